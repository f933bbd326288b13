//! Connection gate for the viewer WebSocket endpoint.
//!
//! Runs once per upgrade, before the session may enter the registry. Every
//! step is a hard rejection with its own close reason:
//!
//! 1. `token` query parameter present
//! 2. token signature and expiry valid (distinct reasons)
//! 3. restricted viewer roles need a live session in progress
//!
//! The gate is re-run for every connection attempt; nothing is cached
//! across reconnects.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;

use lectern_common::auth::{AuthError, Claims};
use lectern_common::protocol::CloseReason;

use crate::state::AppState;

// ─── Live-session authorization seam ─────────────────────────────────────────

/// Boolean contract with the platform's session store: is a live session
/// currently in progress for this viewer's context? The real implementation
/// is a database lookup owned by the web application.
pub trait LiveDirectory: Send + Sync {
    fn has_active_live<'a>(&'a self, claims: &'a Claims) -> BoxFuture<'a, bool>;
}

/// Directory that admits everyone — for deployments where the relay only
/// runs while a lecture is on air.
pub struct AlwaysLive;

impl LiveDirectory for AlwaysLive {
    fn has_active_live<'a>(&'a self, _claims: &'a Claims) -> BoxFuture<'a, bool> {
        Box::pin(async { true })
    }
}

/// Directory backed by a single shared flag the embedding platform toggles
/// when a live session starts or ends.
#[derive(Default)]
pub struct LiveFlag {
    live: AtomicBool,
}

impl LiveFlag {
    pub fn new(initially_live: bool) -> Arc<Self> {
        Arc::new(LiveFlag {
            live: AtomicBool::new(initially_live),
        })
    }

    pub fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::Release);
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }
}

impl LiveDirectory for LiveFlag {
    fn has_active_live<'a>(&'a self, _claims: &'a Claims) -> BoxFuture<'a, bool> {
        let live = self.is_live();
        Box::pin(async move { live })
    }
}

// ─── Admission ───────────────────────────────────────────────────────────────

/// Run the three gate checks for one upgrade attempt.
pub async fn admit(state: &AppState, token: Option<&str>) -> Result<Claims, CloseReason> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or(CloseReason::TokenMissing)?;

    let claims = state.jwt().verify_token(token).map_err(|e| match e {
        AuthError::Expired => CloseReason::TokenExpired,
        _ => CloseReason::TokenInvalid,
    })?;

    if claims.role.requires_active_live() && !state.live().has_active_live(&claims).await {
        return Err(CloseReason::NoActiveLive);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::BackpressurePolicy;
    use chrono::Utc;
    use lectern_common::auth::{JwtContext, Role};

    fn state_with(live: Arc<dyn LiveDirectory>) -> (AppState, JwtContext) {
        let (jwt, seed) = JwtContext::generate();
        let state = AppState::new(
            JwtContext::from_ed25519_seed(&seed).unwrap(),
            live,
            BackpressurePolicy::default(),
        );
        (state, jwt)
    }

    fn token_for(jwt: &JwtContext, role: Role, ttl_secs: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims::new("usr_gate", role, now, ttl_secs);
        jwt.create_token(&claims).unwrap()
    }

    #[tokio::test]
    async fn missing_token_rejected_first() {
        let (state, _jwt) = state_with(Arc::new(AlwaysLive));
        assert_eq!(admit(&state, None).await.unwrap_err(), CloseReason::TokenMissing);
        assert_eq!(
            admit(&state, Some("")).await.unwrap_err(),
            CloseReason::TokenMissing
        );
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let (state, _jwt) = state_with(Arc::new(AlwaysLive));
        assert_eq!(
            admit(&state, Some("not.a.jwt")).await.unwrap_err(),
            CloseReason::TokenInvalid
        );
    }

    #[tokio::test]
    async fn expired_token_is_distinct_from_invalid() {
        let (state, jwt) = state_with(Arc::new(AlwaysLive));
        let token = token_for(&jwt, Role::Instructor, -100);
        assert_eq!(
            admit(&state, Some(&token)).await.unwrap_err(),
            CloseReason::TokenExpired
        );
    }

    #[tokio::test]
    async fn student_needs_an_active_live() {
        let flag = LiveFlag::new(false);
        let (state, jwt) = state_with(flag.clone());
        let token = token_for(&jwt, Role::Student, 3600);

        assert_eq!(
            admit(&state, Some(&token)).await.unwrap_err(),
            CloseReason::NoActiveLive
        );

        flag.set_live(true);
        let claims = admit(&state, Some(&token)).await.expect("admitted");
        assert_eq!(claims.role, Role::Student);
    }

    #[tokio::test]
    async fn instructor_admitted_without_active_live() {
        let (state, jwt) = state_with(LiveFlag::new(false));
        let token = token_for(&jwt, Role::Instructor, 3600);
        assert!(admit(&state, Some(&token)).await.is_ok());
    }
}
