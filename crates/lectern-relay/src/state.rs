//! Shared application state.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use lectern_common::auth::JwtContext;

use crate::gate::LiveDirectory;
use crate::registry::{BackpressurePolicy, ClientHandle};

/// State shared across the WebSocket handlers and the ingest tasks.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    pub jwt: JwtContext,
    /// The "is a live session in progress" authorization seam — a database
    /// lookup in the full platform.
    pub live: Arc<dyn LiveDirectory>,
    /// Connected viewer sessions, keyed by session id.
    pub sessions: DashMap<Uuid, ClientHandle>,
    pub policy: BackpressurePolicy,
}

impl AppState {
    pub fn new(jwt: JwtContext, live: Arc<dyn LiveDirectory>, policy: BackpressurePolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                jwt,
                live,
                sessions: DashMap::new(),
                policy,
            }),
        }
    }

    pub fn jwt(&self) -> &JwtContext {
        &self.inner.jwt
    }

    pub fn live(&self) -> &dyn LiveDirectory {
        self.inner.live.as_ref()
    }

    pub fn sessions(&self) -> &DashMap<Uuid, ClientHandle> {
        &self.inner.sessions
    }

    pub fn policy(&self) -> &BackpressurePolicy {
        &self.inner.policy
    }
}
