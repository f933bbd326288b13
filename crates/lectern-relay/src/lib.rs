//! Lectern live relay library.
//!
//! Re-exports the router, shared state, registry, gate, and ingest loops so
//! they can be used by integration tests (and potentially embedded in the
//! platform's own binary).

pub mod gate;
pub mod ingest;
pub mod registry;
pub mod state;
pub mod ws_viewer;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Build the relay's HTTP/WebSocket router.
///
/// Path-based routing multiplexes the live endpoint beside whatever other
/// WebSocket endpoints (text chat, ...) the embedding platform mounts on
/// the same port.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/live/ws", get(ws_viewer::handler))
        .route("/live/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}
