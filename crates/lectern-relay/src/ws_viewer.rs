//! WebSocket handler for viewer connections.
//!
//! Endpoint: GET /live/ws?token=...
//!
//! Flow:
//! 1. Upgrade, then run the connection gate (token, role, live check)
//! 2. On rejection: close immediately with the gate's distinct close code
//! 3. On admission: register the session and pump queued media frames to
//!    the socket until the viewer leaves, errors, or is kicked by the
//!    backpressure policy
//!
//! Per-viewer ordering holds because this task is the only writer to its
//! socket: a later access unit is never sent before an earlier one.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::stream::StreamExt;
use futures::SinkExt;
use serde::Deserialize;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use lectern_common::protocol::CloseReason;

use crate::gate;
use crate::registry::{ClientHandle, FRAME_QUEUE_DEPTH};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    token: Option<String>,
}

/// Axum handler — upgrades HTTP to WebSocket.
pub async fn handler(
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, params, socket))
}

fn close_frame(reason: CloseReason) -> Message {
    Message::Close(Some(CloseFrame {
        code: reason.code(),
        reason: reason.reason().into(),
    }))
}

/// Main WebSocket handler for a single viewer connection.
async fn handle_socket(state: AppState, params: ConnectParams, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let claims = match gate::admit(&state, params.token.as_deref()).await {
        Ok(claims) => claims,
        Err(reason) => {
            tracing::info!(code = reason.code(), reason = reason.reason(), "viewer refused");
            let _ = ws_tx.send(close_frame(reason)).await;
            return;
        }
    };

    let session_id = Uuid::now_v7();
    let (tx, mut rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
    let buffered = Arc::new(AtomicUsize::new(0));
    let (kick_tx, mut kick_rx) = watch::channel(None);

    state.sessions().insert(
        session_id,
        ClientHandle::new(
            claims.sub.clone(),
            claims.role,
            tx,
            buffered.clone(),
            kick_tx,
        ),
    );

    tracing::info!(
        session_id = %session_id,
        user_id = %claims.sub,
        role = ?claims.role,
        viewers = state.sessions().len(),
        "viewer connected"
    );

    loop {
        tokio::select! {
            // Kick wins over a drained queue so the close frame carries
            // the policy's code instead of a bare disconnect.
            biased;

            // Forced termination (backpressure policy)
            _ = kick_rx.changed() => {
                let reason = *kick_rx.borrow_and_update();
                if let Some(reason) = reason {
                    let _ = ws_tx.send(close_frame(reason)).await;
                }
                break;
            }

            // Queued media frames → socket
            frame = rx.recv() => {
                match frame {
                    Some(frame) => {
                        let len = frame.len();
                        if ws_tx.send(Message::Binary(frame)).await.is_err() {
                            break;
                        }
                        buffered.fetch_sub(len, Ordering::AcqRel);
                    }
                    None => break,
                }
            }

            // Messages FROM the viewer — only close matters
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {} // Ping/Pong handled by axum
                }
            }
        }
    }

    // Cleanup — the registry entry may already be gone if the policy
    // removed it before kicking us.
    state.sessions().remove(&session_id);
    tracing::info!(session_id = %session_id, user_id = %claims.sub, "viewer disconnected");
}
