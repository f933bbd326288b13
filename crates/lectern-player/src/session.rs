//! WebSocket session to the relay.
//!
//! Handles:
//! - Connection with exponential backoff reconnect
//! - Decoder re-initialization on every (re)connect
//! - Demultiplexing incoming frames via [`FrameRouter`]
//! - Close-code branching: auth rejections are terminal (the caller needs
//!   a fresh token), everything else backs off and retries
//!
//! Long idle stretches are normal — the stream may be paused upstream — so
//! the loop simply waits; only a close or a transport error ends a session.

use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;
use tokio_tungstenite::tungstenite::Message;

use lectern_common::protocol::CloseReason;

use crate::consumer::FrameRouter;
use crate::sink::{AudioDecoder, VideoDecoder};

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Live endpoint URL, e.g. `ws://host:3000/live/ws`.
    pub url: String,
    /// Bearer token passed as the `token` query parameter.
    pub token: String,
}

impl PlayerConfig {
    fn connect_url(&self) -> String {
        format!("{}?token={}", self.url, self.token)
    }
}

#[derive(Debug, Error)]
pub enum PlayerError {
    /// The relay refused the connection for a reason retrying cannot fix.
    #[error("connection rejected: {}", .0.reason())]
    Rejected(CloseReason),
}

/// How one connected session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disconnect {
    /// Server sent a close frame (with one of our codes, if recognized).
    Closed(Option<CloseReason>),
    /// Transport dropped without a close frame.
    Dropped,
}

/// A close reason the reconnect loop must give up on, if any.
fn terminal_rejection(disconnect: Disconnect) -> Option<CloseReason> {
    match disconnect {
        Disconnect::Closed(Some(reason)) if !reason.retryable() => Some(reason),
        _ => None,
    }
}

/// Run the consumer loop — connects, resets decoders, then demultiplexes
/// incoming frames until disconnect. Reconnects with exponential backoff;
/// returns only for rejections a retry cannot cure.
pub async fn run<V, A>(
    config: PlayerConfig,
    router: &mut FrameRouter<V, A>,
) -> Result<(), PlayerError>
where
    V: VideoDecoder,
    A: AudioDecoder,
{
    let mut backoff = Duration::from_secs(1);
    let max_backoff = Duration::from_secs(30);

    loop {
        match connect_and_consume(&config, router).await {
            Ok(disconnect) => {
                if let Some(reason) = terminal_rejection(disconnect) {
                    tracing::error!(code = reason.code(), reason = reason.reason(), "giving up");
                    return Err(PlayerError::Rejected(reason));
                }
                tracing::info!(?disconnect, "session ended");
                backoff = Duration::from_secs(1);
            }
            Err(e) => {
                tracing::warn!(error = %e, "connection failed");
            }
        }

        tracing::info!(backoff_s = backoff.as_secs(), "reconnecting");
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(max_backoff);
    }
}

async fn connect_and_consume<V, A>(
    config: &PlayerConfig,
    router: &mut FrameRouter<V, A>,
) -> Result<Disconnect, tokio_tungstenite::tungstenite::Error>
where
    V: VideoDecoder,
    A: AudioDecoder,
{
    let (ws, _response) = tokio_tungstenite::connect_async(config.connect_url()).await?;
    let (_ws_tx, mut ws_rx) = ws.split();

    tracing::info!("WebSocket connected");

    // Fresh socket, fresh bitstream: an SPS/PPS or IDR may have been missed
    // since the last session, so the decoders start from scratch.
    router.reset();

    while let Some(msg) = ws_rx.next().await {
        match msg? {
            Message::Binary(data) => {
                if let Err(e) = router.handle_message(data) {
                    tracing::warn!(error = %e, "unreadable frame skipped");
                }
            }
            Message::Close(frame) => {
                let reason = frame.and_then(|f| CloseReason::from_code(f.code.into()));
                return Ok(Disconnect::Closed(reason));
            }
            Message::Ping(_) | Message::Pong(_) => {} // handled by tungstenite
            other => {
                tracing::debug!(?other, "ignoring non-binary message");
            }
        }
    }

    Ok(Disconnect::Dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_rejections_stop_the_reconnect_loop() {
        for reason in [
            CloseReason::TokenMissing,
            CloseReason::TokenInvalid,
            CloseReason::TokenExpired,
        ] {
            assert_eq!(
                terminal_rejection(Disconnect::Closed(Some(reason))),
                Some(reason)
            );
        }
    }

    #[test]
    fn everything_else_reconnects() {
        assert_eq!(
            terminal_rejection(Disconnect::Closed(Some(CloseReason::NoActiveLive))),
            None
        );
        assert_eq!(
            terminal_rejection(Disconnect::Closed(Some(CloseReason::SlowConsumer))),
            None
        );
        assert_eq!(terminal_rejection(Disconnect::Closed(None)), None);
        assert_eq!(terminal_rejection(Disconnect::Dropped), None);
    }

    #[test]
    fn connect_url_carries_the_token() {
        let config = PlayerConfig {
            url: "ws://relay:3000/live/ws".into(),
            token: "abc.def.ghi".into(),
        };
        assert_eq!(
            config.connect_url(),
            "ws://relay:3000/live/ws?token=abc.def.ghi"
        );
    }
}
