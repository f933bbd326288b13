//! UDP transport listeners.
//!
//! Two sockets, one per elementary stream, fed by a single upstream
//! encoder. Datagram loss is a glitch, never an error: nothing is acked or
//! retried, and a socket-level receive failure is logged and the loop keeps
//! going. The video task exclusively owns the framer and aggregator — one
//! writer, no lock on the raw stream buffer.

use bytes::Bytes;
use tokio::net::UdpSocket;

use lectern_common::protocol::MediaFrame;
use lectern_stream::{AccessUnitAggregator, AnnexBFramer};

use crate::registry;
use crate::state::AppState;

/// Largest datagram payload the listeners accept.
pub const MAX_DATAGRAM: usize = 65_536;

/// Receive the raw H.264 elementary stream, reframe it into access units,
/// and fan each completed unit out to every viewer.
pub async fn run_video(socket: UdpSocket, state: AppState) {
    let mut framer = AnnexBFramer::new();
    let mut aggregator = AccessUnitAggregator::new();
    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
        let len = match socket.recv_from(&mut buf).await {
            Ok((len, _addr)) => len,
            Err(e) => {
                tracing::warn!(error = %e, "video socket receive failed");
                continue;
            }
        };

        for nal in framer.push(&buf[..len]) {
            if let Some(unit) = aggregator.push(nal) {
                tracing::debug!(
                    nal_count = unit.nal_count(),
                    viewers = state.sessions().len(),
                    "access unit flushed"
                );
                registry::broadcast(&state, MediaFrame::Video(unit.into_payload()));
            }
        }
    }
}

/// Relay audio datagrams verbatim — no reassembly, no buffering beyond the
/// per-viewer queue.
pub async fn run_audio(socket: UdpSocket, state: AppState) {
    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, _addr)) => {
                registry::broadcast(
                    &state,
                    MediaFrame::Audio(Bytes::copy_from_slice(&buf[..len])),
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "audio socket receive failed");
            }
        }
    }
}
