//! Client registry entries and fan-out.
//!
//! Every completed access unit (and every audio packet) is encoded once and
//! offered to each connected viewer's pending queue. Queues are independent:
//! a viewer that cannot keep up is terminated by the backpressure policy
//! without touching anyone else's delivery.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use lectern_common::auth::Role;
use lectern_common::protocol::{CloseReason, MediaFrame};

use crate::state::AppState;

/// Frames a single viewer may have queued before the byte threshold is
/// consulted at all.
pub const FRAME_QUEUE_DEPTH: usize = 64;

// ─── Backpressure policy ─────────────────────────────────────────────────────

/// Threshold + action for viewers that fall behind.
///
/// The action is terminate: exceeding the limit closes the connection with
/// [`CloseReason::SlowConsumer`] rather than letting the queue grow. A
/// drop-oldest (or send-latest-only) variant would slot in here without
/// touching the framer or the fan-out loop.
#[derive(Debug, Clone, Copy)]
pub struct BackpressurePolicy {
    /// Maximum bytes a viewer may have buffered and unsent.
    pub max_buffered_bytes: usize,
}

impl Default for BackpressurePolicy {
    fn default() -> Self {
        BackpressurePolicy {
            max_buffered_bytes: 1024 * 1024,
        }
    }
}

// ─── Client sessions ─────────────────────────────────────────────────────────

/// Registry entry for one connected, authenticated viewer.
///
/// The socket task holds the receiving half of `tx` and the same `buffered`
/// counter; the counter is incremented here on enqueue and decremented by
/// the socket task once the frame has been written out.
pub struct ClientHandle {
    pub user_id: String,
    pub role: Role,
    tx: mpsc::Sender<Bytes>,
    buffered: Arc<AtomicUsize>,
    kick: watch::Sender<Option<CloseReason>>,
}

/// Why an enqueue did not go through.
pub(crate) enum EnqueueError {
    /// Viewer exceeded the backpressure policy.
    Backpressure,
    /// Viewer's socket task already exited.
    Gone,
}

impl ClientHandle {
    pub fn new(
        user_id: String,
        role: Role,
        tx: mpsc::Sender<Bytes>,
        buffered: Arc<AtomicUsize>,
        kick: watch::Sender<Option<CloseReason>>,
    ) -> Self {
        ClientHandle {
            user_id,
            role,
            tx,
            buffered,
            kick,
        }
    }

    /// Bytes currently queued for this viewer.
    pub fn buffered_bytes(&self) -> usize {
        self.buffered.load(Ordering::Acquire)
    }

    /// Offer one encoded frame, checking the policy first.
    pub(crate) fn try_enqueue(
        &self,
        frame: Bytes,
        policy: &BackpressurePolicy,
    ) -> Result<(), EnqueueError> {
        let len = frame.len();
        if self.buffered.load(Ordering::Acquire) + len > policy.max_buffered_bytes {
            return Err(EnqueueError::Backpressure);
        }
        self.buffered.fetch_add(len, Ordering::AcqRel);
        match self.tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.buffered.fetch_sub(len, Ordering::AcqRel);
                Err(EnqueueError::Backpressure)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.buffered.fetch_sub(len, Ordering::AcqRel);
                Err(EnqueueError::Gone)
            }
        }
    }

    /// Force the socket task to close with `reason`.
    pub fn kick(&self, reason: CloseReason) {
        let _ = self.kick.send(Some(reason));
    }
}

// ─── Fan-out ─────────────────────────────────────────────────────────────────

/// Send one media frame to every registered viewer.
///
/// The frame is encoded once; each viewer gets a cheap clone of the same
/// bytes. Viewers whose queue violates the policy are terminated with
/// [`CloseReason::SlowConsumer`]; viewers whose socket task is already gone
/// are dropped from the registry silently. Neither affects the others.
pub fn broadcast(state: &AppState, frame: MediaFrame) {
    let wire = frame.encode();

    let mut doomed: Vec<(Uuid, Option<CloseReason>)> = Vec::new();
    for entry in state.sessions().iter() {
        match entry.value().try_enqueue(wire.clone(), state.policy()) {
            Ok(()) => {}
            Err(EnqueueError::Backpressure) => {
                doomed.push((*entry.key(), Some(CloseReason::SlowConsumer)));
            }
            Err(EnqueueError::Gone) => doomed.push((*entry.key(), None)),
        }
    }

    // Removal happens outside the iteration: DashMap shards stay unlocked
    // while we mutate the registry.
    for (session_id, reason) in doomed {
        if let Some((_, handle)) = state.sessions().remove(&session_id) {
            if let Some(reason) = reason {
                tracing::warn!(
                    session_id = %session_id,
                    user_id = %handle.user_id,
                    buffered = handle.buffered_bytes(),
                    "viewer cannot keep up, terminating"
                );
                handle.kick(reason);
            } else {
                tracing::debug!(session_id = %session_id, "dropping closed viewer session");
            }
        }
    }
}
