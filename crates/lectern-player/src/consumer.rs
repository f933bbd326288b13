//! Incoming-message demultiplexing.
//!
//! Each binary WebSocket message is one [`MediaFrame`]; the router decodes
//! it and hands the payload to the matching decoder. While locally paused
//! it drops frames instead of queuing them — otherwise un-pausing would
//! dump a decode backlog on the decoder all at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;

use lectern_common::protocol::{FrameError, MediaFrame};

use crate::sink::{AudioDecoder, VideoDecoder};

/// Cloneable handle for toggling the router's pause state from the UI.
#[derive(Clone)]
pub struct PauseControl {
    paused: Arc<AtomicBool>,
}

impl PauseControl {
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }
}

/// Routes framed messages to the video/audio decoders.
pub struct FrameRouter<V, A> {
    video: V,
    audio: A,
    paused: Arc<AtomicBool>,
}

impl<V: VideoDecoder, A: AudioDecoder> FrameRouter<V, A> {
    pub fn new(video: V, audio: A) -> Self {
        FrameRouter {
            video,
            audio,
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn pause_control(&self) -> PauseControl {
        PauseControl {
            paused: self.paused.clone(),
        }
    }

    /// Re-initialize both decoders. Run on every (re)connect — there is no
    /// bitstream continuity across connections.
    pub fn reset(&mut self) {
        self.video.reset();
        self.audio.reset();
    }

    /// Demultiplex one binary message by its leading type byte.
    pub fn handle_message(&mut self, data: Bytes) -> Result<(), FrameError> {
        let frame = MediaFrame::decode(data)?;

        if self.paused.load(Ordering::Acquire) {
            tracing::trace!(tag = frame.tag(), "paused, dropping frame");
            return Ok(());
        }

        match frame {
            MediaFrame::Video(payload) => self.video.submit_access_unit(payload),
            MediaFrame::Audio(payload) => self.audio.submit_packet(payload),
        }
        Ok(())
    }
}
