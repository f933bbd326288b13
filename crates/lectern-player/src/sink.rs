//! Decoder seam.
//!
//! The actual H.264/audio decoders are external black boxes; the consumer
//! only needs to hand them framed payloads and to restart them when
//! bitstream continuity is lost.

use bytes::Bytes;

/// Software video decoder fed one access unit at a time.
///
/// Payloads are start-code-delimited NAL runs, ready for direct decoder
/// consumption.
pub trait VideoDecoder: Send {
    fn submit_access_unit(&mut self, data: Bytes);

    /// Drop all decoder state. Called on every (re)connect: an SPS/PPS or
    /// IDR may have been missed while disconnected, so nothing decoded so
    /// far can be trusted as a reference.
    fn reset(&mut self);
}

/// Audio decoder/playback path fed raw encoded packets.
pub trait AudioDecoder: Send {
    fn submit_packet(&mut self, data: Bytes);

    /// Drop all decoder state (see [`VideoDecoder::reset`]).
    fn reset(&mut self);
}

// ─── Logging stubs ───────────────────────────────────────────────────────────

/// Video "decoder" that only counts and logs — the demo binary's stand-in
/// for a real decoder.
#[derive(Debug, Default)]
pub struct LoggingVideoDecoder {
    access_units: u64,
}

impl VideoDecoder for LoggingVideoDecoder {
    fn submit_access_unit(&mut self, data: Bytes) {
        self.access_units += 1;
        tracing::debug!(n = self.access_units, bytes = data.len(), "video access unit");
    }

    fn reset(&mut self) {
        tracing::info!(decoded = self.access_units, "video decoder reset");
        self.access_units = 0;
    }
}

/// Audio counterpart of [`LoggingVideoDecoder`].
#[derive(Debug, Default)]
pub struct LoggingAudioDecoder {
    packets: u64,
}

impl AudioDecoder for LoggingAudioDecoder {
    fn submit_packet(&mut self, data: Bytes) {
        self.packets += 1;
        tracing::debug!(n = self.packets, bytes = data.len(), "audio packet");
    }

    fn reset(&mut self) {
        tracing::info!(decoded = self.packets, "audio decoder reset");
        self.packets = 0;
    }
}
