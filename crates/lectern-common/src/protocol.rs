//! # Lectern Wire Format
//!
//! Binary frame carried in each WebSocket message between the relay and a
//! viewer. One byte of type tag, then the raw payload:
//!
//! ```text
//!  0                   1
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 ...
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |   Type (8)    |  Payload ...  |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Type `0` carries one complete access unit of start-code-prefixed H.264
//! NAL data, ready for direct decoder consumption. Type `1` carries one raw
//! encoded audio packet, relayed verbatim.
//!
//! Both ends use [`MediaFrame`] so the tag values cannot drift between the
//! server and client halves.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

// ─── Constants ───────────────────────────────────────────────────────────────

/// Type tag for a video access unit.
pub const TAG_VIDEO: u8 = 0;

/// Type tag for an audio packet.
pub const TAG_AUDIO: u8 = 1;

// ─── Frames ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// A frame must carry at least the type byte.
    #[error("empty frame")]
    Empty,
    #[error("unknown frame tag {0}")]
    UnknownTag(u8),
}

/// One relay→viewer message, discriminated by the leading type byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaFrame {
    /// One access unit of start-code-prefixed NAL units.
    Video(Bytes),
    /// One raw audio packet.
    Audio(Bytes),
}

impl MediaFrame {
    /// The wire tag for this frame.
    pub fn tag(&self) -> u8 {
        match self {
            MediaFrame::Video(_) => TAG_VIDEO,
            MediaFrame::Audio(_) => TAG_AUDIO,
        }
    }

    /// The payload bytes (without the tag).
    pub fn payload(&self) -> &Bytes {
        match self {
            MediaFrame::Video(payload) | MediaFrame::Audio(payload) => payload,
        }
    }

    /// Serialize to the wire layout: 1 tag byte + payload.
    pub fn encode(&self) -> Bytes {
        let payload = self.payload();
        let mut buf = BytesMut::with_capacity(1 + payload.len());
        buf.put_u8(self.tag());
        buf.extend_from_slice(payload);
        buf.freeze()
    }

    /// Parse a received binary message.
    pub fn decode(data: Bytes) -> Result<Self, FrameError> {
        if data.is_empty() {
            return Err(FrameError::Empty);
        }
        let payload = data.slice(1..);
        match data[0] {
            TAG_VIDEO => Ok(MediaFrame::Video(payload)),
            TAG_AUDIO => Ok(MediaFrame::Audio(payload)),
            other => Err(FrameError::UnknownTag(other)),
        }
    }
}

// ─── Close reasons ───────────────────────────────────────────────────────────

/// Why the relay closed (or refused) a viewer connection.
///
/// Codes are stable so the viewer side can branch behavior: an auth failure
/// means re-login, [`CloseReason::NoActiveLive`] means "stream not started",
/// [`CloseReason::SlowConsumer`] means the client fell behind and may simply
/// reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// No `token` query parameter on the upgrade URL.
    TokenMissing,
    /// Token failed signature/issuer validation.
    TokenInvalid,
    /// Token was well-formed but past its expiry.
    TokenExpired,
    /// Restricted viewer role with no live session in progress.
    NoActiveLive,
    /// Outbound buffer exceeded the backpressure threshold.
    SlowConsumer,
    /// Generic server-side failure.
    Internal,
}

impl CloseReason {
    /// WebSocket close code. Gate rejections use the 4000-range private
    /// codes; [`CloseReason::Internal`] is the standard 1011.
    pub fn code(self) -> u16 {
        match self {
            CloseReason::TokenMissing => 4001,
            CloseReason::TokenInvalid => 4002,
            CloseReason::TokenExpired => 4003,
            CloseReason::NoActiveLive => 4004,
            CloseReason::SlowConsumer => 4005,
            CloseReason::Internal => 1011,
        }
    }

    /// Human-readable close reason sent in the close frame.
    pub fn reason(self) -> &'static str {
        match self {
            CloseReason::TokenMissing => "token missing",
            CloseReason::TokenInvalid => "token invalid",
            CloseReason::TokenExpired => "token expired",
            CloseReason::NoActiveLive => "no active live",
            CloseReason::SlowConsumer => "slow consumer",
            CloseReason::Internal => "internal error",
        }
    }

    /// Map a received close code back to a reason, if it is one of ours.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            4001 => Some(CloseReason::TokenMissing),
            4002 => Some(CloseReason::TokenInvalid),
            4003 => Some(CloseReason::TokenExpired),
            4004 => Some(CloseReason::NoActiveLive),
            4005 => Some(CloseReason::SlowConsumer),
            1011 => Some(CloseReason::Internal),
            _ => None,
        }
    }

    /// Whether reconnecting with the same token can possibly succeed.
    /// Auth rejections need a fresh token first.
    pub fn retryable(self) -> bool {
        !matches!(
            self,
            CloseReason::TokenMissing | CloseReason::TokenInvalid | CloseReason::TokenExpired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_frame_wire_layout() {
        let frame = MediaFrame::Video(Bytes::from_static(&[0, 0, 0, 1, 0x65, 0xAA]));
        let wire = frame.encode();
        assert_eq!(wire[0], TAG_VIDEO);
        assert_eq!(&wire[1..], &[0, 0, 0, 1, 0x65, 0xAA]);
    }

    #[test]
    fn audio_frame_wire_layout() {
        let frame = MediaFrame::Audio(Bytes::from_static(&[0xDE, 0xAD]));
        let wire = frame.encode();
        assert_eq!(wire[0], TAG_AUDIO);
        assert_eq!(&wire[1..], &[0xDE, 0xAD]);
    }

    #[test]
    fn decode_routes_by_tag() {
        let video = MediaFrame::decode(Bytes::from_static(&[0, 1, 2, 3])).unwrap();
        assert!(matches!(video, MediaFrame::Video(_)));
        assert_eq!(video.payload().as_ref(), &[1, 2, 3]);

        let audio = MediaFrame::decode(Bytes::from_static(&[1, 9])).unwrap();
        assert!(matches!(audio, MediaFrame::Audio(_)));
    }

    #[test]
    fn decode_rejects_empty_and_unknown() {
        assert_eq!(MediaFrame::decode(Bytes::new()), Err(FrameError::Empty));
        assert_eq!(
            MediaFrame::decode(Bytes::from_static(&[7, 0])),
            Err(FrameError::UnknownTag(7))
        );
    }

    #[test]
    fn tag_only_frame_has_empty_payload() {
        let frame = MediaFrame::decode(Bytes::from_static(&[1])).unwrap();
        assert!(frame.payload().is_empty());
    }

    #[test]
    fn close_codes_are_distinct_and_round_trip() {
        let all = [
            CloseReason::TokenMissing,
            CloseReason::TokenInvalid,
            CloseReason::TokenExpired,
            CloseReason::NoActiveLive,
            CloseReason::SlowConsumer,
            CloseReason::Internal,
        ];
        for (i, a) in all.iter().enumerate() {
            assert_eq!(CloseReason::from_code(a.code()), Some(*a));
            for b in &all[i + 1..] {
                assert_ne!(a.code(), b.code());
            }
        }
        assert_eq!(CloseReason::from_code(1000), None);
    }

    #[test]
    fn auth_rejections_are_not_retryable() {
        assert!(!CloseReason::TokenExpired.retryable());
        assert!(!CloseReason::TokenMissing.retryable());
        assert!(CloseReason::NoActiveLive.retryable());
        assert!(CloseReason::SlowConsumer.retryable());
    }
}
