//! Annex-B bitstream framing.
//!
//! The encoder sends a continuous H.264 elementary stream chopped into UDP
//! datagrams at arbitrary positions, so a NAL unit may span datagrams and a
//! datagram may carry several NAL units. [`AnnexBFramer`] owns the raw
//! stream buffer: each datagram payload is appended, the buffer is scanned
//! for `00 00 00 01` start codes, and the bytes between consecutive codes
//! are emitted as one [`NalUnit`]. The unterminated tail (from the last
//! start code onward) always stays in the buffer for the next datagram.

use bytes::{Buf, Bytes, BytesMut};

/// The 4-byte Annex-B start code delimiting NAL units.
pub const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

// ─── NAL units ───────────────────────────────────────────────────────────────

/// NAL unit classification, from the low 5 bits of the header byte.
///
/// Only the types that matter for access-unit boundaries get their own
/// variant; everything else (SPS, PPS, SEI, ...) is [`NalKind::Other`] and
/// is forwarded untouched — parameter sets belong to whichever access unit
/// is currently open and must never be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalKind {
    /// Type 9 — explicit picture boundary marker.
    AccessUnitDelimiter,
    /// Type 5 — slice of an IDR picture.
    IdrSlice,
    /// Type 1 — slice of a non-IDR picture.
    NonIdrSlice,
    /// Any other type, carried through unclassified.
    Other(u8),
}

impl NalKind {
    /// Classify from the NAL header byte (the first byte after the start code).
    pub fn from_header(header: u8) -> Self {
        match header & 0x1F {
            9 => NalKind::AccessUnitDelimiter,
            5 => NalKind::IdrSlice,
            1 => NalKind::NonIdrSlice,
            t => NalKind::Other(t),
        }
    }

    /// Whether this is a picture slice (IDR or not).
    pub fn is_slice(self) -> bool {
        matches!(self, NalKind::IdrSlice | NalKind::NonIdrSlice)
    }
}

/// One extracted NAL unit, start-code prefix included.
///
/// Immutable once extracted; ownership moves to the access-unit aggregator
/// and the prefix is kept so flushed access units concatenate directly into
/// a decoder-ready byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NalUnit {
    data: Bytes,
    kind: NalKind,
}

impl NalUnit {
    /// Wrap an extracted, start-code-prefixed byte range.
    ///
    /// Callers must pass at least the start code plus the header byte.
    fn from_prefixed(data: Bytes) -> Self {
        debug_assert!(data.len() > START_CODE.len());
        debug_assert_eq!(&data[..START_CODE.len()], &START_CODE);
        let kind = NalKind::from_header(data[START_CODE.len()]);
        NalUnit { data, kind }
    }

    pub fn kind(&self) -> NalKind {
        self.kind
    }

    /// The full start-code-prefixed bytes.
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// Payload length excluding the start code.
    pub fn payload_len(&self) -> usize {
        self.data.len() - START_CODE.len()
    }
}

// ─── Framer ──────────────────────────────────────────────────────────────────

/// Stateful Annex-B reframer over the raw video stream buffer.
///
/// Single-writer: exactly one ingest task owns the framer, so the buffer
/// needs no lock. Invariant: bytes belonging to an unterminated NAL unit are
/// never discarded between [`push`](Self::push) calls — only bytes that
/// precede the first start code ever seen (a mid-stream join with no NAL to
/// attribute them to) are dropped.
#[derive(Debug, Default)]
pub struct AnnexBFramer {
    buf: BytesMut,
    /// Offset below which the buffer is known to contain no start code.
    scanned: usize,
    /// Set once the first start code has been found.
    synced: bool,
}

impl AnnexBFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes currently held for the unterminated tail.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Append one datagram payload and emit every NAL unit it completes.
    pub fn push(&mut self, datagram: &[u8]) -> Vec<NalUnit> {
        self.buf.extend_from_slice(datagram);

        if !self.synced && !self.resync() {
            return Vec::new();
        }

        // The buffer now begins with a start code. Every further start code
        // terminates the NAL unit before it.
        let mut out = Vec::new();
        while let Some(next) = find_start_code(&self.buf, self.scanned.max(START_CODE.len())) {
            let raw = self.buf.split_to(next).freeze();
            // A start code immediately followed by another carries no header
            // byte; there is nothing to classify or forward.
            if raw.len() > START_CODE.len() {
                let nal = NalUnit::from_prefixed(raw);
                tracing::trace!(kind = ?nal.kind(), len = nal.payload_len(), "NAL unit framed");
                out.push(nal);
            }
            self.scanned = START_CODE.len();
        }

        // Everything up to a possible start-code prefix at the very end has
        // been scanned; resume there next time.
        self.scanned = self.buf.len().saturating_sub(START_CODE.len() - 1);
        out
    }

    /// Find the first start code and drop everything before it. Until one
    /// appears, retain only the bytes that could be the prefix of a start
    /// code split across datagrams.
    fn resync(&mut self) -> bool {
        match find_start_code(&self.buf, 0) {
            Some(pos) => {
                if pos > 0 {
                    tracing::debug!(dropped = pos, "discarding bytes before first start code");
                    self.buf.advance(pos);
                }
                self.scanned = 0;
                self.synced = true;
                true
            }
            None => {
                let keep = self.buf.len().min(START_CODE.len() - 1);
                let excess = self.buf.len() - keep;
                if excess > 0 {
                    self.buf.advance(excess);
                }
                false
            }
        }
    }
}

/// First offset `>= from` where a start code begins, if any.
fn find_start_code(data: &[u8], from: usize) -> Option<usize> {
    if data.len() < from + START_CODE.len() {
        return None;
    }
    data[from..]
        .windows(START_CODE.len())
        .position(|w| w == START_CODE)
        .map(|p| p + from)
}
