//! Access-unit aggregation.
//!
//! Groups the framer's NAL units into access units — one decodable picture
//! each — with a one-element lookahead: an access unit only completes when
//! the NAL unit starting the *next* one arrives. The boundary NAL always
//! stays behind as the sole content of the new open unit, so a flushed unit
//! is complete and never split mid-picture, at the cost of one access unit
//! of latency.

use bytes::{Bytes, BytesMut};

use crate::framer::{NalKind, NalUnit};

/// An ordered group of NAL units forming one decodable picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessUnit {
    nals: Vec<NalUnit>,
}

impl AccessUnit {
    pub fn nals(&self) -> &[NalUnit] {
        &self.nals
    }

    pub fn nal_count(&self) -> usize {
        self.nals.len()
    }

    /// Concatenate into one start-code-delimited byte run, ready to be
    /// tagged and sent. Single-NAL units hand back their bytes without
    /// copying.
    pub fn into_payload(mut self) -> Bytes {
        if self.nals.len() == 1 {
            return self.nals.pop().expect("len checked").into_bytes();
        }
        let total: usize = self.nals.iter().map(|n| n.as_bytes().len()).sum();
        let mut buf = BytesMut::with_capacity(total);
        for nal in self.nals {
            buf.extend_from_slice(nal.into_bytes().as_ref());
        }
        buf.freeze()
    }
}

/// One-behind-boundary access-unit builder.
///
/// Boundary rule: an access-unit delimiter always opens a new unit; a slice
/// NAL opens one only when the currently open unit already holds a slice.
/// That way SPS/PPS arriving before an IDR stay attached to the picture
/// they configure, and a slice directly following an AUD joins that AUD's
/// unit. Non-boundary NAL units (parameter sets, SEI, ...) attach to
/// whichever unit is open.
#[derive(Debug, Default)]
pub struct AccessUnitAggregator {
    open: Vec<NalUnit>,
    open_has_slice: bool,
}

impl AccessUnitAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// NAL units held in the open (unflushed) access unit.
    pub fn open_len(&self) -> usize {
        self.open.len()
    }

    /// Append one NAL unit. Returns the access unit it completed, if any.
    pub fn push(&mut self, nal: NalUnit) -> Option<AccessUnit> {
        let boundary = match nal.kind() {
            NalKind::AccessUnitDelimiter => true,
            kind if kind.is_slice() => self.open_has_slice,
            _ => false,
        };

        let flushed = if boundary && !self.open.is_empty() {
            self.open_has_slice = false;
            Some(AccessUnit {
                nals: std::mem::take(&mut self.open),
            })
        } else {
            None
        };

        self.open_has_slice |= nal.kind().is_slice();
        self.open.push(nal);

        if let Some(unit) = &flushed {
            tracing::trace!(nal_count = unit.nal_count(), "access unit complete");
        }
        flushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framer::{AnnexBFramer, START_CODE};

    /// Run start-code-prefixed bodies through the real framer to get NALs.
    fn nal(body: &[u8]) -> NalUnit {
        let mut framer = AnnexBFramer::new();
        let mut data = START_CODE.to_vec();
        data.extend_from_slice(body);
        data.extend_from_slice(&START_CODE);
        framer.push(&data).remove(0)
    }

    #[test]
    fn aud_idr_aud_flushes_exactly_one_unit() {
        let mut agg = AccessUnitAggregator::new();

        assert!(agg.push(nal(&[0x09, 0xF0])).is_none());
        // The IDR joins the AUD's unit — a delimiter already opened it.
        assert!(agg.push(nal(&[0x65, 0x88])).is_none());

        let unit = agg.push(nal(&[0x09, 0xF0])).expect("boundary flushes");
        assert_eq!(unit.nal_count(), 2);
        assert_eq!(unit.nals()[0].kind(), NalKind::AccessUnitDelimiter);
        assert_eq!(unit.nals()[1].kind(), NalKind::IdrSlice);
        // The second AUD is retained as the new open unit's first element.
        assert_eq!(agg.open_len(), 1);
    }

    #[test]
    fn parameter_sets_stay_with_their_idr() {
        let mut agg = AccessUnitAggregator::new();

        assert!(agg.push(nal(&[0x67, 0x42])).is_none()); // SPS
        assert!(agg.push(nal(&[0x68, 0xCE])).is_none()); // PPS
        assert!(agg.push(nal(&[0x65, 0x88])).is_none()); // IDR joins them

        // Next picture's slice is the boundary.
        let unit = agg.push(nal(&[0x41, 0x9A])).expect("new picture flushes");
        assert_eq!(unit.nal_count(), 3);
        assert_eq!(unit.nals()[2].kind(), NalKind::IdrSlice);
        assert_eq!(agg.open_len(), 1);
    }

    #[test]
    fn slice_only_stream_flushes_per_picture() {
        let mut agg = AccessUnitAggregator::new();

        assert!(agg.push(nal(&[0x41, 0x01])).is_none());
        for _ in 0..3 {
            let unit = agg.push(nal(&[0x41, 0x02])).expect("one unit per slice");
            assert_eq!(unit.nal_count(), 1);
        }
    }

    #[test]
    fn payload_concatenates_with_start_codes() {
        let mut agg = AccessUnitAggregator::new();
        agg.push(nal(&[0x09, 0xF0]));
        agg.push(nal(&[0x65, 0x88, 0x77]));
        let unit = agg.push(nal(&[0x09, 0xF0])).unwrap();

        let payload = unit.into_payload();
        let mut expected = Vec::new();
        expected.extend_from_slice(&START_CODE);
        expected.extend_from_slice(&[0x09, 0xF0]);
        expected.extend_from_slice(&START_CODE);
        expected.extend_from_slice(&[0x65, 0x88, 0x77]);
        assert_eq!(payload.as_ref(), &expected[..]);
    }

    #[test]
    fn single_nal_payload_is_zero_copy() {
        let mut agg = AccessUnitAggregator::new();
        agg.push(nal(&[0x41, 0x01]));
        let unit = agg.push(nal(&[0x41, 0x02])).unwrap();
        let payload = unit.into_payload();
        assert_eq!(payload.as_ref(), &[0, 0, 0, 1, 0x41, 0x01]);
    }

    #[test]
    fn boundary_on_empty_open_unit_does_not_flush() {
        let mut agg = AccessUnitAggregator::new();
        assert!(agg.push(nal(&[0x09, 0xF0])).is_none());
        assert_eq!(agg.open_len(), 1);
    }
}
