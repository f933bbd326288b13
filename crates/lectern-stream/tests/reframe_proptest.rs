//! Property-based tests for the Annex-B framer.
//!
//! The encoder chops the elementary stream into UDP datagrams at arbitrary
//! byte positions, so the one property the framer must hold is chunking
//! invariance: however the stream is split, the emitted NAL units are
//! exactly the ones a single-shot scan of the whole stream would produce.

use proptest::prelude::*;

use lectern_stream::framer::{AnnexBFramer, START_CODE};
use lectern_stream::{AccessUnitAggregator, NalKind};

/// Build an Annex-B stream from NAL bodies. Bodies use no zero bytes, so no
/// accidental start code can appear inside a NAL (real streams guarantee
/// this via emulation prevention).
fn annex_b_stream(bodies: &[Vec<u8>]) -> Vec<u8> {
    let mut stream = Vec::new();
    for body in bodies {
        stream.extend_from_slice(&START_CODE);
        stream.extend_from_slice(body);
    }
    // Terminate the last NAL so every body is emitted.
    stream.extend_from_slice(&START_CODE);
    stream
}

/// NAL bodies: header byte + payload, none of them zero.
fn nal_bodies() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(1u8..=255, 1..48), 1..24)
}

proptest! {
    /// Chunking invariance: any split of the stream into datagrams yields
    /// the same NAL sequence as feeding it in one piece.
    #[test]
    fn rechunking_never_changes_framing(
        bodies in nal_bodies(),
        chunk_seed in any::<u64>(),
    ) {
        let stream = annex_b_stream(&bodies);

        // Reference: the whole stream as one datagram.
        let mut reference = AnnexBFramer::new();
        let expected = reference.push(&stream);

        // Candidate: split into pseudo-random chunks (1..=17 bytes).
        let mut candidate = AnnexBFramer::new();
        let mut produced = Vec::new();
        let mut pos = 0usize;
        let mut state = chunk_seed | 1;
        while pos < stream.len() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let len = (1 + (state >> 33) % 17) as usize;
            let end = (pos + len).min(stream.len());
            produced.extend(candidate.push(&stream[pos..end]));
            pos = end;
        }

        prop_assert_eq!(produced.len(), expected.len());
        for (got, want) in produced.iter().zip(expected.iter()) {
            prop_assert_eq!(got.as_bytes(), want.as_bytes());
            prop_assert_eq!(got.kind(), want.kind());
        }
    }

    /// Every emitted NAL keeps its start-code prefix and classifies from
    /// its header byte, whatever the input.
    #[test]
    fn emitted_nals_are_prefixed_and_classified(bodies in nal_bodies()) {
        let stream = annex_b_stream(&bodies);
        let mut framer = AnnexBFramer::new();
        let nals = framer.push(&stream);

        prop_assert_eq!(nals.len(), bodies.len());
        for (nal, body) in nals.iter().zip(bodies.iter()) {
            prop_assert_eq!(&nal.as_bytes()[..START_CODE.len()], &START_CODE[..]);
            prop_assert_eq!(&nal.as_bytes()[START_CODE.len()..], &body[..]);
            prop_assert_eq!(nal.kind(), NalKind::from_header(body[0]));
        }
    }

    /// Boundary count property: a stream with N boundary NAL units flushes
    /// exactly N-1 access units (the last boundary stays open).
    #[test]
    fn aggregator_flushes_one_unit_per_boundary(aud_count in 1usize..16) {
        // AUD followed by one IDR slice, repeated.
        let mut bodies = Vec::new();
        for _ in 0..aud_count {
            bodies.push(vec![0x09, 0xF0]);
            bodies.push(vec![0x65, 0x88]);
        }
        let stream = annex_b_stream(&bodies);

        let mut framer = AnnexBFramer::new();
        let mut agg = AccessUnitAggregator::new();
        let mut flushed = 0usize;
        for nal in framer.push(&stream) {
            if agg.push(nal).is_some() {
                flushed += 1;
            }
        }

        prop_assert_eq!(flushed, aud_count - 1);
        prop_assert_eq!(agg.open_len(), 2);
    }
}
