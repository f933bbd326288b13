//! # lectern-stream
//!
//! Pure logic — no I/O. Takes the raw H.264 elementary-stream bytes the
//! transport layer receives over UDP, reframes them into NAL units, and
//! groups those into access units ready for fan-out.
//!
//! ## Crate structure
//!
//! - [`framer`] — Annex-B start-code scanning over an append-only buffer
//! - [`access_unit`] — one-behind-boundary grouping into decodable pictures
//!
//! The framer does NOT manage sockets — the relay's ingest layer feeds it
//! datagram payloads and forwards whatever completes.

pub mod access_unit;
pub mod framer;

pub use access_unit::{AccessUnit, AccessUnitAggregator};
pub use framer::{AnnexBFramer, NalKind, NalUnit};
