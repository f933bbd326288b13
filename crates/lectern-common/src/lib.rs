//! Shared types for the Lectern live platform.
//!
//! This crate contains:
//! - **Wire protocol** — the binary frame format between relay and viewers
//! - **Auth primitives** — JWT creation/validation and viewer roles
//! - **Close reasons** — stable WebSocket close codes for gate rejections

pub mod auth;
pub mod protocol;
