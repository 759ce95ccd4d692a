//! Quantum conquest engine library.
//!
//! Exposes the board representation, the round resolver, the action log
//! format, the data-store seam, and live game sessions for use by
//! integration tests and the self-play binary.

pub mod board;
pub mod config;
pub mod error;
pub mod protocol;
pub mod resolve;
pub mod selfplay;
pub mod session;
pub mod store;
