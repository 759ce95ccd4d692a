//! Live game sessions: roster, readiness gates, the per-game state owner, and
//! its async coordinator.

pub mod game;
pub mod readiness;
pub mod roster;
pub mod service;

pub use game::{GameSession, MoveNotice, PlacementNotice, RoundOutcome};
pub use readiness::{pending_players, wait_for_gate, Gate};
pub use roster::{admit, exit_game, join_game, GameStatus, JoinRequest};
pub use service::{GameHandle, SessionEvent};
