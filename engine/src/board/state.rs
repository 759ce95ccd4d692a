//! Round phase representation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The phase a round (or a single player within it) is in.
///
/// The three interactive phases sort before the two resolution phases, so
/// "earliest phase" comparisons use the derived ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Fortify,
    Attack,
    Movement,
    ApplyingMoves,
    GameComplete,
}

impl GamePhase {
    /// Returns the wire name used by the action log and the data store.
    pub const fn as_str(self) -> &'static str {
        match self {
            GamePhase::Fortify => "fortify",
            GamePhase::Attack => "attack",
            GamePhase::Movement => "movement",
            GamePhase::ApplyingMoves => "applying_moves",
            GamePhase::GameComplete => "game_complete",
        }
    }

    /// Parses a phase from its wire name.
    pub fn from_name(s: &str) -> Option<GamePhase> {
        match s {
            "fortify" => Some(GamePhase::Fortify),
            "attack" => Some(GamePhase::Attack),
            "movement" => Some(GamePhase::Movement),
            "applying_moves" => Some(GamePhase::ApplyingMoves),
            "game_complete" => Some(GamePhase::GameComplete),
            _ => None,
        }
    }

    /// True for the phases in which players submit actions.
    pub const fn is_interactive(self) -> bool {
        matches!(self, GamePhase::Fortify | GamePhase::Attack | GamePhase::Movement)
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
