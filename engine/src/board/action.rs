//! Player actions for the three interactive phases.
//!
//! An action is immutable once created. The authoritative copy lives in the
//! round's action log; copies held by a session are for feedback only.

use serde::{Deserialize, Serialize};

use super::planet::PlanetId;
use super::state::GamePhase;

/// Discriminant of a [`PendingAction`], in replay group order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Fortify,
    Attack,
    Movement,
}

impl ActionKind {
    /// The phase in which actions of this kind are submitted.
    pub const fn phase(self) -> GamePhase {
        match self {
            ActionKind::Fortify => GamePhase::Fortify,
            ActionKind::Attack => GamePhase::Attack,
            ActionKind::Movement => GamePhase::Movement,
        }
    }
}

/// A single player decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PendingAction {
    /// Place troops on an owned planet.
    Fortify { to: PlanetId, troops: u8 },

    /// Commit troops from an owned planet against another planet.
    Attack {
        from: PlanetId,
        to: PlanetId,
        troops: u8,
    },

    /// Shift troops between two owned planets.
    Movement {
        from: PlanetId,
        to: PlanetId,
        troops: u8,
    },
}

impl PendingAction {
    pub const fn kind(&self) -> ActionKind {
        match self {
            PendingAction::Fortify { .. } => ActionKind::Fortify,
            PendingAction::Attack { .. } => ActionKind::Attack,
            PendingAction::Movement { .. } => ActionKind::Movement,
        }
    }

    /// The source planet, if the action has one.
    pub fn source(&self) -> Option<&PlanetId> {
        match self {
            PendingAction::Fortify { .. } => None,
            PendingAction::Attack { from, .. } | PendingAction::Movement { from, .. } => Some(from),
        }
    }

    /// The planet the action lands on.
    pub fn to(&self) -> &PlanetId {
        match self {
            PendingAction::Fortify { to, .. }
            | PendingAction::Attack { to, .. }
            | PendingAction::Movement { to, .. } => to,
        }
    }

    pub const fn troops(&self) -> u8 {
        match self {
            PendingAction::Fortify { troops, .. }
            | PendingAction::Attack { troops, .. }
            | PendingAction::Movement { troops, .. } => *troops,
        }
    }
}
