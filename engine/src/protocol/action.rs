//! Action Log row format.
//!
//! One row per submitted action:
//!
//! ```json
//! {"game_id":"g1","round":1,"player_id":"p1","phase":"attack",
//!  "action":{"action_type":"attack",
//!            "action_data":{"from_planet":"a","to_planet":"b","troops":3}},
//!  "submitted_order":7}
//! ```
//!
//! `submitted_order` is assigned by the store on append and is the only
//! ordering key used during replay.

use serde::{Deserialize, Serialize};

use crate::board::{GamePhase, PendingAction, PlanetId, PlayerId};

/// Wire form of a [`PendingAction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action_type", content = "action_data", rename_all = "snake_case")]
pub enum LoggedAction {
    PlaceTroops {
        planet_id: PlanetId,
        troops: u8,
    },
    Attack {
        from_planet: PlanetId,
        to_planet: PlanetId,
        troops: u8,
    },
    MoveTroops {
        from_planet: PlanetId,
        to_planet: PlanetId,
        troops: u8,
    },
}

impl LoggedAction {
    /// The wire name of the action type.
    pub const fn action_type(&self) -> &'static str {
        match self {
            LoggedAction::PlaceTroops { .. } => "place_troops",
            LoggedAction::Attack { .. } => "attack",
            LoggedAction::MoveTroops { .. } => "move_troops",
        }
    }
}

impl From<&PendingAction> for LoggedAction {
    fn from(action: &PendingAction) -> Self {
        match action.clone() {
            PendingAction::Fortify { to, troops } => LoggedAction::PlaceTroops {
                planet_id: to,
                troops,
            },
            PendingAction::Attack { from, to, troops } => LoggedAction::Attack {
                from_planet: from,
                to_planet: to,
                troops,
            },
            PendingAction::Movement { from, to, troops } => LoggedAction::MoveTroops {
                from_planet: from,
                to_planet: to,
                troops,
            },
        }
    }
}

impl From<LoggedAction> for PendingAction {
    fn from(action: LoggedAction) -> Self {
        match action {
            LoggedAction::PlaceTroops { planet_id, troops } => PendingAction::Fortify {
                to: planet_id,
                troops,
            },
            LoggedAction::Attack {
                from_planet,
                to_planet,
                troops,
            } => PendingAction::Attack {
                from: from_planet,
                to: to_planet,
                troops,
            },
            LoggedAction::MoveTroops {
                from_planet,
                to_planet,
                troops,
            } => PendingAction::Movement {
                from: from_planet,
                to: to_planet,
                troops,
            },
        }
    }
}

/// A new log row before the store has assigned its order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAction {
    pub game_id: String,
    pub round: u32,
    pub player_id: PlayerId,
    pub phase: GamePhase,
    pub action: LoggedAction,
}

impl NewAction {
    /// Builds a row for `action`, tagged with the phase its kind belongs to.
    pub fn new(game_id: impl Into<String>, round: u32, player_id: PlayerId, action: &PendingAction) -> Self {
        NewAction {
            game_id: game_id.into(),
            round,
            player_id,
            phase: action.kind().phase(),
            action: LoggedAction::from(action),
        }
    }
}

/// A stored, immutable Action Log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub game_id: String,
    pub round: u32,
    pub player_id: PlayerId,
    pub phase: GamePhase,
    pub action: LoggedAction,
    pub submitted_order: u64,
}

impl ActionLogEntry {
    pub fn from_new(new: NewAction, submitted_order: u64) -> Self {
        ActionLogEntry {
            game_id: new.game_id,
            round: new.round,
            player_id: new.player_id,
            phase: new.phase,
            action: new.action,
            submitted_order,
        }
    }

    /// The domain action carried by this row.
    pub fn pending(&self) -> PendingAction {
        PendingAction::from(self.action.clone())
    }
}
