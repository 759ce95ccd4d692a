//! Phase sequencing logic.
//!
//! Each active player walks fortify -> attack -> movement on their own. The
//! round-wide phase is the earliest phase any active player is still in;
//! once every active player has finished movement the round moves to
//! applying_moves, and completing it starts the next round in fortify or ends
//! the game.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::{Galaxy, GamePhase, Player, PlayerId};
use crate::config::GameConfig;
use crate::error::ActionError;

/// Fortify budget for a player owning `owned` planets in `round`.
///
/// Round 1 uses the fixed first-round bonus; later rounds use
/// `max(min_fortify_budget, owned)`.
pub fn troop_budget(round: u32, owned: usize, config: &GameConfig) -> u32 {
    if round <= 1 {
        u32::from(config.first_round_bonus)
    } else {
        (owned as u32).max(u32::from(config.min_fortify_budget))
    }
}

/// Next per-player phase. Movement has no successor; finishing it is
/// tracked by the `finished` flag instead.
pub fn next_phase(phase: GamePhase) -> Option<GamePhase> {
    match phase {
        GamePhase::Fortify => Some(GamePhase::Attack),
        GamePhase::Attack => Some(GamePhase::Movement),
        GamePhase::Movement | GamePhase::ApplyingMoves | GamePhase::GameComplete => None,
    }
}

/// One active player's progress through the current round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerTurn {
    pub phase: GamePhase,
    pub budget: u32,
    pub placed: u32,
    pub ready: bool,
    pub finished: bool,
}

impl PlayerTurn {
    fn new(budget: u32) -> Self {
        PlayerTurn {
            phase: GamePhase::Fortify,
            budget,
            placed: 0,
            ready: false,
            finished: false,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.budget.saturating_sub(self.placed)
    }
}

/// Result of completing a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundAdvance {
    pub round: u32,
    pub phase: GamePhase,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseMachine {
    round: u32,
    applying: bool,
    complete: bool,
    turns: BTreeMap<PlayerId, PlayerTurn>,
}

impl PhaseMachine {
    /// Starts round 1 in fortify for every active player.
    pub fn new(players: &[Player], galaxy: &Galaxy, config: &GameConfig) -> Self {
        let mut machine = PhaseMachine {
            round: 1,
            applying: false,
            complete: false,
            turns: BTreeMap::new(),
        };
        machine.sync_roster(players, galaxy, config);
        machine
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// The round-wide phase.
    pub fn phase(&self) -> GamePhase {
        if self.complete {
            return GamePhase::GameComplete;
        }
        if self.applying {
            return GamePhase::ApplyingMoves;
        }
        self.turns
            .values()
            .map(|t| t.phase)
            .min()
            .unwrap_or(GamePhase::Fortify)
    }

    pub fn turn(&self, player: &PlayerId) -> Option<&PlayerTurn> {
        self.turns.get(player)
    }

    pub fn turns(&self) -> impl Iterator<Item = (&PlayerId, &PlayerTurn)> {
        self.turns.iter()
    }

    /// Adds turns for newly active players and drops departed ones. A player
    /// joining mid-round starts in fortify with that round's budget.
    pub fn sync_roster(&mut self, players: &[Player], galaxy: &Galaxy, config: &GameConfig) {
        self.turns
            .retain(|id, _| players.iter().any(|p| &p.id == id && p.is_active()));
        for player in players.iter().filter(|p| p.is_active()) {
            if !self.turns.contains_key(&player.id) {
                let budget = troop_budget(self.round, galaxy.owned_count(&player.id), config);
                self.turns.insert(player.id.clone(), PlayerTurn::new(budget));
            }
        }
    }

    /// Checks that `player` may act in `expected` right now.
    pub fn require_phase(&self, player: &PlayerId, expected: GamePhase) -> Result<&PlayerTurn, ActionError> {
        if self.complete {
            return Err(ActionError::GameComplete);
        }
        let turn = self
            .turns
            .get(player)
            .ok_or_else(|| ActionError::UnknownPlayer(player.clone()))?;
        if turn.finished {
            return Err(ActionError::AlreadyFinished);
        }
        if self.applying || turn.phase != expected {
            return Err(ActionError::WrongPhase {
                expected,
                actual: if self.applying { GamePhase::ApplyingMoves } else { turn.phase },
            });
        }
        Ok(turn)
    }

    /// Records `amount` placed troops against the player's fortify budget.
    /// `requested` is what the player asked for and must fit the remainder.
    pub fn charge(&mut self, player: &PlayerId, requested: u32, amount: u32) -> Result<u32, ActionError> {
        let remaining = self.require_phase(player, GamePhase::Fortify)?.remaining();
        if requested > remaining {
            return Err(ActionError::InsufficientBudget { requested, remaining });
        }
        let turn = self
            .turns
            .get_mut(player)
            .ok_or_else(|| ActionError::UnknownPlayer(player.clone()))?;
        turn.placed += amount.min(requested);
        Ok(turn.remaining())
    }

    /// Returns all staged placements to the budget.
    pub fn refund(&mut self, player: &PlayerId) {
        if let Some(turn) = self.turns.get_mut(player) {
            turn.placed = 0;
        }
    }

    /// Moves `player` to their next phase, or marks them finished after
    /// movement. Clears their ready flag either way.
    pub fn advance_player(&mut self, player: &PlayerId) -> Result<GamePhase, ActionError> {
        if self.complete {
            return Err(ActionError::GameComplete);
        }
        let turn = self
            .turns
            .get_mut(player)
            .ok_or_else(|| ActionError::UnknownPlayer(player.clone()))?;
        if turn.finished {
            return Err(ActionError::AlreadyFinished);
        }
        match next_phase(turn.phase) {
            Some(next) => {
                turn.phase = next;
                turn.ready = false;
            }
            None => {
                turn.ready = true;
                turn.finished = true;
            }
        }
        tracing::debug!(%player, phase = %turn.phase, finished = turn.finished, "player advanced");
        Ok(turn.phase)
    }

    /// Active players that have not finished movement.
    pub fn waiting_on(&self) -> Vec<PlayerId> {
        self.turns
            .iter()
            .filter(|(_, t)| !t.finished)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn all_finished(&self) -> bool {
        !self.turns.is_empty() && self.turns.values().all(|t| t.finished)
    }

    /// Enters applying_moves. Fails with the list of unfinished players.
    pub fn begin_applying(&mut self) -> Result<(), Vec<PlayerId>> {
        if !self.all_finished() {
            return Err(self.waiting_on());
        }
        self.applying = true;
        Ok(())
    }

    /// Finishes the round: increments the round, then either ends the game
    /// or resets every player to fortify with a fresh budget computed from
    /// `galaxy`. Flags reset in the same step as the phase change.
    pub fn complete_round(&mut self, galaxy: &Galaxy, config: &GameConfig) -> RoundAdvance {
        self.round += 1;
        self.applying = false;

        if self.round > config.max_rounds {
            self.complete = true;
            for turn in self.turns.values_mut() {
                turn.ready = false;
                turn.finished = false;
                turn.budget = 0;
                turn.placed = 0;
            }
            tracing::info!(round = self.round, "game complete");
            return RoundAdvance {
                round: self.round,
                phase: GamePhase::GameComplete,
            };
        }

        let round = self.round;
        for (id, turn) in self.turns.iter_mut() {
            *turn = PlayerTurn::new(troop_budget(round, galaxy.owned_count(id), config));
        }
        tracing::info!(round, "round started");
        RoundAdvance {
            round,
            phase: GamePhase::Fortify,
        }
    }
}
