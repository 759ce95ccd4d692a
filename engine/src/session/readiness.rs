//! Pooled readiness gates.
//!
//! A gate opens once every active player has a given flag set. The store is
//! polled at a fixed interval; change notifications wake the wait early.
//! Reaching the deadline is a typed failure, never a silent hang.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::Instant;

use crate::board::{Player, PlayerFlag, PlayerId};
use crate::error::SessionError;
use crate::store::{GameStore, StoreChange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    /// Every active player has loaded the map (game start).
    MapLoaded,
    /// Every active player has finished movement (movement -> applying_moves).
    RoundReady,
}

impl Gate {
    pub const fn flag(self) -> PlayerFlag {
        match self {
            Gate::MapLoaded => PlayerFlag::MapLoaded,
            Gate::RoundReady => PlayerFlag::Finished,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Gate::MapLoaded => "map_loaded",
            Gate::RoundReady => "round_ready",
        }
    }

    /// What the waited-on players still have to do.
    pub const fn verb(self) -> &'static str {
        match self {
            Gate::MapLoaded => "load the map",
            Gate::RoundReady => "finish their moves",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Active players that do not yet satisfy `gate`.
pub fn pending_players(players: &[Player], gate: Gate) -> Vec<PlayerId> {
    players
        .iter()
        .filter(|p| p.is_active() && !gate.flag().get(p))
        .map(|p| p.id.clone())
        .collect()
}

/// Waits until every active player of `game_id` satisfies `gate`.
///
/// Returns the player list that opened the gate. Fails with
/// [`SessionError::NoActivePlayers`] if nobody could ever open it and with
/// [`SessionError::ReadinessTimeout`] once `timeout` has elapsed.
pub async fn wait_for_gate<S>(
    store: &S,
    game_id: &str,
    gate: Gate,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<Vec<Player>, SessionError>
where
    S: GameStore + ?Sized,
{
    let deadline = Instant::now() + timeout;
    let mut changes = Some(store.subscribe());

    loop {
        let players = store.read_players(game_id)?;
        if !players.iter().any(Player::is_active) {
            return Err(SessionError::NoActivePlayers);
        }
        let waiting = pending_players(&players, gate);
        if waiting.is_empty() {
            tracing::info!(game_id, %gate, "gate open");
            return Ok(players);
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(game_id, %gate, waiting = waiting.len(), "gate timed out");
            return Err(SessionError::ReadinessTimeout {
                gate,
                waiting_on: waiting,
            });
        }
        tracing::debug!(game_id, %gate, waiting = waiting.len(), "waiting on gate");

        let wake = (now + poll_interval).min(deadline);
        tokio::select! {
            _ = tokio::time::sleep_until(wake) => {}
            change = next_change(&mut changes) => {
                if let Err(RecvError::Closed) = change {
                    changes = None;
                }
            }
        }
    }
}

/// Next notification, or never if notifications are unavailable. A lagged
/// receiver just triggers an early re-poll.
async fn next_change(
    changes: &mut Option<broadcast::Receiver<StoreChange>>,
) -> Result<(), RecvError> {
    match changes {
        Some(rx) => rx.recv().await.map(|_| ()),
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Role;

    #[test]
    fn pending_ignores_visitors() {
        let mut a = Player::new("a", "Ada", "#a00");
        a.finished = true;
        let b = Player::new("b", "Bo", "#0b0");
        let mut v = Player::new("v", "Vi", "#555");
        v.role = Role::Visitor;

        let players = vec![a, b, v];
        assert_eq!(pending_players(&players, Gate::RoundReady), vec![PlayerId::from("b")]);
        assert_eq!(pending_players(&players, Gate::MapLoaded).len(), 2);
    }

    #[test]
    fn gate_labels() {
        assert_eq!(Gate::MapLoaded.to_string(), "map_loaded");
        assert_eq!(Gate::RoundReady.flag(), PlayerFlag::Finished);
    }
}
