//! Joining and leaving a game.

use serde::{Deserialize, Serialize};

use crate::board::{Player, PlayerId, Role};
use crate::error::{RosterError, SessionError};
use crate::store::GameStore;

/// Lifecycle of a game as seen by the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Waiting,
    Playing,
    Ended,
}

/// A request to join as `name` with `color`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub id: PlayerId,
    pub name: String,
    pub color: String,
}

/// Decides the player row for a join request.
///
/// Rejoining with the same id updates name and color and keeps role and
/// flags. Joining a game in progress makes a visitor. Otherwise the player
/// cap and color uniqueness among active players apply.
pub fn admit(
    players: &[Player],
    request: &JoinRequest,
    status: GameStatus,
    max_players: usize,
) -> Result<Player, RosterError> {
    if status == GameStatus::Ended {
        return Err(RosterError::GameEnded);
    }
    if players
        .iter()
        .any(|p| p.name == request.name && p.id != request.id)
    {
        return Err(RosterError::NameTaken(request.name.clone()));
    }

    let existing = players.iter().find(|p| p.id == request.id);
    let role = match existing {
        Some(p) => p.role,
        None if status == GameStatus::Playing => Role::Visitor,
        None => Role::Player,
    };

    if role == Role::Player {
        let others: Vec<&Player> = players
            .iter()
            .filter(|p| p.is_active() && p.id != request.id)
            .collect();
        if existing.is_none() && others.len() >= max_players {
            return Err(RosterError::LobbyFull { max: max_players });
        }
        if others.iter().any(|p| p.color.eq_ignore_ascii_case(&request.color)) {
            return Err(RosterError::ColorTaken(request.color.clone()));
        }
    }

    let mut player = match existing {
        Some(p) => p.clone(),
        None => Player::new(request.id.as_str(), request.name.clone(), request.color.clone()),
    };
    player.name = request.name.clone();
    player.color = request.color.clone();
    player.role = role;
    Ok(player)
}

/// Admits the request and writes the resulting row.
pub fn join_game<S>(
    store: &S,
    game_id: &str,
    request: &JoinRequest,
    status: GameStatus,
    max_players: usize,
) -> Result<Player, SessionError>
where
    S: GameStore + ?Sized,
{
    let players = store.read_players(game_id)?;
    let player = admit(&players, request, status, max_players)?;
    store.upsert_player(game_id, &player)?;
    tracing::info!(game_id, player = %player.id, role = ?player.role, "player joined");
    Ok(player)
}

pub fn exit_game<S>(store: &S, game_id: &str, player: &PlayerId) -> Result<(), SessionError>
where
    S: GameStore + ?Sized,
{
    store.remove_player(game_id, player)?;
    tracing::info!(game_id, %player, "player left");
    Ok(())
}
