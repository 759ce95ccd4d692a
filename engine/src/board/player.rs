//! Players and their per-session flags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a player within a game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        PlayerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        PlayerId(s.to_string())
    }
}

/// Whether a participant plays or only watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Player,
    Visitor,
}

/// A participant in a game session.
///
/// `is_ready` is transient and reset on every phase transition. `finished`
/// and `map_loaded` mirror the store-side flags that drive the pooled gates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_ready: bool,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub map_loaded: bool,
}

impl Player {
    /// Creates an active player with all flags cleared.
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Player {
            id: PlayerId::new(id),
            name: name.into(),
            color: color.into(),
            role: Role::Player,
            is_ready: false,
            finished: false,
            map_loaded: false,
        }
    }

    /// Visitors never act and never gate progression.
    pub fn is_active(&self) -> bool {
        self.role == Role::Player
    }
}

/// Store-side boolean flags on a player row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerFlag {
    Ready,
    Finished,
    MapLoaded,
}

impl PlayerFlag {
    pub const fn as_str(self) -> &'static str {
        match self {
            PlayerFlag::Ready => "ready",
            PlayerFlag::Finished => "finished",
            PlayerFlag::MapLoaded => "map_loaded",
        }
    }

    /// Reads this flag off a player.
    pub fn get(self, player: &Player) -> bool {
        match self {
            PlayerFlag::Ready => player.is_ready,
            PlayerFlag::Finished => player.finished,
            PlayerFlag::MapLoaded => player.map_loaded,
        }
    }

    /// Writes this flag on a player.
    pub fn set(self, player: &mut Player, value: bool) {
        match self {
            PlayerFlag::Ready => player.is_ready = value,
            PlayerFlag::Finished => player.finished = value,
            PlayerFlag::MapLoaded => player.map_loaded = value,
        }
    }
}

impl fmt::Display for PlayerFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
