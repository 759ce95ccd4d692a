//! Data store contract.
//!
//! The durable store holds the Action Log, players, planet templates and the
//! committed galaxy per game, and pushes a [`StoreChange`] on every write.
//! Notifications are a hint for waiting code; reads remain authoritative.

pub mod memory;

use tokio::sync::broadcast;

use crate::board::{Galaxy, PlanetTemplate, Player, PlayerFlag, PlayerId};
use crate::error::StoreError;
use crate::protocol::{ActionLogEntry, NewAction};

pub use memory::MemoryStore;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Which collection of a game changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    Players { game_id: String },
    Actions { game_id: String, round: u32 },
    Planets { game_id: String },
}

impl StoreChange {
    pub fn game_id(&self) -> &str {
        match self {
            StoreChange::Players { game_id }
            | StoreChange::Actions { game_id, .. }
            | StoreChange::Planets { game_id } => game_id,
        }
    }
}

pub trait GameStore: Send + Sync {
    /// Appends a row to the Action Log and returns it with its assigned
    /// submission order. Rows are never modified afterwards.
    fn append_action(&self, action: NewAction) -> Result<ActionLogEntry>;

    /// Rows of one round in submission order.
    fn read_actions(&self, game_id: &str, round: u32) -> Result<Vec<ActionLogEntry>>;

    fn read_planet_template(&self, map_name: &str, version: u32) -> Result<Vec<PlanetTemplate>>;

    /// Players in join order.
    fn read_players(&self, game_id: &str) -> Result<Vec<Player>>;

    /// Inserts a player or replaces the row with the same id.
    fn upsert_player(&self, game_id: &str, player: &Player) -> Result<()>;

    fn remove_player(&self, game_id: &str, player: &PlayerId) -> Result<()>;

    fn update_player_flag(&self, game_id: &str, player: &PlayerId, flag: PlayerFlag, value: bool) -> Result<()>;

    /// Sets `flag` on every player of the game.
    fn reset_player_flags(&self, game_id: &str, flag: PlayerFlag, value: bool) -> Result<()> {
        for player in self.read_players(game_id)? {
            self.update_player_flag(game_id, &player.id, flag, value)?;
        }
        Ok(())
    }

    fn save_planets(&self, game_id: &str, galaxy: &Galaxy) -> Result<()>;

    fn load_planets(&self, game_id: &str) -> Result<Option<Galaxy>>;

    /// Change notifications for every game; receivers filter by id.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}
