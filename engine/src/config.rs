//! Game configuration.
//!
//! Every tunable rule and timing constant lives in `GameConfig`, loadable
//! from JSON. All participants of a game must use the same rule values or
//! their optimistic views will diverge from the round executor. The troop cap
//! and starting garrison are compile-time constants in `board::planet`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Last playable round. Completing this round ends the game.
    pub max_rounds: u32,
    /// Fortify budget for round 1.
    pub first_round_bonus: u8,
    /// Minimum fortify budget from round 2 on.
    pub min_fortify_budget: u8,
    /// Attack and movement range, in map distance units.
    pub attack_range: f64,
    /// Planets handed to each active player at game start.
    pub planets_per_player: usize,
    /// Maximum number of active (non-visitor) players.
    pub max_players: usize,
    pub map_name: String,
    pub map_version: u32,

    pub round_poll_interval_ms: u64,
    pub round_timeout_ms: u64,
    pub map_load_poll_interval_ms: u64,
    pub map_load_timeout_ms: u64,
    /// Pause between narrated round events. Does not affect outcomes.
    pub playback_delay_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            max_rounds: 10,
            first_round_bonus: 5,
            min_fortify_budget: 3,
            attack_range: 75.0,
            planets_per_player: 10,
            max_players: 6,
            map_name: "Standard Galaxy v1".to_string(),
            map_version: 1,
            round_poll_interval_ms: 3_000,
            round_timeout_ms: 300_000,
            map_load_poll_interval_ms: 1_000,
            map_load_timeout_ms: 60_000,
            playback_delay_ms: 3_000,
        }
    }
}

impl GameConfig {
    /// Short games with no pacing, for tests and self-play.
    pub fn testing() -> Self {
        GameConfig {
            max_rounds: 2,
            round_poll_interval_ms: 10,
            round_timeout_ms: 2_000,
            map_load_poll_interval_ms: 10,
            map_load_timeout_ms: 2_000,
            playback_delay_ms: 0,
            ..GameConfig::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Rejects values that would stall or break a game.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rounds == 0 {
            return Err(ConfigError::Invalid("max_rounds must be at least 1".into()));
        }
        if self.max_players == 0 {
            return Err(ConfigError::Invalid("max_players must be at least 1".into()));
        }
        if !(self.attack_range.is_finite() && self.attack_range > 0.0) {
            return Err(ConfigError::Invalid("attack_range must be positive".into()));
        }
        if self.round_poll_interval_ms == 0 || self.map_load_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll intervals must be non-zero".into()));
        }
        Ok(())
    }

    pub fn round_poll_interval(&self) -> Duration {
        Duration::from_millis(self.round_poll_interval_ms)
    }

    pub fn round_timeout(&self) -> Duration {
        Duration::from_millis(self.round_timeout_ms)
    }

    pub fn map_load_poll_interval(&self) -> Duration {
        Duration::from_millis(self.map_load_poll_interval_ms)
    }

    pub fn map_load_timeout(&self) -> Duration {
        Duration::from_millis(self.map_load_timeout_ms)
    }

    pub fn playback_delay(&self) -> Duration {
        Duration::from_millis(self.playback_delay_ms)
    }
}
