//! In-memory GameStore for tests, self-play and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use tokio::sync::broadcast;

use super::{GameStore, Result, StoreChange};
use crate::board::{Galaxy, PlanetTemplate, Player, PlayerFlag, PlayerId};
use crate::error::StoreError;
use crate::protocol::{ActionLogEntry, NewAction};

const CHANGE_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct GameRecord {
    players: Vec<Player>,
    actions: Vec<ActionLogEntry>,
    planets: Option<Galaxy>,
}

/// Keeps every game in process memory.
///
/// `set_unavailable(true)` makes every call fail with
/// [`StoreError::Unavailable`], for exercising retry paths.
pub struct MemoryStore {
    games: RwLock<HashMap<String, GameRecord>>,
    templates: RwLock<HashMap<(String, u32), Vec<PlanetTemplate>>>,
    next_order: AtomicU64,
    unavailable: AtomicBool,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            games: RwLock::new(HashMap::new()),
            templates: RwLock::new(HashMap::new()),
            next_order: AtomicU64::new(0),
            unavailable: AtomicBool::new(false),
            changes,
        }
    }

    /// Registers a map template.
    pub fn with_template(self, map_name: &str, version: u32, planets: Vec<PlanetTemplate>) -> Self {
        if let Ok(mut templates) = self.templates.write() {
            templates.insert((map_name.to_string(), version), planets);
        }
        self
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        Ok(())
    }

    fn notify(&self, change: StoreChange) {
        // No receivers is fine.
        let _ = self.changes.send(change);
    }

    fn with_game<T>(&self, game_id: &str, f: impl FnOnce(&GameRecord) -> T) -> Result<T> {
        self.check_available()?;
        let games = self.games.read().map_err(|_| StoreError::LockPoisoned)?;
        match games.get(game_id) {
            Some(record) => Ok(f(record)),
            None => Ok(f(&GameRecord::default())),
        }
    }

    fn with_game_mut<T>(&self, game_id: &str, f: impl FnOnce(&mut GameRecord) -> T) -> Result<T> {
        self.check_available()?;
        let mut games = self.games.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(f(games.entry(game_id.to_string()).or_default()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GameStore for MemoryStore {
    fn append_action(&self, action: NewAction) -> Result<ActionLogEntry> {
        let game_id = action.game_id.clone();
        let round = action.round;
        let entry = self.with_game_mut(&game_id, |record| {
            let order = self.next_order.fetch_add(1, Ordering::SeqCst);
            let entry = ActionLogEntry::from_new(action, order);
            record.actions.push(entry.clone());
            entry
        })?;
        self.notify(StoreChange::Actions { game_id, round });
        Ok(entry)
    }

    fn read_actions(&self, game_id: &str, round: u32) -> Result<Vec<ActionLogEntry>> {
        self.with_game(game_id, |record| {
            let mut rows: Vec<ActionLogEntry> = record
                .actions
                .iter()
                .filter(|a| a.round == round)
                .cloned()
                .collect();
            rows.sort_by_key(|a| a.submitted_order);
            rows
        })
    }

    fn read_planet_template(&self, map_name: &str, version: u32) -> Result<Vec<PlanetTemplate>> {
        self.check_available()?;
        let templates = self.templates.read().map_err(|_| StoreError::LockPoisoned)?;
        templates
            .get(&(map_name.to_string(), version))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("map '{map_name}' v{version}")))
    }

    fn read_players(&self, game_id: &str) -> Result<Vec<Player>> {
        self.with_game(game_id, |record| record.players.clone())
    }

    fn upsert_player(&self, game_id: &str, player: &Player) -> Result<()> {
        self.with_game_mut(game_id, |record| {
            match record.players.iter_mut().find(|p| p.id == player.id) {
                Some(existing) => *existing = player.clone(),
                None => record.players.push(player.clone()),
            }
        })?;
        self.notify(StoreChange::Players {
            game_id: game_id.to_string(),
        });
        Ok(())
    }

    fn remove_player(&self, game_id: &str, player: &PlayerId) -> Result<()> {
        self.with_game_mut(game_id, |record| record.players.retain(|p| &p.id != player))?;
        self.notify(StoreChange::Players {
            game_id: game_id.to_string(),
        });
        Ok(())
    }

    fn update_player_flag(&self, game_id: &str, player: &PlayerId, flag: PlayerFlag, value: bool) -> Result<()> {
        let found = self.with_game_mut(game_id, |record| {
            match record.players.iter_mut().find(|p| &p.id == player) {
                Some(p) => {
                    flag.set(p, value);
                    true
                }
                None => false,
            }
        })?;
        if !found {
            return Err(StoreError::NotFound(format!("player '{player}' in game '{game_id}'")));
        }
        self.notify(StoreChange::Players {
            game_id: game_id.to_string(),
        });
        Ok(())
    }

    fn reset_player_flags(&self, game_id: &str, flag: PlayerFlag, value: bool) -> Result<()> {
        self.with_game_mut(game_id, |record| {
            for p in &mut record.players {
                flag.set(p, value);
            }
        })?;
        self.notify(StoreChange::Players {
            game_id: game_id.to_string(),
        });
        Ok(())
    }

    fn save_planets(&self, game_id: &str, galaxy: &Galaxy) -> Result<()> {
        self.with_game_mut(game_id, |record| record.planets = Some(galaxy.clone()))?;
        self.notify(StoreChange::Planets {
            game_id: game_id.to_string(),
        });
        Ok(())
    }

    fn load_planets(&self, game_id: &str) -> Result<Option<Galaxy>> {
        self.with_game(game_id, |record| record.planets.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
