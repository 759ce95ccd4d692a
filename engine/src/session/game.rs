//! Game session: the state of one game, owned by one coordinator.
//!
//! Planet state is two-tier. `committed` is the round-start snapshot and is
//! only ever replaced by the round executor. `view` is the optimistic layer:
//! `committed` plus every action submitted this round applied eagerly, plus
//! staged placements. The view is thrown away when a round completes.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::roster::GameStatus;
use crate::board::{
    assign_planets, Galaxy, GamePhase, PendingAction, PlanetId, Player, PlayerFlag, PlayerId,
};
use crate::config::GameConfig;
use crate::error::{ActionError, Result, SessionError};
use crate::protocol::{ActionLogEntry, NewAction};
use crate::resolve::{
    apply_attack, execute_round, AttackReport, PhaseMachine, PlayerTurn, RoundAdvance,
    RoundResolution, Salt,
};
use crate::store::GameStore;

/// Feedback for one troop placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementNotice {
    pub planet: PlanetId,
    pub requested: u8,
    pub placed: u8,
    /// Troops dropped because the planet hit the cap.
    pub lost: u8,
    pub remaining_budget: u32,
}

impl PlacementNotice {
    /// Informational text when troops were lost to the cap.
    pub fn message(&self) -> Option<String> {
        (self.lost > 0).then(|| {
            format!(
                "{} troops lost: planet {} is at maximum capacity",
                self.lost, self.planet
            )
        })
    }
}

/// Feedback for one troop movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveNotice {
    pub from: PlanetId,
    pub to: PlanetId,
    pub requested: u8,
    pub moved: u8,
}

/// Result of [`GameSession::execute_round`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub round_played: u32,
    pub advance: RoundAdvance,
    pub resolution: RoundResolution,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Placement {
    planet: PlanetId,
    troops: u8,
}

pub struct GameSession {
    game_id: String,
    seed: u32,
    config: GameConfig,
    store: Arc<dyn GameStore>,
    players: Vec<Player>,
    machine: Option<PhaseMachine>,
    committed: Galaxy,
    view: Galaxy,
    submitted: Vec<ActionLogEntry>,
    staged: BTreeMap<PlayerId, Vec<Placement>>,
}

impl GameSession {
    pub fn new(
        game_id: impl Into<String>,
        seed: u32,
        config: GameConfig,
        store: Arc<dyn GameStore>,
    ) -> Self {
        GameSession {
            game_id: game_id.into(),
            seed,
            config,
            store,
            players: Vec::new(),
            machine: None,
            committed: Galaxy::default(),
            view: Galaxy::default(),
            submitted: Vec::new(),
            staged: BTreeMap::new(),
        }
    }

    // === Accessors ===

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn GameStore> {
        &self.store
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// The authoritative round-start galaxy.
    pub fn committed(&self) -> &Galaxy {
        &self.committed
    }

    /// The optimistic galaxy including this round's eager actions.
    pub fn view(&self) -> &Galaxy {
        &self.view
    }

    /// Rows this session appended during the current round.
    pub fn submitted(&self) -> &[ActionLogEntry] {
        &self.submitted
    }

    pub fn round(&self) -> u32 {
        self.machine.as_ref().map_or(0, PhaseMachine::round)
    }

    pub fn phase(&self) -> GamePhase {
        self.machine
            .as_ref()
            .map_or(GamePhase::Fortify, PhaseMachine::phase)
    }

    pub fn status(&self) -> GameStatus {
        match &self.machine {
            None => GameStatus::Waiting,
            Some(m) if m.is_complete() => GameStatus::Ended,
            Some(_) => GameStatus::Playing,
        }
    }

    pub fn turn(&self, player: &PlayerId) -> Option<&PlayerTurn> {
        self.machine.as_ref().and_then(|m| m.turn(player))
    }

    pub fn machine(&self) -> Result<&PhaseMachine> {
        self.machine.as_ref().ok_or(SessionError::NotStarted)
    }

    fn machine_mut(&mut self) -> Result<&mut PhaseMachine> {
        self.machine.as_mut().ok_or(SessionError::NotStarted)
    }

    // === Lifecycle ===

    /// Re-reads the roster and gives new active players a turn.
    pub fn sync_players(&mut self) -> Result<()> {
        self.players = self.store.read_players(&self.game_id)?;
        if let Some(machine) = self.machine.as_mut() {
            machine.sync_roster(&self.players, &self.committed, &self.config);
        }
        Ok(())
    }

    /// Assigns the map to the current roster and starts round 1 in fortify.
    pub fn start(&mut self) -> Result<()> {
        if self.machine.is_some() {
            return Ok(());
        }
        self.players = self.store.read_players(&self.game_id)?;
        if !self.players.iter().any(Player::is_active) {
            return Err(SessionError::NoActivePlayers);
        }

        let template = self
            .store
            .read_planet_template(&self.config.map_name, self.config.map_version)?;
        if template.is_empty() {
            return Err(SessionError::EmptyMap {
                name: self.config.map_name.clone(),
                version: self.config.map_version,
            });
        }
        let galaxy = assign_planets(
            &template,
            &self.players,
            self.seed,
            self.config.planets_per_player,
        );
        self.store.save_planets(&self.game_id, &galaxy)?;
        self.store
            .reset_player_flags(&self.game_id, PlayerFlag::Finished, false)?;
        self.store
            .reset_player_flags(&self.game_id, PlayerFlag::Ready, false)?;

        self.machine = Some(PhaseMachine::new(&self.players, &galaxy, &self.config));
        self.committed = galaxy;
        self.view = self.committed.clone();
        self.submitted.clear();
        self.staged.clear();

        tracing::info!(
            game_id = %self.game_id,
            planets = self.committed.len(),
            players = self.players.len(),
            "game started"
        );
        Ok(())
    }

    pub fn mark_map_loaded(&mut self, player: &PlayerId) -> Result<()> {
        self.store
            .update_player_flag(&self.game_id, player, PlayerFlag::MapLoaded, true)?;
        if let Some(p) = self.players.iter_mut().find(|p| &p.id == player) {
            p.map_loaded = true;
        }
        Ok(())
    }

    // === Player operations ===

    fn active_player(&self, id: &PlayerId) -> std::result::Result<Player, ActionError> {
        let player = self
            .players
            .iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| ActionError::UnknownPlayer(id.clone()))?;
        if !player.is_active() {
            return Err(ActionError::VisitorCannotAct);
        }
        Ok(player.clone())
    }

    /// Checks that `planet` exists in the view and belongs to `player`.
    fn owned_in_view(&self, planet: &PlanetId, player: &PlayerId) -> std::result::Result<u8, ActionError> {
        let p = self
            .view
            .get(planet)
            .ok_or_else(|| ActionError::UnknownPlanet(planet.clone()))?;
        if !p.is_owned_by(player) {
            return Err(ActionError::NotOwner(planet.clone()));
        }
        Ok(p.troops)
    }

    fn require_in_range(&self, from: &PlanetId, to: &PlanetId) -> std::result::Result<(), ActionError> {
        if !self.view.in_range(from, to, self.config.attack_range) {
            return Err(ActionError::OutOfRange {
                from: from.clone(),
                to: to.clone(),
            });
        }
        Ok(())
    }

    /// Stages a placement on an owned planet. Troops above the cap are
    /// dropped and reported in the notice; only placed troops use budget.
    pub fn place_troops(&mut self, player: &PlayerId, planet: &PlanetId, troops: u8) -> Result<PlacementNotice> {
        self.active_player(player)?;
        let remaining = self.machine()?.require_phase(player, GamePhase::Fortify)?.remaining();
        if troops == 0 {
            return Err(ActionError::NoTroopsToPlace.into());
        }
        self.owned_in_view(planet, player)?;
        if u32::from(troops) > remaining {
            return Err(ActionError::InsufficientBudget {
                requested: u32::from(troops),
                remaining,
            }
            .into());
        }

        let placed = match self.view.get_mut(planet) {
            Some(p) => p.reinforce(troops),
            None => 0,
        };
        let remaining_budget = self
            .machine_mut()?
            .charge(player, u32::from(troops), u32::from(placed))?;
        if placed > 0 {
            self.staged.entry(player.clone()).or_default().push(Placement {
                planet: planet.clone(),
                troops: placed,
            });
        }

        let notice = PlacementNotice {
            planet: planet.clone(),
            requested: troops,
            placed,
            lost: troops - placed,
            remaining_budget,
        };
        if let Some(message) = notice.message() {
            tracing::info!(%player, %planet, lost = notice.lost, "{message}");
        }
        Ok(notice)
    }

    /// Drops the player's staged placements and restores their budget.
    pub fn reset_troop_placements(&mut self, player: &PlayerId) -> Result<()> {
        self.machine()?.require_phase(player, GamePhase::Fortify)?;
        self.staged.remove(player);
        self.machine_mut()?.refund(player);
        self.rebuild_view();
        Ok(())
    }

    /// Staged placements of `player`, as `(planet, troops)`.
    pub fn staged(&self, player: &PlayerId) -> Vec<(PlanetId, u8)> {
        self.staged
            .get(player)
            .map(|list| list.iter().map(|p| (p.planet.clone(), p.troops)).collect())
            .unwrap_or_default()
    }

    /// Writes staged placements to the Action Log and moves the player to
    /// attack. On a store failure the unwritten placements stay staged.
    pub fn confirm_troop_placements(&mut self, player: &PlayerId) -> Result<GamePhase> {
        self.active_player(player)?;
        self.machine()?.require_phase(player, GamePhase::Fortify)?;
        let round = self.round();

        let staged = self.staged.remove(player).unwrap_or_default();
        for (i, placement) in staged.iter().enumerate() {
            let action = PendingAction::Fortify {
                to: placement.planet.clone(),
                troops: placement.troops,
            };
            match self
                .store
                .append_action(NewAction::new(&self.game_id, round, player.clone(), &action))
            {
                Ok(entry) => self.submitted.push(entry),
                Err(err) => {
                    self.staged.insert(player.clone(), staged[i..].to_vec());
                    return Err(err.into());
                }
            }
        }

        let phase = self.machine_mut()?.advance_player(player)?;
        tracing::info!(%player, placements = staged.len(), "fortify confirmed");
        Ok(phase)
    }

    /// Validates and eagerly applies an attack, then logs it.
    pub fn attack(&mut self, player: &PlayerId, from: &PlanetId, to: &PlanetId, troops: u8) -> Result<AttackReport> {
        let attacker = self.active_player(player)?;
        self.machine()?.require_phase(player, GamePhase::Attack)?;
        self.owned_in_view(from, player)?;
        let target = self
            .view
            .get(to)
            .ok_or_else(|| ActionError::UnknownPlanet(to.clone()))?;
        if target.is_owned_by(player) {
            return Err(ActionError::TargetOwned(to.clone()).into());
        }
        self.require_in_range(from, to)?;

        let mut next = self.view.clone();
        let report = apply_attack(&mut next, &attacker, from, to, troops, self.seed, Salt::default())
            .map_err(ActionError::from)?;

        let action = PendingAction::Attack {
            from: from.clone(),
            to: to.clone(),
            troops,
        };
        let entry = self
            .store
            .append_action(NewAction::new(&self.game_id, self.round(), player.clone(), &action))?;
        self.submitted.push(entry);
        self.view = next;
        Ok(report)
    }

    /// Validates and eagerly applies a movement between owned planets, then
    /// logs it. Troops beyond the destination's capacity stay at the source.
    pub fn move_troops(&mut self, player: &PlayerId, from: &PlanetId, to: &PlanetId, troops: u8) -> Result<MoveNotice> {
        self.active_player(player)?;
        self.machine()?.require_phase(player, GamePhase::Movement)?;
        if from == to {
            return Err(ActionError::SamePlanet.into());
        }
        let available = self.owned_in_view(from, player)?;
        self.owned_in_view(to, player)?;
        self.require_in_range(from, to)?;
        if troops == 0 || troops >= available {
            return Err(ActionError::NotEnoughTroops {
                requested: troops,
                available,
            }
            .into());
        }

        let action = PendingAction::Movement {
            from: from.clone(),
            to: to.clone(),
            troops,
        };
        let entry = self
            .store
            .append_action(NewAction::new(&self.game_id, self.round(), player.clone(), &action))?;
        self.submitted.push(entry);
        let moved = transfer(&mut self.view, from, to, troops);

        Ok(MoveNotice {
            from: from.clone(),
            to: to.clone(),
            requested: troops,
            moved,
        })
    }

    /// Ends the player's current phase.
    ///
    /// Fortify confirms staged placements. Attack moves on to movement.
    /// Movement marks the player finished in the store, feeding the pooled
    /// round gate.
    pub fn ready_for_next_phase(&mut self, player: &PlayerId) -> Result<GamePhase> {
        self.active_player(player)?;
        let machine = self.machine()?;
        if machine.is_complete() {
            return Err(ActionError::GameComplete.into());
        }
        let turn = machine
            .turn(player)
            .ok_or_else(|| ActionError::UnknownPlayer(player.clone()))?;
        if turn.finished {
            return Err(ActionError::AlreadyFinished.into());
        }
        let phase = turn.phase;

        match phase {
            GamePhase::Fortify => self.confirm_troop_placements(player),
            GamePhase::Movement => {
                self.store
                    .update_player_flag(&self.game_id, player, PlayerFlag::Finished, true)?;
                self.store
                    .update_player_flag(&self.game_id, player, PlayerFlag::Ready, true)?;
                if let Some(p) = self.players.iter_mut().find(|p| &p.id == player) {
                    p.finished = true;
                    p.is_ready = true;
                }
                self.machine_mut()?.advance_player(player).map_err(Into::into)
            }
            _ => self.machine_mut()?.advance_player(player).map_err(Into::into),
        }
    }

    /// Resolves `expected_round` from the committed snapshot and the stored
    /// Action Log, persists the result, and starts the next round.
    ///
    /// Fails with [`SessionError::StaleRound`] if that round was already
    /// executed and with [`SessionError::PlayersNotReady`] while any active
    /// player has not finished movement. A store failure leaves the round
    /// in applying_moves and the call can be retried.
    pub fn execute_round(&mut self, expected_round: u32) -> Result<RoundOutcome> {
        let machine = self.machine()?;
        if machine.is_complete() {
            return Err(ActionError::GameComplete.into());
        }
        let current = machine.round();
        if current != expected_round {
            return Err(SessionError::StaleRound {
                requested: expected_round,
                current,
            });
        }
        self.machine_mut()?
            .begin_applying()
            .map_err(|waiting_on| SessionError::PlayersNotReady { waiting_on })?;
        tracing::info!(game_id = %self.game_id, round = current, "applying moves");

        let entries = self.store.read_actions(&self.game_id, current)?;
        let resolution = execute_round(&self.committed, &self.players, &entries, self.seed, &self.config);
        self.store.save_planets(&self.game_id, &resolution.galaxy)?;
        self.store
            .reset_player_flags(&self.game_id, PlayerFlag::Finished, false)?;
        self.store
            .reset_player_flags(&self.game_id, PlayerFlag::Ready, false)?;

        self.committed = resolution.galaxy.clone();
        self.view = self.committed.clone();
        self.submitted.clear();
        self.staged.clear();
        for p in &mut self.players {
            p.finished = false;
            p.is_ready = false;
        }
        let committed = &self.committed;
        let config = &self.config;
        let advance = match self.machine.as_mut() {
            Some(machine) => machine.complete_round(committed, config),
            None => return Err(SessionError::NotStarted),
        };

        tracing::info!(
            game_id = %self.game_id,
            round = advance.round,
            phase = %advance.phase,
            events = resolution.events.len(),
            "round executed"
        );
        Ok(RoundOutcome {
            round_played: current,
            advance,
            resolution,
        })
    }

    /// Rebuilds the optimistic view from `committed`, this round's submitted
    /// rows in order, then staged placements.
    fn rebuild_view(&mut self) {
        let mut view = self.committed.clone();
        for entry in &self.submitted {
            match entry.pending() {
                PendingAction::Fortify { to, troops } => {
                    if let Some(p) = view.get_mut(&to) {
                        p.reinforce(troops);
                    }
                }
                PendingAction::Attack { from, to, troops } => {
                    if let Some(attacker) = self.players.iter().find(|p| p.id == entry.player_id) {
                        // A row that no longer applies to the view is left out.
                        if let Err(err) =
                            apply_attack(&mut view, attacker, &from, &to, troops, self.seed, Salt::default())
                        {
                            tracing::debug!(
                                game_id = %self.game_id,
                                player = %entry.player_id,
                                order = entry.submitted_order,
                                error = %err,
                                "attack row left out of view"
                            );
                        }
                    }
                }
                PendingAction::Movement { from, to, troops } => {
                    transfer(&mut view, &from, &to, troops);
                }
            }
        }
        for placements in self.staged.values() {
            for placement in placements {
                if let Some(p) = view.get_mut(&placement.planet) {
                    p.reinforce(placement.troops);
                }
            }
        }
        self.view = view;
    }
}

/// Moves up to `troops` from `from` to `to`, limited by the destination's
/// capacity and the source's troops. Returns the amount moved.
fn transfer(galaxy: &mut Galaxy, from: &PlanetId, to: &PlanetId, troops: u8) -> u8 {
    let available = galaxy.get(from).map_or(0, |p| p.troops);
    let capacity = galaxy.get(to).map_or(0, |p| p.capacity_left());
    let moved = troops.min(available).min(capacity);
    if let Some(p) = galaxy.get_mut(from) {
        p.troops -= moved;
    }
    if let Some(p) = galaxy.get_mut(to) {
        p.troops += moved;
    }
    moved
}
