//! Async coordinator around a [`GameSession`].
//!
//! Every mutation goes through one mutex, so the session sees a single
//! writer. Gates are awaited without holding the lock; players keep acting
//! while others wait. Observers follow the game through a broadcast channel.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch, Mutex};

use super::game::{GameSession, MoveNotice, PlacementNotice, RoundOutcome};
use super::readiness::{wait_for_gate, Gate};
use super::roster::{exit_game, join_game, JoinRequest};
use crate::board::{Galaxy, GamePhase, PlanetId, Player, PlayerId};
use crate::config::GameConfig;
use crate::error::{Result, SessionError};
use crate::resolve::{AttackReport, RoundEvent};
use crate::store::GameStore;

const EVENT_CAPACITY: usize = 512;

/// What observers of a game are told.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    PhaseChanged { player: PlayerId, phase: GamePhase },
    Notice { player: PlayerId, message: String },
    ActionLogged { player: PlayerId, phase: GamePhase },
    Round { event: RoundEvent },
    RoundCompleted { round: u32, phase: GamePhase },
    GameComplete { round: u32 },
    Error { player: Option<PlayerId>, message: String },
}

#[derive(Clone)]
pub struct GameHandle {
    session: Arc<Mutex<GameSession>>,
    store: Arc<dyn GameStore>,
    game_id: String,
    config: GameConfig,
    events: broadcast::Sender<SessionEvent>,
    /// Last round started, bumped after each execution.
    rounds: watch::Sender<u32>,
}

impl GameHandle {
    pub fn new(
        game_id: impl Into<String>,
        seed: u32,
        config: GameConfig,
        store: Arc<dyn GameStore>,
    ) -> Self {
        let game_id = game_id.into();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (rounds, _) = watch::channel(0);
        let session = GameSession::new(game_id.clone(), seed, config.clone(), store.clone());
        GameHandle {
            session: Arc::new(Mutex::new(session)),
            store,
            game_id,
            config,
            events,
            rounds,
        }
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: SessionEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    /// Publishes failures before handing them back. Gate timeouts go to
    /// the whole session, everything else to `player`.
    fn report<T>(&self, player: &PlayerId, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            tracing::warn!(game_id = %self.game_id, %player, error = %err, "request rejected");
            let player = match err {
                SessionError::ReadinessTimeout { .. } => None,
                _ => Some(player.clone()),
            };
            self.publish(SessionEvent::Error {
                player,
                message: err.user_message(),
            });
        }
        result
    }

    pub async fn view(&self) -> Galaxy {
        self.session.lock().await.view().clone()
    }

    pub async fn committed(&self) -> Galaxy {
        self.session.lock().await.committed().clone()
    }

    pub async fn players(&self) -> Vec<Player> {
        self.session.lock().await.players().to_vec()
    }

    pub async fn round(&self) -> u32 {
        self.session.lock().await.round()
    }

    pub async fn phase(&self) -> GamePhase {
        self.session.lock().await.phase()
    }

    // === Roster ===

    pub async fn join(&self, request: JoinRequest) -> Result<Player> {
        let mut session = self.session.lock().await;
        let status = session.status();
        let player = join_game(
            self.store.as_ref(),
            &self.game_id,
            &request,
            status,
            self.config.max_players,
        );
        let player = self.report(&request.id, player)?;
        session.sync_players()?;
        Ok(player)
    }

    pub async fn exit(&self, player: &PlayerId) -> Result<()> {
        let mut session = self.session.lock().await;
        exit_game(self.store.as_ref(), &self.game_id, player)?;
        session.sync_players()
    }

    // === Lifecycle ===

    /// Assigns the map, then waits until every active player has loaded it.
    pub async fn start(&self) -> Result<Vec<Player>> {
        self.session.lock().await.start()?;
        let players = wait_for_gate(
            self.store.as_ref(),
            &self.game_id,
            Gate::MapLoaded,
            self.config.map_load_poll_interval(),
            self.config.map_load_timeout(),
        )
        .await;
        if let Err(err) = &players {
            self.publish(SessionEvent::Error {
                player: None,
                message: err.user_message(),
            });
        }
        let players = players?;
        self.session.lock().await.sync_players()?;
        Ok(players)
    }

    pub async fn mark_map_loaded(&self, player: &PlayerId) -> Result<()> {
        self.session.lock().await.mark_map_loaded(player)
    }

    // === Actions ===

    pub async fn place_troops(&self, player: &PlayerId, planet: &PlanetId, troops: u8) -> Result<PlacementNotice> {
        let notice = self.session.lock().await.place_troops(player, planet, troops);
        let notice = self.report(player, notice)?;
        if let Some(message) = notice.message() {
            self.publish(SessionEvent::Notice {
                player: player.clone(),
                message,
            });
        }
        Ok(notice)
    }

    pub async fn reset_troop_placements(&self, player: &PlayerId) -> Result<()> {
        let result = self.session.lock().await.reset_troop_placements(player);
        self.report(player, result)
    }

    pub async fn attack(&self, player: &PlayerId, from: &PlanetId, to: &PlanetId, troops: u8) -> Result<AttackReport> {
        let report = self.session.lock().await.attack(player, from, to, troops);
        let report = self.report(player, report)?;
        self.publish(SessionEvent::ActionLogged {
            player: player.clone(),
            phase: GamePhase::Attack,
        });
        Ok(report)
    }

    pub async fn move_troops(&self, player: &PlayerId, from: &PlanetId, to: &PlanetId, troops: u8) -> Result<MoveNotice> {
        let notice = self.session.lock().await.move_troops(player, from, to, troops);
        let notice = self.report(player, notice)?;
        self.publish(SessionEvent::ActionLogged {
            player: player.clone(),
            phase: GamePhase::Movement,
        });
        Ok(notice)
    }

    /// Ends the player's current phase. Finishing movement does not wait for
    /// the round; use [`GameHandle::finish_movement`] for that.
    pub async fn ready_for_next_phase(&self, player: &PlayerId) -> Result<GamePhase> {
        let phase = self.session.lock().await.ready_for_next_phase(player);
        let phase = self.report(player, phase)?;
        self.publish(SessionEvent::PhaseChanged {
            player: player.clone(),
            phase,
        });
        Ok(phase)
    }

    /// Finishes `player`'s movement phase, waits for the round gate, and
    /// executes the round.
    ///
    /// Every waiting caller races for the lock once the gate opens; the
    /// first executes the round and the rest see it already played and
    /// return `Ok(None)`. A caller still polling when the round completes
    /// stops waiting and also returns `Ok(None)`.
    pub async fn finish_movement(&self, player: &PlayerId) -> Result<Option<RoundOutcome>> {
        let round = {
            let mut session = self.session.lock().await;
            let round = session.round();
            let phase = session.ready_for_next_phase(player);
            let phase = self.report(player, phase)?;
            self.publish(SessionEvent::PhaseChanged {
                player: player.clone(),
                phase,
            });
            round
        };

        let mut rounds = self.rounds.subscribe();
        let gate = wait_for_gate(
            self.store.as_ref(),
            &self.game_id,
            Gate::RoundReady,
            self.config.round_poll_interval(),
            self.config.round_timeout(),
        );
        tokio::select! {
            gate = gate => {
                self.report(player, gate)?;
            }
            _ = rounds.wait_for(|started| *started > round) => {
                return Ok(None);
            }
        }

        self.execute_round(round).await
    }

    /// Executes `round` if it is still current, then plays back its events.
    pub async fn execute_round(&self, round: u32) -> Result<Option<RoundOutcome>> {
        let outcome = {
            let mut session = self.session.lock().await;
            match session.execute_round(round) {
                Ok(outcome) => outcome,
                Err(SessionError::StaleRound { requested, current }) => {
                    tracing::debug!(requested, current, "round already executed");
                    return Ok(None);
                }
                Err(err) => {
                    tracing::error!(game_id = %self.game_id, round, error = %err, "round execution failed");
                    self.publish(SessionEvent::Error {
                        player: None,
                        message: err.user_message(),
                    });
                    return Err(err);
                }
            }
        };

        self.rounds.send_replace(outcome.advance.round);
        self.play_back(&outcome).await;
        Ok(Some(outcome))
    }

    async fn play_back(&self, outcome: &RoundOutcome) {
        let delay = self.config.playback_delay();
        for (i, event) in outcome.resolution.events.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.publish(SessionEvent::Round {
                event: event.clone(),
            });
        }
        let advance = outcome.advance;
        if advance.phase == GamePhase::GameComplete {
            self.publish(SessionEvent::GameComplete {
                round: outcome.round_played,
            });
        } else {
            self.publish(SessionEvent::RoundCompleted {
                round: advance.round,
                phase: advance.phase,
            });
        }
    }
}
