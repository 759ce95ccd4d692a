//! Error types surfaced by the session layer and the data store.
//!
//! Combat precondition failures live with the resolver in
//! `resolve::combat::CombatError` and are wrapped here.

use thiserror::Error;

use crate::board::{GamePhase, PlanetId, PlayerId};
use crate::resolve::CombatError;
use crate::session::readiness::Gate;

/// Rejected player input. Never logged as an action; the player can correct it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("not allowed during {actual} (expected {expected})")]
    WrongPhase {
        expected: GamePhase,
        actual: GamePhase,
    },

    #[error("the game is over")]
    GameComplete,

    #[error("unknown planet '{0}'")]
    UnknownPlanet(PlanetId),

    #[error("unknown player '{0}'")]
    UnknownPlayer(PlayerId),

    #[error("visitors cannot submit actions")]
    VisitorCannotAct,

    #[error("you have already finished this phase")]
    AlreadyFinished,

    #[error("you do not own planet '{0}'")]
    NotOwner(PlanetId),

    #[error("you already own planet '{0}'")]
    TargetOwned(PlanetId),

    #[error("planet '{to}' is out of range of '{from}'")]
    OutOfRange { from: PlanetId, to: PlanetId },

    #[error("cannot move troops onto the same planet")]
    SamePlanet,

    #[error("must place at least 1 troop")]
    NoTroopsToPlace,

    #[error("only {remaining} troops left to place ({requested} requested)")]
    InsufficientBudget { requested: u32, remaining: u32 },

    #[error("must move at least 1 troop and leave 1 behind ({requested} requested, {available} available)")]
    NotEnoughTroops { requested: u8, available: u8 },

    #[error(transparent)]
    Combat(#[from] CombatError),
}

/// Failures of the external data store. Retry policy belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("data store unavailable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store lock was poisoned")]
    LockPoisoned,

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Rejected join requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("color {0} is already taken")]
    ColorTaken(String),

    #[error("name '{0}' is already taken")]
    NameTaken(String),

    #[error("the game is full ({max} players)")]
    LobbyFull { max: usize },

    #[error("the game has ended")]
    GameEnded,
}

/// Failures loading a [`GameConfig`](crate::config::GameConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("timed out waiting on the {gate} gate for {}", join_ids(.waiting_on))]
    ReadinessTimeout { gate: Gate, waiting_on: Vec<PlayerId> },

    #[error("no active players in the game")]
    NoActivePlayers,

    #[error("still waiting for {} to finish the round", join_ids(.waiting_on))]
    PlayersNotReady { waiting_on: Vec<PlayerId> },

    #[error("round {requested} was requested but the game is in round {current}")]
    StaleRound { requested: u32, current: u32 },

    #[error("the game has not started")]
    NotStarted,

    #[error("map '{name}' v{version} has no planets")]
    EmptyMap { name: String, version: u32 },
}

fn join_ids(ids: &[PlayerId]) -> String {
    ids.iter().map(PlayerId::as_str).collect::<Vec<_>>().join(", ")
}

impl SessionError {
    /// Text safe to show a player: validation messages verbatim, internal
    /// failures as generic notices.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Action(err) => err.to_string(),
            SessionError::Roster(err) => err.to_string(),
            SessionError::ReadinessTimeout { gate, waiting_on } => format!(
                "Timed out waiting for {} to {}",
                if waiting_on.is_empty() {
                    "players".to_string()
                } else {
                    join_ids(waiting_on)
                },
                gate.verb()
            ),
            SessionError::Store(_) => "Action failed, please try again".to_string(),
            SessionError::NoActivePlayers => "No active players in this game".to_string(),
            SessionError::PlayersNotReady { waiting_on } => {
                format!("Waiting for {} to finish", join_ids(waiting_on))
            }
            SessionError::Config(_)
            | SessionError::StaleRound { .. }
            | SessionError::NotStarted
            | SessionError::EmptyMap { .. } => "Failed to execute round".to_string(),
        }
    }

    /// True for failures worth retrying without changing the request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::Store(_) | SessionError::ReadinessTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
