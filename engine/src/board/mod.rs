//! Board representation and game-state types.
//!
//! Contains the core data structures for planets, players, actions, the
//! galaxy they live in, and the round phase.

pub mod action;
pub mod galaxy;
pub mod map;
pub mod planet;
pub mod player;
pub mod state;

pub use action::{ActionKind, PendingAction};
pub use galaxy::Galaxy;
pub use map::{assign_planets, PlanetTemplate};
pub use planet::{
    EntanglementEffect, Infrastructure, Interference, Planet, PlanetId, PlanetKind, Position,
    Resources, INITIAL_TROOPS, MAX_TROOPS_PER_PLANET, NEUTRAL_COLOR,
};
pub use player::{Player, PlayerFlag, PlayerId, Role};
pub use state::GamePhase;
