//! Planet types and troop constants.
//!
//! A planet carries its static flavor data (kind, resources, infrastructure),
//! its position in galaxy space, and the mutable ownership/troop fields that
//! round resolution rewrites.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::player::PlayerId;

/// Hard cap on the troops a single planet can hold.
pub const MAX_TROOPS_PER_PLANET: u8 = 8;

/// Troops placed on each planet a player receives at game start.
pub const INITIAL_TROOPS: u8 = 2;

/// Color used for planets nobody owns.
pub const NEUTRAL_COLOR: &str = "#4a5568";

/// Stable identifier of a planet within a map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanetId(pub String);

impl PlanetId {
    pub fn new(id: impl Into<String>) -> Self {
        PlanetId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlanetId {
    fn from(s: &str) -> Self {
        PlanetId(s.to_string())
    }
}

/// A point in galaxy space. Only used for range checks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Position { x, y, z }
    }

    /// Squared Euclidean distance to another position.
    pub fn distance_squared(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Returns true if `other` lies within `range` units (inclusive).
    /// Compares squared distances so no square root is taken.
    pub fn within_range(&self, other: &Position, range: f64) -> bool {
        self.distance_squared(other) <= range * range
    }
}

/// Planet surface class. Flavor only; combat ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanetKind {
    #[default]
    Rocky,
    Gas,
    Ice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resources {
    pub gas: u32,
    pub metal: u32,
    pub crystal: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Infrastructure {
    pub labs: u32,
    pub mines: u32,
    pub shipyards: u32,
}

/// Which way an interference event pushed a planet's troops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interference {
    Constructive,
    Destructive,
}

impl Interference {
    pub const fn from_positive(positive: bool) -> Self {
        if positive {
            Interference::Constructive
        } else {
            Interference::Destructive
        }
    }

    pub const fn is_positive(self) -> bool {
        matches!(self, Interference::Constructive)
    }
}

/// Transient record of the last entanglement effect that touched a planet.
///
/// Carries no invariant; it exists for reporting and animation and is
/// cleared whenever a new committed snapshot is taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntanglementEffect {
    pub kind: Interference,
    pub magnitude: u8,
    pub source: PlanetId,
}

/// A planet in the galaxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    pub id: PlanetId,
    pub name: String,
    pub position: Position,
    #[serde(default = "default_size")]
    pub size: f64,
    pub color: String,
    /// Owning players. Zero or one entry under the current rules.
    #[serde(default)]
    pub owners: Vec<PlayerId>,
    #[serde(default)]
    pub troops: u8,
    #[serde(default, rename = "type")]
    pub kind: PlanetKind,
    #[serde(default)]
    pub resources: Resources,
    #[serde(default)]
    pub infrastructure: Infrastructure,
    /// Planets whose troop counts resonate with this one after combat.
    /// Not required to be symmetric.
    #[serde(default)]
    pub entangled_with: Vec<PlanetId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entanglement_effect: Option<EntanglementEffect>,
}

fn default_size() -> f64 {
    1.2
}

impl Planet {
    /// Creates an unowned planet with no troops.
    pub fn new(id: impl Into<String>, name: impl Into<String>, position: Position) -> Self {
        Planet {
            id: PlanetId::new(id),
            name: name.into(),
            position,
            size: default_size(),
            color: NEUTRAL_COLOR.to_string(),
            owners: Vec::new(),
            troops: 0,
            kind: PlanetKind::default(),
            resources: Resources::default(),
            infrastructure: Infrastructure::default(),
            entangled_with: Vec::new(),
            entanglement_effect: None,
        }
    }

    /// The owning player, if any.
    pub fn owner(&self) -> Option<&PlayerId> {
        self.owners.first()
    }

    pub fn is_owned_by(&self, player: &PlayerId) -> bool {
        self.owners.iter().any(|o| o == player)
    }

    pub fn is_neutral(&self) -> bool {
        self.owners.is_empty()
    }

    /// Hands the planet to `player`, repainting it in their color.
    pub fn set_owner(&mut self, player: PlayerId, color: &str) {
        self.owners = vec![player];
        self.color = color.to_string();
    }

    /// Makes the planet neutral with no troops.
    pub fn neutralize(&mut self) {
        self.owners.clear();
        self.troops = 0;
        self.color = NEUTRAL_COLOR.to_string();
    }

    /// Room left before the troop cap.
    pub fn capacity_left(&self) -> u8 {
        MAX_TROOPS_PER_PLANET.saturating_sub(self.troops)
    }

    /// Adds up to `amount` troops without crossing the cap.
    /// Returns how many were actually added.
    pub fn reinforce(&mut self, amount: u8) -> u8 {
        let added = amount.min(self.capacity_left());
        self.troops += added;
        added
    }

    pub fn is_entangled(&self) -> bool {
        !self.entangled_with.is_empty()
    }
}
