//! The galaxy: every planet in a game, in map order.
//!
//! Map order is preserved so that any iteration over planets is
//! deterministic. Lookups by id go through a side index.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::planet::{Planet, PlanetId, MAX_TROOPS_PER_PLANET};
use super::player::PlayerId;

/// Ordered planet collection with O(1) id lookup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Planet>", into = "Vec<Planet>")]
pub struct Galaxy {
    planets: Vec<Planet>,
    index: HashMap<PlanetId, usize>,
}

impl From<Vec<Planet>> for Galaxy {
    fn from(planets: Vec<Planet>) -> Self {
        Galaxy::new(planets)
    }
}

impl From<Galaxy> for Vec<Planet> {
    fn from(galaxy: Galaxy) -> Self {
        galaxy.planets
    }
}

impl Galaxy {
    /// Builds a galaxy from planets in map order. A later duplicate id
    /// shadows an earlier one for lookups.
    pub fn new(planets: Vec<Planet>) -> Self {
        let index = planets
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        Galaxy { planets, index }
    }

    pub fn len(&self) -> usize {
        self.planets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planets.is_empty()
    }

    pub fn planets(&self) -> &[Planet] {
        &self.planets
    }

    pub fn iter(&self) -> impl Iterator<Item = &Planet> {
        self.planets.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Planet> {
        self.planets.iter_mut()
    }

    pub fn contains(&self, id: &PlanetId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &PlanetId) -> Option<&Planet> {
        self.index.get(id).map(|&i| &self.planets[i])
    }

    pub fn get_mut(&mut self, id: &PlanetId) -> Option<&mut Planet> {
        match self.index.get(id) {
            Some(&i) => self.planets.get_mut(i),
            None => None,
        }
    }

    /// Number of planets owned by `player`.
    pub fn owned_count(&self, player: &PlayerId) -> usize {
        self.planets.iter().filter(|p| p.is_owned_by(player)).count()
    }

    /// Returns true if both planets exist and lie within `range` of each other.
    pub fn in_range(&self, a: &PlanetId, b: &PlanetId, range: f64) -> bool {
        match (self.get(a), self.get(b)) {
            (Some(pa), Some(pb)) => pa.position.within_range(&pb.position, range),
            _ => false,
        }
    }

    /// Re-applies the per-planet troop cap everywhere.
    pub fn clamp_troops(&mut self) {
        for planet in &mut self.planets {
            planet.troops = planet.troops.min(MAX_TROOPS_PER_PLANET);
        }
    }

    /// Drops every transient entanglement descriptor.
    pub fn clear_effects(&mut self) {
        for planet in &mut self.planets {
            planet.entanglement_effect = None;
        }
    }

    /// Sum of troops held by `player` across the galaxy.
    pub fn troops_of(&self, player: &PlayerId) -> u32 {
        self.planets
            .iter()
            .filter(|p| p.is_owned_by(player))
            .map(|p| u32::from(p.troops))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::planet::Position;

    fn galaxy() -> Galaxy {
        let mut a = Planet::new("a", "Alpha", Position::new(0.0, 0.0, 0.0));
        a.set_owner(PlayerId::from("p1"), "#f00");
        a.troops = 3;
        let b = Planet::new("b", "Beta", Position::new(50.0, 0.0, 0.0));
        let mut c = Planet::new("c", "Gamma", Position::new(200.0, 0.0, 0.0));
        c.set_owner(PlayerId::from("p1"), "#f00");
        c.troops = 5;
        Galaxy::new(vec![a, b, c])
    }

    #[test]
    fn lookup_and_order() {
        let g = galaxy();
        assert_eq!(g.len(), 3);
        assert_eq!(g.get(&PlanetId::from("b")).map(|p| p.name.as_str()), Some("Beta"));
        assert!(g.get(&PlanetId::from("zz")).is_none());
        let ids: Vec<&str> = g.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn ownership_counts() {
        let g = galaxy();
        let p1 = PlayerId::from("p1");
        assert_eq!(g.owned_count(&p1), 2);
        assert_eq!(g.troops_of(&p1), 8);
        assert_eq!(g.owned_count(&PlayerId::from("p2")), 0);
    }

    #[test]
    fn range_checks() {
        let g = galaxy();
        assert!(g.in_range(&PlanetId::from("a"), &PlanetId::from("b"), 75.0));
        assert!(!g.in_range(&PlanetId::from("a"), &PlanetId::from("c"), 75.0));
        assert!(!g.in_range(&PlanetId::from("a"), &PlanetId::from("missing"), 75.0));
    }

    #[test]
    fn clamp_restores_cap() {
        let mut g = galaxy();
        g.get_mut(&PlanetId::from("a")).unwrap().troops = 11;
        g.clamp_troops();
        assert_eq!(g.get(&PlanetId::from("a")).unwrap().troops, MAX_TROOPS_PER_PLANET);
    }

    #[test]
    fn serializes_as_planet_list() {
        let g = galaxy();
        let json = serde_json::to_string(&g).unwrap();
        assert!(json.starts_with('['));
        let back: Galaxy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, g);
        assert!(back.contains(&PlanetId::from("c")));
    }
}
