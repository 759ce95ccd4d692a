//! Map templates and start-of-game planet assignment.
//!
//! Templates come from the data store and describe a map's planets with no
//! ownership. `assign_planets` turns a template into the round-1 galaxy by
//! handing each active player a block of planets from a seeded shuffle.

use serde::{Deserialize, Serialize};

use super::galaxy::Galaxy;
use super::planet::{
    Infrastructure, Planet, PlanetId, PlanetKind, Position, Resources, INITIAL_TROOPS,
    NEUTRAL_COLOR,
};
use super::player::Player;

/// Seed used when the game seed is zero.
const FALLBACK_SEED: u32 = 12345;

/// Static description of one planet in a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetTemplate {
    pub id: PlanetId,
    pub name: String,
    pub position: Position,
    #[serde(default, rename = "type")]
    pub kind: PlanetKind,
    #[serde(default)]
    pub resources: Resources,
    #[serde(default)]
    pub infrastructure: Infrastructure,
    #[serde(default)]
    pub entangled_with: Vec<PlanetId>,
}

impl PlanetTemplate {
    pub fn new(id: impl Into<String>, name: impl Into<String>, position: Position) -> Self {
        PlanetTemplate {
            id: PlanetId::new(id),
            name: name.into(),
            position,
            kind: PlanetKind::default(),
            resources: Resources::default(),
            infrastructure: Infrastructure::default(),
            entangled_with: Vec::new(),
        }
    }

    /// Materializes the template as an unowned planet with no troops.
    pub fn to_planet(&self) -> Planet {
        let mut planet = Planet::new(self.id.as_str(), self.name.clone(), self.position);
        planet.kind = self.kind;
        planet.resources = self.resources;
        planet.infrastructure = self.infrastructure;
        planet.entangled_with = self.entangled_with.clone();
        planet
    }
}

/// 31-bit linear congruential generator used for map assignment.
#[derive(Debug, Clone, Copy)]
struct MapLcg {
    state: u32,
}

impl MapLcg {
    fn new(seed: u32) -> Self {
        let state = if seed == 0 { FALLBACK_SEED } else { seed };
        MapLcg { state }
    }

    fn next_u31(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1_103_515_245).wrapping_add(12_345) & 0x7fff_ffff;
        self.state
    }

    /// Uniform-ish index in `0..bound`. `bound` must be non-zero.
    fn next_index(&mut self, bound: usize) -> usize {
        self.next_u31() as usize % bound
    }
}

/// Builds the starting galaxy from a template.
///
/// Planets are shuffled with a Fisher-Yates pass driven by `seed`; the first
/// `planets_per_player` shuffled planets go to the first active player, the
/// next block to the second, and so on. Owned planets start with
/// [`INITIAL_TROOPS`]; the rest stay neutral with no troops. The returned
/// galaxy keeps template order.
pub fn assign_planets(
    template: &[PlanetTemplate],
    players: &[Player],
    seed: u32,
    planets_per_player: usize,
) -> Galaxy {
    let mut planets: Vec<Planet> = template.iter().map(PlanetTemplate::to_planet).collect();

    let mut order: Vec<usize> = (0..planets.len()).collect();
    let mut lcg = MapLcg::new(seed);
    for i in (1..order.len()).rev() {
        let j = lcg.next_index(i + 1);
        order.swap(i, j);
    }

    let active: Vec<&Player> = players.iter().filter(|p| p.is_active()).collect();
    for (slot, &planet_idx) in order.iter().enumerate() {
        let Some(player) = active.get(slot / planets_per_player.max(1)) else {
            break;
        };
        let planet = &mut planets[planet_idx];
        planet.set_owner(player.id.clone(), &player.color);
        planet.troops = INITIAL_TROOPS;
    }

    for planet in planets.iter_mut().filter(|p| p.is_neutral()) {
        planet.color = NEUTRAL_COLOR.to_string();
    }

    Galaxy::new(planets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::player::{PlayerId, Role};

    fn template(n: usize) -> Vec<PlanetTemplate> {
        (0..n)
            .map(|i| PlanetTemplate::new(format!("p{i}"), format!("Planet {i}"), Position::new(i as f64, 0.0, 0.0)))
            .collect()
    }

    fn players() -> Vec<Player> {
        let mut visitor = Player::new("v", "Visitor", "#999999");
        visitor.role = Role::Visitor;
        vec![
            Player::new("a", "Ada", "#ff0000"),
            visitor,
            Player::new("b", "Bo", "#00ff00"),
        ]
    }

    #[test]
    fn each_active_player_gets_a_block() {
        let g = assign_planets(&template(25), &players(), 42, 10);
        assert_eq!(g.owned_count(&PlayerId::from("a")), 10);
        assert_eq!(g.owned_count(&PlayerId::from("b")), 10);
        assert_eq!(g.owned_count(&PlayerId::from("v")), 0);
        assert_eq!(g.iter().filter(|p| p.is_neutral()).count(), 5);

        for p in g.iter() {
            if p.is_neutral() {
                assert_eq!(p.troops, 0);
                assert_eq!(p.color, NEUTRAL_COLOR);
            } else {
                assert_eq!(p.troops, INITIAL_TROOPS);
            }
        }
    }

    #[test]
    fn assignment_is_deterministic_per_seed() {
        let a = assign_planets(&template(30), &players(), 7, 10);
        let b = assign_planets(&template(30), &players(), 7, 10);
        let c = assign_planets(&template(30), &players(), 8, 10);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn small_map_runs_out_of_planets() {
        let g = assign_planets(&template(12), &players(), 1, 10);
        assert_eq!(g.owned_count(&PlayerId::from("a")), 10);
        assert_eq!(g.owned_count(&PlayerId::from("b")), 2);
    }

    #[test]
    fn template_order_is_kept() {
        let g = assign_planets(&template(5), &players(), 3, 1);
        let ids: Vec<&str> = g.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p0", "p1", "p2", "p3", "p4"]);
    }
}
