//! Round executor.
//!
//! Replays one round's Action Log against the round-start snapshot and
//! produces the next committed galaxy. The result is a pure function of
//! `(snapshot, players, log, seed, config)`: no live or optimistic state is
//! consulted.
//!
//! Order: every placement, then every attack bucketed by target, then every
//! movement. A row that no longer makes sense against the replay state is
//! skipped with a diagnostic and the rest of the round still resolves.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::combat::{apply_attack, AttackReport, CombatError};
use super::multi::{apply_multiple_attacks, Contribution, MultiAttackReport};
use super::quantum::Salt;
use super::replay::{PlannedAction, ReplayPlan, TargetGroup};
use crate::board::{Galaxy, PendingAction, PlanetId, Player, PlayerId};
use crate::config::GameConfig;
use crate::protocol::ActionLogEntry;

/// Why a logged action was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum SkipReason {
    #[error("player '{0}' is not an active player")]
    UnknownPlayer(PlayerId),

    #[error("planet '{0}' does not exist")]
    UnknownPlanet(PlanetId),

    #[error("planet '{0}' is not owned by the submitter")]
    NotOwner(PlanetId),

    #[error("planet '{0}' already belongs to the attacker")]
    TargetOwned(PlanetId),

    #[error("planet '{to}' is out of range of '{from}'")]
    OutOfRange { from: PlanetId, to: PlanetId },

    #[error("source and destination are the same planet")]
    SamePlanet,

    #[error("no troops in the action")]
    NoTroops,

    #[error("movement into '{0}', which was attacked this round")]
    ContestedDestination(PlanetId),

    #[error(transparent)]
    Combat(#[from] CombatError),
}

/// A logged action that replay skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedAction {
    pub order: u64,
    pub player: PlayerId,
    pub action: PendingAction,
    pub reason: SkipReason,
}

/// One narrated step of round resolution, in replay order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoundEvent {
    Placement {
        player: PlayerId,
        planet: PlanetId,
        requested: u8,
        placed: u8,
    },
    Battle(AttackReport),
    Siege(MultiAttackReport),
    Movement {
        player: PlayerId,
        from: PlanetId,
        to: PlanetId,
        requested: u8,
        moved: u8,
    },
    Skipped(SkippedAction),
}

/// Output of [`execute_round`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResolution {
    pub galaxy: Galaxy,
    pub events: Vec<RoundEvent>,
}

impl RoundResolution {
    pub fn skipped(&self) -> impl Iterator<Item = &SkippedAction> {
        self.events.iter().filter_map(|e| match e {
            RoundEvent::Skipped(s) => Some(s),
            _ => None,
        })
    }

    pub fn battles(&self) -> impl Iterator<Item = &AttackReport> {
        self.events.iter().filter_map(|e| match e {
            RoundEvent::Battle(r) => Some(r),
            _ => None,
        })
    }

    pub fn sieges(&self) -> impl Iterator<Item = &MultiAttackReport> {
        self.events.iter().filter_map(|e| match e {
            RoundEvent::Siege(r) => Some(r),
            _ => None,
        })
    }
}

/// Resolves a round from the snapshot and its log.
pub fn execute_round(
    snapshot: &Galaxy,
    players: &[Player],
    entries: &[ActionLogEntry],
    seed: u32,
    config: &GameConfig,
) -> RoundResolution {
    let mut replay = Replay {
        galaxy: snapshot.clone(),
        players,
        seed,
        range: config.attack_range,
        events: Vec::with_capacity(entries.len()),
    };
    replay.galaxy.clear_effects();

    let plan = ReplayPlan::build(entries);
    tracing::debug!(
        fortify = plan.fortify.len(),
        targets = plan.attacks.len(),
        movements = plan.movements.len(),
        "replaying round"
    );

    for planned in &plan.fortify {
        replay.fortify(planned);
    }
    for group in &plan.attacks {
        replay.attack_target(group);
    }
    let attacked = plan.attacked_targets();
    for planned in &plan.movements {
        if attacked.contains(planned.action.to()) {
            replay.skip(planned, SkipReason::ContestedDestination(planned.action.to().clone()));
            continue;
        }
        replay.movement(planned);
    }

    replay.galaxy.clamp_troops();
    RoundResolution {
        galaxy: replay.galaxy,
        events: replay.events,
    }
}

struct Replay<'a> {
    galaxy: Galaxy,
    players: &'a [Player],
    seed: u32,
    range: f64,
    events: Vec<RoundEvent>,
}

impl<'a> Replay<'a> {
    fn skip(&mut self, planned: &PlannedAction, reason: SkipReason) {
        tracing::warn!(
            order = planned.order,
            player = %planned.player,
            action = ?planned.action,
            %reason,
            "skipping logged action"
        );
        self.events.push(RoundEvent::Skipped(SkippedAction {
            order: planned.order,
            player: planned.player.clone(),
            action: planned.action.clone(),
            reason,
        }));
    }

    fn player(&self, id: &PlayerId) -> Result<&'a Player, SkipReason> {
        self.players
            .iter()
            .find(|p| &p.id == id && p.is_active())
            .ok_or_else(|| SkipReason::UnknownPlayer(id.clone()))
    }

    /// Checks that `id` exists and belongs to `player`, returning its troops.
    fn owned_troops(&self, id: &PlanetId, player: &PlayerId) -> Result<u8, SkipReason> {
        let planet = self
            .galaxy
            .get(id)
            .ok_or_else(|| SkipReason::UnknownPlanet(id.clone()))?;
        if !planet.is_owned_by(player) {
            return Err(SkipReason::NotOwner(id.clone()));
        }
        Ok(planet.troops)
    }

    fn fortify(&mut self, planned: &PlannedAction) {
        let PendingAction::Fortify { to, troops } = &planned.action else {
            return;
        };
        let checked = self
            .player(&planned.player)
            .and_then(|_| self.owned_troops(to, &planned.player))
            .and_then(|_| if *troops == 0 { Err(SkipReason::NoTroops) } else { Ok(()) });
        if let Err(reason) = checked {
            self.skip(planned, reason);
            return;
        }

        let placed = match self.galaxy.get_mut(to) {
            Some(planet) => planet.reinforce(*troops),
            None => 0,
        };
        tracing::debug!(player = %planned.player, planet = %to, requested = troops, placed, "placement");
        self.events.push(RoundEvent::Placement {
            player: planned.player.clone(),
            planet: to.clone(),
            requested: *troops,
            placed,
        });
    }

    /// Validates one attack of a target group. `reserved` holds troops
    /// already committed from each source by earlier attacks in the group.
    fn check_attack(
        &self,
        planned: &PlannedAction,
        reserved: &HashMap<PlanetId, u8>,
    ) -> Result<&'a Player, SkipReason> {
        let PendingAction::Attack { from, to, troops } = &planned.action else {
            return Err(SkipReason::NoTroops);
        };
        let player = self.player(&planned.player)?;
        let available = self.owned_troops(from, &player.id)?;
        let target = self
            .galaxy
            .get(to)
            .ok_or_else(|| SkipReason::UnknownPlanet(to.clone()))?;
        if target.is_owned_by(&player.id) {
            return Err(SkipReason::TargetOwned(to.clone()));
        }
        if !self.galaxy.in_range(from, to, self.range) {
            return Err(SkipReason::OutOfRange {
                from: from.clone(),
                to: to.clone(),
            });
        }
        if *troops == 0 {
            return Err(CombatError::NoTroopsCommitted.into());
        }
        let left = available.saturating_sub(reserved.get(from).copied().unwrap_or(0));
        if *troops >= left {
            return Err(CombatError::MustLeaveTroop {
                committed: *troops,
                available: left,
            }
            .into());
        }
        Ok(player)
    }

    fn attack_target(&mut self, group: &TargetGroup) {
        let mut reserved: HashMap<PlanetId, u8> = HashMap::new();
        let mut valid: Vec<(&PlannedAction, &'a Player)> = Vec::new();

        for planned in &group.attacks {
            match self.check_attack(planned, &reserved) {
                Ok(player) => {
                    if let Some(from) = planned.action.source() {
                        *reserved.entry(from.clone()).or_insert(0) += planned.action.troops();
                    }
                    valid.push((planned, player));
                }
                Err(reason) => self.skip(planned, reason),
            }
        }

        match valid.as_slice() {
            [] => {}
            [(planned, player)] => {
                let PendingAction::Attack { from, to, troops } = &planned.action else {
                    return;
                };
                match apply_attack(
                    &mut self.galaxy,
                    player,
                    from,
                    to,
                    *troops,
                    self.seed,
                    Salt::default(),
                ) {
                    Ok(report) => self.events.push(RoundEvent::Battle(report)),
                    Err(err) => self.skip(planned, err.into()),
                }
            }
            many => {
                let contributions: Vec<Contribution> = many
                    .iter()
                    .filter_map(|(planned, player)| {
                        Some(Contribution {
                            attacker: player.id.clone(),
                            color: player.color.clone(),
                            from: planned.action.source()?.clone(),
                            troops: planned.action.troops(),
                        })
                    })
                    .collect();
                if let Some(report) =
                    apply_multiple_attacks(&mut self.galaxy, &group.target, &contributions)
                {
                    self.events.push(RoundEvent::Siege(report));
                }
            }
        }
    }

    fn movement(&mut self, planned: &PlannedAction) {
        let PendingAction::Movement { from, to, troops } = &planned.action else {
            return;
        };
        let checked = self.player(&planned.player).and_then(|_| {
            if from == to {
                return Err(SkipReason::SamePlanet);
            }
            if *troops == 0 {
                return Err(SkipReason::NoTroops);
            }
            let source = self.owned_troops(from, &planned.player)?;
            self.owned_troops(to, &planned.player)?;
            if !self.galaxy.in_range(from, to, self.range) {
                return Err(SkipReason::OutOfRange {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
            Ok(source)
        });
        let source_troops = match checked {
            Ok(t) => t,
            Err(reason) => {
                self.skip(planned, reason);
                return;
            }
        };

        let capacity = self.galaxy.get(to).map(|p| p.capacity_left()).unwrap_or(0);
        let moved = (*troops).min(capacity).min(source_troops);
        if let Some(source) = self.galaxy.get_mut(from) {
            source.troops -= moved;
        }
        if let Some(dest) = self.galaxy.get_mut(to) {
            dest.troops += moved;
        }

        tracing::debug!(player = %planned.player, %from, %to, requested = troops, moved, "movement");
        self.events.push(RoundEvent::Movement {
            player: planned.player.clone(),
            from: from.clone(),
            to: to.clone(),
            requested: *troops,
            moved,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Planet, Position, MAX_TROOPS_PER_PLANET};
    use crate::protocol::NewAction;

    fn players() -> Vec<Player> {
        vec![
            Player::new("a", "Ada", "#aa0000"),
            Player::new("b", "Bo", "#00bb00"),
        ]
    }

    fn owned(id: &str, owner: Option<&str>, troops: u8, x: f64) -> Planet {
        let mut p = Planet::new(id, id.to_uppercase(), Position::new(x, 0.0, 0.0));
        if let Some(o) = owner {
            p.set_owner(PlayerId::from(o), &format!("#{o}"));
        }
        p.troops = troops;
        p
    }

    fn snapshot() -> Galaxy {
        Galaxy::new(vec![
            owned("a1", Some("a"), 6, 0.0),
            owned("a2", Some("a"), 2, 10.0),
            owned("b1", Some("b"), 8, 20.0),
            owned("t", Some("b"), 6, 30.0),
            owned("n", None, 0, 40.0),
            owned("far", Some("b"), 4, 500.0),
        ])
    }

    fn log(rows: Vec<(&str, PendingAction)>) -> Vec<ActionLogEntry> {
        rows.into_iter()
            .enumerate()
            .map(|(i, (player, action))| {
                ActionLogEntry::from_new(NewAction::new("g", 1, PlayerId::from(player), &action), i as u64)
            })
            .collect()
    }

    fn troops(g: &Galaxy, id: &str) -> u8 {
        g.get(&PlanetId::from(id)).unwrap().troops
    }

    #[test]
    fn placements_clamp_at_cap() {
        let entries = log(vec![
            ("a", PendingAction::Fortify { to: PlanetId::from("a1"), troops: 5 }),
            ("a", PendingAction::Fortify { to: PlanetId::from("a2"), troops: 3 }),
        ]);
        let r = execute_round(&snapshot(), &players(), &entries, 1, &GameConfig::default());
        assert_eq!(troops(&r.galaxy, "a1"), MAX_TROOPS_PER_PLANET);
        assert_eq!(troops(&r.galaxy, "a2"), 5);
        assert!(matches!(
            r.events[0],
            RoundEvent::Placement { requested: 5, placed: 2, .. }
        ));
    }

    #[test]
    fn snapshot_is_not_mutated() {
        let snap = snapshot();
        let entries = log(vec![(
            "a",
            PendingAction::Fortify { to: PlanetId::from("a2"), troops: 1 },
        )]);
        let r = execute_round(&snap, &players(), &entries, 1, &GameConfig::default());
        assert_eq!(troops(&snap, "a2"), 2);
        assert_eq!(troops(&r.galaxy, "a2"), 3);
    }

    #[test]
    fn missing_planet_is_skipped_not_fatal() {
        let entries = log(vec![
            ("a", PendingAction::Fortify { to: PlanetId::from("ghost"), troops: 1 }),
            ("a", PendingAction::Fortify { to: PlanetId::from("a2"), troops: 1 }),
            (
                "a",
                PendingAction::Attack { from: PlanetId::from("ghost"), to: PlanetId::from("n"), troops: 1 },
            ),
        ]);
        let r = execute_round(&snapshot(), &players(), &entries, 1, &GameConfig::default());
        let skipped: Vec<&SkippedAction> = r.skipped().collect();
        assert_eq!(skipped.len(), 2);
        assert_eq!(skipped[0].reason, SkipReason::UnknownPlanet(PlanetId::from("ghost")));
        assert_eq!(troops(&r.galaxy, "a2"), 3);
    }

    #[test]
    fn unknown_player_is_skipped() {
        let entries = log(vec![(
            "zed",
            PendingAction::Fortify { to: PlanetId::from("a1"), troops: 1 },
        )]);
        let r = execute_round(&snapshot(), &players(), &entries, 1, &GameConfig::default());
        assert_eq!(r.skipped().count(), 1);
        assert_eq!(troops(&r.galaxy, "a1"), 6);
    }

    #[test]
    fn single_attack_on_neutral_empty_planet_captures() {
        let entries = log(vec![(
            "a",
            PendingAction::Attack { from: PlanetId::from("a1"), to: PlanetId::from("n"), troops: 3 },
        )]);
        // a1 (x=0) to n (x=40) is within range 75.
        let r = execute_round(&snapshot(), &players(), &entries, 77, &GameConfig::default());
        let n = r.galaxy.get(&PlanetId::from("n")).unwrap();
        assert_eq!(n.owner(), Some(&PlayerId::from("a")));
        assert_eq!(n.color, "#aa0000");
        assert_eq!(n.troops, 3);
        assert_eq!(troops(&r.galaxy, "a1"), 3);
        assert_eq!(r.battles().count(), 1);
    }

    #[test]
    fn out_of_range_attack_skipped() {
        let entries = log(vec![(
            "a",
            PendingAction::Attack { from: PlanetId::from("a1"), to: PlanetId::from("far"), troops: 2 },
        )]);
        let r = execute_round(&snapshot(), &players(), &entries, 1, &GameConfig::default());
        assert!(matches!(
            r.skipped().next().map(|s| &s.reason),
            Some(SkipReason::OutOfRange { .. })
        ));
        assert_eq!(r.galaxy, {
            let mut g = snapshot();
            g.clear_effects();
            g
        });
    }

    #[test]
    fn multi_attack_uses_subtraction() {
        let mut planets = snapshot().planets().to_vec();
        planets.push(owned("c1", Some("c"), 8, 35.0));
        let snap = Galaxy::new(planets);
        let mut roster = players();
        roster.push(Player::new("c", "Cy", "#0000cc"));

        // a commits 3, c commits 5 against t (6 troops): -2, c captures with 5.
        let entries = log(vec![
            ("a", PendingAction::Attack { from: PlanetId::from("a1"), to: PlanetId::from("t"), troops: 3 }),
            ("c", PendingAction::Attack { from: PlanetId::from("c1"), to: PlanetId::from("t"), troops: 5 }),
        ]);
        let r = execute_round(&snap, &roster, &entries, 1, &GameConfig::default());
        let t = r.galaxy.get(&PlanetId::from("t")).unwrap();
        assert_eq!(t.owner(), Some(&PlayerId::from("c")));
        assert_eq!(t.troops, 5);
        assert_eq!(troops(&r.galaxy, "a1"), 3);
        assert_eq!(troops(&r.galaxy, "c1"), 3);
        assert_eq!(r.sieges().count(), 1);
    }

    #[test]
    fn same_source_cannot_overcommit_within_group() {
        let mut planets = snapshot().planets().to_vec();
        planets.push(owned("c1", Some("c"), 8, 35.0));
        let snap = Galaxy::new(planets);
        let mut roster = players();
        roster.push(Player::new("c", "Cy", "#0000cc"));

        // a1 has 6: first commit 4 leaves 2, a second commit of 2 would empty it.
        let entries = log(vec![
            ("a", PendingAction::Attack { from: PlanetId::from("a1"), to: PlanetId::from("t"), troops: 4 }),
            ("a", PendingAction::Attack { from: PlanetId::from("a1"), to: PlanetId::from("t"), troops: 2 }),
            ("c", PendingAction::Attack { from: PlanetId::from("c1"), to: PlanetId::from("t"), troops: 1 }),
        ]);
        let r = execute_round(&snap, &roster, &entries, 1, &GameConfig::default());
        assert_eq!(r.skipped().count(), 1);
        // 6 - (4 + 1) = 1: defender holds
        assert_eq!(troops(&r.galaxy, "t"), 1);
        assert_eq!(troops(&r.galaxy, "a1"), 2);
    }

    #[test]
    fn movement_into_attacked_planet_is_voided() {
        let entries = log(vec![
            ("b", PendingAction::Movement { from: PlanetId::from("b1"), to: PlanetId::from("t"), troops: 2 }),
            ("a", PendingAction::Attack { from: PlanetId::from("a1"), to: PlanetId::from("t"), troops: 2 }),
        ]);
        let r = execute_round(&snapshot(), &players(), &entries, 5, &GameConfig::default());
        let skipped: Vec<&SkippedAction> = r.skipped().collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].reason, SkipReason::ContestedDestination(PlanetId::from("t")));
        assert_eq!(troops(&r.galaxy, "b1"), 8);
    }

    #[test]
    fn movement_clamps_to_destination_capacity() {
        let entries = log(vec![
            ("b", PendingAction::Movement { from: PlanetId::from("t"), to: PlanetId::from("b1"), troops: 3 }),
            ("a", PendingAction::Movement { from: PlanetId::from("a1"), to: PlanetId::from("a2"), troops: 4 }),
        ]);
        let r = execute_round(&snapshot(), &players(), &entries, 5, &GameConfig::default());
        // b1 is full: nothing moves
        assert_eq!(troops(&r.galaxy, "t"), 6);
        assert_eq!(troops(&r.galaxy, "b1"), 8);
        assert_eq!(troops(&r.galaxy, "a1"), 2);
        assert_eq!(troops(&r.galaxy, "a2"), 6);
    }

    #[test]
    fn movement_requires_owned_destination() {
        let entries = log(vec![(
            "a",
            PendingAction::Movement { from: PlanetId::from("a1"), to: PlanetId::from("n"), troops: 1 },
        )]);
        let r = execute_round(&snapshot(), &players(), &entries, 5, &GameConfig::default());
        assert_eq!(
            r.skipped().next().map(|s| s.reason.clone()),
            Some(SkipReason::NotOwner(PlanetId::from("n")))
        );
    }

    #[test]
    fn all_planets_within_cap() {
        let entries = log(vec![
            ("a", PendingAction::Fortify { to: PlanetId::from("a1"), troops: 8 }),
            ("b", PendingAction::Fortify { to: PlanetId::from("t"), troops: 8 }),
            ("a", PendingAction::Attack { from: PlanetId::from("a1"), to: PlanetId::from("t"), troops: 7 }),
            ("b", PendingAction::Movement { from: PlanetId::from("t"), to: PlanetId::from("b1"), troops: 7 }),
        ]);
        for seed in 0..50 {
            let r = execute_round(&snapshot(), &players(), &entries, seed, &GameConfig::default());
            assert!(r.galaxy.iter().all(|p| p.troops <= MAX_TROOPS_PER_PLANET));
        }
    }
}
