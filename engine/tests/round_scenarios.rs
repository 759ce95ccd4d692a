//! Round resolution scenarios.
//!
//! Each test builds a round-start galaxy and an Action Log by hand, runs the
//! round executor, and checks the committed result.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use quantum_conquest::board::{
    Galaxy, PendingAction, Planet, PlanetId, Player, PlayerId, Position, MAX_TROOPS_PER_PLANET,
};
use quantum_conquest::config::GameConfig;
use quantum_conquest::protocol::{ActionLogEntry, NewAction};
use quantum_conquest::resolve::{
    apply_entanglement, entanglement_delta, execute_round, resolve_attack, MultiOutcome,
    PhaseMachine, RoundEvent, Salt, SkipReason,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SEED: u32 = 20_240_611;

fn ada() -> Player {
    Player::new("ada", "Ada", "#e53e3e")
}

fn bo() -> Player {
    Player::new("bo", "Bo", "#3182ce")
}

fn cy() -> Player {
    Player::new("cy", "Cy", "#38a169")
}

fn players() -> Vec<Player> {
    vec![ada(), bo(), cy()]
}

/// A planet at `x` on the line, owned by `owner` (or neutral) with `troops`.
fn planet(id: &str, x: f64, owner: Option<&Player>, troops: u8) -> Planet {
    let mut p = Planet::new(id, id.to_uppercase(), Position::new(x, 0.0, 0.0));
    if let Some(owner) = owner {
        p.set_owner(owner.id.clone(), &owner.color);
    }
    p.troops = troops;
    p
}

fn pid(id: &str) -> PlanetId {
    PlanetId::from(id)
}

fn fortify(to: &str, troops: u8) -> PendingAction {
    PendingAction::Fortify { to: pid(to), troops }
}

fn attack(from: &str, to: &str, troops: u8) -> PendingAction {
    PendingAction::Attack {
        from: pid(from),
        to: pid(to),
        troops,
    }
}

fn movement(from: &str, to: &str, troops: u8) -> PendingAction {
    PendingAction::Movement {
        from: pid(from),
        to: pid(to),
        troops,
    }
}

/// Turns `(player, action)` pairs into log rows in submission order.
fn log(rows: &[(&Player, PendingAction)]) -> Vec<ActionLogEntry> {
    rows.iter()
        .enumerate()
        .map(|(i, (player, action))| {
            ActionLogEntry::from_new(NewAction::new("g", 1, player.id.clone(), action), i as u64)
        })
        .collect()
}

fn run(galaxy: &Galaxy, rows: &[(&Player, PendingAction)]) -> quantum_conquest::resolve::RoundResolution {
    execute_round(galaxy, &players(), &log(rows), SEED, &GameConfig::testing())
}

fn troops(galaxy: &Galaxy, id: &str) -> u8 {
    galaxy.get(&pid(id)).map(|p| p.troops).unwrap_or(0)
}

fn owner(galaxy: &Galaxy, id: &str) -> Option<PlayerId> {
    galaxy.get(&pid(id)).and_then(|p| p.owner().cloned())
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn combat_is_deterministic() {
    for seed in [0, 1, 42, SEED, u32::MAX] {
        for defender in 0..=MAX_TROOPS_PER_PLANET {
            for attacking in 1..MAX_TROOPS_PER_PLANET {
                let first = resolve_attack(defender, MAX_TROOPS_PER_PLANET, attacking, seed, Salt::default()).unwrap();
                let again = resolve_attack(defender, MAX_TROOPS_PER_PLANET, attacking, seed, Salt::default()).unwrap();
                assert_eq!(first.constructive_interference, again.constructive_interference);
                assert_eq!(first.attacker_troops_after, again.attacker_troops_after);
                assert_eq!(first.defender_troops_after, again.defender_troops_after);
            }
        }
    }
}

#[test]
fn round_execution_is_deterministic() {
    let (a, b) = (ada(), bo());
    let galaxy = Galaxy::new(vec![
        planet("p1", 0.0, Some(&a), 6),
        planet("p2", 40.0, Some(&b), 4),
        planet("p3", 80.0, None, 1),
    ]);
    let rows = [
        (&a, fortify("p1", 2)),
        (&b, fortify("p2", 3)),
        (&a, attack("p1", "p2", 5)),
        (&b, attack("p2", "p3", 2)),
    ];
    assert_eq!(run(&galaxy, &rows), run(&galaxy, &rows));
}

// ---------------------------------------------------------------------------
// Troop cap
// ---------------------------------------------------------------------------

#[test]
fn overflowing_placements_and_moves_clamp() {
    let a = ada();
    let galaxy = Galaxy::new(vec![planet("p1", 0.0, Some(&a), 7), planet("p2", 30.0, Some(&a), 6)]);
    let result = run(
        &galaxy,
        &[(&a, fortify("p1", 5)), (&a, fortify("p2", 1)), (&a, movement("p2", "p1", 5))],
    );

    assert_eq!(troops(&result.galaxy, "p1"), MAX_TROOPS_PER_PLANET);
    assert_eq!(troops(&result.galaxy, "p2"), 7);
    assert!(result.events.iter().any(|e| matches!(
        e,
        RoundEvent::Placement { requested: 5, placed: 1, .. }
    )));
    assert!(result.events.iter().any(|e| matches!(
        e,
        RoundEvent::Movement { requested: 5, moved: 0, .. }
    )));
}

#[test]
fn random_logs_never_break_the_cap() {
    let roster = players();
    let mut rng = SmallRng::seed_from_u64(7);

    for round in 0..200u32 {
        let planets: Vec<Planet> = (0..8)
            .map(|i| {
                let owner = roster.get(rng.gen_range(0..4));
                let mut p = planet(&format!("p{i}"), 25.0 * i as f64, owner, rng.gen_range(0..=8));
                if rng.gen_bool(0.3) {
                    p.entangled_with = (0..rng.gen_range(1..4))
                        .map(|_| pid(&format!("p{}", rng.gen_range(0..8))))
                        .collect();
                }
                p
            })
            .collect();
        let galaxy = Galaxy::new(planets);

        let rows: Vec<(&Player, PendingAction)> = (0..24)
            .map(|_| {
                let player = &roster[rng.gen_range(0..roster.len())];
                let from = format!("p{}", rng.gen_range(0..8));
                let to = format!("p{}", rng.gen_range(0..8));
                let n = rng.gen_range(0..=9);
                let action = match rng.gen_range(0..3) {
                    0 => fortify(&to, n),
                    1 => attack(&from, &to, n),
                    _ => movement(&from, &to, n),
                };
                (player, action)
            })
            .collect();

        let entries = log(&rows);
        let result = execute_round(&galaxy, &roster, &entries, round, &GameConfig::testing());
        for p in result.galaxy.iter() {
            assert!(p.troops <= MAX_TROOPS_PER_PLANET, "round {round}: {} has {}", p.id, p.troops);
        }
    }
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[test]
fn interleaving_across_groups_does_not_matter() {
    let (a, b) = (ada(), bo());
    let galaxy = Galaxy::new(vec![
        planet("p1", 0.0, Some(&a), 4),
        planet("p2", 30.0, Some(&a), 2),
        planet("p3", 60.0, Some(&b), 3),
        planet("p4", 90.0, Some(&b), 5),
    ]);

    let grouped = [
        (&a, fortify("p1", 3)),
        (&b, fortify("p4", 2)),
        (&a, attack("p1", "p3", 5)),
        (&a, movement("p1", "p2", 1)),
        (&b, movement("p4", "p3", 2)),
    ];
    let interleaved = [
        (&a, movement("p1", "p2", 1)),
        (&a, attack("p1", "p3", 5)),
        (&b, movement("p4", "p3", 2)),
        (&a, fortify("p1", 3)),
        (&b, fortify("p4", 2)),
    ];

    assert_eq!(run(&galaxy, &grouped).galaxy, run(&galaxy, &interleaved).galaxy);
}

#[test]
fn placements_land_before_attacks_regardless_of_submission() {
    let (a, b) = (ada(), bo());
    let galaxy = Galaxy::new(vec![planet("p1", 0.0, Some(&a), 2), planet("p2", 30.0, Some(&b), 1)]);

    // The attack needs the placement to have happened first.
    let result = run(&galaxy, &[(&a, attack("p1", "p2", 4)), (&a, fortify("p1", 3))]);
    assert_eq!(result.skipped().count(), 0);
    assert_eq!(result.battles().count(), 1);
}

#[test]
fn order_within_a_group_matters() {
    let a = ada();
    let galaxy = Galaxy::new(vec![
        planet("p1", 0.0, Some(&a), 6),
        planet("p2", 30.0, Some(&a), 6),
        planet("p3", 60.0, Some(&a), 1),
    ]);

    let first = run(&galaxy, &[(&a, movement("p1", "p3", 5)), (&a, movement("p2", "p3", 5))]);
    let second = run(&galaxy, &[(&a, movement("p2", "p3", 5)), (&a, movement("p1", "p3", 5))]);

    assert_eq!((troops(&first.galaxy, "p1"), troops(&first.galaxy, "p2")), (1, 4));
    assert_eq!((troops(&second.galaxy, "p1"), troops(&second.galaxy, "p2")), (4, 1));
    assert_eq!(troops(&first.galaxy, "p3"), MAX_TROOPS_PER_PLANET);
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

#[test]
fn emptied_defender_changes_hands() {
    let (a, b) = (ada(), bo());
    let galaxy = Galaxy::new(vec![
        planet("p1", 0.0, Some(&a), 7),
        planet("p2", 30.0, Some(&b), 0),
        planet("p3", 60.0, None, 0),
    ]);

    let result = run(&galaxy, &[(&a, attack("p1", "p2", 3)), (&a, attack("p1", "p3", 2))]);

    assert_eq!(owner(&result.galaxy, "p2"), Some(a.id.clone()));
    assert_eq!(troops(&result.galaxy, "p2"), 3);
    assert_eq!(owner(&result.galaxy, "p3"), Some(a.id.clone()));
    assert_eq!(troops(&result.galaxy, "p3"), 2);
    assert_eq!(result.galaxy.get(&pid("p2")).map(|p| p.color.as_str()), Some("#e53e3e"));
    assert!(result.battles().all(|r| r.captured));
}

#[test]
fn attacks_from_a_captured_source_are_skipped() {
    let (a, b) = (ada(), bo());
    let galaxy = Galaxy::new(vec![
        planet("p1", 0.0, Some(&a), 7),
        planet("p2", 30.0, Some(&b), 0),
        planet("p3", 60.0, Some(&a), 1),
    ]);

    // p2 falls before its own attack on p3 is reached.
    let result = run(&galaxy, &[(&a, attack("p1", "p2", 3)), (&b, attack("p2", "p3", 1))]);

    let skipped: Vec<_> = result.skipped().collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].reason, SkipReason::NotOwner(pid("p2")));
    assert_eq!(owner(&result.galaxy, "p3"), Some(a.id.clone()));
}

// ---------------------------------------------------------------------------
// Multiple attackers
// ---------------------------------------------------------------------------

fn siege_galaxy(target_troops: u8) -> Galaxy {
    let (a, b, c) = (ada(), bo(), cy());
    Galaxy::new(vec![
        planet("a1", 0.0, Some(&a), 4),
        planet("b1", 60.0, Some(&b), 6),
        planet("t", 30.0, Some(&c), target_troops),
    ])
}

#[test]
fn siege_held_by_defender() {
    let (a, b) = (ada(), bo());
    let result = run(&siege_galaxy(10), &[(&a, attack("a1", "t", 3)), (&b, attack("b1", "t", 5))]);

    let sieges: Vec<_> = result.sieges().collect();
    assert_eq!(sieges.len(), 1);
    assert_eq!(sieges[0].total_attacking, 8);
    assert_eq!(sieges[0].outcome, MultiOutcome::Held { remaining: 2 });
    assert_eq!(owner(&result.galaxy, "t"), Some(cy().id));
    assert_eq!(troops(&result.galaxy, "t"), 2);
    assert_eq!(troops(&result.galaxy, "a1"), 1);
    assert_eq!(troops(&result.galaxy, "b1"), 1);
}

#[test]
fn siege_captured_by_largest_contributor() {
    let (a, b) = (ada(), bo());
    let result = run(&siege_galaxy(6), &[(&a, attack("a1", "t", 3)), (&b, attack("b1", "t", 5))]);

    let siege = result.sieges().next().unwrap();
    assert_eq!(siege.outcome, MultiOutcome::Captured { by: b.id.clone(), troops: 5 });
    assert_eq!(owner(&result.galaxy, "t"), Some(b.id.clone()));
    assert_eq!(troops(&result.galaxy, "t"), 5);
}

#[test]
fn siege_that_exactly_matches_neutralizes() {
    let (a, b) = (ada(), bo());
    let result = run(&siege_galaxy(8), &[(&a, attack("a1", "t", 3)), (&b, attack("b1", "t", 5))]);

    assert_eq!(result.sieges().next().unwrap().outcome, MultiOutcome::Neutralized);
    assert_eq!(owner(&result.galaxy, "t"), None);
    assert_eq!(troops(&result.galaxy, "t"), 0);
}

#[test]
fn invalid_siege_member_leaves_a_single_attack() {
    let (a, b) = (ada(), bo());
    // Bo commits everything on b1, so only Ada's attack is valid.
    let result = run(&siege_galaxy(0), &[(&a, attack("a1", "t", 3)), (&b, attack("b1", "t", 6))]);

    assert_eq!(result.sieges().count(), 0);
    assert_eq!(result.battles().count(), 1);
    assert_eq!(result.skipped().count(), 1);
    assert_eq!(owner(&result.galaxy, "t"), Some(a.id.clone()));
}

// ---------------------------------------------------------------------------
// Movement vs attack
// ---------------------------------------------------------------------------

#[test]
fn movement_into_an_attacked_planet_is_void() {
    let (a, b) = (ada(), bo());
    let galaxy = Galaxy::new(vec![
        planet("p1", 0.0, Some(&a), 5),
        planet("p2", 30.0, Some(&b), 8),
        planet("p3", 60.0, Some(&b), 4),
    ]);

    let result = run(&galaxy, &[(&b, movement("p3", "p2", 2)), (&a, attack("p1", "p2", 2))]);

    let skipped: Vec<_> = result.skipped().collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].reason, SkipReason::ContestedDestination(pid("p2")));
    assert_eq!(troops(&result.galaxy, "p3"), 4);
    assert!(!result.events.iter().any(|e| matches!(e, RoundEvent::Movement { .. })));
}

#[test]
fn even_a_rejected_attack_contests_its_target() {
    let (a, b) = (ada(), bo());
    let galaxy = Galaxy::new(vec![
        planet("p1", 0.0, Some(&a), 2),
        planet("p2", 30.0, Some(&b), 1),
        planet("p3", 60.0, Some(&b), 4),
    ]);

    let result = run(&galaxy, &[(&a, attack("p1", "p2", 2)), (&b, movement("p3", "p2", 2))]);

    assert_eq!(result.skipped().count(), 2);
    assert_eq!(troops(&result.galaxy, "p2"), 1);
    assert_eq!(troops(&result.galaxy, "p3"), 4);
}

// ---------------------------------------------------------------------------
// Entanglement
// ---------------------------------------------------------------------------

#[test]
fn two_partners_shift_by_a_fifth() {
    assert_eq!(entanglement_delta(10, 2), 2);
    assert_eq!(entanglement_delta(4, 2), 1);

    let mut source = planet("s", 0.0, None, 10);
    source.entangled_with = vec![pid("x"), pid("y")];
    let mut galaxy = Galaxy::new(vec![source, planet("x", 10.0, None, 8), planet("y", 20.0, None, 3)]);

    let shifts = apply_entanglement(&mut galaxy, &pid("s"), false);
    assert_eq!(shifts.len(), 2);
    assert_eq!(troops(&galaxy, "x"), 7);
    assert_eq!(troops(&galaxy, "y"), 2);
    assert_eq!(troops(&galaxy, "s"), 10);

    apply_entanglement(&mut galaxy, &pid("s"), true);
    assert_eq!(troops(&galaxy, "x"), 8);
    assert_eq!(troops(&galaxy, "y"), 3);
}

#[test]
fn battle_entanglement_is_reported_and_clamped() {
    let (a, b) = (ada(), bo());
    let mut source = planet("p1", 0.0, Some(&a), 7);
    source.entangled_with = vec![pid("p3")];
    let mut target = planet("p2", 30.0, Some(&b), 5);
    target.entangled_with = vec![pid("p4")];
    let galaxy = Galaxy::new(vec![
        source,
        target,
        planet("p3", 60.0, Some(&a), 8),
        planet("p4", 90.0, Some(&b), 8),
    ]);

    let result = run(&galaxy, &[(&a, attack("p1", "p2", 3))]);
    let report = result.battles().next().unwrap();

    assert_eq!(report.entanglement.len(), 2);
    for p in result.galaxy.iter() {
        assert!(p.troops <= MAX_TROOPS_PER_PLANET);
    }
    let touched = result.galaxy.get(&pid("p3")).unwrap();
    assert!(touched.entanglement_effect.is_some());
}

// ---------------------------------------------------------------------------
// Round cap
// ---------------------------------------------------------------------------

#[test]
fn rounds_stop_at_the_cap() {
    let config = GameConfig::testing();
    let a = ada();
    let galaxy = Galaxy::new(vec![planet("p1", 0.0, Some(&a), 2)]);
    let mut machine = PhaseMachine::new(&[a.clone()], &galaxy, &config);

    let mut rounds = 0;
    while !machine.is_complete() {
        for _ in 0..3 {
            machine.advance_player(&a.id).unwrap();
        }
        machine.begin_applying().unwrap();
        machine.complete_round(&galaxy, &config);
        rounds += 1;
        assert!(rounds <= config.max_rounds, "game did not end");
    }

    assert_eq!(rounds, config.max_rounds);
    assert_eq!(machine.round(), config.max_rounds + 1);
    assert!(machine.advance_player(&a.id).is_err());
}
