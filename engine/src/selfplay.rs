//! Self-play game generation.
//!
//! Plays complete games between random agents through the real session and
//! an in-memory store. Every round is checked against the troop cap and
//! summarized; finished games are written as JSONL.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::board::{
    GamePhase, PlanetId, PlanetTemplate, Player, PlayerId, Position, MAX_TROOPS_PER_PLANET,
};
use crate::config::GameConfig;
use crate::error::{Result, SessionError};
use crate::session::GameSession;
use crate::store::{GameStore, MemoryStore};

/// Distance between neighboring grid planets; diagonals stay within the
/// default attack range.
const GRID_SPACING: f64 = 50.0;

const PLAYER_COLORS: [&str; 6] = [
    "#e53e3e", "#3182ce", "#38a169", "#d69e2e", "#805ad5", "#dd6b20",
];

/// Configuration for self-play game generation.
#[derive(Debug, Clone)]
pub struct SelfPlayConfig {
    /// Number of games to play.
    pub num_games: usize,
    /// Players per game (at most six).
    pub players: usize,
    /// Neutral planets added to the map on top of the owned ones.
    pub neutral_planets: usize,
    /// Probability that an agent attacks from a planet that can.
    pub aggression: f64,
    /// Probability that an agent moves troops out of a planet that can.
    pub mobility: f64,
    /// Number of parallel threads for concurrent games.
    pub threads: usize,
    /// Random seed (0 = use entropy).
    pub seed: u64,
    /// Suppress per-game progress output.
    pub quiet: bool,
    /// Rules for every game.
    pub game: GameConfig,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        SelfPlayConfig {
            num_games: 10,
            players: 4,
            neutral_planets: 8,
            aggression: 0.6,
            mobility: 0.3,
            threads: 4,
            seed: 0,
            quiet: false,
            game: GameConfig {
                planets_per_player: 4,
                ..GameConfig::testing()
            },
        }
    }
}

/// Standing of one player after a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub planets: usize,
    pub troops: u32,
}

/// A single executed round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    pub actions: usize,
    pub battles: usize,
    pub captures: usize,
    pub sieges: usize,
    pub skipped: usize,
    pub standings: BTreeMap<PlayerId, Standing>,
}

/// A complete self-play game record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: usize,
    pub seed: u32,
    pub rounds: Vec<RoundRecord>,
    /// Player holding the most planets at the end; `None` on a tie.
    pub winner: Option<PlayerId>,
    /// Planets found above the cap after a round. Always zero.
    pub cap_violations: usize,
}

/// `count` planets on a square grid, `GRID_SPACING` apart.
pub fn grid_template(count: usize) -> Vec<PlanetTemplate> {
    let cols = (count as f64).sqrt().ceil().max(1.0) as usize;
    (0..count)
        .map(|i| {
            let (row, col) = (i / cols, i % cols);
            PlanetTemplate::new(
                format!("planet-{i}"),
                format!("Planet {i}"),
                Position::new(col as f64 * GRID_SPACING, row as f64 * GRID_SPACING, 0.0),
            )
        })
        .collect()
}

fn new_session(config: &SelfPlayConfig, game_id: usize, seed: u32) -> Result<GameSession> {
    let game = &config.game;
    let planets = config.players * game.planets_per_player + config.neutral_planets;
    let store = Arc::new(MemoryStore::new().with_template(
        &game.map_name,
        game.map_version,
        grid_template(planets),
    ));
    let id = format!("selfplay-{game_id}");
    for (i, color) in PLAYER_COLORS.iter().enumerate().take(config.players) {
        let player = Player::new(format!("agent-{i}"), format!("Agent {i}"), *color);
        store.upsert_player(&id, &player)?;
    }
    let mut session = GameSession::new(id, seed, game.clone(), store);
    session.start()?;
    Ok(session)
}

/// Spends the whole fortify budget one troop at a time on random owned
/// planets, skipping full ones.
fn fortify(session: &mut GameSession, player: &PlayerId, rng: &mut SmallRng) -> Result<()> {
    loop {
        let remaining = session.turn(player).map_or(0, |t| t.remaining());
        let open: Vec<PlanetId> = session
            .view()
            .iter()
            .filter(|p| p.is_owned_by(player) && p.capacity_left() > 0)
            .map(|p| p.id.clone())
            .collect();
        let Some(planet) = open.choose(rng) else {
            break;
        };
        if remaining == 0 {
            break;
        }
        session.place_troops(player, planet, 1)?;
    }
    session.ready_for_next_phase(player)?;
    Ok(())
}

/// Owned planets with at least two troops, each paired with the planets in
/// range that `keep` accepts.
fn options(
    session: &GameSession,
    player: &PlayerId,
    keep: impl Fn(&crate::board::Planet) -> bool,
) -> Vec<(PlanetId, Vec<PlanetId>)> {
    let view = session.view();
    let range = session.config().attack_range;
    view.iter()
        .filter(|p| p.is_owned_by(player) && p.troops >= 2)
        .map(|from| {
            let targets: Vec<PlanetId> = view
                .iter()
                .filter(|to| to.id != from.id && keep(to))
                .filter(|to| from.position.within_range(&to.position, range))
                .map(|to| to.id.clone())
                .collect();
            (from.id.clone(), targets)
        })
        .filter(|(_, targets)| !targets.is_empty())
        .collect()
}

fn attack(session: &mut GameSession, player: &PlayerId, config: &SelfPlayConfig, rng: &mut SmallRng) -> Result<usize> {
    let mut actions = 0;
    for (from, targets) in options(session, player, |p| !p.is_owned_by(player)) {
        if !rng.gen_bool(config.aggression) {
            continue;
        }
        // Earlier attacks can drain or lose this planet.
        let troops = match session.view().get(&from) {
            Some(p) if p.is_owned_by(player) && p.troops >= 2 => p.troops,
            _ => continue,
        };
        let Some(to) = targets.choose(rng) else {
            continue;
        };
        if session.view().get(to).is_some_and(|p| p.is_owned_by(player)) {
            continue;
        }
        let committed = rng.gen_range(1..troops);
        session.attack(player, &from, to, committed)?;
        actions += 1;
    }
    session.ready_for_next_phase(player)?;
    Ok(actions)
}

fn movement(session: &mut GameSession, player: &PlayerId, config: &SelfPlayConfig, rng: &mut SmallRng) -> Result<usize> {
    let mut actions = 0;
    for (from, targets) in options(session, player, |p| p.is_owned_by(player) && p.troops < MAX_TROOPS_PER_PLANET) {
        if !rng.gen_bool(config.mobility) {
            continue;
        }
        let troops = session.view().get(&from).map_or(0, |p| p.troops);
        let Some(to) = targets.choose(rng) else {
            continue;
        };
        if troops < 2 {
            continue;
        }
        session.move_troops(player, &from, to, rng.gen_range(1..troops))?;
        actions += 1;
    }
    session.ready_for_next_phase(player)?;
    Ok(actions)
}

fn standings(session: &GameSession) -> BTreeMap<PlayerId, Standing> {
    let galaxy = session.committed();
    session
        .players()
        .iter()
        .filter(|p| p.is_active())
        .map(|p| {
            let standing = Standing {
                planets: galaxy.owned_count(&p.id),
                troops: galaxy.troops_of(&p.id),
            };
            (p.id.clone(), standing)
        })
        .collect()
}

fn leader(standings: &BTreeMap<PlayerId, Standing>) -> Option<PlayerId> {
    let best = standings.values().map(|s| s.planets).max()?;
    let mut leaders = standings.iter().filter(|(_, s)| s.planets == best);
    match (leaders.next(), leaders.next()) {
        (Some((id, _)), None) => Some(id.clone()),
        _ => None,
    }
}

pub fn play_game(config: &SelfPlayConfig, game_id: usize, rng: &mut SmallRng) -> Result<GameRecord> {
    let seed: u32 = rng.gen();
    let mut session = new_session(config, game_id, seed)?;
    let players: Vec<PlayerId> = session
        .players()
        .iter()
        .filter(|p| p.is_active())
        .map(|p| p.id.clone())
        .collect();
    let mut rounds = Vec::new();
    let mut cap_violations = 0;

    while session.phase() != GamePhase::GameComplete {
        let mut actions = 0;
        for player in &players {
            fortify(&mut session, player, rng)?;
        }
        for player in &players {
            actions += attack(&mut session, player, config, rng)?;
        }
        for player in &players {
            actions += movement(&mut session, player, config, rng)?;
        }

        let round = session.round();
        let outcome = session.execute_round(round)?;
        let resolution = &outcome.resolution;

        let over_cap = resolution
            .galaxy
            .iter()
            .filter(|p| p.troops > MAX_TROOPS_PER_PLANET)
            .count();
        if over_cap > 0 {
            tracing::error!(game_id, round, over_cap, "troop cap violated");
        }
        cap_violations += over_cap;

        rounds.push(RoundRecord {
            round,
            actions,
            battles: resolution.battles().count(),
            captures: resolution.battles().filter(|b| b.captured).count(),
            sieges: resolution.sieges().count(),
            skipped: resolution.skipped().count(),
            standings: standings(&session),
        });
    }

    let winner = rounds.last().and_then(|r| leader(&r.standings));
    Ok(GameRecord {
        game_id,
        seed,
        rounds,
        winner,
        cap_violations,
    })
}

fn log_game(config: &SelfPlayConfig, n: usize, game: &GameRecord, started: Instant) {
    if config.quiet {
        return;
    }
    let outcome = match &game.winner {
        Some(w) => format!("{w} leads"),
        None => "tie".to_string(),
    };
    tracing::info!(
        "Game {}/{}: {} after {} rounds ({:.1}s)",
        n,
        config.num_games,
        outcome,
        game.rounds.len(),
        started.elapsed().as_secs_f64()
    );
}

pub fn run_self_play(config: &SelfPlayConfig) -> Result<Vec<GameRecord>> {
    let mut games = Vec::with_capacity(config.num_games);
    run_self_play_with_callback(config, |game| games.push(game))?;
    games.sort_by_key(|g| g.game_id);
    Ok(games)
}

pub fn run_self_play_with_callback<F>(config: &SelfPlayConfig, on_game: F) -> Result<()>
where
    F: FnMut(GameRecord) + Send,
{
    if config.threads > 1 {
        run_self_play_parallel(config, on_game)
    } else {
        run_self_play_sequential(config, on_game)
    }
}

fn run_self_play_sequential<F>(config: &SelfPlayConfig, mut on_game: F) -> Result<()>
where
    F: FnMut(GameRecord),
{
    let mut rng = if config.seed != 0 {
        SmallRng::seed_from_u64(config.seed)
    } else {
        SmallRng::from_entropy()
    };

    for i in 0..config.num_games {
        let started = Instant::now();
        let game = play_game(config, i, &mut rng)?;
        log_game(config, i + 1, &game, started);
        on_game(game);
    }
    Ok(())
}

fn run_self_play_parallel<F>(config: &SelfPlayConfig, mut on_game: F) -> Result<()>
where
    F: FnMut(GameRecord) + Send,
{
    use rayon::prelude::*;

    let completed = AtomicUsize::new(0);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| SessionError::Config(crate::error::ConfigError::Invalid(e.to_string())))?;

    let games: Vec<Result<GameRecord>> = pool.install(|| {
        (0..config.num_games)
            .into_par_iter()
            .map(|i| {
                let mut rng = if config.seed != 0 {
                    SmallRng::seed_from_u64(config.seed.wrapping_add(i as u64))
                } else {
                    SmallRng::from_entropy()
                };
                let started = Instant::now();
                let game = play_game(config, i, &mut rng)?;
                let n = completed.fetch_add(1, Ordering::Relaxed) + 1;
                log_game(config, n, &game, started);
                Ok(game)
            })
            .collect()
    });

    for game in games {
        on_game(game?);
    }
    Ok(())
}

/// Writes game records as JSONL (one JSON object per game, one per line).
pub fn write_jsonl<W: Write>(games: &[GameRecord], out: &mut W) -> std::io::Result<()> {
    for game in games {
        serde_json::to_writer(&mut *out, game)?;
        writeln!(out)?;
    }
    out.flush()
}

/// Logs a summary of self-play results.
pub fn print_summary(games: &[GameRecord]) {
    let total = games.len().max(1) as f64;
    let rounds: usize = games.iter().map(|g| g.rounds.len()).sum();
    let battles: usize = games.iter().flat_map(|g| &g.rounds).map(|r| r.battles).sum();
    let captures: usize = games.iter().flat_map(|g| &g.rounds).map(|r| r.captures).sum();
    let skipped: usize = games.iter().flat_map(|g| &g.rounds).map(|r| r.skipped).sum();
    let violations: usize = games.iter().map(|g| g.cap_violations).sum();

    let mut wins: BTreeMap<&PlayerId, usize> = BTreeMap::new();
    let mut ties = 0usize;
    for game in games {
        match &game.winner {
            Some(w) => *wins.entry(w).or_default() += 1,
            None => ties += 1,
        }
    }

    tracing::info!("=== Self-Play Summary ===");
    tracing::info!("Games: {}", games.len());
    tracing::info!("Avg rounds/game: {:.1}", rounds as f64 / total);
    tracing::info!("Battles: {} ({} captures)", battles, captures);
    tracing::info!("Skipped actions: {}", skipped);
    tracing::info!("Troop cap violations: {}", violations);
    tracing::info!("Ties: {}", ties);
    for (player, count) in wins {
        tracing::info!("  {:>8}: {} ({:.1}%)", player, count, 100.0 * count as f64 / total);
    }
}
