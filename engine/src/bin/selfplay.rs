//! Self-play game generation CLI.
//!
//! Plays quantum conquest games between random agents and outputs one JSON
//! record per game.
//!
//! Usage:
//!   cargo run --release --bin selfplay -- [OPTIONS]
//!
//! Options:
//!   --games N        Number of games to play (default: 10)
//!   --players N      Players per game, 1-6 (default: 4)
//!   --neutral N      Neutral planets per map (default: 8)
//!   --rounds N       Rounds per game (default: 2)
//!   --aggression P   Attack probability per planet (default: 0.6)
//!   --threads N      Number of parallel threads (default: 4)
//!   --seed N         Random seed, 0 for entropy (default: 0)
//!   --config FILE    Game rules as JSON (default: short test rules)
//!   --output FILE    Output file path (default: stdout)
//!   --quiet          Suppress summary output

use std::env;
use std::fs::File;
use std::io::{self, BufWriter};
use std::process;
use std::str::FromStr;
use std::time::Instant;

use quantum_conquest::config::GameConfig;
use quantum_conquest::selfplay::{self, SelfPlayConfig};

fn value<T: FromStr>(args: &[String], i: usize, flag: &str) -> T {
    match args.get(i).map(|s| s.parse()) {
        Some(Ok(v)) => v,
        _ => {
            eprintln!("invalid {flag} value");
            print_usage();
            process::exit(1);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let mut config = SelfPlayConfig::default();
    let mut output_path: Option<String> = None;
    let mut rounds: Option<u32> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--games" => {
                i += 1;
                config.num_games = value(&args, i, "--games");
            }
            "--players" => {
                i += 1;
                config.players = value(&args, i, "--players");
            }
            "--neutral" => {
                i += 1;
                config.neutral_planets = value(&args, i, "--neutral");
            }
            "--rounds" => {
                i += 1;
                rounds = Some(value(&args, i, "--rounds"));
            }
            "--aggression" => {
                i += 1;
                config.aggression = value(&args, i, "--aggression");
            }
            "--threads" => {
                i += 1;
                config.threads = value(&args, i, "--threads");
            }
            "--seed" => {
                i += 1;
                config.seed = value(&args, i, "--seed");
            }
            "--config" => {
                i += 1;
                let path: String = value(&args, i, "--config");
                config.game = match GameConfig::load(&path) {
                    Ok(game) => game,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to load config");
                        process::exit(1);
                    }
                };
            }
            "--output" => {
                i += 1;
                output_path = Some(value(&args, i, "--output"));
            }
            "--quiet" => {
                config.quiet = true;
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    if let Some(rounds) = rounds {
        config.game.max_rounds = rounds;
    }
    if !(1..=6).contains(&config.players) || !(0.0..=1.0).contains(&config.aggression) {
        eprintln!("--players must be 1-6 and --aggression 0.0-1.0");
        process::exit(1);
    }
    if let Err(e) = config.game.validate() {
        tracing::error!(error = %e, "invalid game rules");
        process::exit(1);
    }

    if !config.quiet {
        tracing::info!(
            "Self-play: {} games, {} players, {} neutral planets, {} rounds, {} threads",
            config.num_games,
            config.players,
            config.neutral_planets,
            config.game.max_rounds,
            config.threads
        );
    }

    let start = Instant::now();
    let games = match selfplay::run_self_play(&config) {
        Ok(games) => games,
        Err(e) => {
            tracing::error!(error = %e, "self-play failed");
            process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    if !config.quiet {
        tracing::info!(
            "Completed {} games in {:.1}s ({:.1} games/hour)",
            games.len(),
            elapsed.as_secs_f64(),
            games.len() as f64 / elapsed.as_secs_f64().max(f64::EPSILON) * 3600.0
        );
        selfplay::print_summary(&games);
    }

    let written = match &output_path {
        Some(path) => File::create(path).and_then(|file| {
            let mut writer = BufWriter::new(file);
            selfplay::write_jsonl(&games, &mut writer)
        }),
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            selfplay::write_jsonl(&games, &mut writer)
        }
    };
    match (written, output_path) {
        (Err(e), _) => {
            tracing::error!(error = %e, "failed to write output");
            process::exit(1);
        }
        (Ok(()), Some(path)) if !config.quiet => {
            tracing::info!("Wrote {} games to {}", games.len(), path);
        }
        _ => {}
    }
}

fn print_usage() {
    eprintln!("Usage: selfplay [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --games N        Number of games to play (default: 10)");
    eprintln!("  --players N      Players per game, 1-6 (default: 4)");
    eprintln!("  --neutral N      Neutral planets per map (default: 8)");
    eprintln!("  --rounds N       Rounds per game (default: 2)");
    eprintln!("  --aggression P   Attack probability per planet (default: 0.6)");
    eprintln!("  --threads N      Number of parallel threads (default: 4)");
    eprintln!("  --seed N         Random seed, 0 for entropy (default: 0)");
    eprintln!("  --config FILE    Game rules as JSON (default: short test rules)");
    eprintln!("  --output FILE    Output file path (default: stdout)");
    eprintln!("  --quiet          Suppress summary output");
    eprintln!("  --help           Show this help");
}
