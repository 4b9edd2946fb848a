//! Headless Frontier runner.
//!
//! This binary runs games without graphics or network, controlled via JSON
//! on stdin/stdout or by scenario scripts. Designed for CI determinism
//! checks, replay verification and AI balance runs.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p frontier_headless
//!
//! # Play a scenario script, streaming hash events
//! cargo run -p frontier_headless -- play duel --record duel.replay
//!
//! # Run the same game on 8 replicas and compare hashes
//! cargo run -p frontier_headless -- verify duel --runs 8
//!
//! # Verify a recorded game
//! cargo run -p frontier_headless -- replay duel.replay --verify
//!
//! # Run a batch of AI games under different game ids
//! cargo run -p frontier_headless -- batch nations --count 64 --output results/
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use frontier_core::replay::{Replay, ReplayPlayer};
use frontier_core::Tick;
use frontier_headless::{
    batch::{run_batch, verify_determinism, BatchConfig, BatchResults},
    protocol::Response,
    runner::{HeadlessConfig, HeadlessRunner},
    scenario::Scenario,
    HeadlessError,
};

#[derive(Parser)]
#[command(name = "frontier_headless")]
#[command(about = "Headless Frontier runner for determinism checks, replays and AI batches")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive game driven by JSON lines on stdin
    Run {
        /// Scenario file or built-in name providing the setup
        #[arg(short, long, default_value = "duel")]
        scenario: String,

        /// Output a state line after every tick command
        #[arg(long)]
        auto_state: bool,

        /// Stream only hash events, not tick events
        #[arg(long)]
        hashes_only: bool,
    },

    /// Play a scenario's turn script and stream hash events to stdout
    Play {
        /// Scenario file or built-in name
        scenario: String,

        /// Override the number of ticks to play
        #[arg(short, long)]
        ticks: Option<Tick>,

        /// Also stream tick events, not just hashes
        #[arg(long)]
        events: bool,

        /// Write a replay file when done
        #[arg(short, long)]
        record: Option<PathBuf>,
    },

    /// Verify determinism by running the same game on several replicas
    Verify {
        /// Scenario file or built-in name
        scenario: String,

        /// Game id (defaults to the scenario's)
        #[arg(short, long)]
        game_id: Option<String>,

        /// Number of replicas
        #[arg(short, long, default_value = "4")]
        runs: u32,
    },

    /// Replay a recorded game
    Replay {
        /// Replay file path
        file: PathBuf,

        /// Verify replay produces identical hash
        #[arg(long)]
        verify: bool,
    },

    /// Run a batch of games under consecutive game ids
    Batch {
        /// Scenario file or built-in name
        #[arg(default_value = "nations")]
        scenario: String,

        /// Number of games to run
        #[arg(short, long, default_value = "16")]
        count: u32,

        /// Number of parallel games (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// First seed appended to the game id
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Tick limit per game (0 = the scenario's own length)
        #[arg(long, default_value = "0")]
        max_ticks: Tick,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for protocol lines
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Some(Commands::Run {
            scenario,
            auto_state,
            hashes_only,
        }) => cmd_run(&scenario, auto_state, hashes_only),
        Some(Commands::Play {
            scenario,
            ticks,
            events,
            record,
        }) => cmd_play(&scenario, ticks, events, record),
        Some(Commands::Verify {
            scenario,
            game_id,
            runs,
        }) => cmd_verify(&scenario, game_id, runs),
        Some(Commands::Replay { file, verify }) => cmd_replay(&file, verify),
        Some(Commands::Batch {
            scenario,
            count,
            parallel,
            seed,
            max_ticks,
            output,
        }) => cmd_batch(scenario, count, parallel, seed, max_ticks, &output),
        None => {
            // Default: interactive mode
            cmd_run("duel", false, false)
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Fatal");
        eprintln!("FATAL: {e}");
        std::process::exit(1);
    }
}

/// Run a single interactive game
fn cmd_run(scenario: &str, auto_state: bool, hashes_only: bool) -> Result<(), HeadlessError> {
    let scenario = Scenario::resolve(scenario)?;
    let config = HeadlessConfig {
        auto_state_output: auto_state,
        hashes_only,
    };
    let mut runner = HeadlessRunner::from_scenario(&scenario, config)?;
    let stdin = io::stdin();
    runner.run(stdin.lock(), io::stdout().lock())
}

/// Play a scenario script
fn cmd_play(
    scenario: &str,
    ticks: Option<Tick>,
    events: bool,
    record: Option<PathBuf>,
) -> Result<(), HeadlessError> {
    let scenario = Scenario::resolve(scenario)?;
    let ticks = ticks.unwrap_or(scenario.ticks);
    let turns = scenario.scripted_turns()?;
    tracing::info!(scenario = %scenario.name, ticks, turns = turns.len(), "Playing scenario");

    let mut runner = HeadlessRunner::from_scenario(&scenario, HeadlessConfig::default())?;
    let mut out = io::stdout().lock();
    runner.play_script_with(&turns, ticks, |output| {
        for line in Response::from_tick_output(output) {
            if events || matches!(line, Response::Hash { .. }) {
                out.write_all(line.to_json_line().as_bytes())?;
            }
        }
        Ok(())
    })?;
    out.flush()?;

    let replay = runner.finished_replay()?;
    eprintln!(
        "Finished at tick {} with hash {:016x}",
        replay.final_tick, replay.final_hash
    );
    if let Some(path) = record {
        replay.save(&path)?;
        eprintln!("Replay saved to {}", path.display());
    }
    Ok(())
}

/// Verify determinism
fn cmd_verify(scenario: &str, game_id: Option<String>, runs: u32) -> Result<(), HeadlessError> {
    let scenario = Scenario::resolve(scenario)?;
    let game_id = game_id.unwrap_or_else(|| scenario.game_id.clone());
    match verify_determinism(&scenario, &game_id, runs) {
        Ok(report) => {
            eprintln!(
                "PASS: All {} runs produced identical results ({} hashes, final {:016x})",
                report.runs, report.hashes_compared, report.final_hash
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("FAIL: Non-determinism detected!");
            Err(e)
        }
    }
}

/// Replay a recorded game
fn cmd_replay(file: &Path, verify: bool) -> Result<(), HeadlessError> {
    if verify {
        tracing::info!("Verifying replay: {}", file.display());
    } else {
        tracing::info!("Playing replay: {}", file.display());
    }

    let replay = Replay::load(file)?;
    eprintln!("Loaded replay:");
    eprintln!("  Game: {}", replay.start.game_id);
    eprintln!("  Players: {}", replay.start.players.len());
    eprintln!("  Turns: {}", replay.turn_count());
    eprintln!("  Duration: {} ticks", replay.duration());

    let mut player = ReplayPlayer::new(replay)?;

    if verify {
        eprintln!("Verifying replay...");
        match player.verify() {
            Ok(()) => {
                eprintln!("PASS: Replay verification successful");
                eprintln!("  Hash: {:016x}", player.replay().final_hash);
                Ok(())
            }
            Err(e) => {
                eprintln!("FAIL: Replay produced different hash!");
                Err(e.into())
            }
        }
    } else {
        let mut last_percent = 0;
        while player.advance()? {
            let percent = player.progress_percent();
            if percent > last_percent && percent % 10 == 0 {
                eprintln!("Progress: {percent}%");
                last_percent = percent;
            }
        }

        let game = player.game();
        eprintln!("Replay complete at tick {}", game.tick());
        eprintln!("Final state hash: {:016x}", game.state_hash()?);
        println!("{}", Response::state(game).to_json_line().trim_end());
        Ok(())
    }
}

/// Run batch of games
fn cmd_batch(
    scenario: String,
    count: u32,
    parallel: u32,
    seed: u64,
    max_ticks: Tick,
    output: &Path,
) -> Result<(), HeadlessError> {
    std::fs::create_dir_all(output)?;

    let config = BatchConfig {
        scenario,
        game_count: count,
        parallel_games: parallel,
        seed_start: seed,
        max_ticks,
    };
    let results = run_batch(config)?;
    let results_path = BatchResults::path_in(output);
    results.save(&results_path)?;

    // Print summary
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Games played: {}", results.games.len());
    if !results.errors.is_empty() {
        eprintln!("Games FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!("Average length: {:.0} ticks", results.summary.average_ticks);
    eprintln!("Unfinished: {}", results.summary.unfinished);
    eprintln!("\nWins:");
    for (name, wins) in &results.summary.wins {
        eprintln!("  {name}: {wins}");
    }

    if !results.errors.is_empty() {
        eprintln!("\nGAME FAILURES:");
        for error in results.errors.iter().take(10) {
            eprintln!("  Game {} ({}): {}", error.game_index, error.game_id, error.message);
        }
        if results.errors.len() > 10 {
            eprintln!("  ... and {} more failures", results.errors.len() - 10);
        }
    }

    eprintln!("\nResults saved to: {}", results_path.display());
    Ok(())
}
