//! Batch runs and parallel determinism checks.
//!
//! Runs many games in parallel using rayon. A batch plays one scenario under
//! a range of game ids (the game id seeds every random stream, so each id is
//! a different game). A determinism check plays the *same* game id many
//! times and compares the hash streams.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use frontier_core::hash::HashEvent;
use frontier_core::Tick;

use crate::error::{HeadlessError, Result};
use crate::protocol::winner_name;
use crate::runner::{HeadlessConfig, HeadlessRunner};
use crate::scenario::Scenario;

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario file or built-in name
    pub scenario: String,
    /// Number of games to run
    pub game_count: u32,
    /// Maximum parallel games (0 = use rayon default)
    pub parallel_games: u32,
    /// First seed; game `i` runs as `<game_id>-<seed_start + i>`
    pub seed_start: u64,
    /// Maximum ticks per game (0 = the scenario's own length)
    pub max_ticks: Tick,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: "nations".to_string(),
            game_count: 16,
            parallel_games: 0,
            seed_start: 0,
            max_ticks: 0,
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario
    pub fn new(scenario: &str, game_count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }
}

/// Outcome of one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    /// Index within the batch.
    pub game_index: u32,
    /// Game id the game ran under.
    pub game_id: String,
    /// Ticks played.
    pub ticks: Tick,
    /// Winner's name, if one was declared.
    pub winner: Option<String>,
    /// State hash after the last tick.
    pub final_hash: u64,
}

/// Error during batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Game index
    pub game_index: u32,
    /// Game id used
    pub game_id: String,
    /// Error message
    pub message: String,
}

/// Aggregate over a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Wins per player name.
    pub wins: BTreeMap<String, u32>,
    /// Games that hit the tick limit without a winner.
    pub unfinished: u32,
    /// Mean game length in ticks.
    pub average_ticks: f64,
}

impl BatchSummary {
    fn from_games(games: &[GameSummary]) -> Self {
        let mut summary = Self::default();
        for game in games {
            match &game.winner {
                Some(name) => *summary.wins.entry(name.clone()).or_default() += 1,
                None => summary.unfinished += 1,
            }
        }
        if !games.is_empty() {
            let total: Tick = games.iter().map(|g| g.ticks).sum();
            summary.average_ticks = total as f64 / games.len() as f64;
        }
        summary
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual games, in index order
    pub games: Vec<GameSummary>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }

    /// Default results path inside an output directory.
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join("batch_results.json")
    }
}

fn run_game(scenario: &Scenario, game_id: &str, max_ticks: Tick) -> Result<(GameSummary, Vec<HashEvent>)> {
    let start = scenario.start_info_with_id(game_id)?;
    let mut runner = HeadlessRunner::with_config(start, HeadlessConfig::default())?;
    let turns = scenario.scripted_turns()?;
    let hashes = runner.play_script(&turns, max_ticks)?;
    let game = runner.game();
    let summary = GameSummary {
        game_index: 0,
        game_id: game_id.to_string(),
        ticks: game.tick(),
        winner: winner_name(game),
        final_hash: game.state_hash()?,
    };
    Ok((summary, hashes))
}

fn with_pool<T: Send>(threads: u32, job: impl FnOnce() -> T + Send) -> Result<T> {
    if threads == 0 {
        return Ok(job());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads as usize)
        .build()
        .map_err(|e| HeadlessError::Io(std::io::Error::other(e)))?;
    Ok(pool.install(job))
}

/// Run a batch of games in parallel.
///
/// Failures of single games are collected in [`BatchResults::errors`]; only
/// a scenario that cannot be loaded fails the whole batch.
pub fn run_batch(config: BatchConfig) -> Result<BatchResults> {
    let scenario = Scenario::resolve(&config.scenario)?;
    let max_ticks = if config.max_ticks == 0 {
        scenario.ticks
    } else {
        config.max_ticks
    };
    let started = Instant::now();
    info!(
        scenario = %scenario.name,
        games = config.game_count,
        max_ticks,
        "Starting batch"
    );

    let outcomes: Vec<_> = with_pool(config.parallel_games, || {
        (0..config.game_count)
            .into_par_iter()
            .map(|index| {
                let game_id = format!("{}-{}", scenario.game_id, config.seed_start + u64::from(index));
                let outcome = run_game(&scenario, &game_id, max_ticks);
                debug!(game_id = %game_id, ok = outcome.is_ok(), "Game finished");
                (index, game_id, outcome)
            })
            .collect()
    })?;

    let mut games = Vec::new();
    let mut errors = Vec::new();
    for (game_index, game_id, outcome) in outcomes {
        match outcome {
            Ok((summary, _)) => games.push(GameSummary {
                game_index,
                ..summary
            }),
            Err(e) => {
                warn!(game_id = %game_id, error = %e, "Game failed");
                errors.push(BatchError {
                    game_index,
                    game_id,
                    message: e.to_string(),
                });
            }
        }
    }

    let summary = BatchSummary::from_games(&games);
    let results = BatchResults {
        config,
        games,
        summary,
        duration_seconds: started.elapsed().as_secs_f64(),
        errors,
    };
    info!(
        completed = results.games.len(),
        failed = results.errors.len(),
        duration_secs = results.duration_seconds,
        "Batch finished"
    );
    Ok(results)
}

/// Outcome of a parallel determinism check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterminismReport {
    /// Game id every replica ran under.
    pub game_id: String,
    /// Number of replicas.
    pub runs: u32,
    /// Ticks played by each replica.
    pub ticks: Tick,
    /// Hash events each replica produced.
    pub hashes_compared: usize,
    /// Final state hash shared by all replicas.
    pub final_hash: u64,
}

/// Run `runs` replicas of a scenario in parallel and compare their hash
/// streams and final hashes.
///
/// # Errors
///
/// Returns [`HeadlessError::Diverged`] with the first tick at which any
/// replica's hash differs from the first replica's, or the error of the
/// first replica that failed to run.
pub fn verify_determinism(scenario: &Scenario, game_id: &str, runs: u32) -> Result<DeterminismReport> {
    let runs = runs.max(2);
    info!(game_id, runs, ticks = scenario.ticks, "Verifying determinism");

    let outcomes: Vec<_> = (0..runs)
        .into_par_iter()
        .map(|_| run_game(scenario, game_id, scenario.ticks))
        .collect();
    let outcomes = outcomes.into_iter().collect::<Result<Vec<_>>>()?;

    let (reference, reference_hashes) = &outcomes[0];
    for (summary, hashes) in &outcomes[1..] {
        if let Some(tick) = first_divergence(reference_hashes, hashes) {
            warn!(game_id, tick, "Replicas diverged");
            return Err(HeadlessError::Diverged { tick, runs });
        }
        if summary.final_hash != reference.final_hash || summary.ticks != reference.ticks {
            warn!(game_id, tick = summary.ticks, "Final states differ");
            return Err(HeadlessError::Diverged {
                tick: summary.ticks.min(reference.ticks),
                runs,
            });
        }
    }

    Ok(DeterminismReport {
        game_id: game_id.to_string(),
        runs,
        ticks: reference.ticks,
        hashes_compared: reference_hashes.len(),
        final_hash: reference.final_hash,
    })
}

fn first_divergence(a: &[HashEvent], b: &[HashEvent]) -> Option<Tick> {
    a.iter()
        .zip(b)
        .find(|(x, y)| x != y)
        .map(|(x, y)| x.tick.min(y.tick))
        .or_else(|| match a.len().cmp(&b.len()) {
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Less => Some(b[a.len()].tick),
            std::cmp::Ordering::Greater => Some(a[b.len()].tick),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT_DUEL: &str = r##"(
        name: "Short duel",
        game_id: "duel",
        config: (spawn_phase_ticks: 10),
        map: Land(width: 24, height: 16),
        players: [
            (name: "alice", kind: Human, client_id: Some("client-a")),
            (name: "bob", kind: Human, client_id: Some("client-b")),
        ],
        turns: [
            r#"{"turnNumber":0,"intents":[{"type":"spawn","clientID":"client-a","tile":101},{"type":"spawn","clientID":"client-b","tile":114}]}"#,
            r#"{"turnNumber":12,"intents":[{"type":"attack","clientID":"client-a","targetID":null,"troops":800}]}"#,
        ],
        ticks: 60,
    )"##;

    fn short_duel() -> Scenario {
        Scenario::from_ron_str(SHORT_DUEL).unwrap()
    }

    #[test]
    fn test_replicas_agree() {
        let report = verify_determinism(&short_duel(), "abc123", 4).unwrap();
        assert_eq!(report.runs, 4);
        assert_eq!(report.ticks, 60);
        // Hash interval 10: ticks 0, 10, ..., 50.
        assert_eq!(report.hashes_compared, 6);
    }

    #[test]
    fn test_first_divergence() {
        let a = [HashEvent { tick: 0, hash: 1 }, HashEvent { tick: 10, hash: 2 }];
        let b = [HashEvent { tick: 0, hash: 1 }, HashEvent { tick: 10, hash: 3 }];
        assert_eq!(first_divergence(&a, &a), None);
        assert_eq!(first_divergence(&a, &b), Some(10));
        assert_eq!(first_divergence(&a[..1], &a), Some(10));
    }

    #[test]
    fn test_batch_runs_every_seed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("duel.ron");
        std::fs::write(&path, SHORT_DUEL).unwrap();

        let config = BatchConfig {
            parallel_games: 2,
            ..BatchConfig::new(path.to_str().unwrap(), 3).with_seed(7)
        };
        let results = run_batch(config).unwrap();
        assert!(results.errors.is_empty());
        assert_eq!(results.games.len(), 3);
        assert_eq!(results.games[0].game_id, "duel-7");
        assert_eq!(results.games[2].game_id, "duel-9");
        assert!(results.games.iter().all(|g| g.ticks == 60));
        assert_eq!(results.summary.unfinished, 3);

        let out = BatchResults::path_in(dir.path());
        results.save(&out).unwrap();
        assert_eq!(BatchResults::load(&out).unwrap().games, results.games);
    }

    #[test]
    fn test_unknown_scenario_fails_batch() {
        assert!(run_batch(BatchConfig::new("no-such-scenario", 2)).is_err());
    }
}
