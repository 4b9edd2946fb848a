//! Error type for the headless runner.

use thiserror::Error;

use frontier_core::error::GameError;

use crate::scenario::ScenarioError;

/// Result type alias using [`HeadlessError`].
pub type Result<T> = std::result::Result<T, HeadlessError>;

/// Anything that ends a headless session.
#[derive(Debug, Error)]
pub enum HeadlessError {
    /// The simulation reported a fatal error (protocol, desync, replay).
    #[error(transparent)]
    Game(#[from] GameError),

    /// A scenario could not be loaded or built.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    /// Reading input or writing output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output could not be produced.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Replicas of the same scenario disagreed.
    #[error("Replicas diverged at tick {tick} after {runs} runs")]
    Diverged {
        /// First tick with differing hashes.
        tick: u64,
        /// Number of replicas compared.
        runs: u32,
    },
}
