//! Error types for the game simulation.
//!
//! Only failures that must end a session surface as [`GameError`]. Invalid
//! player actions never do: they become no-op executions and a log line.

use thiserror::Error;

use crate::Tick;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// A turn or intent could not be decoded (unknown intent kind, bad shape).
    ///
    /// Indicates a protocol/version mismatch between replicas. Fatal.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A turn arrived for a tick other than the next one.
    #[error("Turn out of order: expected turn {expected}, got {received}")]
    TurnOutOfOrder {
        /// Turn number the simulation expected.
        expected: Tick,
        /// Turn number that was received.
        received: Tick,
    },

    /// Failed to parse a configuration file.
    #[error("Failed to parse config '{path}': {message}")]
    ConfigParse {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Failed to parse a terrain map.
    #[error("Invalid map: {0}")]
    MapParse(String),

    /// Player referenced by a setup structure does not exist.
    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Replay file could not be read, written or verified.
    #[error("Replay error: {0}")]
    Replay(String),

    /// Desync detected in multiplayer.
    #[error("Desync detected at tick {tick}: local hash {local_hash}, remote hash {remote_hash}")]
    DesyncDetected {
        /// Tick where desync occurred.
        tick: Tick,
        /// Local simulation hash.
        local_hash: u64,
        /// Remote simulation hash.
        remote_hash: u64,
    },
}

impl GameError {
    /// Whether this error must end the session for the local replica.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Protocol(_) | Self::TurnOutOfOrder { .. } | Self::DesyncDetected { .. }
        )
    }
}
