//! Error type for the lockstep host.

use thiserror::Error;

use frontier_core::error::GameError;

/// Result type alias using [`ServerError`].
pub type Result<T> = std::result::Result<T, ServerError>;

/// Anything that ends a session.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The host replica failed: protocol error, desync or bad start info.
    #[error(transparent)]
    Game(#[from] GameError),

    /// Server configuration could not be loaded.
    #[error("Failed to load server config '{path}': {message}")]
    Config {
        /// Config file path.
        path: String,
        /// Error message.
        message: String,
    },

    /// The simulation thread could not be started.
    #[error("Failed to start simulation thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The simulation thread is gone.
    #[error("Simulation host closed")]
    HostClosed,

    /// The simulation thread panicked.
    #[error("Simulation thread panicked")]
    WorkerPanicked,
}
