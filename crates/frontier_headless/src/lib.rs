//! Headless lockstep runner for scripted games and CI verification.
//!
//! This crate drives a [`frontier_core::game::Game`] without any client
//! attached. It enables:
//!
//! - **Scripted play**: Run a scenario's turn script and stream hash events
//! - **Interactive control**: Feed turns over stdin, one JSON object per line
//! - **Determinism checks**: Run many replicas in parallel and compare hashes
//! - **Replay verification**: Check that a replay reproduces its final hash
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from the controller (turn, tick, state, etc.)
//! - **stdout**: Responses, tick events and hash events (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See [`protocol`] for every command and response.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"tick","count":60}' | cargo run -p frontier_headless
//!
//! # Play a scenario script and record it
//! cargo run -p frontier_headless -- play scenarios/duel.ron --record duel.replay
//!
//! # Verify the recording
//! cargo run -p frontier_headless -- replay duel.replay --verify
//! ```

pub mod batch;
pub mod error;
pub mod protocol;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults, DeterminismReport};
pub use error::{HeadlessError, Result};
pub use protocol::{Command, Response};
pub use runner::{HeadlessConfig, HeadlessRunner};
pub use scenario::{MapSpec, Scenario, ScenarioError};
