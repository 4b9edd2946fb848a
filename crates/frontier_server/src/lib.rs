//! # Frontier Lockstep Host
//!
//! Server side of a lockstep game. The host never trusts client state: it
//! collects intents, seals them into numbered turns, runs its own replica of
//! the simulation and compares the hashes clients report against its own.
//!
//! - [`sequencer`] - Orders incoming intents into turns
//! - [`host`] - Simulation replica on a dedicated thread behind channels
//! - [`session`] - Turn timer tying clients, sequencer and host together

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod error;
pub mod host;
pub mod sequencer;
pub mod session;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use host::{HostCommand, HostMessage, SimulationHost};
pub use sequencer::TurnSequencer;
pub use session::{ClientMessage, Session, SessionSummary};
