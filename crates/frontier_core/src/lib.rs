//! # Frontier Core
//!
//! Deterministic lockstep simulation core for Frontier, a multiplayer
//! territory-control strategy game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO (apart from reading configs and replay files on request)
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! Every replica of a game feeds the same [`Turn`](intent::Turn)s into a
//! [`Game`](game::Game) and must reach identical state tick for tick.
//! Divergence is detected by comparing [`HashEvent`](hash::HashEvent)s.
//!
//! ## Crate Structure
//!
//! - [`intent`] - Wire-level player actions and turns
//! - [`execution`] - Execution lifecycle, scheduler and intent translator
//! - [`ai`] - Bot and nation decision executions
//! - [`world`] - Players, tiles, units, attacks and diplomacy
//! - [`random`] - Seeded pseudo-random streams
//! - [`hash`] - Consistency hashing and desync detection
//! - [`game`] - Turn-driven game loop
//! - [`replay`] - Replay recording and verification

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod config;
pub mod error;
pub mod execution;
pub mod game;
pub mod hash;
pub mod intent;
pub mod map;
pub mod math;
pub mod random;
pub mod replay;
pub mod world;

/// Discrete simulation time step.
pub type Tick = u64;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Difficulty, GameConfig};
    pub use crate::error::{GameError, Result};
    pub use crate::execution::{Execution, ExecutionBehavior, ExecutionContext, Scheduler};
    pub use crate::game::{Game, GameStartInfo, PlayerSetup, TickOutput};
    pub use crate::hash::{DesyncDetector, HashEvent};
    pub use crate::intent::{EmbargoAction, Intent, Turn};
    pub use crate::map::{TerrainMap, TileRef};
    pub use crate::math::Fixed;
    pub use crate::random::PseudoRandom;
    pub use crate::replay::{Replay, ReplayPlayer};
    pub use crate::world::{
        AttackId, ClientId, GameEvent, PlayerId, PlayerKind, RequestId, SmallId, UnitId,
        UnitType, World,
    };
    pub use crate::Tick;
}
