//! AI-controlled players.
//!
//! Bots (tribes) and fake humans (nations) are executions like any other.
//! They observe the world and act by submitting ordinary [`Intent`]s, so
//! every AI decision goes through the same translation and validation as a
//! human's. Each agent owns a [`PseudoRandom`] seeded from the game seed and
//! its player id; no other randomness is used.
//!
//! [`Intent`]: crate::intent::Intent
//! [`PseudoRandom`]: crate::random::PseudoRandom

mod behavior;
mod bot;
mod fake_human;
pub mod nuke_targeting;
pub mod structures;

pub use behavior::{AiBehavior, AiKind, AttackPlan};
pub use bot::BotExecution;
pub use fake_human::FakeHumanExecution;
