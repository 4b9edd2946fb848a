//! Replay recording and playback.
//!
//! A replay stores the start info of a game and the stream of turns applied
//! to it. Replaying those turns into a fresh [`Game`] recreates the game tick
//! for tick; the final hash proves it.
//!
//! Turns are kept in their JSON wire form. Intents are internally tagged,
//! which bincode cannot decode.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::game::{Game, GameStartInfo};
use crate::intent::Turn;
use crate::Tick;

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// A recorded turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayTurn {
    /// Tick the turn was applied on.
    pub tick: Tick,
    /// Turn JSON as received.
    pub wire: String,
}

/// Complete replay data structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Game setup.
    pub start: GameStartInfo,
    /// Non-empty turns in tick order. Ticks without an entry had no intents.
    pub turns: Vec<ReplayTurn>,
    /// Number of ticks played.
    pub final_tick: Tick,
    /// State hash after the last tick.
    pub final_hash: u64,
}

impl Replay {
    /// Start recording a game.
    #[must_use]
    pub const fn new(start: GameStartInfo) -> Self {
        Self {
            version: REPLAY_VERSION,
            start,
            turns: Vec::new(),
            final_tick: 0,
            final_hash: 0,
        }
    }

    /// Record a turn. Empty turns are implied and not stored.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Replay`] if the turn goes backwards in time, or
    /// [`GameError::Protocol`] if it cannot be encoded.
    pub fn record_turn(&mut self, turn: &Turn) -> Result<()> {
        if let Some(last) = self.turns.last() {
            if turn.turn_number <= last.tick {
                return Err(GameError::Replay(format!(
                    "turn {} recorded after turn {}",
                    turn.turn_number, last.tick
                )));
            }
        }
        if turn.intents.is_empty() {
            return Ok(());
        }
        self.turns.push(ReplayTurn {
            tick: turn.turn_number,
            wire: turn.encode()?,
        });
        Ok(())
    }

    /// Finalize the replay with end-game state.
    pub fn finalize(&mut self, final_tick: Tick, final_hash: u64) {
        self.final_tick = final_tick;
        self.final_hash = final_hash;
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Replay`] if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| GameError::Replay(format!("Failed to serialize replay: {e}")))?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::Replay(format!("Failed to write replay file: {e}")))?;
        Ok(())
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Replay`] if file reading or deserialization fails,
    /// or the file was written by another format version.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::Replay(format!("Failed to read replay file: {e}")))?;
        let replay: Self = bincode::deserialize(&bytes)
            .map_err(|e| GameError::Replay(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(GameError::Replay(format!(
                "Replay version mismatch: expected {REPLAY_VERSION}, got {}",
                replay.version
            )));
        }

        Ok(replay)
    }

    /// Turn applied on `tick`; an empty turn if none was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Protocol`] if the stored turn cannot be decoded.
    pub fn turn_at(&self, tick: Tick) -> Result<Turn> {
        match self.turns.binary_search_by_key(&tick, |t| t.tick) {
            Ok(index) => Turn::decode(&self.turns[index].wire),
            Err(_) => Ok(Turn::empty(tick)),
        }
    }

    /// Get the total duration of the replay in ticks.
    #[must_use]
    pub const fn duration(&self) -> Tick {
        self.final_tick
    }

    /// Number of stored (non-empty) turns.
    #[must_use]
    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }
}

/// Replay playback controller.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: Replay,
    game: Game,
    /// Whether playback is paused.
    pub paused: bool,
}

impl ReplayPlayer {
    /// Create a player positioned at tick 0.
    ///
    /// # Errors
    ///
    /// Returns the error of [`Game::new`] if the start info is invalid.
    pub fn new(replay: Replay) -> Result<Self> {
        let game = Game::new(replay.start.clone())?;
        Ok(Self {
            replay,
            game,
            paused: false,
        })
    }

    /// Advance the replay by one tick.
    ///
    /// Returns `true` while there are more ticks to play.
    ///
    /// # Errors
    ///
    /// Propagates decoding and simulation errors.
    pub fn advance(&mut self) -> Result<bool> {
        if self.paused || self.is_finished() {
            return Ok(!self.is_finished());
        }
        let turn = self.replay.turn_at(self.game.tick())?;
        self.game.execute_turn(&turn)?;
        Ok(!self.is_finished())
    }

    /// Seek to a specific tick, replaying from the start if it lies behind.
    ///
    /// # Errors
    ///
    /// Propagates decoding and simulation errors.
    pub fn seek(&mut self, target_tick: Tick) -> Result<()> {
        if target_tick < self.game.tick() {
            self.game = Game::new(self.replay.start.clone())?;
        }
        let target = target_tick.min(self.replay.final_tick);
        while self.game.tick() < target {
            let turn = self.replay.turn_at(self.game.tick())?;
            self.game.execute_turn(&turn)?;
        }
        Ok(())
    }

    /// Get the current tick.
    #[must_use]
    pub const fn current_tick(&self) -> Tick {
        self.game.tick()
    }

    /// Get a reference to the game being replayed.
    #[must_use]
    pub const fn game(&self) -> &Game {
        &self.game
    }

    /// Get the replay being played.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Check if the replay has finished.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.game.tick() >= self.replay.final_tick
    }

    /// Play to the end and compare the final hash.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Replay`] on a hash mismatch, or propagates
    /// decoding and simulation errors.
    pub fn verify(&mut self) -> Result<()> {
        self.seek(self.replay.final_tick)?;
        let actual = self.game.state_hash()?;
        if actual != self.replay.final_hash {
            tracing::error!(
                tick = self.replay.final_tick,
                expected = self.replay.final_hash,
                actual,
                "Replay diverged"
            );
            return Err(GameError::Replay(format!(
                "final hash mismatch at tick {}: expected {}, got {actual}",
                self.replay.final_tick, self.replay.final_hash
            )));
        }
        Ok(())
    }

    /// Toggle pause state.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Progress as a whole percentage (0-100).
    #[must_use]
    pub fn progress_percent(&self) -> u32 {
        if self.replay.final_tick == 0 {
            100
        } else {
            (self.game.tick().min(self.replay.final_tick) * 100 / self.replay.final_tick) as u32
        }
    }
}
