//! JSON protocol for headless game communication.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Tick results, hash events and responses
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0",...}`
//! 2. Controller sends turns or asks for empty ticks
//! 3. Runner outputs a `tick` line per executed tick, plus a `hash` line on
//!    hash ticks
//! 4. When a winner is declared, outputs `{"type":"game_over",...}`
//!
//! A line that cannot be decoded, including a turn with an unknown intent
//! kind, is a protocol error: the runner answers with an `error` line and
//! ends the session.
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","game_id":"duel","tick":0}
//! -> {"cmd":"turn","intents":[{"type":"spawn","clientID":"client-a","tile":101}]}
//! <- {"type":"tick","tick":0,"events":[{"event":"player_spawned",...}]}
//! <- {"type":"hash","tick":0,"hash":1234567890}
//! -> {"cmd":"tick","count":10}
//! <- {"type":"tick","tick":1,"events":[]}
//! ...
//! -> {"cmd":"state"}
//! <- {"type":"state","tick":11,"players":[...],"units":0,"attacks":0}
//! ```

use serde::{Deserialize, Serialize};

use frontier_core::game::{Game, TickOutput};
use frontier_core::intent::Intent;
use frontier_core::world::GameEvent;
use frontier_core::Tick;

/// Protocol version reported in the ready line.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (controller -> runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Apply these intents as the turn for the current tick.
    Turn {
        #[serde(default)]
        intents: Vec<Intent>,
    },

    /// Advance by N empty turns (default: 1).
    Tick {
        #[serde(default = "default_tick_count")]
        count: u32,
    },

    /// Report the current state without advancing time.
    State,

    /// Report the state hash for the current tick.
    Hash,

    /// Write the turns played so far as a replay file.
    SaveReplay { path: String },

    /// End the session.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

// ============================================================================
// Output Responses (runner -> controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        version: String,
        game_id: String,
        tick: Tick,
    },

    /// Acknowledgment of a command.
    Ack { cmd: String },

    /// Error processing a command.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// A tick was executed.
    Tick { tick: Tick, events: Vec<GameEvent> },

    /// Consistency hash for a tick.
    Hash { tick: Tick, hash: u64 },

    /// Current game state.
    State {
        tick: Tick,
        players: Vec<PlayerState>,
        units: usize,
        attacks: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        winner: Option<String>,
    },

    /// A winner was declared.
    GameOver { winner: String, tick: Tick },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// Summary of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub alive: bool,
    pub tiles: usize,
    pub troops: u64,
    pub gold: u64,
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(game_id: &str, tick: Tick) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            game_id: game_id.to_string(),
            tick,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Tick line, followed by the hash line on hash ticks.
    pub fn from_tick_output(output: TickOutput) -> Vec<Self> {
        let mut lines = vec![Self::Tick {
            tick: output.tick,
            events: output.events,
        }];
        if let Some(hash) = output.hash {
            lines.push(Self::Hash {
                tick: hash.tick,
                hash: hash.hash,
            });
        }
        lines
    }

    /// Snapshot of a game.
    pub fn state(game: &Game) -> Self {
        let world = game.world();
        let players = world
            .players()
            .map(|p| PlayerState {
                id: p.id().0.clone(),
                name: p.name().to_string(),
                kind: format!("{:?}", p.kind()),
                alive: p.is_alive(),
                tiles: p.tile_count(),
                troops: p.troops,
                gold: p.gold,
            })
            .collect();
        Self::State {
            tick: game.tick(),
            players,
            units: world.units().count(),
            attacks: world.attacks().count(),
            winner: winner_name(game),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","message":"Serialization failed: {}"}}"#,
                e
            )
        });
        json.push('\n');
        json
    }
}

/// Display name of the declared winner.
pub fn winner_name(game: &Game) -> Option<String> {
    game.winner()
        .and_then(|id| game.world().player(id))
        .map(|p| p.name().to_string())
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Turn { .. } => "turn",
            Self::Tick { .. } => "tick",
            Self::State => "state",
            Self::Hash => "hash",
            Self::SaveReplay { .. } => "save_replay",
            Self::Quit => "quit",
        }
    }
}
