//! Turn sequencing.
//!
//! Intents arrive from clients at any time. The sequencer keeps them in
//! arrival order and, on every turn boundary, seals them into the [`Turn`]
//! for the next tick. Sealed turns are kept so a client that reconnects can
//! catch up.

use frontier_core::intent::{Intent, Turn};
use frontier_core::Tick;

/// Orders intents into consecutive turns.
#[derive(Debug, Default)]
pub struct TurnSequencer {
    next_turn: Tick,
    pending: Vec<Intent>,
    history: Vec<Turn>,
}

impl TurnSequencer {
    /// Sequencer whose first turn is turn 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an intent for the next turn.
    pub fn submit(&mut self, intent: Intent) {
        tracing::trace!(kind = intent.kind(), turn = self.next_turn, "Intent queued");
        self.pending.push(intent);
    }

    /// Seal the queued intents into the next turn.
    pub fn seal(&mut self) -> Turn {
        let turn = Turn::new(self.next_turn, std::mem::take(&mut self.pending));
        self.next_turn += 1;
        self.history.push(turn.clone());
        turn
    }

    /// Number of the turn the next [`seal`](Self::seal) produces.
    #[must_use]
    pub const fn next_turn(&self) -> Tick {
        self.next_turn
    }

    /// Intents waiting for the next turn.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Sealed turns from `tick` on, for a client catching up.
    #[must_use]
    pub fn turns_since(&self, tick: Tick) -> &[Turn] {
        let start = usize::try_from(tick).map_or(self.history.len(), |t| t.min(self.history.len()));
        &self.history[start..]
    }
}
