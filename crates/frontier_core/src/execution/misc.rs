//! Small single-tick executions.

use serde::{Deserialize, Serialize};

use super::{ExecutionBehavior, ExecutionContext};
use crate::math::percent;
use crate::world::{GameEvent, SmallId};
use crate::Tick;

/// Does nothing and deactivates on its first tick.
///
/// Stands in for intents that referenced unknown entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoopExecution {
    active: bool,
}

impl NoopExecution {
    /// Create a no-op.
    #[must_use]
    pub const fn new() -> Self {
        Self { active: true }
    }
}

impl Default for NoopExecution {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionBehavior for NoopExecution {
    fn init(&mut self, _ctx: &mut ExecutionContext<'_>, _tick: Tick) {}

    fn tick(&mut self, _ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn active_during_spawn_phase(&self) -> bool {
        true
    }
}

/// Marks a player as a target so the marker's allies join in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetPlayerExecution {
    player: SmallId,
    target: SmallId,
    active: bool,
}

impl TargetPlayerExecution {
    /// Create the execution.
    #[must_use]
    pub const fn new(player: SmallId, target: SmallId) -> Self {
        Self {
            player,
            target,
            active: true,
        }
    }
}

impl ExecutionBehavior for TargetPlayerExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        if self.player == self.target
            || !ctx.world.is_alive(self.player)
            || !ctx.world.is_alive(self.target)
        {
            tracing::warn!(player = %self.player, target = %self.target, "Invalid target mark");
            self.active = false;
        }
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        self.active = false;
        if !ctx.world.is_alive(self.target) {
            return;
        }
        if let Some(p) = ctx.world.player_mut(self.player) {
            p.target(self.target, tick);
            ctx.world.emit(GameEvent::TargetMarked {
                player: self.player,
                target: self.target,
            });
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Sets the share of troops used by attacks without an explicit amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopRatioExecution {
    player: SmallId,
    ratio: u32,
    active: bool,
}

impl TroopRatioExecution {
    /// Create the execution. `ratio` is a whole percentage.
    #[must_use]
    pub const fn new(player: SmallId, ratio: u32) -> Self {
        Self {
            player,
            ratio,
            active: true,
        }
    }
}

impl ExecutionBehavior for TroopRatioExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        if self.ratio == 0 || self.ratio > 100 {
            tracing::warn!(player = %self.player, ratio = self.ratio, "Troop ratio out of range");
            self.active = false;
        } else if !ctx.world.is_alive(self.player) {
            self.active = false;
        }
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        if let Some(p) = ctx.world.player_mut(self.player) {
            p.attack_ratio = percent(self.ratio);
        }
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn active_during_spawn_phase(&self) -> bool {
        true
    }
}

/// Flags a player as disconnected or reconnected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkDisconnectedExecution {
    player: SmallId,
    disconnected: bool,
    active: bool,
}

impl MarkDisconnectedExecution {
    /// Create the execution.
    #[must_use]
    pub const fn new(player: SmallId, disconnected: bool) -> Self {
        Self {
            player,
            disconnected,
            active: true,
        }
    }
}

impl ExecutionBehavior for MarkDisconnectedExecution {
    fn init(&mut self, _ctx: &mut ExecutionContext<'_>, _tick: Tick) {}

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        self.active = false;
        let Some(p) = ctx.world.player_mut(self.player) else {
            return;
        };
        let changed = p.disconnected != self.disconnected;
        p.disconnected = self.disconnected;
        if changed && self.disconnected {
            ctx.world.emit(GameEvent::PlayerDisconnected {
                player: self.player,
            });
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn active_during_spawn_phase(&self) -> bool {
        true
    }
}
