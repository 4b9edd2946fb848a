//! Trade embargoes.

use serde::{Deserialize, Serialize};

use super::{ExecutionBehavior, ExecutionContext};
use crate::intent::EmbargoAction;
use crate::world::{GameEvent, SmallId};
use crate::Tick;

/// Starts or stops an embargo of `player` against `target`. Embargoed pairs
/// do not trade through their ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbargoExecution {
    player: SmallId,
    target: SmallId,
    action: EmbargoAction,
    active: bool,
}

impl EmbargoExecution {
    /// Create the execution.
    #[must_use]
    pub const fn new(player: SmallId, target: SmallId, action: EmbargoAction) -> Self {
        Self {
            player,
            target,
            action,
            active: true,
        }
    }
}

impl ExecutionBehavior for EmbargoExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        if self.player == self.target || !ctx.world.is_alive(self.player) {
            tracing::warn!(player = %self.player, target = %self.target, "Invalid embargo");
            self.active = false;
        }
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        self.active = false;
        let Some(p) = ctx.world.player_mut(self.player) else {
            return;
        };
        let changed = match self.action {
            EmbargoAction::Start => p.add_embargo(self.target),
            EmbargoAction::Stop => p.stop_embargo(self.target),
        };
        if changed {
            ctx.world.emit(GameEvent::EmbargoChanged {
                player: self.player,
                target: self.target,
                active: self.action == EmbargoAction::Start,
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
