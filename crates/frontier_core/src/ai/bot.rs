//! Tribe bots.

use serde::{Deserialize, Serialize};

use super::{AiBehavior, AiKind};
use crate::execution::{ExecutionBehavior, ExecutionContext};
use crate::world::SmallId;
use crate::Tick;

/// Drives a bot player: diplomacy bookkeeping and land attacks on its
/// cadence. Bots are spawned by the game and wait out the spawn phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotExecution {
    player: SmallId,
    behavior: Option<AiBehavior>,
    active: bool,
}

impl BotExecution {
    /// Create the execution for a bot player.
    #[must_use]
    pub const fn new(player: SmallId) -> Self {
        Self {
            player,
            behavior: None,
            active: true,
        }
    }

    /// Decision state, once initialized.
    #[must_use]
    pub const fn behavior(&self) -> Option<&AiBehavior> {
        self.behavior.as_ref()
    }
}

impl ExecutionBehavior for BotExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        self.behavior = AiBehavior::new(ctx.world, self.player, AiKind::Bot);
        if self.behavior.is_none() {
            self.active = false;
        }
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        let Some(player) = ctx.world.alive_player(self.player) else {
            self.active = false;
            return;
        };
        if player.tile_count() == 0 {
            tracing::debug!(player = %self.player, tick, "Bot has no territory");
            self.active = false;
            return;
        }
        let Some(behavior) = self.behavior.as_mut() else {
            self.active = false;
            return;
        };
        if behavior.should_act(tick) {
            behavior.act(ctx, tick);
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
