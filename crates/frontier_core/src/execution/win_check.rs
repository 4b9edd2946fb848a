//! Victory detection.

use serde::{Deserialize, Serialize};

use super::{ExecutionBehavior, ExecutionContext};
use crate::world::{SmallId, World};
use crate::Tick;

/// Declares the first living player owning the configured share of all land
/// the winner, once.
///
/// Held back until the spawn phase is over. Its `init` then eliminates every
/// player that never claimed land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinCheckExecution {
    active: bool,
}

impl WinCheckExecution {
    /// Create the execution.
    #[must_use]
    pub const fn new() -> Self {
        Self { active: true }
    }

    /// Player meeting the win condition right now, lowest id first.
    #[must_use]
    pub fn leader_over_threshold(world: &World) -> Option<SmallId> {
        let land = world.map().land_tile_count() as u64;
        if land == 0 {
            return None;
        }
        let threshold = u64::from(world.config().win_threshold_percent);
        world
            .players()
            .filter(|p| p.is_alive())
            .find(|p| (p.tile_count() as u64) * 100 >= land * threshold)
            .map(|p| p.small_id())
    }
}

impl Default for WinCheckExecution {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionBehavior for WinCheckExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        let landless: Vec<SmallId> = ctx
            .world
            .players()
            .filter(|p| p.is_alive() && p.tile_count() == 0)
            .map(|p| p.small_id())
            .collect();
        for player in landless {
            tracing::debug!(player = %player, tick, "Never spawned");
            ctx.world.kill_player(player);
        }
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        if ctx.world.winner().is_some() {
            self.active = false;
            return;
        }
        let interval = ctx.world.config().win_check_interval.max(1);
        if tick % interval != 0 {
            return;
        }
        if let Some(winner) = Self::leader_over_threshold(ctx.world) {
            tracing::info!(player = %winner, tick, "Winner declared");
            ctx.world.set_winner(winner);
            self.active = false;
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
