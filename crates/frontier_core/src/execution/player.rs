//! Per-player upkeep.

use serde::{Deserialize, Serialize};

use super::{ExecutionBehavior, ExecutionContext};
use crate::math::{percent, scale};
use crate::world::{GameEvent, SmallId};
use crate::Tick;

/// Grows troops and gold, decays relations, expires alliances and traitor
/// flags, and removes the player once it has no territory left.
///
/// Lives as long as the player does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerExecution {
    player: SmallId,
    active: bool,
}

impl PlayerExecution {
    /// Create upkeep for a player.
    #[must_use]
    pub const fn new(player: SmallId) -> Self {
        Self {
            player,
            active: true,
        }
    }

    fn grow(ctx: &mut ExecutionContext<'_>, player: SmallId) {
        let max_troops = ctx.world.max_troops(player);
        let economy = ctx.world.config().economy.clone();
        let Some(p) = ctx.world.player_mut(player) else {
            return;
        };
        if p.troops < max_troops {
            let gap = max_troops - p.troops;
            let growth = economy.base_troop_growth + scale(gap, percent(economy.troop_growth_percent));
            p.troops = (p.troops + growth).min(max_troops);
        }
        let per_tiles = if economy.tiles_per_gold == 0 {
            0
        } else {
            p.tile_count() as u64 / economy.tiles_per_gold
        };
        p.gold = p
            .gold
            .saturating_add(economy.base_gold_income)
            .saturating_add(per_tiles);
    }

    fn expire_alliances(ctx: &mut ExecutionContext<'_>, player: SmallId, tick: Tick) {
        // The lower id of each pair owns its expiry so it is reported once.
        let expired: Vec<SmallId> = ctx
            .world
            .diplomacy()
            .alliances()
            .filter(|a| a.a == player && a.expires <= tick)
            .map(|a| a.b)
            .collect();
        for other in expired {
            ctx.world.diplomacy_mut().break_alliance(player, other);
            tracing::info!(a = %player, b = %other, tick, "Alliance expired");
            ctx.world.emit(GameEvent::AllianceExpired {
                a: player,
                b: other,
            });
        }
    }
}

impl ExecutionBehavior for PlayerExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        if !ctx.world.is_alive(self.player) {
            self.active = false;
        }
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        let Some(p) = ctx.world.alive_player(self.player) else {
            self.active = false;
            return;
        };
        if p.tile_count() == 0 {
            ctx.world.kill_player(self.player);
            self.active = false;
            return;
        }

        Self::grow(ctx, self.player);

        let decay_interval = ctx.world.config().diplomacy.relation_decay_interval;
        if let Some(p) = ctx.world.player_mut(self.player) {
            if tick % decay_interval == 0 {
                p.decay_relations();
            }
            if p.expire_traitor(tick) {
                tracing::debug!(player = %self.player, tick, "Traitor flag expired");
            }
        }

        Self::expire_alliances(ctx, self.player, tick);
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
