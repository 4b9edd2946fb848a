//! Nations: AI players that play like humans.

use serde::{Deserialize, Serialize};

use super::nuke_targeting::{best_nuke_target, mirv_target};
use super::structures::choose_structure;
use super::{AiBehavior, AiKind};
use crate::execution::{unit_cost, ExecutionBehavior, ExecutionContext};
use crate::intent::Intent;
use crate::map::TileRef;
use crate::world::{ClientId, SmallId, UnitType, World};
use crate::Tick;

/// Ticks between spawn attempts while the nation has not landed.
const SPAWN_RETRY_TICKS: Tick = 3;

/// Tries to find free land to spawn on per attempt.
const SPAWN_TILE_TRIES: usize = 100;

/// Drives a nation. During the spawn phase it picks a starting tile; after
/// that it runs the shared decision round on its cadence, then considers
/// special weapons and construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FakeHumanExecution {
    player: SmallId,
    behavior: Option<AiBehavior>,
    next_spawn_attempt: Tick,
    recent_nukes: Vec<(TileRef, Tick)>,
    active: bool,
}

impl FakeHumanExecution {
    /// Create the execution for a nation player.
    #[must_use]
    pub const fn new(player: SmallId) -> Self {
        Self {
            player,
            behavior: None,
            next_spawn_attempt: 0,
            recent_nukes: Vec::new(),
            active: true,
        }
    }

    /// Decision state, once initialized.
    #[must_use]
    pub const fn behavior(&self) -> Option<&AiBehavior> {
        self.behavior.as_ref()
    }

    fn client(world: &World, player: SmallId) -> Option<ClientId> {
        world.player(player).map(|p| p.info().client_id.clone())
    }

    fn try_spawn(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        if tick < self.next_spawn_attempt {
            return;
        }
        self.next_spawn_attempt = tick + SPAWN_RETRY_TICKS;
        let (Some(behavior), Some(client_id)) =
            (self.behavior.as_mut(), Self::client(ctx.world, self.player))
        else {
            return;
        };
        let land: Vec<TileRef> = ctx.world.map().land_tiles().collect();
        let rng = behavior.rng_mut();
        let mut choice = None;
        for _ in 0..SPAWN_TILE_TRIES {
            let Some(&tile) = rng.rand_element(&land) else {
                break;
            };
            if ctx.world.owner(tile).is_none() {
                choice = Some(tile);
                break;
            }
        }
        match choice {
            Some(tile) => ctx.submit(&Intent::Spawn { client_id, tile }),
            None => tracing::warn!(player = %self.player, tick, "Nation found no free land to spawn"),
        }
    }

    fn build_intent(world: &World, player: SmallId, unit: UnitType, tile: TileRef) -> Option<Intent> {
        Some(Intent::BuildUnit {
            client_id: Self::client(world, player)?,
            unit,
            tile,
        })
    }

    fn consider_weapons(&mut self, world: &World, tick: Tick) -> Option<Intent> {
        let behavior = self.behavior.as_mut()?;
        let me = world.alive_player(self.player)?;
        let has_silo = world
            .units_of(self.player, UnitType::MissileSilo)
            .any(|s| s.is_ready(tick));
        if !has_silo {
            return None;
        }
        let gold = me.gold;
        let affordable = |kind: UnitType| {
            !world.config().is_unit_disabled(kind) && gold >= unit_cost(world, self.player, kind)
        };

        if affordable(UnitType::Mirv) {
            if let Some(victim) = mirv_target(world, self.player) {
                let odds = world.config().difficulty.mirv_hesitation_odds();
                if behavior.rng_mut().chance(odds) {
                    tracing::debug!(player = %self.player, victim = %victim, tick, "Nation hesitated to MIRV");
                    return None;
                }
                let tiles: Vec<TileRef> = world.player(victim)?.tiles().iter().copied().collect();
                let &tile = behavior.rng_mut().rand_element(&tiles)?;
                tracing::info!(player = %self.player, victim = %victim, tick, "Nation launching MIRV");
                return Self::build_intent(world, self.player, UnitType::Mirv, tile);
            }
        }

        let enemy = behavior.enemy()?;
        let kind = [UnitType::HydrogenBomb, UnitType::AtomBomb]
            .into_iter()
            .find(|&k| affordable(k))?;
        let recent: Vec<TileRef> = self.recent_nukes.iter().map(|&(t, _)| t).collect();
        let tile = best_nuke_target(world, self.player, enemy, kind, &recent, behavior.rng_mut())?;
        self.recent_nukes.push((tile, tick));
        tracing::debug!(player = %self.player, enemy = %enemy, kind = %kind, tile, tick, "Nation launching nuke");
        Self::build_intent(world, self.player, kind, tile)
    }

    fn consider_construction(&mut self, world: &World) -> Option<Intent> {
        let behavior = self.behavior.as_mut()?;
        let (kind, tile) = choose_structure(world, self.player, behavior.rng_mut())?;
        tracing::debug!(player = %self.player, kind = %kind, tile, "Nation building");
        Self::build_intent(world, self.player, kind, tile)
    }
}

impl ExecutionBehavior for FakeHumanExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        self.behavior = AiBehavior::new(ctx.world, self.player, AiKind::FakeHuman);
        if self.behavior.is_none() {
            self.active = false;
        }
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        let Some(player) = ctx.world.alive_player(self.player) else {
            self.active = false;
            return;
        };
        let (spawned, tiles) = (player.has_spawned(), player.tile_count());

        if ctx.world.in_spawn_phase() {
            if !spawned {
                self.try_spawn(ctx, tick);
            }
            return;
        }
        if tiles == 0 {
            tracing::debug!(player = %self.player, tick, "Nation has no territory");
            self.active = false;
            return;
        }

        let recency = ctx.world.config().ai.nuke_recency_ticks;
        self.recent_nukes
            .retain(|&(_, at)| tick.saturating_sub(at) < recency);

        let Some(behavior) = self.behavior.as_mut() else {
            self.active = false;
            return;
        };
        if !behavior.should_act(tick) {
            return;
        }
        behavior.act(ctx, tick);

        let mut intents = Vec::new();
        intents.extend(self.consider_weapons(ctx.world, tick));
        intents.extend(self.consider_construction(ctx.world));
        for intent in &intents {
            ctx.submit(intent);
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn active_during_spawn_phase(&self) -> bool {
        true
    }
}
