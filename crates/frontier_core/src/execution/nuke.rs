//! Nuclear missiles in flight.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ExecutionBehavior, ExecutionContext};
use crate::map::TileRef;
use crate::world::{GameEvent, SmallId, UnitId, UnitType, World, MIN_RELATION};
use crate::Tick;

/// Inner (fallout) and outer (unit destruction) blast radius of a bomb.
#[must_use]
pub fn blast_radii(world: &World, kind: UnitType) -> (u32, u32) {
    let nukes = &world.config().nukes;
    match kind {
        UnitType::HydrogenBomb => (nukes.hydrogen_inner_radius, nukes.hydrogen_outer_radius),
        _ => (nukes.atom_inner_radius, nukes.atom_outer_radius),
    }
}

fn flight_ticks(world: &World, src: TileRef, dst: TileRef) -> Tick {
    let speed = world.config().nukes.missile_speed.max(1);
    Tick::from(world.map().manhattan(src, dst).div_ceil(speed)).max(1)
}

/// A bomb flying from a silo to its target tile.
///
/// Interception is observed as the missile unit disappearing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NukeExecution {
    launcher: SmallId,
    kind: UnitType,
    src: TileRef,
    target: TileRef,
    unit: Option<UnitId>,
    remaining: Tick,
    active: bool,
}

impl NukeExecution {
    /// Create a launch.
    #[must_use]
    pub const fn new(launcher: SmallId, kind: UnitType, src: TileRef, target: TileRef) -> Self {
        Self {
            launcher,
            kind,
            src,
            target,
            unit: None,
            remaining: 0,
            active: true,
        }
    }

    /// Missile unit, once launched.
    #[must_use]
    pub const fn unit(&self) -> Option<UnitId> {
        self.unit
    }

    fn detonate(&self, world: &mut World) {
        let (inner, outer) = blast_radii(world, self.kind);

        let mut lost: BTreeMap<SmallId, u64> = BTreeMap::new();
        for tile in world.map().tiles_within(self.target, inner) {
            if !world.map().is_land(tile) {
                continue;
            }
            if let Some(owner) = world.owner(tile) {
                *lost.entry(owner).or_default() += 1;
            }
            world.irradiate(tile);
        }

        let destroyed: Vec<UnitId> = world
            .units()
            .filter(|u| {
                Some(u.id) != self.unit
                    && !u.kind.is_nuke()
                    && world.map().manhattan(u.tile, self.target) <= outer
            })
            .map(|u| u.id)
            .collect();
        for unit in destroyed {
            world.remove_unit(unit);
        }

        for (player, tiles_lost) in lost {
            let Some(p) = world.player_mut(player) else {
                continue;
            };
            let before = p.tile_count() as u64 + tiles_lost;
            let troop_loss = p.troops.saturating_mul(tiles_lost) / before.max(1);
            p.troops -= troop_loss.min(p.troops);
            if player != self.launcher {
                p.update_relation(self.launcher, 2 * MIN_RELATION);
            }
        }

        tracing::info!(launcher = %self.launcher, kind = %self.kind, tile = self.target, "Nuke detonated");
        world.emit(GameEvent::NukeDetonated {
            launcher: self.launcher,
            tile: self.target,
            kind: self.kind,
        });
    }
}

impl ExecutionBehavior for NukeExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        if !ctx.world.is_alive(self.launcher) || !ctx.world.map().is_valid(self.target) {
            self.active = false;
            return;
        }
        let unit = ctx.world.create_unit(self.kind, self.launcher, self.src);
        if let Some(u) = ctx.world.unit_mut(unit) {
            u.target_tile = Some(self.target);
        }
        self.unit = Some(unit);
        self.remaining = flight_ticks(ctx.world, self.src, self.target);
        ctx.world.emit(GameEvent::UnitCreated {
            unit,
            kind: self.kind,
            owner: self.launcher,
        });
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        let Some(unit) = self.unit else {
            self.active = false;
            return;
        };
        if ctx.world.unit(unit).is_none() {
            self.active = false;
            return;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return;
        }
        self.detonate(ctx.world);
        ctx.world.remove_unit(unit);
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// A MIRV: flies to a separation point, then splits into warheads aimed at
/// random tiles of the player owning the target tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirvExecution {
    launcher: SmallId,
    src: TileRef,
    target: TileRef,
    target_player: Option<SmallId>,
    unit: Option<UnitId>,
    remaining: Tick,
    active: bool,
}

impl MirvExecution {
    /// Create a launch.
    #[must_use]
    pub const fn new(launcher: SmallId, src: TileRef, target: TileRef) -> Self {
        Self {
            launcher,
            src,
            target,
            target_player: None,
            unit: None,
            remaining: 0,
            active: true,
        }
    }

    fn separate(&self, ctx: &mut ExecutionContext<'_>, unit: UnitId, target_player: SmallId) {
        let warheads = ctx.world.config().nukes.mirv_warheads;
        let tiles: Vec<TileRef> = ctx
            .world
            .player(target_player)
            .map(|p| p.tiles().iter().copied().collect())
            .unwrap_or_default();
        let mut rng = ctx.world.derive_rng(u64::from(unit.0));
        let mut aims = Vec::with_capacity(warheads);
        for _ in 0..warheads {
            if let Some(&tile) = rng.rand_element(&tiles) {
                aims.push(tile);
            }
        }
        tracing::debug!(mirv = %unit, warheads = aims.len(), "MIRV separated");
        for aim in aims {
            ctx.spawn(NukeExecution::new(
                self.launcher,
                UnitType::MirvWarhead,
                self.target,
                aim,
            ));
        }
    }
}

impl ExecutionBehavior for MirvExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        if !ctx.world.is_alive(self.launcher) {
            self.active = false;
            return;
        }
        match ctx.world.owner(self.target) {
            Some(owner) if owner != self.launcher => self.target_player = Some(owner),
            _ => {
                tracing::warn!(launcher = %self.launcher, tile = self.target, "MIRV needs an enemy tile");
                self.active = false;
                return;
            }
        }
        let unit = ctx.world.create_unit(UnitType::Mirv, self.launcher, self.src);
        if let Some(u) = ctx.world.unit_mut(unit) {
            u.target_tile = Some(self.target);
        }
        self.unit = Some(unit);
        self.remaining = ctx.world.config().nukes.mirv_separation_ticks.max(1);
        ctx.world.emit(GameEvent::UnitCreated {
            unit,
            kind: UnitType::Mirv,
            owner: self.launcher,
        });
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        let (Some(unit), Some(target_player)) = (self.unit, self.target_player) else {
            self.active = false;
            return;
        };
        if ctx.world.unit(unit).is_none() {
            self.active = false;
            return;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return;
        }
        ctx.world.remove_unit(unit);
        self.separate(ctx, unit, target_player);
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
