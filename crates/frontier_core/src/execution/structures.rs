//! Operating executions of completed structures.
//!
//! Each lives as long as its unit. When the tile under a structure changes
//! hands the structure changes owner with it; when the tile loses its owner
//! (fallout) the structure is destroyed.

use serde::{Deserialize, Serialize};

use super::{follow_structure_owner, ExecutionBehavior, ExecutionContext};
use crate::world::{GameEvent, SmallId, UnitId, UnitType, World};
use crate::Tick;

macro_rules! passive_structure {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            unit: UnitId,
            active: bool,
        }

        impl $name {
            /// Operate a completed unit.
            #[must_use]
            pub const fn new(unit: UnitId) -> Self {
                Self { unit, active: true }
            }
        }

        impl ExecutionBehavior for $name {
            fn init(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
                if ctx.world.unit(self.unit).is_none() {
                    self.active = false;
                }
            }

            fn tick(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
                if !follow_structure_owner(ctx.world, self.unit) {
                    self.active = false;
                }
            }

            fn is_active(&self) -> bool {
                self.active
            }
        }
    };
}

passive_structure!(
    /// Raises its owner's troop cap while it stands.
    CityExecution
);

passive_structure!(
    /// Makes nearby tiles more expensive to conquer while it stands.
    DefensePostExecution
);

/// Reloads the silo after launches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissileSiloExecution {
    unit: UnitId,
    active: bool,
}

impl MissileSiloExecution {
    /// Operate a completed silo.
    #[must_use]
    pub const fn new(unit: UnitId) -> Self {
        Self { unit, active: true }
    }
}

impl ExecutionBehavior for MissileSiloExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        if ctx.world.unit(self.unit).is_none() {
            self.active = false;
        }
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        if !follow_structure_owner(ctx.world, self.unit) {
            self.active = false;
            return;
        }
        if let Some(silo) = ctx.world.unit_mut(self.unit) {
            if silo.cooldown_until.is_some_and(|until| tick >= until) {
                silo.cooldown_until = None;
            }
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Earns gold from trade with every other player's port that neither side
/// embargoes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortExecution {
    unit: UnitId,
    active: bool,
}

impl PortExecution {
    /// Operate a completed port.
    #[must_use]
    pub const fn new(unit: UnitId) -> Self {
        Self { unit, active: true }
    }

    /// Ports this player's port can trade with.
    #[must_use]
    pub fn trading_partners(world: &World, owner: SmallId) -> usize {
        let Some(me) = world.player(owner) else {
            return 0;
        };
        world
            .units()
            .filter(|u| u.kind == UnitType::Port && !u.under_construction && u.owner != owner)
            .filter(|u| {
                world.alive_player(u.owner).is_some_and(|other| {
                    !me.has_embargo_against(u.owner) && !other.has_embargo_against(owner)
                })
            })
            .count()
    }
}

impl ExecutionBehavior for PortExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        if ctx.world.unit(self.unit).is_none() {
            self.active = false;
        }
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        if !follow_structure_owner(ctx.world, self.unit) {
            self.active = false;
            return;
        }
        let economy = &ctx.world.config().economy;
        if tick % economy.port_trade_interval != 0 {
            return;
        }
        let per_partner = economy.port_trade_gold;
        let Some(owner) = ctx.world.unit(self.unit).map(|u| u.owner) else {
            return;
        };
        let partners = Self::trading_partners(ctx.world, owner) as u64;
        if partners == 0 {
            return;
        }
        if let Some(p) = ctx.world.player_mut(owner) {
            p.gold = p.gold.saturating_add(partners * per_partner);
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Shoots down one incoming hostile nuke in range per reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamLauncherExecution {
    unit: UnitId,
    active: bool,
}

impl SamLauncherExecution {
    /// Operate a completed SAM launcher.
    #[must_use]
    pub const fn new(unit: UnitId) -> Self {
        Self { unit, active: true }
    }
}

impl ExecutionBehavior for SamLauncherExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        if ctx.world.unit(self.unit).is_none() {
            self.active = false;
        }
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        if !follow_structure_owner(ctx.world, self.unit) {
            self.active = false;
            return;
        }
        let Some(sam) = ctx.world.unit(self.unit) else {
            return;
        };
        if !sam.is_ready(tick) {
            return;
        }
        let (owner, tile) = (sam.owner, sam.tile);
        let range = ctx.world.config().nukes.sam_range;
        let cooldown = ctx.world.config().nukes.sam_cooldown;

        let world = &*ctx.world;
        let threat = world
            .units()
            .filter(|u| u.kind.is_nuke() && u.owner != owner && !world.are_allied(owner, u.owner))
            .find(|u| {
                u.target_tile
                    .is_some_and(|t| world.map().manhattan(t, tile) <= range)
            })
            .map(|u| u.id);

        if let Some(nuke) = threat {
            ctx.world.remove_unit(nuke);
            if let Some(sam) = ctx.world.unit_mut(self.unit) {
                sam.cooldown_until = Some(tick + cooldown);
            }
            tracing::debug!(sam = %self.unit, nuke = %nuke, tick, "Nuke intercepted");
            ctx.world.emit(GameEvent::NukeIntercepted {
                unit: nuke,
                by: self.unit,
            });
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
