//! Transport ships carrying troops across water.

use serde::{Deserialize, Serialize};

use super::{AttackExecution, ExecutionBehavior, ExecutionContext};
use crate::map::TileRef;
use crate::math::scale;
use crate::world::{GameEvent, SmallId, UnitId, UnitType, World};
use crate::Tick;

/// Own shore tile closest to `dst`, ties broken by lowest tile.
#[must_use]
pub fn launch_tile(world: &World, player: SmallId, dst: TileRef) -> Option<TileRef> {
    world
        .shore_tiles(player)
        .into_iter()
        .min_by_key(|&t| (world.map().manhattan(t, dst), t))
}

/// Ships troops from the nearest own shore to a shore tile of the target
/// (or unclaimed shore), then continues as a land attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportShipExecution {
    owner: SmallId,
    target: Option<SmallId>,
    requested: Option<u64>,
    dst: TileRef,
    ship: Option<UnitId>,
    remaining: Tick,
    active: bool,
}

impl TransportShipExecution {
    /// Create the execution.
    #[must_use]
    pub const fn new(
        owner: SmallId,
        target: Option<SmallId>,
        troops: Option<u64>,
        dst: TileRef,
    ) -> Self {
        Self {
            owner,
            target,
            requested: troops,
            dst,
            ship: None,
            remaining: 0,
            active: true,
        }
    }

    /// Ship unit, once launched.
    #[must_use]
    pub const fn ship(&self) -> Option<UnitId> {
        self.ship
    }

    fn reject(&mut self, reason: &str) {
        tracing::warn!(owner = %self.owner, dst = self.dst, reason, "Boat rejected");
        self.active = false;
    }

    fn return_troops(ctx: &mut ExecutionContext<'_>, owner: SmallId, troops: u64) {
        if let Some(p) = ctx.world.player_mut(owner).filter(|p| p.is_alive()) {
            p.troops += troops;
        }
    }
}

impl ExecutionBehavior for TransportShipExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        let world = &*ctx.world;
        let Some(owner) = world.alive_player(self.owner) else {
            return self.reject("owner not alive");
        };
        if !world.map().is_shore(self.dst) {
            return self.reject("destination is not a shore tile");
        }
        if world.owner(self.dst) != self.target {
            return self.reject("destination not owned by target");
        }
        if let Some(target) = self.target {
            if target == self.owner || !world.is_alive(target) || world.are_allied(self.owner, target) {
                return self.reject("invalid target");
            }
        }
        let Some(src) = launch_tile(world, self.owner, self.dst) else {
            return self.reject("no shore to launch from");
        };

        let wanted = self
            .requested
            .unwrap_or_else(|| scale(owner.troops, owner.attack_ratio));
        let troops = wanted.min(owner.troops);
        if troops == 0 {
            return self.reject("no troops to carry");
        }
        let distance = world.map().manhattan(src, self.dst);
        let speed = world.config().attack.ship_speed.max(1);

        if let Some(p) = ctx.world.player_mut(self.owner) {
            p.troops -= troops;
        }
        let ship = ctx.world.create_unit(UnitType::TransportShip, self.owner, src);
        if let Some(unit) = ctx.world.unit_mut(ship) {
            unit.troops = troops;
            unit.target_tile = Some(self.dst);
        }
        self.ship = Some(ship);
        self.remaining = Tick::from(distance.div_ceil(speed)).max(1);
        tracing::debug!(ship = %ship, owner = %self.owner, troops, eta = self.remaining, tick, "Boat launched");
        ctx.world.emit(GameEvent::UnitCreated {
            unit: ship,
            kind: UnitType::TransportShip,
            owner: self.owner,
        });
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        let Some(ship_id) = self.ship else {
            self.active = false;
            return;
        };
        let Some(ship) = ctx.world.unit(ship_id) else {
            // Sunk by a blast; the troops are lost.
            self.active = false;
            return;
        };
        let (troops, retreating) = (ship.troops, ship.retreating);

        if !ctx.world.is_alive(self.owner) {
            ctx.world.remove_unit(ship_id);
            self.active = false;
            return;
        }
        if retreating {
            ctx.world.remove_unit(ship_id);
            Self::return_troops(ctx, self.owner, troops);
            tracing::debug!(ship = %ship_id, tick, "Boat returned home");
            self.active = false;
            return;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return;
        }

        ctx.world.remove_unit(ship_id);
        self.active = false;
        let target_valid = match self.target {
            Some(t) => ctx.world.is_alive(t) && !ctx.world.are_allied(self.owner, t),
            None => true,
        };
        if target_valid && ctx.world.owner(self.dst) == self.target {
            ctx.world.conquer(self.dst, self.owner);
            ctx.spawn(AttackExecution::from_landing(self.owner, self.target, troops));
            tracing::debug!(ship = %ship_id, dst = self.dst, troops, tick, "Boat landed");
        } else {
            Self::return_troops(ctx, self.owner, troops);
            tracing::debug!(ship = %ship_id, tick, "Landing site lost, troops returned");
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Turns a transport ship around. A no-op for unknown, foreign or already
/// retreating ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelBoatExecution {
    player: SmallId,
    unit: UnitId,
    active: bool,
}

impl CancelBoatExecution {
    /// Create the cancel.
    #[must_use]
    pub const fn new(player: SmallId, unit: UnitId) -> Self {
        Self {
            player,
            unit,
            active: true,
        }
    }
}

impl ExecutionBehavior for CancelBoatExecution {
    fn init(&mut self, _ctx: &mut ExecutionContext<'_>, _tick: Tick) {}

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        self.active = false;
        match ctx.world.unit_mut(self.unit) {
            Some(unit)
                if unit.kind == UnitType::TransportShip
                    && unit.owner == self.player
                    && !unit.retreating =>
            {
                unit.retreating = true;
                tracing::debug!(ship = %self.unit, tick, "Boat retreating");
            }
            _ => tracing::debug!(ship = %self.unit, tick, "Cancel boat ignored"),
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::execution::Execution;
    use crate::map::TerrainMap;
    use crate::world::PlayerKind;

    fn channel() -> (World, SmallId) {
        let mut world = World::new("boat", GameConfig::default(), TerrainMap::from_ascii("#..#").unwrap());
        let a = world.add_player("a", PlayerKind::Human, None);
        world.conquer(0, a);
        world.player_mut(a).unwrap().troops = 1_000;
        (world, a)
    }

    #[test]
    fn test_boat_lands_and_continues_as_attack() {
        let (mut world, a) = channel();
        let mut spawned = Vec::new();
        let mut boat = TransportShipExecution::new(a, None, Some(300), 3);
        let mut ctx = ExecutionContext::new(&mut world, &mut spawned);
        boat.init(&mut ctx, 0);
        let ship = boat.ship().unwrap();
        assert_eq!(ctx.world.unit(ship).map(|u| u.troops), Some(300));
        assert_eq!(ctx.world.player(a).unwrap().troops, 700);

        boat.tick(&mut ctx, 1);
        assert!(boat.is_active());
        boat.tick(&mut ctx, 2);
        assert!(!boat.is_active());

        assert_eq!(world.owner(3), Some(a));
        assert!(world.unit(ship).is_none());
        assert_eq!(
            spawned,
            vec![Execution::from(AttackExecution::from_landing(a, None, 300))]
        );
    }

    #[test]
    fn test_cancelled_boat_returns_troops() {
        let (mut world, a) = channel();
        let mut spawned = Vec::new();
        let mut boat = TransportShipExecution::new(a, None, Some(300), 3);
        let mut ctx = ExecutionContext::new(&mut world, &mut spawned);
        boat.init(&mut ctx, 0);
        let ship = boat.ship().unwrap();

        CancelBoatExecution::new(a, ship).tick(&mut ctx, 1);
        boat.tick(&mut ctx, 1);
        assert!(!boat.is_active());

        assert_eq!(world.player(a).unwrap().troops, 1_000);
        assert!(world.unit(ship).is_none());
        assert_eq!(world.owner(3), None);
        assert!(spawned.is_empty());
    }

    #[test]
    fn test_landing_site_taken_returns_troops() {
        let (mut world, a) = channel();
        let b = world.add_player("b", PlayerKind::Bot, None);
        let mut spawned = Vec::new();
        let mut boat = TransportShipExecution::new(a, None, Some(300), 3);
        boat.init(&mut ExecutionContext::new(&mut world, &mut spawned), 0);

        world.conquer(3, b);
        let mut ctx = ExecutionContext::new(&mut world, &mut spawned);
        boat.tick(&mut ctx, 1);
        boat.tick(&mut ctx, 2);
        assert!(!boat.is_active());
        assert_eq!(world.player(a).unwrap().troops, 1_000);
        assert_eq!(world.owner(3), Some(b));
        assert!(spawned.is_empty());
    }

    #[test]
    fn test_inland_destination_is_rejected() {
        let mut world = World::new("boat", GameConfig::default(), TerrainMap::from_ascii("###.#").unwrap());
        let a = world.add_player("a", PlayerKind::Human, None);
        world.conquer(4, a);
        let mut spawned = Vec::new();
        let mut boat = TransportShipExecution::new(a, None, Some(100), 0);
        boat.init(&mut ExecutionContext::new(&mut world, &mut spawned), 0);
        assert!(!boat.is_active());
        assert_eq!(boat.ship(), None);
    }
}
