//! Timed construction of structures and launching of missiles.
//!
//! ```text
//! Pending ──init ok──▶ UnderConstruction { remaining } ──0──▶ Complete
//!    │
//!    └──init fails──▶ inactive, nothing deducted
//! ```
//!
//! A completed structure hands off to its operating execution (city, port,
//! defense post, SAM launcher, missile silo). Missiles skip the timer: the
//! silo and gold are claimed in `init` and the nuke execution is spawned on
//! the first tick.

use serde::{Deserialize, Serialize};

use super::{
    CityExecution, DefensePostExecution, Execution, ExecutionBehavior, ExecutionContext,
    MirvExecution, MissileSiloExecution, NukeExecution, PortExecution, SamLauncherExecution,
};
use crate::map::TileRef;
use crate::world::{GameEvent, SmallId, UnitId, UnitType, World};
use crate::Tick;

/// Why a structure cannot be placed on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementError {
    /// The tile is not owned by the builder.
    NotOwned,
    /// Ports must stand on a shore tile.
    NotShore,
    /// Another own structure is too close.
    TooClose,
}

/// Check structure placement rules for `player` building `kind` at `tile`.
///
/// # Errors
///
/// Returns the first rule the placement breaks.
pub fn check_placement(
    world: &World,
    player: SmallId,
    kind: UnitType,
    tile: TileRef,
) -> Result<(), PlacementError> {
    if world.owner(tile) != Some(player) {
        return Err(PlacementError::NotOwned);
    }
    if kind == UnitType::Port && !world.map().is_shore(tile) {
        return Err(PlacementError::NotShore);
    }
    let min_distance = world.config().units.structure_min_distance;
    let crowded = world.units().any(|u| {
        u.owner == player
            && u.kind.is_structure()
            && world.map().manhattan(u.tile, tile) < min_distance
    });
    if crowded {
        return Err(PlacementError::TooClose);
    }
    Ok(())
}

/// Ready silo of `player` closest to `target`, ties by unit id.
#[must_use]
pub fn ready_silo(world: &World, player: SmallId, target: TileRef, tick: Tick) -> Option<UnitId> {
    world
        .units_of(player, UnitType::MissileSilo)
        .filter(|u| u.is_ready(tick))
        .min_by_key(|u| (world.map().manhattan(u.tile, target), u.id))
        .map(|u| u.id)
}

/// Gold the next unit of `kind` costs `player`.
#[must_use]
pub fn unit_cost(world: &World, player: SmallId, kind: UnitType) -> u64 {
    world
        .config()
        .units
        .spec(kind)
        .cost_for(world.unit_count(player, kind))
}

/// Operating execution of a completed structure.
#[must_use]
pub fn operating_execution(kind: UnitType, unit: UnitId) -> Option<Execution> {
    match kind {
        UnitType::City => Some(CityExecution::new(unit).into()),
        UnitType::Port => Some(PortExecution::new(unit).into()),
        UnitType::DefensePost => Some(DefensePostExecution::new(unit).into()),
        UnitType::SamLauncher => Some(SamLauncherExecution::new(unit).into()),
        UnitType::MissileSilo => Some(MissileSiloExecution::new(unit).into()),
        UnitType::TransportShip
        | UnitType::AtomBomb
        | UnitType::HydrogenBomb
        | UnitType::Mirv
        | UnitType::MirvWarhead => None,
    }
}

/// Construction progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstructionState {
    /// Not yet validated.
    Pending,
    /// Paid for; counting down.
    UnderConstruction {
        /// Ticks left.
        remaining: Tick,
    },
    /// Handed off.
    Complete,
}

/// Builds a structure or launches a missile ordered through `build_unit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionExecution {
    player: SmallId,
    kind: UnitType,
    tile: TileRef,
    unit: Option<UnitId>,
    silo: Option<UnitId>,
    state: ConstructionState,
    active: bool,
}

impl ConstructionExecution {
    /// Create the execution.
    #[must_use]
    pub const fn new(player: SmallId, kind: UnitType, tile: TileRef) -> Self {
        Self {
            player,
            kind,
            tile,
            unit: None,
            silo: None,
            state: ConstructionState::Pending,
            active: true,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ConstructionState {
        self.state
    }

    /// Unit under construction, once paid for.
    #[must_use]
    pub const fn unit(&self) -> Option<UnitId> {
        self.unit
    }

    fn reject(&mut self, reason: &str) {
        tracing::warn!(player = %self.player, kind = %self.kind, tile = self.tile, reason, "Construction rejected");
        self.active = false;
    }

    fn init_missile(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick, cost: u64) {
        if !ctx.world.map().is_valid(self.tile) {
            return self.reject("target outside the map");
        }
        let Some(silo) = ready_silo(ctx.world, self.player, self.tile, tick) else {
            return self.reject("no ready missile silo");
        };
        let cooldown = ctx.world.config().nukes.silo_cooldown;
        if let Some(p) = ctx.world.player_mut(self.player) {
            p.gold -= cost;
        }
        if let Some(s) = ctx.world.unit_mut(silo) {
            s.cooldown_until = Some(tick + cooldown);
        }
        self.silo = Some(silo);
        self.state = ConstructionState::UnderConstruction { remaining: 0 };
    }

    fn init_structure(&mut self, ctx: &mut ExecutionContext<'_>, cost: u64) {
        if let Err(err) = check_placement(ctx.world, self.player, self.kind, self.tile) {
            let reason = match err {
                PlacementError::NotOwned => "tile not owned",
                PlacementError::NotShore => "port needs a shore tile",
                PlacementError::TooClose => "too close to another structure",
            };
            return self.reject(reason);
        }
        let build_ticks = ctx.world.config().units.spec(self.kind).build_ticks;
        if let Some(p) = ctx.world.player_mut(self.player) {
            p.gold -= cost;
        }
        let unit = ctx.world.create_unit(self.kind, self.player, self.tile);
        if let Some(u) = ctx.world.unit_mut(unit) {
            u.under_construction = true;
        }
        self.unit = Some(unit);
        self.state = ConstructionState::UnderConstruction {
            remaining: build_ticks,
        };
    }

    fn launch(&mut self, ctx: &mut ExecutionContext<'_>) {
        let src = self
            .silo
            .and_then(|s| ctx.world.unit(s))
            .map_or(self.tile, |s| s.tile);
        match self.kind {
            UnitType::Mirv => ctx.spawn(MirvExecution::new(self.player, src, self.tile)),
            kind => ctx.spawn(NukeExecution::new(self.player, kind, src, self.tile)),
        }
    }

    fn complete(&mut self, ctx: &mut ExecutionContext<'_>, unit: UnitId) {
        let Some(u) = ctx.world.unit_mut(unit) else {
            return;
        };
        u.under_construction = false;
        let owner = u.owner;
        ctx.world.emit(GameEvent::UnitCreated {
            unit,
            kind: self.kind,
            owner,
        });
        tracing::debug!(unit = %unit, kind = %self.kind, owner = %owner, "Construction complete");
        if let Some(successor) = operating_execution(self.kind, unit) {
            ctx.spawn(successor);
        }
    }
}

impl ExecutionBehavior for ConstructionExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        let Some(player) = ctx.world.alive_player(self.player) else {
            return self.reject("player not alive");
        };
        let gold = player.gold;
        if !self.kind.is_buildable() {
            return self.reject("unit kind is not buildable");
        }
        if ctx.world.config().is_unit_disabled(self.kind) {
            return self.reject("unit kind disabled");
        }
        let cost = unit_cost(ctx.world, self.player, self.kind);
        if gold < cost {
            return self.reject("insufficient gold");
        }
        if self.kind.is_nuke() {
            self.init_missile(ctx, tick, cost);
        } else {
            self.init_structure(ctx, cost);
        }
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        let ConstructionState::UnderConstruction { remaining } = self.state else {
            self.active = false;
            return;
        };

        if self.kind.is_nuke() {
            self.launch(ctx);
            self.state = ConstructionState::Complete;
            self.active = false;
            return;
        }

        let Some(unit) = self.unit else {
            self.active = false;
            return;
        };
        if !super::follow_structure_owner(ctx.world, unit) {
            tracing::debug!(unit = %unit, "Structure lost during construction");
            self.active = false;
            return;
        }

        if remaining <= 1 {
            self.complete(ctx, unit);
            self.state = ConstructionState::Complete;
            self.active = false;
        } else {
            self.state = ConstructionState::UnderConstruction {
                remaining: remaining - 1,
            };
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
    use crate::map::TerrainMap;
    use crate::world::PlayerKind;

    fn world(gold: u64) -> (World, SmallId) {
        let mut world = World::new("build", GameConfig::default(), TerrainMap::from_ascii("########").unwrap());
        let a = world.add_player("a", PlayerKind::Human, None);
        for tile in 0..6 {
            world.conquer(tile, a);
        }
        world.player_mut(a).unwrap().gold = gold;
        (world, a)
    }

    #[test]
    fn test_city_completes_after_build_time() {
        let (mut world, a) = world(200_000);
        let build_ticks = world.config().units.spec(UnitType::City).build_ticks;
        let mut spawned = Vec::new();
        let mut exec = ConstructionExecution::new(a, UnitType::City, 2);
        let mut ctx = ExecutionContext::new(&mut world, &mut spawned);
        exec.init(&mut ctx, 0);
        let unit = exec.unit().unwrap();
        assert_eq!(ctx.world.player(a).unwrap().gold, 75_000);
        assert!(ctx.world.unit(unit).unwrap().under_construction);

        for tick in 1..build_ticks {
            exec.tick(&mut ctx, tick);
        }
        assert_eq!(exec.state(), ConstructionState::UnderConstruction { remaining: 1 });
        exec.tick(&mut ctx, build_ticks);
        assert_eq!(exec.state(), ConstructionState::Complete);
        assert!(!exec.is_active());
        assert!(!world.unit(unit).unwrap().under_construction);
        assert_eq!(spawned, vec![Execution::from(CityExecution::new(unit))]);
    }

    #[test]
    fn test_insufficient_gold_deducts_nothing() {
        let (mut world, a) = world(1_000);
        let mut spawned = Vec::new();
        let mut exec = ConstructionExecution::new(a, UnitType::City, 2);
        exec.init(&mut ExecutionContext::new(&mut world, &mut spawned), 0);
        assert!(!exec.is_active());
        assert_eq!(world.player(a).unwrap().gold, 1_000);
        assert_eq!(world.units().count(), 0);
    }

    #[test]
    fn test_placement_rules() {
        let (mut world, a) = world(0);
        assert_eq!(check_placement(&world, a, UnitType::City, 7), Err(PlacementError::NotOwned));
        assert_eq!(check_placement(&world, a, UnitType::Port, 2), Err(PlacementError::NotShore));
        world.create_unit(UnitType::City, a, 2);
        assert_eq!(check_placement(&world, a, UnitType::DefensePost, 3), Err(PlacementError::TooClose));
        assert_eq!(check_placement(&world, a, UnitType::DefensePost, 5), Ok(()));
    }

    #[test]
    fn test_cost_scales_with_owned_units() {
        let (mut world, a) = world(0);
        assert_eq!(unit_cost(&world, a, UnitType::City), 125_000);
        world.create_unit(UnitType::City, a, 0);
        assert_eq!(unit_cost(&world, a, UnitType::City), 250_000);
    }

    #[test]
    fn test_atom_bomb_uses_ready_silo() {
        let (mut world, a) = world(1_000_000);
        let silo = world.create_unit(UnitType::MissileSilo, a, 0);
        let cooldown = world.config().nukes.silo_cooldown;
        let mut spawned = Vec::new();
        let mut exec = ConstructionExecution::new(a, UnitType::AtomBomb, 7);
        let mut ctx = ExecutionContext::new(&mut world, &mut spawned);
        exec.init(&mut ctx, 4);
        assert_eq!(ctx.world.player(a).unwrap().gold, 250_000);
        assert_eq!(ctx.world.unit(silo).unwrap().cooldown_until, Some(4 + cooldown));
        assert_eq!(ready_silo(ctx.world, a, 7, 5), None);

        exec.tick(&mut ctx, 5);
        assert!(!exec.is_active());
        assert_eq!(
            spawned,
            vec![Execution::from(NukeExecution::new(a, UnitType::AtomBomb, 0, 7))]
        );
    }

    #[test]
    fn test_missile_without_silo_is_rejected() {
        let (mut world, a) = world(1_000_000);
        let mut spawned = Vec::new();
        let mut exec = ConstructionExecution::new(a, UnitType::AtomBomb, 7);
        exec.init(&mut ExecutionContext::new(&mut world, &mut spawned), 0);
        assert!(!exec.is_active());
        assert_eq!(world.player(a).unwrap().gold, 1_000_000);
    }
}
