//! Land attacks and their cancellation.
//!
//! An attack reserves troops from the attacker's pool into a world-side
//! [`AttackRecord`](crate::world::AttackRecord) and conquers frontier tiles
//! each tick until the troops run out, no frontier remains, or the
//! resolution timer expires. Leftover troops always return home.
//!
//! Cancellation is cooperative: [`CancelAttackExecution`] only sets the
//! record's `retreating` flag; the attack sees it on its next tick.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use super::{ExecutionBehavior, ExecutionContext};
use crate::map::TileRef;
use crate::math::scale;
use crate::world::{AttackId, GameEvent, SmallId, UnitType, World};
use crate::Tick;

/// Troops needed to take `tile` from its current owner.
#[must_use]
pub fn tile_cost(world: &World, tile: TileRef) -> u64 {
    let attack = &world.config().attack;
    let Some(defender) = world.owner(tile).and_then(|d| world.player(d)) else {
        return attack.unclaimed_tile_cost;
    };
    let density = defender.troops / (defender.tile_count().max(1) as u64);
    let cost = attack.base_tile_cost + density;
    if world.has_unit_near(
        tile,
        attack.defense_post_range,
        defender.small_id(),
        UnitType::DefensePost,
    ) {
        cost.saturating_mul(attack.defense_post_multiplier)
    } else {
        cost
    }
}

/// A land attack on a bordering player or on unclaimed land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackExecution {
    attacker: SmallId,
    target: Option<SmallId>,
    requested: Option<u64>,
    /// Troops already off the pool (landed from a ship).
    carried: Option<u64>,
    attack: Option<AttackId>,
    elapsed: Tick,
    active: bool,
}

impl AttackExecution {
    /// Attack with `troops`, or the attacker's attack ratio when `None`.
    #[must_use]
    pub const fn new(attacker: SmallId, target: Option<SmallId>, troops: Option<u64>) -> Self {
        Self {
            attacker,
            target,
            requested: troops,
            carried: None,
            attack: None,
            elapsed: 0,
            active: true,
        }
    }

    /// Continue a ship landing as a land attack with the troops it carried.
    #[must_use]
    pub const fn from_landing(attacker: SmallId, target: Option<SmallId>, troops: u64) -> Self {
        Self {
            attacker,
            target,
            requested: None,
            carried: Some(troops),
            attack: None,
            elapsed: 0,
            active: true,
        }
    }

    /// Record this execution created, once initialized.
    #[must_use]
    pub const fn attack_id(&self) -> Option<AttackId> {
        self.attack
    }

    fn reject(&mut self, ctx: &mut ExecutionContext<'_>, reason: &str) {
        tracing::warn!(attacker = %self.attacker, target = ?self.target, reason, "Attack rejected");
        if let Some(troops) = self.carried {
            if let Some(p) = ctx.world.player_mut(self.attacker) {
                p.troops += troops;
            }
        }
        self.active = false;
    }

    fn finish(&mut self, ctx: &mut ExecutionContext<'_>, retreated: bool) {
        self.active = false;
        let Some(id) = self.attack else {
            return;
        };
        let Some(record) = ctx.world.remove_attack(id) else {
            return;
        };
        if let Some(p) = ctx.world.player_mut(self.attacker).filter(|p| p.is_alive()) {
            p.troops += record.troops;
        }
        tracing::debug!(attack = %id, returned = record.troops, retreated, "Attack ended");
        ctx.world.emit(GameEvent::AttackEnded {
            attack: id,
            returned: record.troops,
            retreated,
        });
    }

    /// Frontier tiles ordered by how many of their neighbours the attacker
    /// already owns, most first, ties by tile.
    fn ordered_frontier(world: &World, attacker: SmallId, target: Option<SmallId>) -> Vec<TileRef> {
        let mut tiles: Vec<(usize, TileRef)> = world
            .frontier(attacker, target)
            .into_iter()
            .map(|t| {
                let owned = world
                    .map()
                    .neighbors(t)
                    .filter(|&n| world.owner(n) == Some(attacker))
                    .count();
                (owned, t)
            })
            .collect();
        tiles.sort_by_key(|&(owned, t)| (Reverse(owned), t));
        tiles.into_iter().map(|(_, t)| t).collect()
    }
}

impl ExecutionBehavior for AttackExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        let world = &*ctx.world;
        let Some(attacker) = world.alive_player(self.attacker) else {
            return self.reject(ctx, "attacker not alive");
        };
        if let Some(target) = self.target {
            if target == self.attacker {
                return self.reject(ctx, "cannot attack self");
            }
            if !world.is_alive(target) {
                return self.reject(ctx, "target not alive");
            }
            if world.are_allied(self.attacker, target) {
                return self.reject(ctx, "target is an ally");
            }
        }
        if !world.shares_border(self.attacker, self.target) {
            return self.reject(ctx, "no shared border");
        }

        let troops = match self.carried {
            Some(carried) => carried,
            None => {
                let pool = attacker.troops;
                let wanted = self
                    .requested
                    .unwrap_or_else(|| scale(pool, attacker.attack_ratio));
                let troops = wanted.min(pool);
                if troops == 0 {
                    return self.reject(ctx, "no troops to send");
                }
                if let Some(p) = ctx.world.player_mut(self.attacker) {
                    p.troops -= troops;
                }
                troops
            }
        };

        let id = ctx.world.add_attack(self.attacker, self.target, troops);
        self.attack = Some(id);
        self.carried = None;
        if let Some(target) = self.target {
            let penalty = ctx.world.config().diplomacy.attack_relation_penalty;
            if let Some(defender) = ctx.world.player_mut(target) {
                defender.update_relation(self.attacker, -penalty);
            }
        }
        tracing::debug!(attack = %id, attacker = %self.attacker, target = ?self.target, troops, tick, "Attack started");
        ctx.world.emit(GameEvent::AttackStarted {
            attack: id,
            attacker: self.attacker,
            target: self.target,
            troops,
        });
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        let Some(id) = self.attack else {
            self.active = false;
            return;
        };
        let Some(record) = ctx.world.attack(id) else {
            self.active = false;
            return;
        };
        if record.retreating {
            return self.finish(ctx, true);
        }
        if !ctx.world.is_alive(self.attacker) {
            ctx.world.remove_attack(id);
            self.active = false;
            return;
        }

        if let Some(target) = self.target {
            if ctx.world.are_allied(self.attacker, target) {
                return self.finish(ctx, true);
            }
            if !ctx.world.is_alive(target) {
                // The defender vanished; keep going against unclaimed land.
                self.target = None;
                if let Some(record) = ctx.world.attack_mut(id) {
                    record.target = None;
                }
            }
        }

        self.elapsed += 1;
        if self.elapsed > ctx.world.config().attack.max_ticks {
            return self.finish(ctx, false);
        }

        let frontier = Self::ordered_frontier(ctx.world, self.attacker, self.target);
        if frontier.is_empty() {
            return self.finish(ctx, false);
        }

        let per_tick = ctx.world.config().attack.tiles_per_tick;
        let mut conquered = 0;
        let mut exhausted = false;
        for tile in frontier.into_iter().take(per_tick) {
            let cost = tile_cost(ctx.world, tile);
            let remaining = ctx.world.attack(id).map_or(0, |r| r.troops);
            if remaining < cost {
                exhausted = true;
                break;
            }
            if let Some(record) = ctx.world.attack_mut(id) {
                record.troops -= cost;
            }
            if let Some(defender) = ctx.world.owner(tile) {
                if let Some(d) = ctx.world.player_mut(defender) {
                    let density = d.troops / (d.tile_count().max(1) as u64);
                    d.troops = d.troops.saturating_sub(density);
                }
            }
            ctx.world.conquer(tile, self.attacker);
            conquered += 1;
        }

        if conquered > 0 {
            ctx.world.emit(GameEvent::TilesConquered {
                attacker: self.attacker,
                defender: self.target,
                count: conquered,
            });
        }
        if exhausted {
            self.finish(ctx, false);
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Asks an attack to retreat. A no-op when the attack already ended, is
/// already retreating, or belongs to someone else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelAttackExecution {
    player: SmallId,
    attack: AttackId,
    active: bool,
}

impl CancelAttackExecution {
    /// Create the cancel.
    #[must_use]
    pub const fn new(player: SmallId, attack: AttackId) -> Self {
        Self {
            player,
            attack,
            active: true,
        }
    }
}

impl ExecutionBehavior for CancelAttackExecution {
    fn init(&mut self, _ctx: &mut ExecutionContext<'_>, _tick: Tick) {}

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        self.active = false;
        match ctx.world.attack_mut(self.attack) {
            Some(record) if record.attacker == self.player && !record.retreating => {
                record.retreating = true;
                tracing::debug!(attack = %self.attack, tick, "Attack retreating");
            }
            _ => {
                tracing::debug!(attack = %self.attack, tick, "Cancel ignored, attack not cancellable");
            }
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

    fn strip() -> (World, SmallId, SmallId) {
        let mut world = World::new("attack", GameConfig::default(), TerrainMap::from_ascii("######").unwrap());
        let a = world.add_player("a", PlayerKind::Human, None);
        let b = world.add_player("b", PlayerKind::Human, None);
        world.conquer(0, a);
        world.conquer(1, b);
        world.conquer(2, b);
        world.player_mut(a).unwrap().troops = 1_000;
        (world, a, b)
    }

    #[test]
    fn test_troops_leave_the_pool_on_init() {
        let (mut world, a, b) = strip();
        let mut spawned = Vec::new();
        let mut exec = AttackExecution::new(a, Some(b), Some(400));
        exec.init(&mut ExecutionContext::new(&mut world, &mut spawned), 0);
        let id = exec.attack_id().unwrap();
        assert_eq!(world.player(a).unwrap().troops, 600);
        assert_eq!(world.attack(id).map(|r| r.troops), Some(400));
    }

    #[test]
    fn test_attack_on_ally_is_rejected() {
        let (mut world, a, b) = strip();
        world.form_alliance(a, b);
        let mut spawned = Vec::new();
        let mut exec = AttackExecution::new(a, Some(b), Some(400));
        exec.init(&mut ExecutionContext::new(&mut world, &mut spawned), 0);
        assert!(!exec.is_active());
        assert_eq!(exec.attack_id(), None);
        assert_eq!(world.player(a).unwrap().troops, 1_000);
    }

    #[test]
    fn test_dead_target_turns_attack_onto_unclaimed_land() {
        let (mut world, a, b) = strip();
        let mut spawned = Vec::new();
        let mut exec = AttackExecution::new(a, Some(b), Some(400));
        exec.init(&mut ExecutionContext::new(&mut world, &mut spawned), 0);
        let id = exec.attack_id().unwrap();

        world.kill_player(b);
        world.drain_events();
        exec.tick(&mut ExecutionContext::new(&mut world, &mut spawned), 1);

        assert!(exec.is_active());
        assert_eq!(world.owner(1), Some(a));
        assert_eq!(world.attack(id).map(|r| r.target), Some(None));
        let cost = world.config().attack.unclaimed_tile_cost;
        assert_eq!(world.attack(id).map(|r| r.troops), Some(400 - cost));
        assert!(world.drain_events().contains(&GameEvent::TilesConquered {
            attacker: a,
            defender: None,
            count: 1,
        }));
    }

    #[test]
    fn test_cancel_returns_troops_on_next_tick() {
        let (mut world, a, b) = strip();
        let mut spawned = Vec::new();
        let mut exec = AttackExecution::new(a, Some(b), Some(400));
        let mut ctx = ExecutionContext::new(&mut world, &mut spawned);
        exec.init(&mut ctx, 0);
        let id = exec.attack_id().unwrap();

        let mut cancel = CancelAttackExecution::new(a, id);
        cancel.tick(&mut ctx, 1);
        assert!(exec.is_active());
        exec.tick(&mut ctx, 2);
        assert!(!exec.is_active());

        assert_eq!(world.player(a).unwrap().troops, 1_000);
        assert!(world.attack(id).is_none());
        assert!(world.drain_events().contains(&GameEvent::AttackEnded {
            attack: id,
            returned: 400,
            retreated: true,
        }));
    }

    #[test]
    fn test_cancel_by_other_player_is_ignored() {
        let (mut world, a, b) = strip();
        let mut spawned = Vec::new();
        let mut exec = AttackExecution::new(a, Some(b), Some(400));
        let mut ctx = ExecutionContext::new(&mut world, &mut spawned);
        exec.init(&mut ctx, 0);
        let id = exec.attack_id().unwrap();
        CancelAttackExecution::new(b, id).tick(&mut ctx, 1);
        assert_eq!(world.attack(id).map(|r| r.retreating), Some(false));
    }
}
