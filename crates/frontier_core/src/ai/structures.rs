//! What nations build, and where.

use crate::execution::{check_placement, unit_cost};
use crate::map::TileRef;
use crate::random::PseudoRandom;
use crate::world::{Relation, SmallId, UnitType, World};

/// Placement attempts per structure kind.
const PLACEMENT_TRIES: usize = 16;

/// Gold a nation wants in hand before building: the real cost inflated by
/// the perceived-cost multiplier, so it keeps a buffer.
#[must_use]
pub fn perceived_cost(world: &World, player: SmallId, kind: UnitType) -> u64 {
    unit_cost(world, player, kind).saturating_mul(u64::from(world.config().ai.perceived_cost_percent))
        / 100
}

fn wants(world: &World, player: SmallId, kind: UnitType) -> bool {
    match kind {
        UnitType::City => true,
        UnitType::Port => !world.shore_tiles(player).is_empty(),
        UnitType::DefensePost => {
            let Some(me) = world.player(player) else {
                return false;
            };
            world
                .neighbors_of(player)
                .into_iter()
                .flatten()
                .any(|n| me.relation(n) == Relation::Hostile)
        }
        UnitType::SamLauncher => world.units().any(|u| {
            u.kind == UnitType::MissileSilo && u.owner != player && !world.are_allied(player, u.owner)
        }),
        UnitType::MissileSilo => world.unit_count(player, UnitType::MissileSilo) == 0,
        _ => false,
    }
}

fn placement_candidates(world: &World, player: SmallId, kind: UnitType) -> Vec<TileRef> {
    match kind {
        UnitType::Port => world.shore_tiles(player),
        UnitType::DefensePost => world.border_tiles(player),
        _ => world
            .player(player)
            .map(|p| p.tiles().iter().copied().collect())
            .unwrap_or_default(),
    }
}

/// Next structure a nation builds, in priority order city, port, defense
/// post, SAM launcher, missile silo. The first kind that is wanted,
/// affordable at perceived cost and placeable wins.
pub fn choose_structure(
    world: &World,
    player: SmallId,
    rng: &mut PseudoRandom,
) -> Option<(UnitType, TileRef)> {
    let gold = world.alive_player(player)?.gold;
    for kind in UnitType::STRUCTURES {
        if world.config().is_unit_disabled(kind) || !wants(world, player, kind) {
            continue;
        }
        if gold < perceived_cost(world, player, kind) {
            continue;
        }
        let candidates = placement_candidates(world, player, kind);
        for _ in 0..PLACEMENT_TRIES {
            let Some(&tile) = rng.rand_element(&candidates) else {
                break;
            };
            if check_placement(world, player, kind, tile).is_ok() {
                return Some((kind, tile));
            }
        }
    }
    None
}
