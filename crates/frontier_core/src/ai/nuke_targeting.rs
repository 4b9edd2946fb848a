//! Where nations aim their nukes, and whom they MIRV.
//!
//! A candidate tile scores:
//!
//! ```text
//! structures_in_outer_radius * structure_weight
//!   + target_tiles_in_inner_radius
//!   - sams_covering_tile * sam_penalty
//!   - recency_penalty (if near a recent own target)
//! ```
//!
//! Tiles whose inner blast would touch own or allied territory are never
//! candidates.

use std::collections::BTreeSet;

use crate::execution::blast_radii;
use crate::map::TileRef;
use crate::random::PseudoRandom;
use crate::world::{SmallId, UnitType, World};

/// Score of nuking `tile` of `target` with a bomb of `kind`, or `None` if the
/// blast would hit the launcher or its allies.
#[must_use]
pub fn score_tile(
    world: &World,
    launcher: SmallId,
    target: SmallId,
    tile: TileRef,
    kind: UnitType,
    recent: &[TileRef],
) -> Option<i64> {
    let (inner, outer) = blast_radii(world, kind);
    let ai = &world.config().ai;

    let mut tiles_hit = 0i64;
    for t in world.map().tiles_within(tile, inner) {
        match world.owner(t) {
            Some(owner) if owner == launcher || world.are_allied(launcher, owner) => return None,
            Some(owner) if owner == target => tiles_hit += 1,
            _ => {}
        }
    }

    let structures = world
        .units()
        .filter(|u| {
            u.owner == target
                && u.kind.is_structure()
                && world.map().manhattan(u.tile, tile) <= outer
        })
        .count() as i64;

    let sam_range = world.config().nukes.sam_range;
    let sams = world
        .units()
        .filter(|u| {
            u.kind == UnitType::SamLauncher
                && !u.under_construction
                && (u.owner == target || world.are_allied(target, u.owner))
                && world.map().manhattan(u.tile, tile) <= sam_range
        })
        .count() as i64;

    let recently_hit = recent
        .iter()
        .any(|&r| world.map().manhattan(r, tile) <= outer);

    let mut score = structures * ai.nuke_structure_weight + tiles_hit - sams * ai.nuke_sam_penalty;
    if recently_hit {
        score -= ai.nuke_recency_penalty;
    }
    Some(score)
}

/// Best tile of `target` to nuke. Candidates are a PRNG sample of the
/// target's tiles plus all its structure tiles. Only positive scores count;
/// ties are broken with the PRNG.
pub fn best_nuke_target(
    world: &World,
    launcher: SmallId,
    target: SmallId,
    kind: UnitType,
    recent: &[TileRef],
    rng: &mut PseudoRandom,
) -> Option<TileRef> {
    let owned: Vec<TileRef> = world
        .player(target)?
        .tiles()
        .iter()
        .copied()
        .collect();
    if owned.is_empty() {
        return None;
    }

    let mut candidates = BTreeSet::new();
    for _ in 0..world.config().ai.nuke_sample_tiles {
        if let Some(&tile) = rng.rand_element(&owned) {
            candidates.insert(tile);
        }
    }
    candidates.extend(
        world
            .units()
            .filter(|u| u.owner == target && u.kind.is_structure())
            .map(|u| u.tile),
    );

    let mut best_score = 0;
    let mut best: Vec<TileRef> = Vec::new();
    for tile in candidates {
        let Some(score) = score_tile(world, launcher, target, tile, kind, recent) else {
            continue;
        };
        if score <= 0 || score < best_score {
            continue;
        }
        if score > best_score {
            best_score = score;
            best.clear();
        }
        best.push(tile);
    }
    rng.rand_element(&best).copied()
}

/// Player a nation should MIRV, if any: first a non-allied player close to
/// winning, otherwise a runaway leader. Hesitation is left to the caller.
#[must_use]
pub fn mirv_target(world: &World, launcher: SmallId) -> Option<SmallId> {
    let ai = &world.config().ai;
    let land = world.map().land_tile_count() as u64;
    let win_tiles = land * u64::from(world.config().win_threshold_percent) / 100;

    let mut contenders: Vec<(usize, SmallId)> = world
        .players()
        .filter(|p| p.is_alive())
        .map(|p| (p.tile_count(), p.small_id()))
        .collect();
    // Most tiles first, lowest id on ties.
    contenders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let hostile = |id: SmallId| id != launcher && !world.are_allied(launcher, id);

    let denial = contenders.iter().find(|&&(tiles, id)| {
        hostile(id)
            && (tiles as u64) * 100 >= win_tiles * u64::from(ai.mirv_victory_denial_percent)
    });
    if let Some(&(_, id)) = denial {
        return Some(id);
    }

    let (&(leader_tiles, leader), rest) = contenders.split_first()?;
    let runner_up = rest.first().map_or(0, |&(tiles, _)| tiles);
    let steamrolling = leader_tiles >= ai.mirv_steamroll_min_tiles
        && (leader_tiles as u64) * 100 >= (runner_up as u64) * u64::from(ai.mirv_steamroll_percent);
    (hostile(leader) && steamrolling).then_some(leader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::TerrainMap;
    use crate::world::PlayerKind;

    fn world(width: usize) -> (World, SmallId, SmallId) {
        let row = "#".repeat(width);
        let map = TerrainMap::from_ascii(&row).unwrap();
        let mut w = World::new("nukes", GameConfig::default(), map);
        let a = w.add_player("a", PlayerKind::FakeHuman, None);
        let b = w.add_player("b", PlayerKind::Human, None);
        (w, a, b)
    }

    #[test]
    fn test_blast_on_own_land_is_skipped() {
        let (mut w, a, b) = world(20);
        w.conquer(0, a);
        for t in 1..20 {
            w.conquer(t, b);
        }
        // Atom inner radius 3 around tile 2 reaches tile 0.
        assert_eq!(score_tile(&w, a, b, 2, UnitType::AtomBomb, &[]), None);
        assert_eq!(score_tile(&w, a, b, 10, UnitType::AtomBomb, &[]), Some(7));
    }

    #[test]
    fn test_structures_and_sams_weigh_in() {
        let (mut w, a, b) = world(40);
        for t in 10..40 {
            w.conquer(t, b);
        }
        w.create_unit(UnitType::City, b, 20);
        let plain = score_tile(&w, a, b, 30, UnitType::AtomBomb, &[]).unwrap();
        let city = score_tile(&w, a, b, 20, UnitType::AtomBomb, &[]).unwrap();
        assert!(city > plain);

        w.create_unit(UnitType::SamLauncher, b, 22);
        let guarded = score_tile(&w, a, b, 20, UnitType::AtomBomb, &[]).unwrap();
        assert!(guarded < city);

        let recent = score_tile(&w, a, b, 30, UnitType::AtomBomb, &[31]).unwrap();
        assert!(recent < plain);
    }

    #[test]
    fn test_best_target_prefers_structures() {
        let (mut w, a, b) = world(60);
        for t in 10..60 {
            w.conquer(t, b);
        }
        w.create_unit(UnitType::City, b, 40);
        let mut rng = PseudoRandom::new(1);
        let tile = best_nuke_target(&w, a, b, UnitType::AtomBomb, &[], &mut rng).unwrap();
        assert!(w.map().manhattan(tile, 40) <= 5);
    }

    #[test]
    fn test_mirv_victory_denial() {
        let (mut w, a, b) = world(100);
        for t in 0..70 {
            w.conquer(t, b);
        }
        w.conquer(99, a);
        assert_eq!(mirv_target(&w, a), Some(b));
        assert_eq!(mirv_target(&w, b), None);
    }

    #[test]
    fn test_mirv_steamroll_prevention() {
        let (mut w, a, b) = world(200);
        let c = w.add_player("c", PlayerKind::Human, None);
        for t in 0..60 {
            w.conquer(t, b);
        }
        for t in 100..120 {
            w.conquer(t, c);
        }
        w.conquer(199, a);
        assert_eq!(mirv_target(&w, a), Some(b));

        w.form_alliance(a, b);
        assert_eq!(mirv_target(&w, a), None);
    }
}
