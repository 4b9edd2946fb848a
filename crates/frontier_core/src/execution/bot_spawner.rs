//! Tribe bots added at game start.

use serde::{Deserialize, Serialize};

use super::{Execution, SpawnExecution};
use crate::ai::BotExecution;
use crate::map::TileRef;
use crate::random::{PseudoRandom, BOT_SPAWN_STREAM};
use crate::world::{PlayerKind, World};

/// Tries per bot to find a free spawn tile before giving up on it.
const SPAWN_ATTEMPTS: usize = 200;

/// Adds bot players and picks their spawn tiles from the game's bot stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotSpawner {
    rng: PseudoRandom,
}

impl BotSpawner {
    /// Create a spawner for a world.
    #[must_use]
    pub fn new(world: &World) -> Self {
        Self {
            rng: PseudoRandom::for_stream(world.seed(), BOT_SPAWN_STREAM),
        }
    }

    /// Add `count` bots to the world. Returns a spawn and an AI execution per
    /// bot that found room on the map.
    pub fn spawn_bots(&mut self, world: &mut World, count: u32) -> Vec<Execution> {
        let land: Vec<TileRef> = world.map().land_tiles().collect();
        let spacing = world.config().spawn_radius * 2 + 1;
        let mut centres: Vec<TileRef> = Vec::new();
        let mut executions = Vec::new();

        for n in 0..count {
            let Some(tile) = self.pick_tile(world, &land, &centres, spacing) else {
                tracing::warn!(bot = n, "No room left to spawn bot");
                break;
            };
            centres.push(tile);
            let bot = world.add_player(format!("Tribe {}", n + 1), PlayerKind::Bot, None);
            tracing::debug!(bot = %bot, tile, "Bot placed");
            executions.push(SpawnExecution::new(bot, tile).into());
            executions.push(BotExecution::new(bot).into());
        }
        executions
    }

    fn pick_tile(
        &mut self,
        world: &World,
        land: &[TileRef],
        centres: &[TileRef],
        spacing: u32,
    ) -> Option<TileRef> {
        for _ in 0..SPAWN_ATTEMPTS {
            let &tile = self.rng.rand_element(land)?;
            let free = world.owner(tile).is_none()
                && centres
                    .iter()
                    .all(|&c| world.map().manhattan(c, tile) >= spacing);
            if free {
                return Some(tile);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::TerrainMap;

    fn world() -> World {
        let map = TerrainMap::from_ascii(
            "
            ##########
            ##########
            ##########
            ##########
            ",
        )
        .unwrap();
        World::new("bots", GameConfig::default(), map)
    }

    #[test]
    fn test_spawn_bots_is_deterministic() {
        let mut a = world();
        let mut b = world();
        let ea = BotSpawner::new(&a).spawn_bots(&mut a, 3);
        let eb = BotSpawner::new(&b).spawn_bots(&mut b, 3);
        assert_eq!(ea, eb);
        assert_eq!(a, b);
    }

    #[test]
    fn test_bots_are_spaced_apart() {
        let mut w = world();
        let executions = BotSpawner::new(&w).spawn_bots(&mut w, 2);
        assert_eq!(executions.len(), 4);
        let tiles: Vec<TileRef> = executions
            .iter()
            .filter_map(|e| match e {
                Execution::Spawn(s) => Some(s.tile()),
                _ => None,
            })
            .collect();
        assert_eq!(tiles.len(), 2);
        assert!(w.map().manhattan(tiles[0], tiles[1]) >= 5);
        assert_eq!(w.players().filter(|p| p.kind() == PlayerKind::Bot).count(), 2);
    }
}
