//! Test fixtures and helpers.
//!
//! Pre-built maps, start infos and worlds for consistent testing.

use fixed::types::I32F32;
use frontier_core::config::GameConfig;
use frontier_core::execution::Scheduler;
use frontier_core::game::{Game, GameStartInfo, PlayerSetup};
use frontier_core::intent::{Intent, Turn};
use frontier_core::map::{TerrainMap, TileRef};
use frontier_core::world::{ClientId, GameEvent, PlayerId, PlayerKind, SmallId, World};
use frontier_core::Tick;

/// Client of the first human in two-player fixtures.
pub const CLIENT_A: &str = "client-a";

/// Client of the second human in two-player fixtures.
pub const CLIENT_B: &str = "client-b";

/// Width of the two-player map.
pub const DUEL_WIDTH: u32 = 12;

/// Spawn tile of [`CLIENT_A`] in [`spawned_duel`]: (3, 3).
pub const SPAWN_A: TileRef = 3 * DUEL_WIDTH + 3;

/// Spawn tile of [`CLIENT_B`] in [`spawned_duel`]: (8, 3). The two starting
/// territories touch.
pub const SPAWN_B: TileRef = 3 * DUEL_WIDTH + 8;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Client id from a string.
#[must_use]
pub fn client(id: &str) -> ClientId {
    ClientId::new(id)
}

/// All-land rectangle.
///
/// # Panics
///
/// Panics if `width` or `height` is zero.
#[must_use]
pub fn land_map(width: usize, height: usize) -> TerrainMap {
    let row = "#".repeat(width);
    TerrainMap::from_ascii(&vec![row; height].join("\n")).expect("non-empty map")
}

/// Two 6x6 islands separated by a four-tile strait.
///
/// # Panics
///
/// Never; the layout is fixed.
#[must_use]
pub fn archipelago_map() -> TerrainMap {
    let row = format!("{}....{}", "#".repeat(6), "#".repeat(6));
    TerrainMap::from_ascii(&vec![row; 6].join("\n")).expect("fixed layout")
}

/// Config with a two-tick spawn phase and a hash every tick.
#[must_use]
pub fn quick_config() -> GameConfig {
    GameConfig {
        spawn_phase_ticks: 2,
        hash_interval: 1,
        ..GameConfig::default()
    }
}

/// Two humans, [`CLIENT_A`] and [`CLIENT_B`], on a 12x8 land map.
#[must_use]
pub fn duel_start(game_id: &str) -> GameStartInfo {
    GameStartInfo {
        game_id: game_id.to_string(),
        config: quick_config(),
        map: land_map(DUEL_WIDTH as usize, 8),
        players: vec![
            PlayerSetup::human("alice", CLIENT_A),
            PlayerSetup::human("bob", CLIENT_B),
        ],
    }
}

/// A game of tribe bots and nations on a 32x24 land map.
#[must_use]
pub fn ai_start(game_id: &str, bots: u32, nations: usize) -> GameStartInfo {
    GameStartInfo {
        game_id: game_id.to_string(),
        config: GameConfig {
            bots,
            spawn_phase_ticks: 10,
            ..GameConfig::default()
        },
        map: land_map(32, 24),
        players: (1..=nations)
            .map(|n| PlayerSetup::nation(format!("nation-{n}")))
            .collect(),
    }
}

/// Turn that spawns each `(client, tile)` pair.
#[must_use]
pub fn spawn_turn(turn_number: Tick, spawns: &[(&str, TileRef)]) -> Turn {
    Turn::new(
        turn_number,
        spawns
            .iter()
            .map(|&(c, tile)| Intent::Spawn {
                client_id: client(c),
                tile,
            })
            .collect(),
    )
}

/// [`duel_start`] with both humans spawned and the spawn phase over.
///
/// # Panics
///
/// Panics if the fixture game cannot be created or run.
#[must_use]
pub fn spawned_duel(game_id: &str) -> Game {
    let mut game = Game::new(duel_start(game_id)).expect("valid fixture");
    game.execute_turn(&spawn_turn(0, &[(CLIENT_A, SPAWN_A), (CLIENT_B, SPAWN_B)]))
        .expect("turn 0");
    game.run_until(2).expect("spawn phase");
    game
}

/// Internal id of the player acting for `client`.
///
/// # Panics
///
/// Panics if no player has that client.
#[must_use]
pub fn small_id(world: &World, client_id: &str) -> SmallId {
    world
        .player_by_client(&client(client_id))
        .expect("fixture client exists")
}

/// Wire id of the player acting for `client`.
///
/// # Panics
///
/// Panics if no player has that client.
#[must_use]
pub fn player_id(world: &World, client_id: &str) -> PlayerId {
    let id = small_id(world, client_id);
    world.player(id).expect("fixture player").id().clone()
}

/// Bare world, past its spawn phase, with [`CLIENT_A`] owning the left and
/// [`CLIENT_B`] the right half of a 10x4 land map. No executions run.
#[must_use]
pub fn bordering_world(game_id: &str) -> (World, SmallId, SmallId) {
    let config = GameConfig {
        spawn_phase_ticks: 0,
        ..GameConfig::default()
    };
    let mut world = World::new(game_id, config, land_map(10, 4));
    let a = world.add_player("alice", PlayerKind::Human, Some(client(CLIENT_A)));
    let b = world.add_player("bob", PlayerKind::Human, Some(client(CLIENT_B)));
    for y in 0..4 {
        for x in 0..10 {
            let owner = if x < 5 { a } else { b };
            world.conquer(y * 10 + x, owner);
        }
    }
    (world, a, b)
}

/// Run a bare scheduler for `ticks` ticks, advancing the world after each,
/// and collect the events.
pub fn step_world(world: &mut World, scheduler: &mut Scheduler, ticks: Tick) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        scheduler.tick(world);
        world.advance_tick();
        events.extend(world.drain_events());
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawned_duel_players_touch() {
        let game = spawned_duel("fixture");
        let world = game.world();
        let a = small_id(world, CLIENT_A);
        let b = small_id(world, CLIENT_B);
        assert_eq!(world.owner(SPAWN_A), Some(a));
        assert_eq!(world.owner(SPAWN_B), Some(b));
        assert!(world.shares_border(a, Some(b)));
        assert!(!world.in_spawn_phase());
    }

    #[test]
    fn test_archipelago_has_two_islands() {
        let map = archipelago_map();
        assert_eq!(map.width(), 16);
        assert_eq!(map.land_tile_count(), 72);
        assert!(map.is_water(6));
    }
}
