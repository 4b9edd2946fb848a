//! Placing a player's starting territory.

use serde::{Deserialize, Serialize};

use super::{ExecutionBehavior, ExecutionContext, PlayerExecution};
use crate::map::TileRef;
use crate::world::{GameEvent, SmallId};
use crate::Tick;

/// Claims the land around a tile as the player's starting territory.
///
/// Runs only during the spawn phase. Spawning again before the phase ends
/// moves the player: the previous territory is released first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnExecution {
    player: SmallId,
    tile: TileRef,
    active: bool,
}

impl SpawnExecution {
    /// Create a spawn at `tile`.
    #[must_use]
    pub const fn new(player: SmallId, tile: TileRef) -> Self {
        Self {
            player,
            tile,
            active: true,
        }
    }

    /// Requested spawn tile.
    #[must_use]
    pub const fn tile(&self) -> TileRef {
        self.tile
    }
}

impl ExecutionBehavior for SpawnExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        if !ctx.world.is_alive(self.player) {
            self.active = false;
        }
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        self.active = false;
        let world = &mut *ctx.world;
        if !world.in_spawn_phase() {
            tracing::warn!(player = %self.player, tick, "Spawn outside the spawn phase ignored");
            return;
        }
        let Some(player) = world.alive_player(self.player) else {
            return;
        };
        let first_spawn = !player.has_spawned();
        match world.owner(self.tile) {
            Some(owner) if owner != self.player => {
                tracing::warn!(player = %self.player, tile = self.tile, "Spawn tile already taken");
                return;
            }
            _ if !world.map().is_land(self.tile) => {
                tracing::warn!(player = %self.player, tile = self.tile, "Spawn tile is not land");
                return;
            }
            _ => {}
        }

        let previous: Vec<TileRef> = player.tiles().iter().copied().collect();
        for tile in previous {
            world.release_tile(tile);
        }

        let radius = world.config().spawn_radius;
        let claim: Vec<TileRef> = world
            .map()
            .tiles_within(self.tile, radius)
            .into_iter()
            .filter(|&t| world.is_unclaimed_land(t))
            .collect();
        for tile in claim {
            world.conquer(tile, self.player);
        }

        if let Some(p) = world.player_mut(self.player) {
            p.set_spawned();
        }
        world.emit(GameEvent::PlayerSpawned {
            player: self.player,
            tile: self.tile,
        });
        tracing::debug!(player = %self.player, tile = self.tile, tick, "Player spawned");

        if first_spawn {
            ctx.spawn(PlayerExecution::new(self.player));
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn active_during_spawn_phase(&self) -> bool {
        true
    }
}
