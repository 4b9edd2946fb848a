//! Turn-driven game loop.
//!
//! A [`Game`] pairs the [`World`] with the [`Scheduler`]. Each call to
//! [`Game::execute_turn`] applies exactly one tick:
//!
//! 1. Translate the turn's intents, in order, and queue the executions.
//! 2. Run the scheduler once.
//! 3. Hash the world if the tick falls on the hash cadence.
//! 4. Advance the tick and hand back the events produced.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ai::FakeHumanExecution;
use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::execution::{translate, BotSpawner, Scheduler, WinCheckExecution};
use crate::hash::{compute_state_hash, HashEvent};
use crate::intent::Turn;
use crate::map::TerrainMap;
use crate::world::{ClientId, GameEvent, PlayerKind, SmallId, World};
use crate::Tick;

/// A player present when the game starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSetup {
    /// Display name.
    pub name: String,
    /// Human or nation. Tribe bots come from [`GameConfig::bots`].
    pub kind: PlayerKind,
    /// Client the player's intents arrive from.
    #[serde(default)]
    pub client_id: Option<ClientId>,
}

impl PlayerSetup {
    /// A human player driven by `client_id`.
    #[must_use]
    pub fn human(name: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PlayerKind::Human,
            client_id: Some(ClientId::new(client_id)),
        }
    }

    /// A nation AI.
    #[must_use]
    pub fn nation(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PlayerKind::FakeHuman,
            client_id: None,
        }
    }
}

/// Everything every replica must agree on before tick 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStartInfo {
    /// Game identifier; seeds every random stream.
    pub game_id: String,
    /// Rules.
    pub config: GameConfig,
    /// Terrain.
    pub map: TerrainMap,
    /// Players in join order.
    pub players: Vec<PlayerSetup>,
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickOutput {
    /// Tick that was executed.
    pub tick: Tick,
    /// Events emitted during the tick.
    pub events: Vec<GameEvent>,
    /// Consistency hash, on hash ticks.
    pub hash: Option<HashEvent>,
}

/// One replica of a running game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    world: World,
    scheduler: Scheduler,
}

impl Game {
    /// Set up a game at tick 0: join players, spawn tribe bots and queue the
    /// nation and win-check executions.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] for an invalid config, a bot in
    /// the player list or a client id used by two players, and
    /// [`GameError::MapParse`] for a map without land.
    pub fn new(info: GameStartInfo) -> Result<Self> {
        info.config.validate().map_err(GameError::InvalidState)?;
        if info.map.land_tile_count() == 0 {
            return Err(GameError::MapParse("map has no land".to_string()));
        }
        if info.players.iter().any(|p| p.kind == PlayerKind::Bot) {
            return Err(GameError::InvalidState(
                "bots are configured through `bots`, not the player list".to_string(),
            ));
        }
        let mut clients = BTreeSet::new();
        for client in info.players.iter().filter_map(|p| p.client_id.as_ref()) {
            if !clients.insert(client) {
                return Err(GameError::InvalidState(format!(
                    "client '{}' joined twice",
                    client.0
                )));
            }
        }

        let mut world = World::new(info.game_id, info.config, info.map);
        let mut scheduler = Scheduler::new();

        for setup in info.players {
            let id = world.add_player(setup.name, setup.kind, setup.client_id);
            if setup.kind == PlayerKind::FakeHuman {
                scheduler.add(FakeHumanExecution::new(id));
            }
        }

        let bots = world.config().bots;
        let mut spawner = BotSpawner::new(&world);
        scheduler.add_all(spawner.spawn_bots(&mut world, bots));
        scheduler.add(WinCheckExecution::new());

        tracing::info!(
            game_id = world.game_id(),
            players = world.players().count(),
            bots,
            "Game created"
        );
        Ok(Self { world, scheduler })
    }

    /// Apply the turn for the current tick.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::TurnOutOfOrder`] if the turn is not for the
    /// current tick, and [`GameError::InvalidState`] if hashing fails.
    pub fn execute_turn(&mut self, turn: &Turn) -> Result<TickOutput> {
        let tick = self.world.tick();
        if turn.turn_number != tick {
            return Err(GameError::TurnOutOfOrder {
                expected: tick,
                received: turn.turn_number,
            });
        }

        for intent in &turn.intents {
            let execution = translate(intent, &self.world);
            self.scheduler.add(execution);
        }
        self.scheduler.tick(&mut self.world);

        let hash = if tick % self.world.config().hash_interval == 0 {
            let hash = compute_state_hash(&self.world)?;
            tracing::debug!(tick, hash, "State hash");
            Some(HashEvent { tick, hash })
        } else {
            None
        };

        self.world.advance_tick();
        Ok(TickOutput {
            tick,
            events: self.world.drain_events(),
            hash,
        })
    }

    /// Apply empty turns until `tick` is reached.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Game::execute_turn`].
    pub fn run_until(&mut self, tick: Tick) -> Result<Vec<TickOutput>> {
        let mut outputs = Vec::new();
        while self.world.tick() < tick {
            outputs.push(self.execute_turn(&Turn::empty(self.world.tick()))?);
        }
        Ok(outputs)
    }

    /// Hash of the current state, regardless of cadence.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if the state cannot be encoded.
    pub fn state_hash(&self) -> Result<u64> {
        compute_state_hash(&self.world)
    }

    /// Next tick to be executed.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.world.tick()
    }

    /// Game state.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Live executions.
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Winner, once declared.
    #[must_use]
    pub const fn winner(&self) -> Option<SmallId> {
        self.world.winner()
    }

    /// Whether a winner has been declared.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.world.winner().is_some()
    }

    /// Snapshot the game for a save or late join.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if encoding fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize game: {e}")))
    }

    /// Restore a snapshot taken with [`Game::serialize`].
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if decoding fails.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize game: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Intent;

    fn info(game_id: &str) -> GameStartInfo {
        GameStartInfo {
            game_id: game_id.to_string(),
            config: GameConfig {
                spawn_phase_ticks: 5,
                ..GameConfig::default()
            },
            map: TerrainMap::from_ascii(
                "
                ##########
                ##########
                ##########
                ##########
                ",
            )
            .unwrap(),
            players: vec![PlayerSetup::human("alice", "c1"), PlayerSetup::human("bob", "c2")],
        }
    }

    #[test]
    fn test_new_game_starts_at_zero() {
        let game = Game::new(info("g")).unwrap();
        assert_eq!(game.tick(), 0);
        assert_eq!(game.world().players().count(), 2);
        assert!(!game.is_over());
        // Win check queued.
        assert_eq!(game.scheduler().pending_count(), 1);
    }

    #[test]
    fn test_rejects_bot_setup_and_empty_map() {
        let mut with_bot = info("g");
        with_bot.players.push(PlayerSetup {
            name: "tribe".to_string(),
            kind: PlayerKind::Bot,
            client_id: None,
        });
        assert!(matches!(Game::new(with_bot), Err(GameError::InvalidState(_))));

        let mut water = info("g");
        water.map = TerrainMap::from_ascii("...").unwrap();
        assert!(matches!(Game::new(water), Err(GameError::MapParse(_))));
    }

    #[test]
    fn test_rejects_duplicate_client() {
        let mut twins = info("g");
        twins.players.push(PlayerSetup::human("mallory", "c1"));
        let err = Game::new(twins).unwrap_err();
        assert!(matches!(err, GameError::InvalidState(ref m) if m.contains("c1")));

        // Nations carry no client and never clash.
        let mut nations = info("g");
        nations.players.push(PlayerSetup::nation("n1"));
        nations.players.push(PlayerSetup::nation("n2"));
        assert!(Game::new(nations).is_ok());
    }

    #[test]
    fn test_rejects_spawn_phase_too_short_to_spawn() {
        let mut short = info("g");
        short.config.spawn_phase_ticks = 1;
        assert!(matches!(Game::new(short), Err(GameError::InvalidState(_))));
    }

    #[test]
    fn test_turn_out_of_order() {
        let mut game = Game::new(info("g")).unwrap();
        let err = game.execute_turn(&Turn::empty(3)).unwrap_err();
        assert!(matches!(
            err,
            GameError::TurnOutOfOrder {
                expected: 0,
                received: 3
            }
        ));
        assert_eq!(game.tick(), 0);
    }

    #[test]
    fn test_hash_on_cadence() {
        let mut game = Game::new(info("g")).unwrap();
        let outputs = game.run_until(21).unwrap();
        let hashed: Vec<Tick> = outputs.iter().filter_map(|o| o.hash.map(|h| h.tick)).collect();
        assert_eq!(hashed, vec![0, 10, 20]);
    }

    #[test]
    fn test_spawn_intent_emits_event() {
        let mut game = Game::new(info("g")).unwrap();
        let turn = Turn::new(
            0,
            vec![Intent::Spawn {
                client_id: ClientId::new("c1"),
                tile: 12,
            }],
        );
        game.execute_turn(&turn).unwrap();
        let out = game.execute_turn(&Turn::empty(1)).unwrap();
        assert!(out
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::PlayerSpawned { .. })));
        let alice = game.world().player_by_client(&ClientId::new("c1")).unwrap();
        assert_eq!(game.world().owner(12), Some(alice));
    }

    #[test]
    fn test_snapshot_resumes_identically() {
        let mut game = Game::new(info("g")).unwrap();
        game.run_until(7).unwrap();
        let mut restored = Game::deserialize(&game.serialize().unwrap()).unwrap();
        assert_eq!(restored.state_hash().unwrap(), game.state_hash().unwrap());

        game.run_until(30).unwrap();
        restored.run_until(30).unwrap();
        assert_eq!(restored.state_hash().unwrap(), game.state_hash().unwrap());
    }
}
