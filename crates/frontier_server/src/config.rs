//! Server configuration.
//!
//! Loaded from RON; every field has a default.
//!
//! ```ron
//! (
//!     game_id: "ranked-42",
//!     turn_interval_ms: 100,
//!     map: ["########", "##....##", "########"],
//!     players: [(name: "alice", kind: Human, client_id: Some("c1"))],
//!     game: (bots: 10),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use frontier_core::config::GameConfig;
use frontier_core::game::{GameStartInfo, PlayerSetup};
use frontier_core::hash::DEFAULT_HISTORY;
use frontier_core::map::TerrainMap;
use frontier_core::Tick;

use crate::error::{Result, ServerError};

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Game id handed to every replica.
    pub game_id: String,
    /// Rules handed to every replica.
    pub game: GameConfig,
    /// Terrain as ASCII rows, `#` land and `.` water.
    pub map: Vec<String>,
    /// Humans and nations in join order.
    pub players: Vec<PlayerSetup>,
    /// Wall-clock length of one turn.
    pub turn_interval_ms: u64,
    /// Capacity of the host's command queue and the client inbox.
    pub channel_capacity: usize,
    /// Ticks of hash history kept for late reports.
    pub hash_history: usize,
    /// End the session after this many ticks.
    pub max_ticks: Option<Tick>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            game_id: "frontier".to_string(),
            game: GameConfig::default(),
            map: vec!["#".repeat(64); 48],
            players: Vec::new(),
            turn_interval_ms: 100,
            channel_capacity: 256,
            hash_history: DEFAULT_HISTORY,
            max_ticks: None,
        }
    }
}

impl ServerConfig {
    /// Parse from a RON string.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the text is not a valid config.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| ServerError::Config {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Load from a RON file.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ServerError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        ron::from_str(&text).map_err(|e| ServerError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Start info every replica of this session is created from.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Game`] if the map is empty or ragged.
    pub fn start_info(&self) -> Result<GameStartInfo> {
        Ok(GameStartInfo {
            game_id: self.game_id.clone(),
            config: self.game.clone(),
            map: TerrainMap::from_ascii(&self.map.join("\n"))?,
            players: self.players.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontier_core::world::PlayerKind;

    #[test]
    fn test_default_start_info() {
        let info = ServerConfig::default().start_info().unwrap();
        assert_eq!(info.map.width(), 64);
        assert_eq!(info.map.land_tile_count(), 64 * 48);
        assert!(info.players.is_empty());
    }

    #[test]
    fn test_parse_ron() {
        let config = ServerConfig::from_ron_str(
            r#####"(
                game_id: "ranked-42",
                turn_interval_ms: 50,
                map: ["####", "#..#"],
                players: [
                    (name: "alice", kind: Human, client_id: Some("c1")),
                    (name: "nation", kind: FakeHuman),
                ],
                game: (bots: 3),
                max_ticks: Some(500),
            )"#####,
        )
        .unwrap();
        assert_eq!(config.turn_interval_ms, 50);
        assert_eq!(config.game.bots, 3);
        assert_eq!(config.max_ticks, Some(500));
        assert_eq!(config.channel_capacity, 256);
        assert_eq!(config.players[1].kind, PlayerKind::FakeHuman);
        assert_eq!(config.start_info().unwrap().map.land_tile_count(), 6);
    }

    #[test]
    fn test_bad_config_is_reported() {
        assert!(matches!(
            ServerConfig::from_ron_str("(turn_interval_ms: \"fast\")"),
            Err(ServerError::Config { .. })
        ));
        assert!(matches!(
            ServerConfig::load("/nonexistent/server.ron"),
            Err(ServerError::Config { .. })
        ));
    }

    #[test]
    fn test_bundled_config_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/server.ron");
        let config = ServerConfig::load(path).unwrap();
        assert_eq!(config.players.len(), 4);
        assert_eq!(config.game.bots, 12);
        frontier_core::game::Game::new(config.start_info().unwrap()).unwrap();
    }
}
