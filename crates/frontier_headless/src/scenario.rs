//! Scenario loading and configuration.
//!
//! A scenario is everything needed to play a game without clients: the
//! start info (game id, rules, map, players) plus a script of turns in their
//! JSON wire form and the number of ticks to play.
//!
//! # Example RON
//!
//! ```ron
//! (
//!     name: "Duel",
//!     game_id: "duel",
//!     config: (spawn_phase_ticks: 10),
//!     map: Land(width: 24, height: 16),
//!     players: [
//!         (name: "alice", kind: Human, client_id: Some("client-a")),
//!         (name: "nation-1", kind: FakeHuman),
//!     ],
//!     turns: [
//!         r#"{"turnNumber":0,"intents":[{"type":"spawn","clientID":"client-a","tile":50}]}"#,
//!     ],
//!     ticks: 500,
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use frontier_core::config::GameConfig;
use frontier_core::error::GameError;
use frontier_core::game::{GameStartInfo, PlayerSetup};
use frontier_core::intent::Turn;
use frontier_core::map::TerrainMap;
use frontier_core::Tick;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// Neither a file nor a built-in scenario of that name.
    #[error("Scenario not found: {0}")]
    NotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The map or a scripted turn is invalid.
    #[error("Invalid scenario: {0}")]
    Invalid(#[from] GameError),
}

/// Terrain description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapSpec {
    /// All-land rectangle.
    Land {
        /// Width in tiles.
        width: u32,
        /// Height in tiles.
        height: u32,
    },
    /// ASCII rows, `#` for land and `.` for water.
    Ascii(Vec<String>),
}

impl MapSpec {
    /// Build the terrain.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Invalid`] for an empty or ragged map.
    pub fn build(&self) -> Result<TerrainMap, ScenarioError> {
        let text = match self {
            Self::Land { width, height } => {
                vec!["#".repeat(*width as usize); *height as usize].join("\n")
            }
            Self::Ascii(rows) => rows.join("\n"),
        };
        Ok(TerrainMap::from_ascii(&text)?)
    }
}

/// A complete scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Game id; seeds every random stream.
    pub game_id: String,
    /// Rules. Missing fields take their defaults.
    #[serde(default)]
    pub config: GameConfig,
    /// Terrain.
    pub map: MapSpec,
    /// Humans and nations, in join order.
    #[serde(default)]
    pub players: Vec<PlayerSetup>,
    /// Scripted turns as wire JSON. Ticks without a turn are empty.
    #[serde(default)]
    pub turns: Vec<String>,
    /// Ticks to play.
    pub ticks: Tick,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::NotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Load a file, or fall back to a built-in scenario of that name.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        if Path::new(name_or_path).exists() {
            return Self::load(name_or_path);
        }
        match name_or_path {
            "duel" => Ok(Self::duel()),
            "nations" => Ok(Self::nations(4, 8)),
            other => Err(ScenarioError::NotFound(other.to_string())),
        }
    }

    /// Two humans who spawn next to each other, then one attacks.
    #[must_use]
    pub fn duel() -> Self {
        Self {
            name: "Duel".to_string(),
            description: "Two scripted humans on a small continent".to_string(),
            game_id: "duel".to_string(),
            config: GameConfig {
                spawn_phase_ticks: 10,
                ..GameConfig::default()
            },
            map: MapSpec::Land {
                width: 24,
                height: 16,
            },
            players: vec![
                PlayerSetup::human("alice", "client-a"),
                PlayerSetup::human("bob", "client-b"),
            ],
            turns: vec![
                r#"{"turnNumber":0,"intents":[{"type":"spawn","clientID":"client-a","tile":101},{"type":"spawn","clientID":"client-b","tile":114}]}"#.to_string(),
                r#"{"turnNumber":12,"intents":[{"type":"attack","clientID":"client-a","targetID":null,"troops":800}]}"#.to_string(),
            ],
            ticks: 300,
        }
    }

    /// Nations and tribe bots with no humans.
    #[must_use]
    pub fn nations(nations: usize, bots: u32) -> Self {
        Self {
            name: "Nations".to_string(),
            description: "AI-only free-for-all".to_string(),
            game_id: "nations".to_string(),
            config: GameConfig {
                bots,
                spawn_phase_ticks: 20,
                ..GameConfig::default()
            },
            map: MapSpec::Land {
                width: 48,
                height: 32,
            },
            players: (1..=nations)
                .map(|n| PlayerSetup::nation(format!("nation-{n}")))
                .collect(),
            turns: Vec::new(),
            ticks: 1_000,
        }
    }

    /// Start info for a game with this scenario's setup.
    pub fn start_info(&self) -> Result<GameStartInfo, ScenarioError> {
        self.start_info_with_id(&self.game_id)
    }

    /// Start info under another game id, for batches and seeds.
    pub fn start_info_with_id(&self, game_id: &str) -> Result<GameStartInfo, ScenarioError> {
        Ok(GameStartInfo {
            game_id: game_id.to_string(),
            config: self.config.clone(),
            map: self.map.build()?,
            players: self.players.clone(),
        })
    }

    /// Decode the scripted turns, sorted by turn number.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Invalid`] if a turn is not valid wire JSON or
    /// names an unknown intent kind.
    pub fn scripted_turns(&self) -> Result<Vec<Turn>, ScenarioError> {
        let mut turns = self
            .turns
            .iter()
            .map(|wire| Turn::decode(wire))
            .collect::<Result<Vec<_>, _>>()?;
        turns.sort_by_key(|t| t.turn_number);
        Ok(turns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontier_core::world::PlayerKind;

    #[test]
    fn test_builtin_duel_is_playable() {
        let scenario = Scenario::duel();
        let info = scenario.start_info().unwrap();
        assert_eq!(info.map.width(), 24);
        assert_eq!(info.players.len(), 2);

        let turns = scenario.scripted_turns().unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].turn_number, 0);
        assert_eq!(turns[1].intents[0].kind(), "attack");
    }

    #[test]
    fn test_parse_ron_scenario() {
        let ron = r####"(
            name: "Strait",
            game_id: "strait",
            config: (spawn_phase_ticks: 3, bots: 2),
            map: Ascii(["###..###", "###..###"]),
            players: [
                (name: "alice", kind: Human, client_id: Some("client-a")),
                (name: "nation-1", kind: FakeHuman),
            ],
            turns: [
                r#"{"turnNumber":0,"intents":[{"type":"spawn","clientID":"client-a","tile":0}]}"#,
            ],
            ticks: 40,
        )"####;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.config.spawn_phase_ticks, 3);
        assert_eq!(scenario.config.bots, 2);
        assert_eq!(scenario.players[1].kind, PlayerKind::FakeHuman);
        assert!(scenario.players[1].client_id.is_none());

        let info = scenario.start_info().unwrap();
        assert_eq!(info.map.land_tile_count(), 12);
        assert!(info.map.is_water(3));
        assert_eq!(scenario.scripted_turns().unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_intent_kind_is_invalid() {
        let mut scenario = Scenario::duel();
        scenario
            .turns
            .push(r#"{"turnNumber":5,"intents":[{"type":"teleport","clientID":"x"}]}"#.to_string());
        assert!(matches!(
            scenario.scripted_turns(),
            Err(ScenarioError::Invalid(GameError::Protocol(_)))
        ));
    }

    #[test]
    fn test_resolve() {
        assert_eq!(Scenario::resolve("duel").unwrap().name, "Duel");
        assert_eq!(Scenario::resolve("nations").unwrap().players.len(), 4);
        assert!(matches!(
            Scenario::resolve("no-such-scenario"),
            Err(ScenarioError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("land.ron");
        std::fs::write(
            &path,
            r#"(name: "Land", game_id: "land", map: Land(width: 4, height: 3), ticks: 10)"#,
        )
        .unwrap();
        let scenario = Scenario::resolve(path.to_str().unwrap()).unwrap();
        assert_eq!(scenario.ticks, 10);
        assert!(scenario.players.is_empty());
        assert_eq!(scenario.start_info().unwrap().map.land_tile_count(), 12);
    }
}
