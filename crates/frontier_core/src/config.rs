//! Game configuration.
//!
//! Every tunable of the simulation lives in [`GameConfig`], which is part of
//! the game start info and therefore identical on every replica. Configs are
//! written in RON; any field left out takes its default.
//!
//! # Example RON
//!
//! ```ron
//! (
//!     spawn_phase_ticks: 50,
//!     difficulty: Hard,
//!     bots: 8,
//!     disabled_units: [HydrogenBomb, Mirv],
//!     economy: (starting_gold: 100000),
//! )
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::world::UnitType;
use crate::Tick;

/// Upper bound for percentage multipliers, so they convert to fixed point.
pub const MAX_MULTIPLIER_PERCENT: u32 = 1_000_000;

/// AI and donation difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    /// Slow, forgiving AI.
    Easy,
    /// Default.
    #[default]
    Medium,
    /// Aggressive AI.
    Hard,
    /// Fastest cadence, hardest to please.
    Impossible,
}

impl Difficulty {
    /// All tiers, easiest first.
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Impossible,
    ];

    /// Half-open band `[lo, hi)` of the percentage of an AI recipient's own
    /// stock a donation must reach before the recipient warms up to the donor.
    #[must_use]
    pub const fn donation_threshold_band(self) -> (i64, i64) {
        match self {
            Self::Easy => (5, 10),
            Self::Medium => (10, 20),
            Self::Hard => (20, 35),
            Self::Impossible => (35, 50),
        }
    }

    /// Half-open band of AI attack cadence in ticks.
    #[must_use]
    pub const fn attack_rate_band(self) -> (i64, i64) {
        match self {
            Self::Easy => (65, 80),
            Self::Medium => (50, 65),
            Self::Hard => (40, 50),
            Self::Impossible => (30, 40),
        }
    }

    /// One-in-N odds that a nation hesitates and skips a MIRV launch.
    #[must_use]
    pub const fn mirv_hesitation_odds(self) -> u32 {
        match self {
            Self::Easy => 2,
            Self::Medium => 4,
            Self::Hard => 8,
            Self::Impossible => 16,
        }
    }
}

/// Troop and gold economy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Troops a human or nation starts with.
    pub starting_troops: u64,
    /// Troops a bot starts with.
    pub bot_starting_troops: u64,
    /// Gold every player starts with.
    pub starting_gold: u64,
    /// Troop cap before tiles and cities.
    pub base_max_troops: u64,
    /// Troop cap added per owned tile.
    pub troops_per_tile: u64,
    /// Troop cap added per completed city.
    pub city_troop_bonus: u64,
    /// Percentage of the gap to the cap regained each tick.
    pub troop_growth_percent: u32,
    /// Flat troops regained each tick while under the cap.
    pub base_troop_growth: u64,
    /// Gold earned per tick regardless of size.
    pub base_gold_income: u64,
    /// One extra gold per this many tiles each tick.
    pub tiles_per_gold: u64,
    /// Ticks between port trade payouts.
    pub port_trade_interval: Tick,
    /// Gold per trading partner port at each payout.
    pub port_trade_gold: u64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_troops: 2_500,
            bot_starting_troops: 1_000,
            starting_gold: 0,
            base_max_troops: 5_000,
            troops_per_tile: 25,
            city_troop_bonus: 25_000,
            troop_growth_percent: 1,
            base_troop_growth: 10,
            base_gold_income: 100,
            tiles_per_gold: 10,
            port_trade_interval: 50,
            port_trade_gold: 2_000,
        }
    }
}

/// Land attacks and transport ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackConfig {
    /// Share of troops sent when an attack names no amount, in percent.
    pub default_attack_ratio_percent: u32,
    /// Maximum tiles an attack conquers per tick.
    pub tiles_per_tick: usize,
    /// Ticks after which an attack resolves regardless of progress.
    pub max_ticks: Tick,
    /// Troops needed to take one unclaimed tile.
    pub unclaimed_tile_cost: u64,
    /// Troops needed per tile on top of the defender's density.
    pub base_tile_cost: u64,
    /// Cost multiplier for tiles near a defense post.
    pub defense_post_multiplier: u64,
    /// Manhattan range of a defense post.
    pub defense_post_range: u32,
    /// Tiles a transport ship travels per tick.
    pub ship_speed: u32,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            default_attack_ratio_percent: 20,
            tiles_per_tick: 4,
            max_ticks: 300,
            unclaimed_tile_cost: 2,
            base_tile_cost: 5,
            defense_post_multiplier: 3,
            defense_post_range: 5,
            ship_speed: 2,
        }
    }
}

/// Alliances, relations and donations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiplomacyConfig {
    /// Ticks an alliance request waits for a reply before auto-rejecting.
    pub alliance_request_duration: Tick,
    /// Ticks an accepted alliance lasts.
    pub alliance_duration: Tick,
    /// Ticks a player stays flagged as traitor after breaking an alliance.
    pub traitor_duration: Tick,
    /// Relation gained by an AI recipient of a large enough donation.
    pub donation_relation_delta: i32,
    /// Relation lost toward an attacker when an attack lands.
    pub attack_relation_penalty: i32,
    /// Ticks between one-step relation decays toward neutral.
    pub relation_decay_interval: Tick,
    /// Ticks a `targetPlayer` mark stays relevant to allies.
    pub target_window: Tick,
}

impl Default for DiplomacyConfig {
    fn default() -> Self {
        Self {
            alliance_request_duration: 200,
            alliance_duration: 3_000,
            traitor_duration: 300,
            donation_relation_delta: 25,
            attack_relation_penalty: 10,
            relation_decay_interval: 20,
            target_window: 300,
        }
    }
}

/// Cost and build time of one unit kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpec {
    /// Cost of the first unit.
    pub cost: u64,
    /// Extra cost per unit of this kind already owned.
    pub cost_step: u64,
    /// Cost ceiling.
    pub max_cost: u64,
    /// Ticks from order to completion.
    pub build_ticks: Tick,
}

impl UnitSpec {
    const fn flat(cost: u64, build_ticks: Tick) -> Self {
        Self {
            cost,
            cost_step: 0,
            max_cost: cost,
            build_ticks,
        }
    }

    const fn scaling(cost: u64, max_cost: u64, build_ticks: Tick) -> Self {
        Self {
            cost,
            cost_step: cost,
            max_cost,
            build_ticks,
        }
    }

    /// Cost of the next unit when `owned` of this kind already exist.
    #[must_use]
    pub fn cost_for(&self, owned: usize) -> u64 {
        self.cost_step
            .saturating_mul(owned as u64)
            .saturating_add(self.cost)
            .min(self.max_cost)
    }

    /// Built-in spec for a kind.
    #[must_use]
    pub const fn builtin(kind: UnitType) -> Self {
        match kind {
            UnitType::City | UnitType::Port => Self::scaling(125_000, 1_000_000, 20),
            UnitType::DefensePost => Self::scaling(50_000, 250_000, 5),
            UnitType::SamLauncher => Self::scaling(1_500_000, 3_000_000, 30),
            UnitType::MissileSilo => Self::flat(1_000_000, 10),
            UnitType::AtomBomb => Self::flat(750_000, 0),
            UnitType::HydrogenBomb => Self::flat(5_000_000, 0),
            UnitType::Mirv => Self::flat(35_000_000, 0),
            UnitType::TransportShip | UnitType::MirvWarhead => Self::flat(0, 0),
        }
    }
}

/// Per-unit overrides and placement rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitsConfig {
    /// Specs replacing the built-in ones.
    pub overrides: BTreeMap<UnitType, UnitSpec>,
    /// Minimum Manhattan distance between two structures of one player.
    pub structure_min_distance: u32,
}

impl Default for UnitsConfig {
    fn default() -> Self {
        Self {
            overrides: BTreeMap::new(),
            structure_min_distance: 3,
        }
    }
}

impl UnitsConfig {
    /// Effective spec for a kind.
    #[must_use]
    pub fn spec(&self, kind: UnitType) -> UnitSpec {
        self.overrides
            .get(&kind)
            .copied()
            .unwrap_or_else(|| UnitSpec::builtin(kind))
    }
}

/// Nukes, MIRVs, silos and SAM launchers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NukeConfig {
    /// Radius of tiles an atom bomb irradiates.
    pub atom_inner_radius: u32,
    /// Radius in which an atom bomb destroys units.
    pub atom_outer_radius: u32,
    /// Radius of tiles a hydrogen bomb irradiates.
    pub hydrogen_inner_radius: u32,
    /// Radius in which a hydrogen bomb destroys units.
    pub hydrogen_outer_radius: u32,
    /// Tiles a missile travels per tick.
    pub missile_speed: u32,
    /// Warheads a MIRV splits into.
    pub mirv_warheads: usize,
    /// Ticks from MIRV launch to separation.
    pub mirv_separation_ticks: Tick,
    /// Range within which a SAM launcher intercepts.
    pub sam_range: u32,
    /// Ticks a SAM launcher reloads after an interception.
    pub sam_cooldown: Tick,
    /// Ticks a silo reloads after a launch.
    pub silo_cooldown: Tick,
}

impl Default for NukeConfig {
    fn default() -> Self {
        Self {
            atom_inner_radius: 3,
            atom_outer_radius: 5,
            hydrogen_inner_radius: 8,
            hydrogen_outer_radius: 12,
            missile_speed: 6,
            mirv_warheads: 8,
            mirv_separation_ticks: 10,
            sam_range: 15,
            sam_cooldown: 75,
            silo_cooldown: 50,
        }
    }
}

/// AI decision thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Ticks an AI remembers who attacked it.
    pub enemy_memory_ticks: Tick,
    /// Troop density an AI needs, relative to a target's, before attacking
    /// it, in percent.
    pub attack_density_percent: u32,
    /// Share of troops an AI commits to an attack, in percent.
    pub attack_commit_percent: u32,
    /// Share of the troop cap an AI keeps home before attacking, in percent.
    pub reserve_percent: u32,
    /// An AI rejects alliances from players with this many times its troops,
    /// in percent.
    pub stronger_reject_percent: u32,
    /// One-in-N odds that a bot accepts an alliance request.
    pub bot_alliance_accept_odds: u32,
    /// Multiplier applied to real costs when a nation decides to build, in
    /// percent.
    pub perceived_cost_percent: u32,
    /// Enemy tiles sampled per nuke targeting pass.
    pub nuke_sample_tiles: usize,
    /// Score weight of one structure in a blast.
    pub nuke_structure_weight: i64,
    /// Score penalty per SAM launcher covering a candidate tile.
    pub nuke_sam_penalty: i64,
    /// Score penalty for tiles near a recent own target.
    pub nuke_recency_penalty: i64,
    /// Ticks a nuke target counts as recent.
    pub nuke_recency_ticks: Tick,
    /// A nation MIRVs a player holding this share of the win threshold, in
    /// percent.
    pub mirv_victory_denial_percent: u32,
    /// A nation MIRVs a leader holding this multiple of the runner-up's
    /// tiles, in percent.
    pub mirv_steamroll_percent: u32,
    /// Minimum tiles the leader needs before steamroll prevention applies.
    pub mirv_steamroll_min_tiles: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enemy_memory_ticks: 600,
            attack_density_percent: 80,
            attack_commit_percent: 40,
            reserve_percent: 30,
            stronger_reject_percent: 300,
            bot_alliance_accept_odds: 3,
            perceived_cost_percent: 150,
            nuke_sample_tiles: 24,
            nuke_structure_weight: 25,
            nuke_sam_penalty: 50,
            nuke_recency_penalty: 40,
            nuke_recency_ticks: 300,
            mirv_victory_denial_percent: 75,
            mirv_steamroll_percent: 200,
            mirv_steamroll_min_tiles: 50,
        }
    }
}

/// Complete game configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Ticks from game start during which only placement is allowed.
    pub spawn_phase_ticks: Tick,
    /// Ticks between consistency hashes.
    pub hash_interval: Tick,
    /// AI and donation difficulty.
    pub difficulty: Difficulty,
    /// Number of tribe bots to spawn at game start.
    pub bots: u32,
    /// Unit kinds that cannot be built.
    pub disabled_units: Vec<UnitType>,
    /// Whether gold and troop donations are allowed.
    pub donations_enabled: bool,
    /// Manhattan radius of the starting territory.
    pub spawn_radius: u32,
    /// Share of claimable land that wins the game, in percent.
    pub win_threshold_percent: u32,
    /// Ticks between win checks.
    pub win_check_interval: Tick,
    /// Economy tuning.
    pub economy: EconomyConfig,
    /// Attack tuning.
    pub attack: AttackConfig,
    /// Diplomacy tuning.
    pub diplomacy: DiplomacyConfig,
    /// Unit costs and placement.
    pub units: UnitsConfig,
    /// Missile tuning.
    pub nukes: NukeConfig,
    /// AI thresholds.
    pub ai: AiConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            spawn_phase_ticks: 100,
            hash_interval: 10,
            difficulty: Difficulty::default(),
            bots: 0,
            disabled_units: Vec::new(),
            donations_enabled: true,
            spawn_radius: 2,
            win_threshold_percent: 80,
            win_check_interval: 10,
            economy: EconomyConfig::default(),
            attack: AttackConfig::default(),
            diplomacy: DiplomacyConfig::default(),
            units: UnitsConfig::default(),
            nukes: NukeConfig::default(),
            ai: AiConfig::default(),
        }
    }
}

impl GameConfig {
    /// Parse a config from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ConfigParse`] if the text is not a valid config.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        Self::parse(text, "<inline>")
    }

    /// Load a config from a RON file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ConfigParse`] if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| GameError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    fn parse(text: &str, origin: &str) -> Result<Self> {
        let config: Self = ron::from_str(text).map_err(|e| GameError::ConfigParse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        config.validate().map_err(|message| GameError::ConfigParse {
            path: origin.to_string(),
            message,
        })?;
        Ok(config)
    }

    /// Check values the simulation divides by or iterates on.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> std::result::Result<(), String> {
        // A spawn queued on tick N first runs on tick N + 1, which must still
        // fall inside the phase.
        if self.spawn_phase_ticks < 2 {
            return Err("spawn_phase_ticks must be at least 2".to_string());
        }
        if self.hash_interval == 0 {
            return Err("hash_interval must be at least 1".to_string());
        }
        if self.win_check_interval == 0 {
            return Err("win_check_interval must be at least 1".to_string());
        }
        if self.win_threshold_percent == 0 || self.win_threshold_percent > 100 {
            return Err("win_threshold_percent must be in 1..=100".to_string());
        }
        if self.attack.tiles_per_tick == 0 || self.attack.ship_speed == 0 {
            return Err("attack speeds must be at least 1".to_string());
        }
        if self.nukes.missile_speed == 0 {
            return Err("nukes.missile_speed must be at least 1".to_string());
        }
        if self.economy.port_trade_interval == 0 || self.diplomacy.relation_decay_interval == 0 {
            return Err("intervals must be at least 1".to_string());
        }
        let shares = [
            ("attack.default_attack_ratio_percent", self.attack.default_attack_ratio_percent),
            ("economy.troop_growth_percent", self.economy.troop_growth_percent),
            ("ai.attack_commit_percent", self.ai.attack_commit_percent),
            ("ai.reserve_percent", self.ai.reserve_percent),
        ];
        if let Some((name, _)) = shares.iter().find(|(_, pct)| *pct > 100) {
            return Err(format!("{name} must be at most 100"));
        }
        // Multipliers may exceed 100 but must fit the fixed-point range.
        let multipliers = [
            ("ai.attack_density_percent", self.ai.attack_density_percent),
            ("ai.stronger_reject_percent", self.ai.stronger_reject_percent),
            ("ai.perceived_cost_percent", self.ai.perceived_cost_percent),
            ("ai.mirv_victory_denial_percent", self.ai.mirv_victory_denial_percent),
            ("ai.mirv_steamroll_percent", self.ai.mirv_steamroll_percent),
        ];
        if let Some((name, _)) = multipliers.iter().find(|(_, pct)| *pct > MAX_MULTIPLIER_PERCENT) {
            return Err(format!("{name} must be at most {MAX_MULTIPLIER_PERCENT}"));
        }
        Ok(())
    }

    /// Whether a unit kind may be built in this game.
    #[must_use]
    pub fn is_unit_disabled(&self, kind: UnitType) -> bool {
        self.disabled_units.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = GameConfig::from_ron_str(
            "(spawn_phase_ticks: 50, difficulty: Hard, economy: (starting_gold: 7))",
        )
        .unwrap();
        assert_eq!(config.spawn_phase_ticks, 50);
        assert_eq!(config.difficulty, Difficulty::Hard);
        assert_eq!(config.economy.starting_gold, 7);
        assert_eq!(
            config.economy.starting_troops,
            EconomyConfig::default().starting_troops
        );
        assert_eq!(config.hash_interval, 10);
    }

    #[test]
    fn test_invalid_ron_is_config_error() {
        let err = GameConfig::from_ron_str("(spawn_phase_ticks: \"soon\")").unwrap_err();
        assert!(matches!(err, GameError::ConfigParse { .. }));

        let err = GameConfig::from_ron_str("(hash_interval: 0)").unwrap_err();
        assert!(matches!(err, GameError::ConfigParse { .. }));
    }

    #[test]
    fn test_spawn_phase_must_fit_a_spawn() {
        for ticks in [0, 1] {
            let config = GameConfig {
                spawn_phase_ticks: ticks,
                ..GameConfig::default()
            };
            assert!(config.validate().unwrap_err().contains("spawn_phase_ticks"));
        }
        let config = GameConfig {
            spawn_phase_ticks: 2,
            ..GameConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_percentages_are_bounded() {
        let mut config = GameConfig::default();
        config.ai.attack_commit_percent = 101;
        assert!(config.validate().unwrap_err().contains("attack_commit_percent"));

        let mut config = GameConfig::default();
        config.economy.troop_growth_percent = u32::MAX;
        assert!(config.validate().unwrap_err().contains("troop_growth_percent"));

        let mut config = GameConfig::default();
        config.ai.attack_density_percent = 250;
        assert!(config.validate().is_ok());
        config.ai.attack_density_percent = u32::MAX;
        assert!(config.validate().unwrap_err().contains("attack_density_percent"));
    }

    #[test]
    fn test_unit_cost_scales_and_caps() {
        let city = UnitSpec::builtin(UnitType::City);
        assert_eq!(city.cost_for(0), 125_000);
        assert_eq!(city.cost_for(1), 250_000);
        assert_eq!(city.cost_for(100), 1_000_000);

        let silo = UnitSpec::builtin(UnitType::MissileSilo);
        assert_eq!(silo.cost_for(0), silo.cost_for(5));
    }

    #[test]
    fn test_unit_override() {
        let config = GameConfig::from_ron_str(
            "(units: (overrides: {City: (cost: 10, cost_step: 0, max_cost: 10, build_ticks: 1)}))",
        )
        .unwrap();
        assert_eq!(config.units.spec(UnitType::City).cost_for(3), 10);
        assert_eq!(
            config.units.spec(UnitType::Port),
            UnitSpec::builtin(UnitType::Port)
        );
    }

    #[test]
    fn test_difficulty_bands_are_ordered() {
        for pair in Difficulty::ALL.windows(2) {
            let (easy, hard) = (pair[0], pair[1]);
            assert!(easy.donation_threshold_band().0 < hard.donation_threshold_band().0);
            assert!(easy.attack_rate_band().0 > hard.attack_rate_band().0);
            assert!(easy.mirv_hesitation_odds() < hard.mirv_hesitation_odds());
        }
        for difficulty in Difficulty::ALL {
            let (lo, hi) = difficulty.donation_threshold_band();
            assert!(lo < hi);
        }
    }
}
