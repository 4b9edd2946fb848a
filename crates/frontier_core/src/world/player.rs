//! Player identity and per-player state.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::map::TileRef;
use crate::math::{fixed_serde, ratio, Fixed};
use crate::Tick;

/// Internal player index used for tile ownership. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SmallId(pub u16);

impl fmt::Display for SmallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Wire identifier of a player, used in intent target fields.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Create a player id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the client that sent an intent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    /// Create a client id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who controls a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerKind {
    /// A connected human client.
    Human,
    /// A simple tribe bot.
    Bot,
    /// A nation AI that plays like a human.
    FakeHuman,
}

impl PlayerKind {
    /// Whether the player is controlled by an AI execution.
    #[must_use]
    pub const fn is_ai(self) -> bool {
        matches!(self, Self::Bot | Self::FakeHuman)
    }
}

/// Static information about a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Display name.
    pub name: String,
    /// Controller kind.
    pub kind: PlayerKind,
    /// Client that acts for this player.
    pub client_id: ClientId,
    /// Wire id.
    pub player_id: PlayerId,
}

/// Coarse diplomatic stance derived from the relation score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Relation {
    /// Score below -50.
    Hostile,
    /// Score in `-50..0`.
    Distrustful,
    /// Score in `0..50`.
    Neutral,
    /// Score of 50 and above.
    Friendly,
}

impl Relation {
    /// Classify a relation score.
    #[must_use]
    pub const fn from_score(score: i32) -> Self {
        if score < -50 {
            Self::Hostile
        } else if score < 0 {
            Self::Distrustful
        } else if score < 50 {
            Self::Neutral
        } else {
            Self::Friendly
        }
    }
}

/// Lowest relation score.
pub const MIN_RELATION: i32 = -100;
/// Highest relation score.
pub const MAX_RELATION: i32 = 100;

/// Mutable state of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    small_id: SmallId,
    info: PlayerInfo,
    /// Troops available at home (not committed to attacks or ships).
    pub troops: u64,
    /// Gold stockpile.
    pub gold: u64,
    /// Fraction of troops sent by attacks that do not name an amount.
    #[serde(with = "fixed_serde")]
    pub attack_ratio: Fixed,
    tiles: BTreeSet<TileRef>,
    relations: BTreeMap<SmallId, i32>,
    embargoes: BTreeSet<SmallId>,
    targets: BTreeMap<SmallId, Tick>,
    traitor_until: Option<Tick>,
    has_spawned: bool,
    alive: bool,
    /// Set by `mark_disconnected`.
    pub disconnected: bool,
}

impl Player {
    /// Create an unspawned player.
    #[must_use]
    pub fn new(small_id: SmallId, info: PlayerInfo, troops: u64, gold: u64, attack_ratio: Fixed) -> Self {
        Self {
            small_id,
            info,
            troops,
            gold,
            attack_ratio,
            tiles: BTreeSet::new(),
            relations: BTreeMap::new(),
            embargoes: BTreeSet::new(),
            targets: BTreeMap::new(),
            traitor_until: None,
            has_spawned: false,
            alive: true,
            disconnected: false,
        }
    }

    /// Internal id.
    #[must_use]
    pub const fn small_id(&self) -> SmallId {
        self.small_id
    }

    /// Static info.
    #[must_use]
    pub const fn info(&self) -> &PlayerInfo {
        &self.info
    }

    /// Wire id.
    #[must_use]
    pub const fn id(&self) -> &PlayerId {
        &self.info.player_id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Controller kind.
    #[must_use]
    pub const fn kind(&self) -> PlayerKind {
        self.info.kind
    }

    /// Owned tiles in ascending order.
    #[must_use]
    pub const fn tiles(&self) -> &BTreeSet<TileRef> {
        &self.tiles
    }

    /// Number of owned tiles.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub(crate) fn add_tile(&mut self, tile: TileRef) {
        self.tiles.insert(tile);
    }

    pub(crate) fn remove_tile(&mut self, tile: TileRef) {
        self.tiles.remove(&tile);
    }

    /// Troops per owned tile.
    #[must_use]
    pub fn troop_density(&self) -> Fixed {
        ratio(self.troops, self.tiles.len() as u64)
    }

    /// Whether the player has placed a starting position.
    #[must_use]
    pub const fn has_spawned(&self) -> bool {
        self.has_spawned
    }

    pub(crate) fn set_spawned(&mut self) {
        self.has_spawned = true;
    }

    /// Whether the player is still in the game.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    pub(crate) fn kill(&mut self) {
        self.alive = false;
        self.troops = 0;
    }

    /// Relation score toward another player (0 when never set).
    #[must_use]
    pub fn relation_score(&self, other: SmallId) -> i32 {
        self.relations.get(&other).copied().unwrap_or(0)
    }

    /// Coarse relation toward another player.
    #[must_use]
    pub fn relation(&self, other: SmallId) -> Relation {
        Relation::from_score(self.relation_score(other))
    }

    /// All non-zero relation scores, sorted by player.
    #[must_use]
    pub const fn relations(&self) -> &BTreeMap<SmallId, i32> {
        &self.relations
    }

    /// Add `delta` to the relation score toward `other`, clamped.
    pub fn update_relation(&mut self, other: SmallId, delta: i32) {
        if other == self.small_id {
            return;
        }
        let score = (self.relation_score(other) + delta).clamp(MIN_RELATION, MAX_RELATION);
        if score == 0 {
            self.relations.remove(&other);
        } else {
            self.relations.insert(other, score);
        }
    }

    /// Move every relation score one step toward zero.
    pub fn decay_relations(&mut self) {
        for score in self.relations.values_mut() {
            *score -= score.signum();
        }
        self.relations.retain(|_, score| *score != 0);
    }

    /// Whether this player embargoes `other`.
    #[must_use]
    pub fn has_embargo_against(&self, other: SmallId) -> bool {
        self.embargoes.contains(&other)
    }

    /// Players this player embargoes.
    #[must_use]
    pub const fn embargoes(&self) -> &BTreeSet<SmallId> {
        &self.embargoes
    }

    /// Start an embargo. Returns false if one was already in place.
    pub fn add_embargo(&mut self, other: SmallId) -> bool {
        other != self.small_id && self.embargoes.insert(other)
    }

    /// Lift an embargo. Returns false if none was in place.
    pub fn stop_embargo(&mut self, other: SmallId) -> bool {
        self.embargoes.remove(&other)
    }

    /// Mark a player as a target (allies of this player may join in).
    pub fn target(&mut self, other: SmallId, tick: Tick) {
        if other != self.small_id {
            self.targets.insert(other, tick);
        }
    }

    /// Targets marked within `window` ticks of `now`.
    #[must_use]
    pub fn recent_targets(&self, now: Tick, window: Tick) -> Vec<SmallId> {
        self.targets
            .iter()
            .filter(|(_, &at)| now.saturating_sub(at) <= window)
            .map(|(&id, _)| id)
            .collect()
    }

    /// Whether the player is flagged as a traitor at `tick`.
    #[must_use]
    pub fn is_traitor(&self, tick: Tick) -> bool {
        self.traitor_until.is_some_and(|until| tick < until)
    }

    pub(crate) fn mark_traitor(&mut self, until: Tick) {
        self.traitor_until = Some(until);
    }

    /// Clear an expired traitor flag. Returns true if it was cleared.
    pub(crate) fn expire_traitor(&mut self, tick: Tick) -> bool {
        if self.traitor_until.is_some_and(|until| tick >= until) {
            self.traitor_until = None;
            return true;
        }
        false
    }

    /// Tick the traitor flag expires, if set.
    #[must_use]
    pub const fn traitor_until(&self) -> Option<Tick> {
        self.traitor_until
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> Player {
        Player::new(
            SmallId(1),
            PlayerInfo {
                name: "Alice".to_string(),
                kind: PlayerKind::Human,
                client_id: ClientId::new("client-a"),
                player_id: PlayerId::new("AAAAAAAA"),
            },
            1000,
            0,
            Fixed::from_num(0.2),
        )
    }

    #[test]
    fn test_relation_thresholds() {
        assert_eq!(Relation::from_score(-100), Relation::Hostile);
        assert_eq!(Relation::from_score(-51), Relation::Hostile);
        assert_eq!(Relation::from_score(-50), Relation::Distrustful);
        assert_eq!(Relation::from_score(0), Relation::Neutral);
        assert_eq!(Relation::from_score(50), Relation::Friendly);
    }

    #[test]
    fn test_update_relation_clamps() {
        let mut p = player();
        p.update_relation(SmallId(2), -500);
        assert_eq!(p.relation_score(SmallId(2)), MIN_RELATION);
        p.update_relation(SmallId(2), 1000);
        assert_eq!(p.relation_score(SmallId(2)), MAX_RELATION);
        // Self relations are ignored.
        p.update_relation(SmallId(1), 10);
        assert_eq!(p.relation_score(SmallId(1)), 0);
    }

    #[test]
    fn test_decay_moves_toward_zero() {
        let mut p = player();
        p.update_relation(SmallId(2), 2);
        p.update_relation(SmallId(3), -1);
        p.decay_relations();
        assert_eq!(p.relation_score(SmallId(2)), 1);
        assert_eq!(p.relation_score(SmallId(3)), 0);
        assert!(!p.relations().contains_key(&SmallId(3)));
    }

    #[test]
    fn test_traitor_flag_expires() {
        let mut p = player();
        p.mark_traitor(10);
        assert!(p.is_traitor(9));
        assert!(!p.expire_traitor(9));
        assert!(p.expire_traitor(10));
        assert!(!p.is_traitor(10));
    }

    #[test]
    fn test_embargo_toggle() {
        let mut p = player();
        assert!(p.add_embargo(SmallId(2)));
        assert!(!p.add_embargo(SmallId(2)));
        assert!(!p.add_embargo(SmallId(1)));
        assert!(p.has_embargo_against(SmallId(2)));
        assert!(p.stop_embargo(SmallId(2)));
        assert!(!p.stop_embargo(SmallId(2)));
    }
}
