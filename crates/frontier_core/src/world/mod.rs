//! Mutable game state operated on by executions.
//!
//! The world owns players, tile ownership, units, attack records and
//! diplomacy. Every collection is ordered (`BTreeMap`, `Vec` indexed by tile)
//! so iteration order is identical on every replica. Executions refer to
//! world entities by id only and resolve them again on every tick.

mod attack;
mod diplomacy;
mod event;
mod player;
mod unit;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub use attack::{AttackId, AttackRecord};
pub use diplomacy::{Alliance, AllianceRequest, Diplomacy, RequestId, RequestStatus};
pub use event::{GameEvent, Resource};
pub use player::{
    ClientId, Player, PlayerId, PlayerInfo, PlayerKind, Relation, SmallId, MAX_RELATION,
    MIN_RELATION,
};
pub use unit::{Unit, UnitId, UnitType};

use crate::config::GameConfig;
use crate::map::{TerrainMap, TileRef};
use crate::math::percent;
use crate::random::{simple_hash, PseudoRandom, EXECUTION_STREAM, PLAYER_ID_STREAM};
use crate::Tick;

/// Complete simulation state of one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    game_id: String,
    seed: u64,
    config: GameConfig,
    map: TerrainMap,
    owners: Vec<Option<SmallId>>,
    fallout: Vec<bool>,
    players: BTreeMap<SmallId, Player>,
    units: BTreeMap<UnitId, Unit>,
    attacks: BTreeMap<AttackId, AttackRecord>,
    diplomacy: Diplomacy,
    id_rng: PseudoRandom,
    next_small_id: u16,
    next_unit_id: u32,
    next_attack_id: u32,
    next_request_id: u32,
    tick: Tick,
    winner: Option<SmallId>,
    #[serde(skip)]
    events: Vec<GameEvent>,
}

impl World {
    /// Create an empty world for a game.
    #[must_use]
    pub fn new(game_id: impl Into<String>, config: GameConfig, map: TerrainMap) -> Self {
        let game_id = game_id.into();
        let seed = simple_hash(&game_id);
        let tiles = map.len();
        Self {
            game_id,
            seed,
            config,
            map,
            owners: vec![None; tiles],
            fallout: vec![false; tiles],
            players: BTreeMap::new(),
            units: BTreeMap::new(),
            attacks: BTreeMap::new(),
            diplomacy: Diplomacy::default(),
            id_rng: PseudoRandom::for_stream(seed, PLAYER_ID_STREAM),
            next_small_id: 1,
            next_unit_id: 1,
            next_attack_id: 1,
            next_request_id: 1,
            tick: 0,
            winner: None,
            events: Vec::new(),
        }
    }

    /// Game identifier the seed is derived from.
    #[must_use]
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Seed of the game (hash of the game id).
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Game configuration.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Terrain.
    #[must_use]
    pub const fn map(&self) -> &TerrainMap {
        &self.map
    }

    /// Current tick.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    /// Move to the next tick. The game loop calls this once the scheduler
    /// and hashing are done.
    pub fn advance_tick(&mut self) {
        self.tick += 1;
    }

    /// Whether the game is still in its spawn phase.
    #[must_use]
    pub const fn in_spawn_phase(&self) -> bool {
        self.tick < self.config.spawn_phase_ticks
    }

    /// Winner, once declared.
    #[must_use]
    pub const fn winner(&self) -> Option<SmallId> {
        self.winner
    }

    /// Stream that player ids are drawn from.
    pub(crate) const fn id_rng(&self) -> &PseudoRandom {
        &self.id_rng
    }

    pub(crate) fn set_winner(&mut self, player: SmallId) {
        self.winner = Some(player);
        self.emit(GameEvent::Winner { player });
    }

    /// Generator for a one-off decision, derived from the game seed, the
    /// current tick and a caller-chosen salt.
    #[must_use]
    pub fn derive_rng(&self, salt: u64) -> PseudoRandom {
        let tick_mix = self.tick.wrapping_mul(0x2545_f491_4f6c_dd1d);
        PseudoRandom::for_stream(self.seed ^ tick_mix, EXECUTION_STREAM.wrapping_add(salt))
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Record an event for this tick.
    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take all events recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Add a player. The wire id is drawn from the game's id stream; AI
    /// players without a client id act under their own player id.
    pub fn add_player(
        &mut self,
        name: impl Into<String>,
        kind: PlayerKind,
        client_id: Option<ClientId>,
    ) -> SmallId {
        let player_id = loop {
            let candidate = PlayerId::new(self.id_rng.next_id());
            if self.player_by_id(&candidate).is_none() {
                break candidate;
            }
        };
        let client_id = client_id.unwrap_or_else(|| ClientId::new(player_id.0.clone()));
        let small_id = SmallId(self.next_small_id);
        self.next_small_id += 1;

        let economy = &self.config.economy;
        let troops = match kind {
            PlayerKind::Bot => economy.bot_starting_troops,
            PlayerKind::Human | PlayerKind::FakeHuman => economy.starting_troops,
        };
        let info = PlayerInfo {
            name: name.into(),
            kind,
            client_id,
            player_id,
        };
        let attack_ratio = percent(self.config.attack.default_attack_ratio_percent);
        self.players.insert(
            small_id,
            Player::new(small_id, info, troops, economy.starting_gold, attack_ratio),
        );
        small_id
    }

    /// Player by internal id.
    #[must_use]
    pub fn player(&self, id: SmallId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Mutable player by internal id.
    pub fn player_mut(&mut self, id: SmallId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Player by id, only if alive.
    #[must_use]
    pub fn alive_player(&self, id: SmallId) -> Option<&Player> {
        self.players.get(&id).filter(|p| p.is_alive())
    }

    /// Whether a player exists and is alive.
    #[must_use]
    pub fn is_alive(&self, id: SmallId) -> bool {
        self.alive_player(id).is_some()
    }

    /// All players in id order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Ids of living players in order.
    #[must_use]
    pub fn alive_player_ids(&self) -> Vec<SmallId> {
        self.players
            .values()
            .filter(|p| p.is_alive())
            .map(Player::small_id)
            .collect()
    }

    /// Resolve a wire player id.
    #[must_use]
    pub fn player_by_id(&self, id: &PlayerId) -> Option<SmallId> {
        self.players
            .values()
            .find(|p| p.id() == id)
            .map(Player::small_id)
    }

    /// Resolve the player a client acts for.
    #[must_use]
    pub fn player_by_client(&self, client: &ClientId) -> Option<SmallId> {
        self.players
            .values()
            .find(|p| &p.info().client_id == client)
            .map(Player::small_id)
    }

    /// Whether two distinct players are allied.
    #[must_use]
    pub fn are_allied(&self, a: SmallId, b: SmallId) -> bool {
        self.diplomacy.are_allied(a, b)
    }

    /// Troop cap of a player.
    #[must_use]
    pub fn max_troops(&self, id: SmallId) -> u64 {
        let Some(player) = self.players.get(&id) else {
            return 0;
        };
        let economy = &self.config.economy;
        let cities = self
            .units_of(id, UnitType::City)
            .filter(|u| !u.under_construction)
            .count() as u64;
        economy
            .base_max_troops
            .saturating_add((player.tile_count() as u64).saturating_mul(economy.troops_per_tile))
            .saturating_add(cities.saturating_mul(economy.city_troop_bonus))
    }

    /// Remove a player from play: units destroyed, alliances dissolved.
    pub fn kill_player(&mut self, id: SmallId) {
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        if !player.is_alive() {
            return;
        }
        player.kill();
        let tiles: Vec<TileRef> = player.tiles().iter().copied().collect();
        for tile in tiles {
            self.release_tile(tile);
        }
        let owned: Vec<UnitId> = self
            .units
            .values()
            .filter(|u| u.owner == id)
            .map(|u| u.id)
            .collect();
        for unit in owned {
            self.remove_unit(unit);
        }
        self.diplomacy.remove_player(id);
        tracing::info!(player = %id, tick = self.tick, "Player eliminated");
        self.emit(GameEvent::PlayerDied { player: id });
    }

    // ------------------------------------------------------------------
    // Tiles
    // ------------------------------------------------------------------

    /// Owner of a tile.
    #[must_use]
    pub fn owner(&self, tile: TileRef) -> Option<SmallId> {
        self.owners.get(tile as usize).copied().flatten()
    }

    /// Whether the tile is irradiated.
    #[must_use]
    pub fn has_fallout(&self, tile: TileRef) -> bool {
        self.fallout.get(tile as usize).copied().unwrap_or(false)
    }

    /// Whether the tile is land with no owner.
    #[must_use]
    pub fn is_unclaimed_land(&self, tile: TileRef) -> bool {
        self.map.is_land(tile) && self.owner(tile).is_none()
    }

    /// Tile ownership in tile order.
    #[must_use]
    pub fn owners(&self) -> &[Option<SmallId>] {
        &self.owners
    }

    /// Fallout flags in tile order.
    #[must_use]
    pub fn fallout(&self) -> &[bool] {
        &self.fallout
    }

    /// Give a land tile to a player. Clears fallout.
    pub fn conquer(&mut self, tile: TileRef, owner: SmallId) {
        if !self.map.is_land(tile) || !self.players.contains_key(&owner) {
            return;
        }
        let idx = tile as usize;
        if let Some(previous) = self.owners[idx] {
            if previous == owner {
                return;
            }
            if let Some(p) = self.players.get_mut(&previous) {
                p.remove_tile(tile);
            }
        }
        self.owners[idx] = Some(owner);
        self.fallout[idx] = false;
        if let Some(p) = self.players.get_mut(&owner) {
            p.add_tile(tile);
        }
    }

    /// Remove the owner of a tile.
    pub fn release_tile(&mut self, tile: TileRef) {
        let Some(slot) = self.owners.get_mut(tile as usize) else {
            return;
        };
        if let Some(previous) = slot.take() {
            if let Some(p) = self.players.get_mut(&previous) {
                p.remove_tile(tile);
            }
        }
    }

    /// Release a tile and mark it irradiated.
    pub fn irradiate(&mut self, tile: TileRef) {
        if !self.map.is_land(tile) {
            return;
        }
        self.release_tile(tile);
        self.fallout[tile as usize] = true;
    }

    /// Owned tiles with at least one land neighbour not owned by the player.
    #[must_use]
    pub fn border_tiles(&self, player: SmallId) -> Vec<TileRef> {
        let Some(p) = self.players.get(&player) else {
            return Vec::new();
        };
        p.tiles()
            .iter()
            .copied()
            .filter(|&t| {
                self.map
                    .neighbors(t)
                    .any(|n| self.map.is_land(n) && self.owner(n) != Some(player))
            })
            .collect()
    }

    /// Tiles of `target` (or unclaimed land for `None`) adjacent to the
    /// attacker's territory, ascending and without duplicates.
    #[must_use]
    pub fn frontier(&self, attacker: SmallId, target: Option<SmallId>) -> Vec<TileRef> {
        let mut tiles = BTreeSet::new();
        for border in self.border_tiles(attacker) {
            for n in self.map.neighbors(border) {
                if self.map.is_land(n) && self.owner(n) == target {
                    tiles.insert(n);
                }
            }
        }
        tiles.into_iter().collect()
    }

    /// Whether the attacker's territory touches the target's.
    #[must_use]
    pub fn shares_border(&self, attacker: SmallId, target: Option<SmallId>) -> bool {
        !self.frontier(attacker, target).is_empty()
    }

    /// Owners of land bordering a player's territory (`None` is unclaimed).
    #[must_use]
    pub fn neighbors_of(&self, player: SmallId) -> BTreeSet<Option<SmallId>> {
        let mut owners = BTreeSet::new();
        for border in self.border_tiles(player) {
            for n in self.map.neighbors(border) {
                if self.map.is_land(n) {
                    let owner = self.owner(n);
                    if owner != Some(player) {
                        owners.insert(owner);
                    }
                }
            }
        }
        owners
    }

    /// Owned tiles that touch water.
    #[must_use]
    pub fn shore_tiles(&self, player: SmallId) -> Vec<TileRef> {
        self.players.get(&player).map_or_else(Vec::new, |p| {
            p.tiles()
                .iter()
                .copied()
                .filter(|&t| self.map.is_shore(t))
                .collect()
        })
    }

    // ------------------------------------------------------------------
    // Units
    // ------------------------------------------------------------------

    /// Place a new unit.
    pub fn create_unit(&mut self, kind: UnitType, owner: SmallId, tile: TileRef) -> UnitId {
        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;
        self.units.insert(id, Unit::new(id, kind, owner, tile));
        id
    }

    /// Unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Mutable unit by id.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Remove a unit and emit a destruction event.
    pub fn remove_unit(&mut self, id: UnitId) -> Option<Unit> {
        let unit = self.units.remove(&id)?;
        self.emit(GameEvent::UnitDestroyed {
            unit: unit.id,
            kind: unit.kind,
            owner: unit.owner,
        });
        Some(unit)
    }

    /// All units in id order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Units of one kind owned by a player, in id order.
    pub fn units_of(&self, owner: SmallId, kind: UnitType) -> impl Iterator<Item = &Unit> {
        self.units
            .values()
            .filter(move |u| u.owner == owner && u.kind == kind)
    }

    /// Number of units of a kind a player owns, including ones being built.
    #[must_use]
    pub fn unit_count(&self, owner: SmallId, kind: UnitType) -> usize {
        self.units_of(owner, kind).count()
    }

    /// Structure standing on a tile.
    #[must_use]
    pub fn structure_at(&self, tile: TileRef) -> Option<&Unit> {
        self.units
            .values()
            .find(|u| u.kind.is_structure() && u.tile == tile)
    }

    /// Whether a completed unit of `kind` owned by `owner` lies within
    /// `range` of `tile`.
    #[must_use]
    pub fn has_unit_near(&self, tile: TileRef, range: u32, owner: SmallId, kind: UnitType) -> bool {
        self.units_of(owner, kind)
            .any(|u| !u.under_construction && self.map.manhattan(u.tile, tile) <= range)
    }

    // ------------------------------------------------------------------
    // Attacks
    // ------------------------------------------------------------------

    /// Register an attack record.
    pub fn add_attack(&mut self, attacker: SmallId, target: Option<SmallId>, troops: u64) -> AttackId {
        let id = AttackId(self.next_attack_id);
        self.next_attack_id += 1;
        self.attacks
            .insert(id, AttackRecord::new(id, attacker, target, troops, self.tick));
        id
    }

    /// Attack by id.
    #[must_use]
    pub fn attack(&self, id: AttackId) -> Option<&AttackRecord> {
        self.attacks.get(&id)
    }

    /// Mutable attack by id.
    pub fn attack_mut(&mut self, id: AttackId) -> Option<&mut AttackRecord> {
        self.attacks.get_mut(&id)
    }

    /// Drop a finished attack.
    pub fn remove_attack(&mut self, id: AttackId) -> Option<AttackRecord> {
        self.attacks.remove(&id)
    }

    /// All attacks in id order.
    pub fn attacks(&self) -> impl Iterator<Item = &AttackRecord> {
        self.attacks.values()
    }

    /// Attacks currently aimed at a player.
    #[must_use]
    pub fn incoming_attacks(&self, target: SmallId) -> Vec<&AttackRecord> {
        self.attacks
            .values()
            .filter(|a| a.target == Some(target) && !a.retreating)
            .collect()
    }

    /// Attacks a player has in flight.
    #[must_use]
    pub fn outgoing_attacks(&self, attacker: SmallId) -> Vec<&AttackRecord> {
        self.attacks
            .values()
            .filter(|a| a.attacker == attacker && !a.retreating)
            .collect()
    }

    // ------------------------------------------------------------------
    // Diplomacy
    // ------------------------------------------------------------------

    /// Alliances and requests.
    #[must_use]
    pub const fn diplomacy(&self) -> &Diplomacy {
        &self.diplomacy
    }

    /// Mutable alliances and requests.
    pub fn diplomacy_mut(&mut self) -> &mut Diplomacy {
        &mut self.diplomacy
    }

    /// Allocate a request id.
    pub fn next_request_id(&mut self) -> RequestId {
        let id = RequestId(self.next_request_id);
        self.next_request_id += 1;
        id
    }

    /// Form an alliance and announce it.
    pub fn form_alliance(&mut self, a: SmallId, b: SmallId) -> bool {
        let duration = self.config.diplomacy.alliance_duration;
        if !self.diplomacy.form_alliance(a, b, self.tick, duration) {
            return false;
        }
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        tracing::info!(a = %a, b = %b, tick = self.tick, "Alliance formed");
        self.emit(GameEvent::AllianceFormed { a, b });
        true
    }
}
