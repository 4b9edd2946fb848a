//! Consistency hashing and desync detection.
//!
//! Every few ticks each replica digests its world state. Replicas exchange
//! `(tick, hash)` pairs; any mismatch means the simulations diverged, which
//! is unrecoverable.
//!
//! The digest covers a canonical encoding of simulation-relevant state only:
//! tile owners and fallout in tile order, players in id order, units,
//! attacks and alliances in id order, and the id stream. Events and
//! presentation data are excluded. The encoding is bincode over borrowed
//! views of ordered collections, hashed with SHA-256; the first eight bytes
//! of the digest form the `u64` hash.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{GameError, Result};
use crate::random::PseudoRandom;
use crate::world::{Alliance, AttackRecord, SmallId, Unit, World};
use crate::Tick;

/// Hash of a replica's state at a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashEvent {
    /// Tick the hash was taken at.
    pub tick: Tick,
    /// State hash.
    pub hash: u64,
}

#[derive(Serialize)]
struct PlayerDigest<'a> {
    id: SmallId,
    troops: u64,
    gold: u64,
    alive: bool,
    spawned: bool,
    tiles: u64,
    relations: &'a BTreeMap<SmallId, i32>,
    embargoes: &'a BTreeSet<SmallId>,
    traitor_until: Option<Tick>,
}

#[derive(Serialize)]
struct StateDigest<'a> {
    tick: Tick,
    owners: &'a [Option<SmallId>],
    fallout: &'a [bool],
    players: Vec<PlayerDigest<'a>>,
    units: Vec<&'a Unit>,
    attacks: Vec<&'a AttackRecord>,
    alliances: Vec<&'a Alliance>,
    id_rng: &'a PseudoRandom,
    winner: Option<SmallId>,
}

/// Compute the consistency hash of a world.
///
/// # Errors
///
/// Returns [`GameError::InvalidState`] if the state cannot be encoded.
pub fn compute_state_hash(world: &World) -> Result<u64> {
    let digest = StateDigest {
        tick: world.tick(),
        owners: world.owners(),
        fallout: world.fallout(),
        players: world
            .players()
            .map(|p| PlayerDigest {
                id: p.small_id(),
                troops: p.troops,
                gold: p.gold,
                alive: p.is_alive(),
                spawned: p.has_spawned(),
                tiles: p.tile_count() as u64,
                relations: p.relations(),
                embargoes: p.embargoes(),
                traitor_until: p.traitor_until(),
            })
            .collect(),
        units: world.units().collect(),
        attacks: world.attacks().collect(),
        alliances: world.diplomacy().alliances().collect(),
        id_rng: world.id_rng(),
        winner: world.winner(),
    };

    let mut hasher = Sha256::new();
    bincode::serialize_into(&mut hasher, &digest)
        .map_err(|e| GameError::InvalidState(format!("state hash encoding failed: {e}")))?;
    let out = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&out[..8]);
    Ok(u64::from_le_bytes(bytes))
}

/// Default number of ticks of hash history kept.
pub const DEFAULT_HISTORY: usize = 64;

/// Compares local hashes against hashes reported by other replicas.
///
/// Reports may arrive before or after the local hash for the same tick;
/// whichever comes second triggers the comparison.
#[derive(Debug, Clone)]
pub struct DesyncDetector {
    local: BTreeMap<Tick, u64>,
    remote: BTreeMap<Tick, u64>,
    capacity: usize,
    last_verified: Option<Tick>,
}

impl DesyncDetector {
    /// Create a detector keeping `capacity` ticks of history.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            local: BTreeMap::new(),
            remote: BTreeMap::new(),
            capacity: capacity.max(1),
            last_verified: None,
        }
    }

    /// Last tick at which local and remote hashes were found equal.
    #[must_use]
    pub const fn last_verified(&self) -> Option<Tick> {
        self.last_verified
    }

    /// Local hash recorded for a tick.
    #[must_use]
    pub fn local_hash(&self, tick: Tick) -> Option<u64> {
        self.local.get(&tick).copied()
    }

    /// Record a local hash.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DesyncDetected`] if a remote hash for the same
    /// tick was already received and differs.
    pub fn record(&mut self, local: HashEvent) -> Result<()> {
        self.local.insert(local.tick, local.hash);
        trim(&mut self.local, self.capacity);
        match self.remote.remove(&local.tick) {
            Some(remote_hash) => self.compare(local.tick, local.hash, remote_hash),
            None => Ok(()),
        }
    }

    /// Check a hash reported by another replica.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DesyncDetected`] on mismatch.
    pub fn check(&mut self, remote: HashEvent) -> Result<()> {
        match self.local.get(&remote.tick).copied() {
            Some(local_hash) => self.compare(remote.tick, local_hash, remote.hash),
            None => {
                if self.local.keys().next().is_some_and(|&oldest| remote.tick < oldest) {
                    tracing::debug!(tick = remote.tick, "Remote hash older than history, ignored");
                    return Ok(());
                }
                self.remote.insert(remote.tick, remote.hash);
                trim(&mut self.remote, self.capacity);
                Ok(())
            }
        }
    }

    fn compare(&mut self, tick: Tick, local_hash: u64, remote_hash: u64) -> Result<()> {
        if local_hash == remote_hash {
            self.last_verified = Some(self.last_verified.map_or(tick, |t| t.max(tick)));
            return Ok(());
        }
        tracing::error!(tick, local_hash, remote_hash, "Desync detected");
        Err(GameError::DesyncDetected {
            tick,
            local_hash,
            remote_hash,
        })
    }
}

impl Default for DesyncDetector {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}

fn trim(history: &mut BTreeMap<Tick, u64>, capacity: usize) {
    while history.len() > capacity {
        history.pop_first();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::TerrainMap;
    use crate::world::PlayerKind;

    fn world(game_id: &str) -> World {
        let mut w = World::new(
            game_id,
            GameConfig::default(),
            TerrainMap::from_ascii("####\n####").unwrap(),
        );
        let a = w.add_player("a", PlayerKind::Human, None);
        w.conquer(0, a);
        w
    }

    #[test]
    fn test_identical_worlds_hash_equal() {
        assert_eq!(
            compute_state_hash(&world("abc123")).unwrap(),
            compute_state_hash(&world("abc123")).unwrap()
        );
    }

    #[test]
    fn test_hash_sensitive_to_state() {
        let base = world("abc123");
        let h = compute_state_hash(&base).unwrap();

        let mut troops = base.clone();
        troops.player_mut(SmallId(1)).unwrap().troops += 1;
        assert_ne!(compute_state_hash(&troops).unwrap(), h);

        let mut tiles = base.clone();
        tiles.conquer(1, SmallId(1));
        assert_ne!(compute_state_hash(&tiles).unwrap(), h);

        assert_ne!(compute_state_hash(&world("other")).unwrap(), h);
    }

    #[test]
    fn test_hash_ignores_events() {
        let mut w = world("abc123");
        let before = compute_state_hash(&w).unwrap();
        w.emit(crate::world::GameEvent::PlayerDied { player: SmallId(1) });
        assert_eq!(compute_state_hash(&w).unwrap(), before);
    }

    #[test]
    fn test_detector_either_order() {
        let mut d = DesyncDetector::default();
        d.record(HashEvent { tick: 10, hash: 7 }).unwrap();
        d.check(HashEvent { tick: 10, hash: 7 }).unwrap();

        d.check(HashEvent { tick: 20, hash: 9 }).unwrap();
        d.record(HashEvent { tick: 20, hash: 9 }).unwrap();
        assert_eq!(d.last_verified(), Some(20));
    }

    #[test]
    fn test_detector_mismatch_is_fatal() {
        let mut d = DesyncDetector::default();
        d.record(HashEvent { tick: 10, hash: 7 }).unwrap();
        let err = d.check(HashEvent { tick: 10, hash: 8 }).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(
            err,
            GameError::DesyncDetected {
                tick: 10,
                local_hash: 7,
                remote_hash: 8
            }
        ));
    }

    #[test]
    fn test_detector_history_bounded() {
        let mut d = DesyncDetector::new(2);
        for tick in 0..5 {
            d.record(HashEvent { tick, hash: tick }).unwrap();
        }
        assert_eq!(d.local_hash(0), None);
        assert_eq!(d.local_hash(4), Some(4));
        // Too old to compare.
        d.check(HashEvent { tick: 0, hash: 99 }).unwrap();
    }
}
