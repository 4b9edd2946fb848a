//! Deterministic pseudo-random number generation.
//!
//! Every random decision in the simulation (player id generation, AI attack
//! cadence, nuke tie-breaks, donation thresholds, MIRV warhead spread) draws
//! from a [`PseudoRandom`] owned by the deciding actor. Generators are seeded
//! from stable identifiers only, never from the clock or OS entropy.
//!
//! The generator is a SplitMix64 step over a single `u64` of state. Range
//! reduction uses integer rejection sampling, so results are identical on
//! every platform.

use serde::{Deserialize, Serialize};

use crate::math::Fixed;

/// Seed offset for the player id stream.
pub const PLAYER_ID_STREAM: u64 = 0x5eed_0001;

/// Seed offset for the bot spawner stream.
pub const BOT_SPAWN_STREAM: u64 = 0x5eed_0002;

/// Seed offset for per-execution derived streams.
pub const EXECUTION_STREAM: u64 = 0x5eed_0003;

const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Seeded pseudo-random generator.
///
/// Two generators constructed with the same seed and driven through the
/// same sequence of calls produce identical results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PseudoRandom {
    state: u64,
}

impl PseudoRandom {
    /// Create a generator from a seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Create a generator for a named stream of a game.
    #[must_use]
    pub fn for_stream(game_seed: u64, stream: u64) -> Self {
        Self::new(mix(game_seed ^ stream.wrapping_mul(0x9e37_79b9_7f4a_7c15)))
    }

    /// Next raw 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        mix(self.state)
    }

    /// Uniform integer in `[lo, hi)`.
    ///
    /// Returns `lo` when the range is empty.
    pub fn next_int(&mut self, lo: i64, hi: i64) -> i64 {
        if hi <= lo {
            return lo;
        }
        let range = hi.wrapping_sub(lo) as u64;
        lo.wrapping_add(self.below(range) as i64)
    }

    /// Uniform index in `[0, len)`. Returns 0 for an empty range.
    pub fn next_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.below(len as u64) as usize
    }

    /// Fixed-point value in `[0, 1)`.
    pub fn next_fixed(&mut self) -> Fixed {
        // 32 random fraction bits fill the I32F32 fractional part exactly.
        Fixed::from_bits((self.next_u64() >> 32) as i64)
    }

    /// One-in-`odds` chance. `chance(1)` is always true, `chance(0)` never.
    pub fn chance(&mut self, odds: u32) -> bool {
        if odds == 0 {
            return false;
        }
        self.below(u64::from(odds)) == 0
    }

    /// Pick a random element of a slice.
    pub fn rand_element<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.next_index(items.len());
        items.get(idx)
    }

    /// Fisher-Yates shuffle in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_index(i + 1);
            items.swap(i, j);
        }
    }

    /// Eight-character alphanumeric identifier.
    pub fn next_id(&mut self) -> String {
        (0..8)
            .map(|_| ID_ALPHABET[self.next_index(ID_ALPHABET.len())] as char)
            .collect()
    }

    /// Uniform value in `[0, range)` via rejection sampling.
    fn below(&mut self, range: u64) -> u64 {
        if range.is_power_of_two() {
            return self.next_u64() & (range - 1);
        }
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return r % range;
            }
        }
    }
}

/// SplitMix64 finalizer.
fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Stable 64-bit FNV-1a hash of a string, used to derive seeds from ids.
#[must_use]
pub fn simple_hash(value: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    value
        .bytes()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = PseudoRandom::new(42);
        let mut b = PseudoRandom::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn different_seeds_differ() {
        let mut a = PseudoRandom::new(42);
        let mut b = PseudoRandom::new(43);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn streams_are_independent() {
        let seed = simple_hash("abc123");
        let mut ids = PseudoRandom::for_stream(seed, PLAYER_ID_STREAM);
        let mut bots = PseudoRandom::for_stream(seed, BOT_SPAWN_STREAM);
        assert_ne!(ids.next_u64(), bots.next_u64());
    }

    #[test]
    fn next_int_within_bounds() {
        let mut rng = PseudoRandom::new(999);
        for _ in 0..10_000 {
            let v = rng.next_int(10, 20);
            assert!((10..20).contains(&v), "next_int out of range: {v}");
        }
        assert_eq!(rng.next_int(5, 5), 5);
        assert_eq!(rng.next_int(-3, -2), -3);
    }

    #[test]
    fn next_fixed_in_unit_range() {
        let mut rng = PseudoRandom::new(12345);
        for _ in 0..10_000 {
            let v = rng.next_fixed();
            assert!(v >= Fixed::ZERO && v < Fixed::ONE, "out of range: {v}");
        }
    }

    #[test]
    fn chance_edges() {
        let mut rng = PseudoRandom::new(7);
        assert!(rng.chance(1));
        assert!(!rng.chance(0));
    }

    #[test]
    fn shuffle_is_permutation_and_deterministic() {
        let mut a: Vec<u32> = (0..50).collect();
        let mut b = a.clone();
        PseudoRandom::new(3).shuffle(&mut a);
        PseudoRandom::new(3).shuffle(&mut b);
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn rand_element_empty_slice() {
        let mut rng = PseudoRandom::new(1);
        let empty: [u8; 0] = [];
        assert!(rng.rand_element(&empty).is_none());
        assert_eq!(rng.rand_element(&[9]), Some(&9));
    }

    #[test]
    fn ids_are_alphanumeric() {
        let mut rng = PseudoRandom::new(11);
        let id = rng.next_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn simple_hash_is_stable() {
        // FNV-1a reference values.
        assert_eq!(simple_hash(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(simple_hash("a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn serialization_roundtrip_continues_sequence() {
        let mut rng = PseudoRandom::new(42);
        for _ in 0..100 {
            rng.next_u64();
        }
        let bytes = bincode::serialize(&rng).unwrap();
        let mut restored: PseudoRandom = bincode::deserialize(&bytes).unwrap();
        for _ in 0..100 {
            assert_eq!(rng.next_u64(), restored.next_u64());
        }
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_next_int_in_range(seed: u64, lo in -1_000_000i64..1_000_000, span in 1i64..1_000_000) {
                let mut rng = PseudoRandom::new(seed);
                for _ in 0..32 {
                    let v = rng.next_int(lo, lo + span);
                    prop_assert!(v >= lo && v < lo + span);
                }
            }

            #[test]
            fn prop_shuffle_keeps_elements(seed: u64, mut items in proptest::collection::vec(any::<u16>(), 0..64)) {
                let mut sorted = items.clone();
                sorted.sort_unstable();
                PseudoRandom::new(seed).shuffle(&mut items);
                items.sort_unstable();
                prop_assert_eq!(items, sorted);
            }
        }
    }
}
