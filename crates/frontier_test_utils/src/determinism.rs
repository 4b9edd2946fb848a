//! Determinism testing utilities.
//!
//! Provides a harness for verifying that games produce identical results
//! given identical turns.
//!
//! # Testing Strategy
//!
//! Lockstep replicas only exchange turns, so every replica must compute the
//! same state from them. Sources of non-determinism include:
//!
//! - **Floating-point math**: We use fixed-point arithmetic via
//!   [`frontier_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   World collections are `BTreeMap`s or tile-indexed `Vec`s.
//!
//! - **System randomness**: Every draw goes through a
//!   [`frontier_core::random::PseudoRandom`] seeded from the game id.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual executions and AI helpers
//! 2. **Property tests**: Random intent streams must never desync replicas
//! 3. **Integration tests**: Full games are reproducible

use std::thread;

use frontier_core::error::Result;
use frontier_core::game::{Game, TickOutput};
use frontier_core::intent::Turn;
use frontier_core::Tick;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel game runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each game.
    pub hashes: Vec<u64>,
    /// Number of ticks each game ran.
    pub ticks: u64,
    /// Number of games run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all games produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all games matched.
    ///
    /// # Panics
    ///
    /// Panics if games produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel games diverged!\n\
                 Games: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Turn for `tick` from a script of turns sorted by turn number; an empty
/// turn when the script has none.
#[must_use]
pub fn scripted_turn(script: &[Turn], tick: Tick) -> Turn {
    script
        .binary_search_by_key(&tick, |t| t.turn_number)
        .map_or_else(|_| Turn::empty(tick), |i| script[i].clone())
}

/// Play `ticks` ticks of a game from its current tick, feeding scripted
/// turns.
///
/// # Errors
///
/// Propagates the first error from [`Game::execute_turn`].
pub fn play(game: &mut Game, script: &[Turn], ticks: Tick) -> Result<Vec<TickOutput>> {
    let end = game.tick() + ticks;
    let mut outputs = Vec::new();
    while game.tick() < end {
        let turn = scripted_turn(script, game.tick());
        outputs.push(game.execute_turn(&turn)?);
    }
    Ok(outputs)
}

/// Per-tick state hashes of a scripted game, including the starting state.
///
/// # Errors
///
/// Propagates simulation and hashing errors.
pub fn hash_trace(game: &mut Game, script: &[Turn], ticks: Tick) -> Result<Vec<u64>> {
    let mut trace = Vec::new();
    trace.push(game.state_hash()?);
    for _ in 0..ticks {
        let turn = scripted_turn(script, game.tick());
        game.execute_turn(&turn)?;
        trace.push(game.state_hash()?);
    }
    Ok(trace)
}

/// Run two independently constructed games on the same script and compare
/// their hash after every tick.
///
/// Returns `false` if the traces differ or either game fails.
pub fn verify_game_determinism<F>(setup_fn: F, script: &[Turn], ticks: Tick) -> bool
where
    F: Fn() -> Game,
{
    let mut first = setup_fn();
    let mut second = setup_fn();
    match (
        hash_trace(&mut first, script, ticks),
        hash_trace(&mut second, script, ticks),
    ) {
        (Ok(a), Ok(b)) => a == b,
        (a, b) => {
            tracing::warn!(first = ?a.err(), second = ?b.err(), "Game failed during determinism check");
            false
        }
    }
}

/// Run N games on scoped threads and collect final hashes.
///
/// This is useful for catching non-determinism that only manifests
/// under thread scheduling variations, memory layout differences, etc.
///
/// # Panics
///
/// Panics if a game fails or a thread panics.
pub fn run_parallel_games_scoped<F>(
    setup_fn: F,
    script: &[Turn],
    num_sims: usize,
    num_ticks: u64,
) -> ParallelSimResult
where
    F: Fn() -> Game + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut game = setup_fn();
                    play(&mut game, script, num_ticks).expect("game runs");
                    game.state_hash().expect("state hashes")
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("game thread"))
            .collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two game runs tick-by-tick, finding first divergence.
///
/// Useful for debugging non-determinism by finding exactly when
/// games start to differ.
///
/// # Returns
///
/// `None` if the games stay identical, `Some(tick)` for the first tick after
/// which their hashes differ (0 for the starting state). A game that fails
/// counts as diverged at the tick it failed on.
pub fn find_first_divergence<F>(setup_fn: F, script: &[Turn], num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Game,
{
    let mut game1 = setup_fn();
    let mut game2 = setup_fn();

    if game1.state_hash().ok()? != game2.state_hash().ok()? {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        let turn = scripted_turn(script, game1.tick());
        let a = game1.execute_turn(&turn).and_then(|_| game1.state_hash());
        let b = game2.execute_turn(&turn).and_then(|_| game2.state_hash());
        match (a, b) {
            (Ok(a), Ok(b)) if a == b => {}
            _ => return Some(tick),
        }
    }

    None
}

/// Verify that a snapshot taken mid-game resumes exactly.
///
/// Runs `num_ticks` ticks, snapshots, runs `num_ticks` more on both the
/// original and the restored copy and compares the final hashes.
pub fn verify_serialization_determinism<F>(setup_fn: F, script: &[Turn], num_ticks: u64) -> bool
where
    F: Fn() -> Game,
{
    let mut game = setup_fn();
    if play(&mut game, script, num_ticks).is_err() {
        return false;
    }

    let Ok(bytes) = game.serialize() else {
        return false;
    };
    let Ok(mut restored) = Game::deserialize(&bytes) else {
        return false;
    };

    if play(&mut game, script, num_ticks).is_err() || play(&mut restored, script, num_ticks).is_err() {
        return false;
    }

    matches!((game.state_hash(), restored.state_hash()), (Ok(a), Ok(b)) if a == b)
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible intents. Referenced
/// ids are drawn from the given pools, which should include ids that do not
/// exist to exercise the no-op path.
pub mod strategies {
    use frontier_core::intent::{EmbargoAction, Intent, Turn};
    use frontier_core::map::TileRef;
    use frontier_core::world::{ClientId, PlayerId, UnitType};
    use proptest::prelude::*;

    /// Any unit kind, including ones that cannot be built.
    pub fn arb_unit_type() -> impl Strategy<Value = UnitType> {
        prop_oneof![
            Just(UnitType::City),
            Just(UnitType::Port),
            Just(UnitType::DefensePost),
            Just(UnitType::SamLauncher),
            Just(UnitType::MissileSilo),
            Just(UnitType::TransportShip),
            Just(UnitType::AtomBomb),
            Just(UnitType::HydrogenBomb),
            Just(UnitType::Mirv),
            Just(UnitType::MirvWarhead),
        ]
    }

    /// Any intent with ids from the pools and tiles below `tiles` plus a
    /// few out of range.
    pub fn arb_intent(
        clients: Vec<ClientId>,
        players: Vec<PlayerId>,
        tiles: TileRef,
    ) -> impl Strategy<Value = Intent> {
        let client = proptest::sample::select(clients);
        let player = proptest::sample::select(players);
        let tile = 0..tiles + 8;
        let troops = proptest::option::of(0u64..20_000);
        let amount = proptest::option::of(0u64..200_000);

        prop_oneof![
            (client.clone(), tile.clone())
                .prop_map(|(client_id, tile)| Intent::Spawn { client_id, tile }),
            (client.clone(), proptest::option::of(player.clone()), troops.clone()).prop_map(
                |(client_id, target_id, troops)| Intent::Attack {
                    client_id,
                    target_id,
                    troops
                }
            ),
            (client.clone(), player.clone(), 0u32..16).prop_map(
                |(client_id, player_id, attack)| Intent::CancelAttack {
                    client_id,
                    player_id,
                    attack_id: frontier_core::world::AttackId(attack),
                }
            ),
            (
                client.clone(),
                proptest::option::of(player.clone()),
                troops,
                tile.clone()
            )
                .prop_map(|(client_id, target_id, troops, dst)| Intent::Boat {
                    client_id,
                    target_id,
                    troops,
                    dst
                }),
            (client.clone(), 0u32..16).prop_map(|(client_id, unit)| Intent::CancelBoat {
                client_id,
                unit_id: frontier_core::world::UnitId(unit),
            }),
            (client.clone(), arb_unit_type(), tile).prop_map(|(client_id, unit, tile)| {
                Intent::BuildUnit {
                    client_id,
                    unit,
                    tile,
                }
            }),
            (client.clone(), player.clone()).prop_map(|(client_id, recipient)| {
                Intent::AllianceRequest {
                    client_id,
                    recipient,
                }
            }),
            (client.clone(), player.clone(), any::<bool>()).prop_map(
                |(client_id, requestor, accept)| Intent::AllianceRequestReply {
                    client_id,
                    requestor,
                    accept
                }
            ),
            (client.clone(), player.clone()).prop_map(|(client_id, recipient)| {
                Intent::BreakAlliance {
                    client_id,
                    recipient,
                }
            }),
            (client.clone(), player.clone())
                .prop_map(|(client_id, target)| Intent::TargetPlayer { client_id, target }),
            (client.clone(), player.clone(), amount.clone()).prop_map(
                |(client_id, recipient, gold)| Intent::DonateGold {
                    client_id,
                    recipient,
                    gold
                }
            ),
            (client.clone(), player.clone(), amount).prop_map(
                |(client_id, recipient, troops)| Intent::DonateTroops {
                    client_id,
                    recipient,
                    troops
                }
            ),
            (client.clone(), player, any::<bool>()).prop_map(|(client_id, target_id, start)| {
                Intent::Embargo {
                    client_id,
                    target_id,
                    action: if start {
                        EmbargoAction::Start
                    } else {
                        EmbargoAction::Stop
                    },
                }
            }),
            (client.clone(), 0u32..150)
                .prop_map(|(client_id, ratio)| Intent::TroopRatio { client_id, ratio }),
            (client, any::<bool>()).prop_map(|(client_id, is_disconnected)| {
                Intent::MarkDisconnected {
                    client_id,
                    is_disconnected,
                }
            }),
        ]
    }

    /// A script of up to `max_turns` turns, starting at `first_turn`, with
    /// strictly increasing turn numbers.
    pub fn arb_turn_script(
        clients: Vec<ClientId>,
        players: Vec<PlayerId>,
        tiles: TileRef,
        first_turn: u64,
        max_turns: usize,
    ) -> impl Strategy<Value = Vec<Turn>> {
        let turn = (
            1u64..4,
            proptest::collection::vec(arb_intent(clients, players, tiles), 0..4),
        );
        proptest::collection::vec(turn, 0..=max_turns).prop_map(move |turns| {
            let mut next = first_turn;
            turns
                .into_iter()
                .map(|(gap, intents)| {
                    let turn = Turn::new(next, intents);
                    next += gap;
                    turn
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::strategies::arb_turn_script;
    use super::*;
    use crate::fixtures::{
        ai_start, client, duel_start, player_id, spawn_turn, spawned_duel, CLIENT_A, CLIENT_B,
        SPAWN_A, SPAWN_B,
    };
    use frontier_core::world::PlayerId;
    use proptest::prelude::*;

    fn duel_script() -> Vec<Turn> {
        vec![spawn_turn(0, &[(CLIENT_A, SPAWN_A), (CLIENT_B, SPAWN_B)])]
    }

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 10, || 0u64, |n| *n += 1, |n| *n);
        result.assert_deterministic();
        assert_eq!(result.unique_hashes(), vec![10]);
    }

    #[test]
    fn test_duel_is_deterministic() {
        assert!(verify_game_determinism(
            || Game::new(duel_start("duel")).unwrap(),
            &duel_script(),
            60
        ));
    }

    #[test]
    fn test_ai_game_is_deterministic() {
        assert!(verify_game_determinism(
            || Game::new(ai_start("ai", 6, 2)).unwrap(),
            &[],
            150
        ));
    }

    #[test]
    fn test_find_divergence_on_deterministic_game() {
        assert_eq!(
            find_first_divergence(|| Game::new(ai_start("ai", 4, 1)).unwrap(), &[], 80),
            None
        );
    }

    #[test]
    fn test_different_game_ids_diverge() {
        let mut a = Game::new(ai_start("left", 4, 1)).unwrap();
        let mut b = Game::new(ai_start("right", 4, 1)).unwrap();
        let ta = hash_trace(&mut a, &[], 20).unwrap();
        let tb = hash_trace(&mut b, &[], 20).unwrap();
        assert_ne!(ta, tb);
    }

    #[test]
    fn test_parallel_games_agree() {
        let result = run_parallel_games_scoped(|| Game::new(ai_start("par", 6, 2)).unwrap(), &[], 4, 120);
        result.assert_deterministic();
        assert_eq!(result.num_sims, 4);
    }

    #[test]
    fn test_serialization_resumes_exactly() {
        assert!(verify_serialization_determinism(
            || Game::new(ai_start("snap", 6, 2)).unwrap(),
            &[],
            60
        ));
    }

    #[test]
    fn test_scripted_turn_fills_gaps() {
        let script = vec![Turn::empty(2), spawn_turn(5, &[(CLIENT_A, 1)])];
        assert_eq!(scripted_turn(&script, 3), Turn::empty(3));
        assert_eq!(scripted_turn(&script, 5).intents.len(), 1);
    }

    fn pools() -> (Vec<frontier_core::world::ClientId>, Vec<PlayerId>) {
        let game = spawned_duel("fuzz");
        let world = game.world();
        (
            vec![client(CLIENT_A), client(CLIENT_B), client("intruder")],
            vec![
                player_id(world, CLIENT_A),
                player_id(world, CLIENT_B),
                PlayerId::new("nonexistent"),
            ],
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_random_intents_never_desync(
            script in {
                let (clients, players) = pools();
                arb_turn_script(clients, players, 96, 2, 20)
            }
        ) {
            let mut first = spawned_duel("fuzz");
            let mut second = spawned_duel("fuzz");
            let a = hash_trace(&mut first, &script, 70).unwrap();
            let b = hash_trace(&mut second, &script, 70).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
