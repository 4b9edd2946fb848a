//! Decision logic shared by bots and nations.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::execution::ExecutionContext;
use crate::intent::{EmbargoAction, Intent};
use crate::map::TileRef;
use crate::math::{percent, scale, Fixed};
use crate::random::{simple_hash, PseudoRandom};
use crate::world::{ClientId, PlayerId, Relation, SmallId, World};
use crate::Tick;

/// Which rule set an agent plays by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiKind {
    /// Tribe: land attacks only, accepts alliances by chance.
    Bot,
    /// Nation: boats, weapons and structures, judges alliance requests.
    FakeHuman,
}

/// What an agent decided to attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackPlan {
    /// Land attack on a bordering player, or unclaimed land for `None`.
    Land(Option<SmallId>),
    /// Ship troops to a shore tile of the target.
    Boat {
        /// Owner of the landing tile.
        target: Option<SmallId>,
        /// Landing tile.
        dst: TileRef,
    },
}

/// Per-agent state: PRNG, cadence and the current enemy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiBehavior {
    player: SmallId,
    kind: AiKind,
    rng: PseudoRandom,
    attack_rate: Tick,
    attack_tick: Tick,
    enemy: Option<SmallId>,
    enemy_since: Tick,
}

impl AiBehavior {
    /// Set up an agent for `player`. The cadence is drawn from the agent's
    /// own PRNG within the difficulty band.
    #[must_use]
    pub fn new(world: &World, player: SmallId, kind: AiKind) -> Option<Self> {
        let p = world.player(player)?;
        let mut rng = PseudoRandom::for_stream(world.seed(), simple_hash(&p.id().0));
        let (lo, hi) = world.config().difficulty.attack_rate_band();
        let attack_rate = rng.next_int(lo, hi).max(1) as Tick;
        let attack_tick = rng.next_int(0, attack_rate as i64) as Tick;
        Some(Self {
            player,
            kind,
            rng,
            attack_rate,
            attack_tick,
            enemy: None,
            enemy_since: 0,
        })
    }

    /// Controlled player.
    #[must_use]
    pub const fn player(&self) -> SmallId {
        self.player
    }

    /// Rule set.
    #[must_use]
    pub const fn kind(&self) -> AiKind {
        self.kind
    }

    /// Ticks between decision rounds.
    #[must_use]
    pub const fn attack_rate(&self) -> Tick {
        self.attack_rate
    }

    /// Offset of the decision round within the cadence.
    #[must_use]
    pub const fn attack_tick(&self) -> Tick {
        self.attack_tick
    }

    /// Player the agent currently holds a grudge against.
    #[must_use]
    pub const fn enemy(&self) -> Option<SmallId> {
        self.enemy
    }

    /// The agent's PRNG.
    pub fn rng_mut(&mut self) -> &mut PseudoRandom {
        &mut self.rng
    }

    /// Whether `tick` is one of the agent's decision ticks.
    #[must_use]
    pub const fn should_act(&self, tick: Tick) -> bool {
        tick % self.attack_rate == self.attack_tick
    }

    /// One decision round: diplomacy bookkeeping, then at most one attack.
    pub fn act(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        let world = &*ctx.world;
        let Some(client) = world.player(self.player).map(|p| p.info().client_id.clone()) else {
            return;
        };

        let mut intents = self.embargo_intents(world, &client);
        intents.extend(self.alliance_replies(world, tick, &client));

        self.forget_enemy(world, tick);
        self.retaliate(world, tick);
        self.assist_allies(world, tick);

        if let Some(plan) = self.select_target(world, tick) {
            tracing::debug!(player = %self.player, plan = ?plan, tick, "AI attack");
            intents.extend(self.attack_intent(world, &client, plan));
        }

        for intent in &intents {
            ctx.submit(intent);
        }
    }

    /// Embargo hostile players and lift embargoes that no longer apply.
    fn embargo_intents(&self, world: &World, client: &ClientId) -> Vec<Intent> {
        let Some(me) = world.player(self.player) else {
            return Vec::new();
        };
        world
            .players()
            .filter(|p| p.is_alive() && p.small_id() != self.player)
            .filter_map(|other| {
                let id = other.small_id();
                let hostile = me.relation(id) == Relation::Hostile;
                let action = match (hostile, me.has_embargo_against(id)) {
                    (true, false) => EmbargoAction::Start,
                    (false, true) => EmbargoAction::Stop,
                    _ => return None,
                };
                Some(Intent::Embargo {
                    client_id: client.clone(),
                    target_id: other.id().clone(),
                    action,
                })
            })
            .collect()
    }

    fn alliance_replies(&mut self, world: &World, tick: Tick, client: &ClientId) -> Vec<Intent> {
        let requestors: Vec<SmallId> = world
            .diplomacy()
            .incoming_requests(self.player)
            .iter()
            .map(|r| r.requestor)
            .collect();
        let mut replies = Vec::new();
        for requestor in requestors {
            let Some(wire) = world.alive_player(requestor).map(|p| p.id().clone()) else {
                continue;
            };
            let accept = match self.kind {
                AiKind::Bot => self.rng.chance(world.config().ai.bot_alliance_accept_odds),
                AiKind::FakeHuman => Self::would_ally(world, self.player, requestor, tick),
            };
            replies.push(Intent::AllianceRequestReply {
                client_id: client.clone(),
                requestor: wire,
                accept,
            });
        }
        replies
    }

    /// A nation accepts unless the requestor is a traitor, is hostile, or is
    /// much stronger than the nation itself.
    #[must_use]
    pub fn would_ally(world: &World, me: SmallId, requestor: SmallId, tick: Tick) -> bool {
        let (Some(mine), Some(theirs)) = (world.player(me), world.player(requestor)) else {
            return false;
        };
        if theirs.is_traitor(tick) || mine.relation(requestor) == Relation::Hostile {
            return false;
        }
        let limit = mine
            .troops
            .saturating_mul(u64::from(world.config().ai.stronger_reject_percent))
            / 100;
        theirs.troops <= limit
    }

    fn set_enemy(&mut self, enemy: SmallId, tick: Tick) {
        self.enemy = Some(enemy);
        self.enemy_since = tick;
    }

    fn forget_enemy(&mut self, world: &World, tick: Tick) {
        let Some(enemy) = self.enemy else {
            return;
        };
        let memory = world.config().ai.enemy_memory_ticks;
        if !world.is_alive(enemy)
            || world.are_allied(self.player, enemy)
            || tick.saturating_sub(self.enemy_since) >= memory
        {
            self.enemy = None;
        }
    }

    /// The non-allied player attacking with the most troops becomes the
    /// enemy.
    fn retaliate(&mut self, world: &World, tick: Tick) {
        let mut by_attacker: BTreeMap<SmallId, u64> = BTreeMap::new();
        for attack in world.incoming_attacks(self.player) {
            if attack.retreating || world.are_allied(self.player, attack.attacker) {
                continue;
            }
            *by_attacker.entry(attack.attacker).or_default() += attack.troops;
        }
        if let Some((&attacker, _)) = by_attacker
            .iter()
            .max_by_key(|(&id, &troops)| (troops, Reverse(id)))
        {
            self.set_enemy(attacker, tick);
        }
    }

    /// Without an enemy of its own, join an ally's recent target.
    fn assist_allies(&mut self, world: &World, tick: Tick) {
        if self.enemy.is_some() {
            return;
        }
        let window = world.config().diplomacy.target_window;
        for ally in world.diplomacy().allies_of(self.player) {
            let Some(ally) = world.alive_player(ally) else {
                continue;
            };
            let target = ally.recent_targets(tick, window).into_iter().find(|&t| {
                t != self.player && world.is_alive(t) && !world.are_allied(self.player, t)
            });
            if let Some(target) = target {
                self.set_enemy(target, tick);
                return;
            }
        }
    }

    /// Layered target selection: enemy, bordering traitor, unclaimed land,
    /// weakest bordering player, then (nations only) the nearest island.
    #[must_use]
    pub fn select_target(&self, world: &World, tick: Tick) -> Option<AttackPlan> {
        let me = world.alive_player(self.player)?;
        let neighbours = world.neighbors_of(self.player);
        let boats = self.kind == AiKind::FakeHuman;

        if let Some(enemy) = self.enemy {
            if neighbours.contains(&Some(enemy)) {
                return Some(AttackPlan::Land(Some(enemy)));
            }
            if boats {
                if let Some((target, dst)) = nearest_landing(world, self.player, &[enemy]) {
                    return Some(AttackPlan::Boat {
                        target: Some(target),
                        dst,
                    });
                }
            }
        }

        let bordering: Vec<SmallId> = neighbours
            .iter()
            .flatten()
            .copied()
            .filter(|&p| world.is_alive(p) && !world.are_allied(self.player, p))
            .collect();

        if let Some(&traitor) = bordering
            .iter()
            .find(|&&p| world.player(p).is_some_and(|p| p.is_traitor(tick)))
        {
            return Some(AttackPlan::Land(Some(traitor)));
        }
        if neighbours.contains(&None) {
            return Some(AttackPlan::Land(None));
        }

        let ai = &world.config().ai;
        let reserve = world
            .max_troops(self.player)
            .saturating_mul(u64::from(ai.reserve_percent))
            / 100;
        if me.troops < reserve {
            return None;
        }

        let weakest = bordering
            .iter()
            .filter_map(|&p| world.player(p).map(|pl| (pl.troop_density(), p)))
            .min();
        if let Some((density, target)) = weakest {
            let mine = me.troop_density().saturating_mul(Fixed::from_num(100));
            let needed = density.saturating_mul(Fixed::saturating_from_num(ai.attack_density_percent));
            if mine >= needed {
                return Some(AttackPlan::Land(Some(target)));
            }
            return None;
        }

        if boats {
            let candidates: Vec<SmallId> = world
                .alive_player_ids()
                .into_iter()
                .filter(|&p| p != self.player && !world.are_allied(self.player, p))
                .collect();
            if let Some((target, dst)) = nearest_landing(world, self.player, &candidates) {
                return Some(AttackPlan::Boat {
                    target: Some(target),
                    dst,
                });
            }
        }
        None
    }

    fn attack_intent(&self, world: &World, client: &ClientId, plan: AttackPlan) -> Option<Intent> {
        let me = world.player(self.player)?;
        let troops = scale(me.troops, percent(world.config().ai.attack_commit_percent));
        if troops == 0 {
            return None;
        }
        let wire = |id: Option<SmallId>| -> Option<PlayerId> {
            id.and_then(|id| world.player(id)).map(|p| p.id().clone())
        };
        Some(match plan {
            AttackPlan::Land(target) => Intent::Attack {
                client_id: client.clone(),
                target_id: wire(target),
                troops: Some(troops),
            },
            AttackPlan::Boat { target, dst } => Intent::Boat {
                client_id: client.clone(),
                target_id: wire(target),
                troops: Some(troops),
                dst,
            },
        })
    }
}

/// Shore tile of one of `candidates` closest to any own shore tile, ties by
/// distance, tile, then player.
fn nearest_landing(
    world: &World,
    player: SmallId,
    candidates: &[SmallId],
) -> Option<(SmallId, TileRef)> {
    let own_shore = world.shore_tiles(player);
    if own_shore.is_empty() {
        return None;
    }
    let mut best: Option<(u32, TileRef, SmallId)> = None;
    for &candidate in candidates {
        for dst in world.shore_tiles(candidate) {
            let Some(distance) = own_shore
                .iter()
                .map(|&src| world.map().manhattan(src, dst))
                .min()
            else {
                continue;
            };
            let key = (distance, dst, candidate);
            if best.map_or(true, |b| key < b) {
                best = Some(key);
            }
        }
    }
    best.map(|(_, dst, target)| (target, dst))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::TerrainMap;
    use crate::world::PlayerKind;

    fn world() -> (World, SmallId, SmallId) {
        let map = TerrainMap::from_ascii(
            "
            ######
            ######
            ",
        )
        .unwrap();
        let mut w = World::new("ai", GameConfig::default(), map);
        let a = w.add_player("a", PlayerKind::FakeHuman, None);
        let b = w.add_player("b", PlayerKind::Bot, None);
        (w, a, b)
    }

    #[test]
    fn test_cadence_within_difficulty_band() {
        let (w, a, _) = world();
        let ai = AiBehavior::new(&w, a, AiKind::FakeHuman).unwrap();
        let (lo, hi) = w.config().difficulty.attack_rate_band();
        assert!((lo as Tick..hi as Tick).contains(&ai.attack_rate()));
        assert!(ai.attack_tick() < ai.attack_rate());
        assert!(ai.should_act(ai.attack_tick()));
        assert!(ai.should_act(ai.attack_tick() + ai.attack_rate()));
        assert!(!ai.should_act(ai.attack_tick() + 1));
    }

    #[test]
    fn test_same_seed_same_agent() {
        let (w1, a1, _) = world();
        let (w2, a2, _) = world();
        assert_eq!(
            AiBehavior::new(&w1, a1, AiKind::Bot),
            AiBehavior::new(&w2, a2, AiKind::Bot)
        );
    }

    #[test]
    fn test_unclaimed_land_before_weak_neighbour() {
        let (mut w, a, b) = world();
        w.conquer(0, a);
        w.conquer(1, b);
        let ai = AiBehavior::new(&w, a, AiKind::Bot).unwrap();
        // Tile 6 below tile 0 is unclaimed.
        assert_eq!(ai.select_target(&w, 0), Some(AttackPlan::Land(None)));
    }

    #[test]
    fn test_weak_neighbour_attacked_when_boxed_in() {
        let (mut w, a, b) = world();
        for t in 0..12 {
            w.conquer(t, if t % 6 < 3 { a } else { b });
        }
        w.player_mut(a).unwrap().troops = 5_000;
        w.player_mut(b).unwrap().troops = 60;
        let ai = AiBehavior::new(&w, a, AiKind::Bot).unwrap();
        assert_eq!(ai.select_target(&w, 0), Some(AttackPlan::Land(Some(b))));

        w.player_mut(a).unwrap().troops = 10;
        assert_eq!(ai.select_target(&w, 0), None);
    }

    #[test]
    fn test_nation_rejects_traitor() {
        let (mut w, a, b) = world();
        w.player_mut(b).unwrap().mark_traitor(100);
        assert!(!AiBehavior::would_ally(&w, a, b, 10));
        assert!(AiBehavior::would_ally(&w, a, b, 100));
    }
}
