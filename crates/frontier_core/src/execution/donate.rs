//! Gold and troop donations.

use serde::{Deserialize, Serialize};

use super::{ExecutionBehavior, ExecutionContext};
use crate::config::Difficulty;
use crate::random::PseudoRandom;
use crate::world::{GameEvent, Relation, Resource, SmallId};
use crate::Tick;

/// Smallest donation an AI recipient is grateful for: a random share of its
/// own stock, drawn from the difficulty's percentage band.
#[must_use]
pub fn donation_threshold(difficulty: Difficulty, stock: u64, rng: &mut PseudoRandom) -> u64 {
    let (lo, hi) = difficulty.donation_threshold_band();
    let pct = rng.next_int(lo, hi) as u64;
    stock.saturating_mul(pct) / 100
}

/// Transfers gold or troops in a single tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationExecution {
    sender: SmallId,
    recipient: SmallId,
    resource: Resource,
    amount: Option<u64>,
    active: bool,
}

impl DonationExecution {
    /// Create the donation. Without an amount a third of the sender's stock
    /// is sent.
    #[must_use]
    pub const fn new(
        sender: SmallId,
        recipient: SmallId,
        resource: Resource,
        amount: Option<u64>,
    ) -> Self {
        Self {
            sender,
            recipient,
            resource,
            amount,
            active: true,
        }
    }

    fn reject(&mut self, reason: &str) {
        tracing::warn!(sender = %self.sender, recipient = %self.recipient, resource = ?self.resource, reason, "Donation rejected");
        self.active = false;
    }
}

impl ExecutionBehavior for DonationExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>, _tick: Tick) {
        let world = &*ctx.world;
        if self.sender == self.recipient {
            return self.reject("cannot donate to self");
        }
        if !world.config().donations_enabled {
            return self.reject("donations disabled");
        }
        let (Some(sender), true) = (world.alive_player(self.sender), world.is_alive(self.recipient))
        else {
            return self.reject("player not alive");
        };
        if sender.relation(self.recipient) == Relation::Hostile {
            return self.reject("sender is hostile toward recipient");
        }
        if sender.has_embargo_against(self.recipient) {
            return self.reject("sender embargoes recipient");
        }
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        self.active = false;
        let world = &mut *ctx.world;
        let (Some(sender), Some(recipient)) = (
            world.alive_player(self.sender),
            world.alive_player(self.recipient),
        ) else {
            return;
        };
        let available = match self.resource {
            Resource::Gold => sender.gold,
            Resource::Troops => sender.troops,
        };
        let amount = self.amount.unwrap_or(available / 3);
        if amount == 0 || amount > available {
            tracing::warn!(sender = %self.sender, amount, available, "Donation amount not available");
            return;
        }
        let recipient_is_ai = recipient.kind().is_ai();
        let recipient_stock = match self.resource {
            Resource::Gold => recipient.gold,
            Resource::Troops => recipient.troops,
        };

        if let Some(p) = world.player_mut(self.sender) {
            match self.resource {
                Resource::Gold => p.gold -= amount,
                Resource::Troops => p.troops -= amount,
            }
        }
        if let Some(p) = world.player_mut(self.recipient) {
            match self.resource {
                Resource::Gold => p.gold = p.gold.saturating_add(amount),
                Resource::Troops => p.troops = p.troops.saturating_add(amount),
            }
        }

        if recipient_is_ai {
            let salt = (u64::from(self.sender.0) << 16) | u64::from(self.recipient.0);
            let mut rng = world.derive_rng(salt);
            let threshold = donation_threshold(world.config().difficulty, recipient_stock, &mut rng);
            if amount >= threshold {
                let delta = world.config().diplomacy.donation_relation_delta;
                if let Some(p) = world.player_mut(self.recipient) {
                    p.update_relation(self.sender, delta);
                }
            }
        }

        tracing::debug!(sender = %self.sender, recipient = %self.recipient, resource = ?self.resource, amount, tick, "Donation");
        world.emit(GameEvent::Donation {
            from: self.sender,
            to: self.recipient,
            resource: self.resource,
            amount,
        });
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_band(difficulty: Difficulty, lo: u64, hi: u64) {
        let mut rng = PseudoRandom::new(17);
        let mut seen_lo = u64::MAX;
        let mut seen_hi = 0;
        for _ in 0..500 {
            let t = donation_threshold(difficulty, 10_000, &mut rng);
            assert!(
                (lo * 100..hi * 100).contains(&t),
                "{difficulty:?} threshold {t} outside {lo}%..{hi}%"
            );
            seen_lo = seen_lo.min(t);
            seen_hi = seen_hi.max(t);
        }
        assert_eq!(seen_lo, lo * 100, "{difficulty:?} never drew its lower bound");
        assert_eq!(seen_hi, (hi - 1) * 100, "{difficulty:?} never drew its upper bound");
    }

    #[test]
    fn test_threshold_easy() {
        assert_band(Difficulty::Easy, 5, 10);
    }

    #[test]
    fn test_threshold_medium() {
        assert_band(Difficulty::Medium, 10, 20);
    }

    #[test]
    fn test_threshold_hard() {
        assert_band(Difficulty::Hard, 20, 35);
    }

    #[test]
    fn test_threshold_impossible() {
        assert_band(Difficulty::Impossible, 35, 50);
    }

    #[test]
    fn test_threshold_deterministic_and_zero_stock() {
        for difficulty in Difficulty::ALL {
            let a = donation_threshold(difficulty, 7_777, &mut PseudoRandom::new(3));
            let b = donation_threshold(difficulty, 7_777, &mut PseudoRandom::new(3));
            assert_eq!(a, b);
            assert_eq!(donation_threshold(difficulty, 0, &mut PseudoRandom::new(3)), 0);
        }
    }
}
