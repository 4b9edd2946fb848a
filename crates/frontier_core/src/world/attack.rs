//! Attack records shared between attack executions and their cancel path.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::world::SmallId;
use crate::Tick;

/// Identifier of an attack record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttackId(pub u32);

impl fmt::Display for AttackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attack#{}", self.0)
    }
}

/// World-side view of an in-flight attack.
///
/// The owning execution holds only the id. A cancel sets `retreating`; the
/// owning execution observes it on its next tick and returns the troops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRecord {
    /// Record id.
    pub id: AttackId,
    /// Attacking player.
    pub attacker: SmallId,
    /// Defending player, or `None` for unclaimed land.
    pub target: Option<SmallId>,
    /// Troops still in flight.
    pub troops: u64,
    /// Tick the attack started.
    pub started: Tick,
    /// Set by a cancel; the owning execution retreats on its next tick.
    pub retreating: bool,
}

impl AttackRecord {
    /// Create a record for a new attack.
    #[must_use]
    pub const fn new(
        id: AttackId,
        attacker: SmallId,
        target: Option<SmallId>,
        troops: u64,
        started: Tick,
    ) -> Self {
        Self {
            id,
            attacker,
            target,
            troops,
            started,
            retreating: false,
        }
    }
}
