//! Events emitted by executions for the presentation layer and logs.
//!
//! Events are output only. They never feed back into the simulation and are
//! not part of the consistency hash.

use serde::{Deserialize, Serialize};

use crate::map::TileRef;
use crate::world::{AttackId, RequestId, SmallId, UnitId, UnitType};

/// Resource moved by a donation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// Gold.
    Gold,
    /// Troops.
    Troops,
}

/// Something that happened during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// A player placed (or moved) its starting territory.
    PlayerSpawned {
        /// Player.
        player: SmallId,
        /// Centre tile.
        tile: TileRef,
    },
    /// An attack left home.
    AttackStarted {
        /// Attack record.
        attack: AttackId,
        /// Attacker.
        attacker: SmallId,
        /// Defender, `None` for unclaimed land.
        target: Option<SmallId>,
        /// Troops committed.
        troops: u64,
    },
    /// An attack finished or retreated and returned its leftover troops.
    AttackEnded {
        /// Attack record.
        attack: AttackId,
        /// Troops returned home.
        returned: u64,
        /// Whether it ended by retreat.
        retreated: bool,
    },
    /// Tiles changed hands.
    TilesConquered {
        /// New owner.
        attacker: SmallId,
        /// Previous owner, `None` for unclaimed land.
        defender: Option<SmallId>,
        /// Tile count.
        count: usize,
    },
    /// A structure finished construction, or a missile or ship launched.
    UnitCreated {
        /// Unit.
        unit: UnitId,
        /// Kind.
        kind: UnitType,
        /// Owner.
        owner: SmallId,
    },
    /// A unit was removed from the map.
    UnitDestroyed {
        /// Unit.
        unit: UnitId,
        /// Kind.
        kind: UnitType,
        /// Owner at destruction.
        owner: SmallId,
    },
    /// A structure changed owner because its tile was taken.
    UnitCaptured {
        /// Unit.
        unit: UnitId,
        /// Previous owner.
        from: SmallId,
        /// New owner.
        to: SmallId,
    },
    /// A nuke hit its target.
    NukeDetonated {
        /// Launching player.
        launcher: SmallId,
        /// Target tile.
        tile: TileRef,
        /// Bomb kind.
        kind: UnitType,
    },
    /// A SAM launcher shot a nuke down.
    NukeIntercepted {
        /// The nuke.
        unit: UnitId,
        /// The SAM launcher.
        by: UnitId,
    },
    /// A player asked another for an alliance.
    AllianceRequested {
        /// Request.
        request: RequestId,
        /// Player asking.
        requestor: SmallId,
        /// Player asked.
        recipient: SmallId,
    },
    /// An alliance request was explicitly rejected.
    AllianceRejected {
        /// Request.
        request: RequestId,
    },
    /// An alliance request timed out without a reply.
    AllianceRequestExpired {
        /// Request.
        request: RequestId,
    },
    /// Two players allied.
    AllianceFormed {
        /// Lower player id.
        a: SmallId,
        /// Higher player id.
        b: SmallId,
    },
    /// A player broke an alliance and became a traitor.
    AllianceBroken {
        /// Player who broke it.
        breaker: SmallId,
        /// Former ally.
        victim: SmallId,
    },
    /// An alliance reached its end.
    AllianceExpired {
        /// Lower player id.
        a: SmallId,
        /// Higher player id.
        b: SmallId,
    },
    /// Resources were donated.
    Donation {
        /// Donor.
        from: SmallId,
        /// Recipient.
        to: SmallId,
        /// Resource.
        resource: Resource,
        /// Amount.
        amount: u64,
    },
    /// An embargo started or stopped.
    EmbargoChanged {
        /// Player imposing it.
        player: SmallId,
        /// Embargoed player.
        target: SmallId,
        /// Whether it is now in place.
        active: bool,
    },
    /// A player marked another as a target.
    TargetMarked {
        /// Player marking.
        player: SmallId,
        /// Target.
        target: SmallId,
    },
    /// A player lost all territory.
    PlayerDied {
        /// Player.
        player: SmallId,
    },
    /// A player was marked disconnected.
    PlayerDisconnected {
        /// Player.
        player: SmallId,
    },
    /// A player reached the win threshold.
    Winner {
        /// Player.
        player: SmallId,
    },
}
