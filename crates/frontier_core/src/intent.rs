//! Player intents and turns.
//!
//! An [`Intent`] is one player action as it travels over the network. It is
//! plain data: the translator turns it into an execution, which does all
//! validation against the world. A [`Turn`] is the ordered batch of intents
//! for one tick.
//!
//! The JSON shape is internally tagged by `type`:
//!
//! ```
//! use frontier_core::intent::{Intent, Turn};
//!
//! let turn = Turn::decode(
//!     r#"{"turnNumber":3,"intents":[{"type":"spawn","clientID":"c1","tile":42}]}"#,
//! )
//! .unwrap();
//! assert_eq!(turn.turn_number, 3);
//! assert!(matches!(turn.intents[0], Intent::Spawn { tile: 42, .. }));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::map::TileRef;
use crate::world::{AttackId, ClientId, PlayerId, UnitId, UnitType};
use crate::Tick;

/// Start or stop an embargo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbargoAction {
    /// Begin the embargo.
    Start,
    /// Lift the embargo.
    Stop,
}

/// A single player action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Intent {
    /// Place or move the starting territory during the spawn phase.
    #[serde(rename = "spawn")]
    Spawn {
        /// Acting client.
        #[serde(rename = "clientID")]
        client_id: ClientId,
        /// Centre tile.
        tile: TileRef,
    },

    /// Attack a bordering player, or unclaimed land when `target_id` is null.
    #[serde(rename = "attack")]
    Attack {
        /// Acting client.
        #[serde(rename = "clientID")]
        client_id: ClientId,
        /// Defender.
        #[serde(rename = "targetID")]
        target_id: Option<PlayerId>,
        /// Troops to send; the attack ratio applies when absent.
        #[serde(default)]
        troops: Option<u64>,
    },

    /// Retreat an attack still in flight.
    #[serde(rename = "cancel_attack")]
    CancelAttack {
        /// Acting client.
        #[serde(rename = "clientID")]
        client_id: ClientId,
        /// Player owning the attack.
        #[serde(rename = "playerID")]
        player_id: PlayerId,
        /// Attack record.
        #[serde(rename = "attackID")]
        attack_id: AttackId,
    },

    /// Ship troops across water.
    #[serde(rename = "boat")]
    Boat {
        /// Acting client.
        #[serde(rename = "clientID")]
        client_id: ClientId,
        /// Owner of the landing tile, null for unclaimed land.
        #[serde(rename = "targetID")]
        target_id: Option<PlayerId>,
        /// Troops to carry; the attack ratio applies when absent.
        #[serde(default)]
        troops: Option<u64>,
        /// Landing tile.
        dst: TileRef,
    },

    /// Turn a transport ship around.
    #[serde(rename = "cancel_boat")]
    CancelBoat {
        /// Acting client.
        #[serde(rename = "clientID")]
        client_id: ClientId,
        /// Ship.
        #[serde(rename = "unitID")]
        unit_id: UnitId,
    },

    /// Build a structure or launch a missile.
    #[serde(rename = "build_unit")]
    BuildUnit {
        /// Acting client.
        #[serde(rename = "clientID")]
        client_id: ClientId,
        /// Unit kind.
        unit: UnitType,
        /// Placement tile (target tile for missiles).
        tile: TileRef,
    },

    /// Ask another player for an alliance.
    #[serde(rename = "allianceRequest")]
    AllianceRequest {
        /// Acting client.
        #[serde(rename = "clientID")]
        client_id: ClientId,
        /// Player asked.
        recipient: PlayerId,
    },

    /// Answer an alliance request.
    #[serde(rename = "allianceRequestReply")]
    AllianceRequestReply {
        /// Acting client (the recipient of the request).
        #[serde(rename = "clientID")]
        client_id: ClientId,
        /// Player who asked.
        requestor: PlayerId,
        /// Whether the alliance is accepted.
        accept: bool,
    },

    /// Break an existing alliance.
    #[serde(rename = "breakAlliance")]
    BreakAlliance {
        /// Acting client.
        #[serde(rename = "clientID")]
        client_id: ClientId,
        /// Former ally.
        recipient: PlayerId,
    },

    /// Mark a player as a target for allies.
    #[serde(rename = "targetPlayer")]
    TargetPlayer {
        /// Acting client.
        #[serde(rename = "clientID")]
        client_id: ClientId,
        /// Target.
        target: PlayerId,
    },

    /// Give gold to another player.
    #[serde(rename = "donate_gold")]
    DonateGold {
        /// Acting client.
        #[serde(rename = "clientID")]
        client_id: ClientId,
        /// Recipient.
        recipient: PlayerId,
        /// Amount; a third of the sender's gold when absent.
        #[serde(default)]
        gold: Option<u64>,
    },

    /// Give troops to another player.
    #[serde(rename = "donate_troops")]
    DonateTroops {
        /// Acting client.
        #[serde(rename = "clientID")]
        client_id: ClientId,
        /// Recipient.
        recipient: PlayerId,
        /// Amount; a third of the sender's troops when absent.
        #[serde(default)]
        troops: Option<u64>,
    },

    /// Start or stop trading with a player.
    #[serde(rename = "embargo")]
    Embargo {
        /// Acting client.
        #[serde(rename = "clientID")]
        client_id: ClientId,
        /// Embargoed player.
        #[serde(rename = "targetID")]
        target_id: PlayerId,
        /// Start or stop.
        action: EmbargoAction,
    },

    /// Change the share of troops sent by attacks.
    #[serde(rename = "troop_ratio")]
    TroopRatio {
        /// Acting client.
        #[serde(rename = "clientID")]
        client_id: ClientId,
        /// New ratio as a whole percentage.
        ratio: u32,
    },

    /// Flag a player as disconnected or reconnected.
    #[serde(rename = "mark_disconnected")]
    MarkDisconnected {
        /// Acting client.
        #[serde(rename = "clientID")]
        client_id: ClientId,
        /// New connection state.
        #[serde(rename = "isDisconnected")]
        is_disconnected: bool,
    },
}

impl Intent {
    /// Client that sent the intent.
    #[must_use]
    pub const fn client_id(&self) -> &ClientId {
        match self {
            Self::Spawn { client_id, .. }
            | Self::Attack { client_id, .. }
            | Self::CancelAttack { client_id, .. }
            | Self::Boat { client_id, .. }
            | Self::CancelBoat { client_id, .. }
            | Self::BuildUnit { client_id, .. }
            | Self::AllianceRequest { client_id, .. }
            | Self::AllianceRequestReply { client_id, .. }
            | Self::BreakAlliance { client_id, .. }
            | Self::TargetPlayer { client_id, .. }
            | Self::DonateGold { client_id, .. }
            | Self::DonateTroops { client_id, .. }
            | Self::Embargo { client_id, .. }
            | Self::TroopRatio { client_id, .. }
            | Self::MarkDisconnected { client_id, .. } => client_id,
        }
    }

    /// Wire name of the intent kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => "spawn",
            Self::Attack { .. } => "attack",
            Self::CancelAttack { .. } => "cancel_attack",
            Self::Boat { .. } => "boat",
            Self::CancelBoat { .. } => "cancel_boat",
            Self::BuildUnit { .. } => "build_unit",
            Self::AllianceRequest { .. } => "allianceRequest",
            Self::AllianceRequestReply { .. } => "allianceRequestReply",
            Self::BreakAlliance { .. } => "breakAlliance",
            Self::TargetPlayer { .. } => "targetPlayer",
            Self::DonateGold { .. } => "donate_gold",
            Self::DonateTroops { .. } => "donate_troops",
            Self::Embargo { .. } => "embargo",
            Self::TroopRatio { .. } => "troop_ratio",
            Self::MarkDisconnected { .. } => "mark_disconnected",
        }
    }
}

/// Ordered intents for one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Tick this turn is applied on.
    #[serde(rename = "turnNumber")]
    pub turn_number: Tick,
    /// Intents in arrival order.
    pub intents: Vec<Intent>,
}

impl Turn {
    /// Create a turn.
    #[must_use]
    pub const fn new(turn_number: Tick, intents: Vec<Intent>) -> Self {
        Self {
            turn_number,
            intents,
        }
    }

    /// A turn with no intents.
    #[must_use]
    pub const fn empty(turn_number: Tick) -> Self {
        Self::new(turn_number, Vec::new())
    }

    /// Decode a turn from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Protocol`] for malformed JSON or an unknown
    /// intent kind. Replicas must treat this as fatal.
    pub fn decode(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| GameError::Protocol(e.to_string()))
    }

    /// Encode the turn as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Protocol`] if encoding fails.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| GameError::Protocol(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let intent = Intent::Attack {
            client_id: ClientId::new("c1"),
            target_id: None,
            troops: Some(500),
        };
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["type"], "attack");
        assert_eq!(json["clientID"], "c1");
        assert!(json["targetID"].is_null());
        assert_eq!(json["troops"], 500);
    }

    #[test]
    fn test_decode_every_kind() {
        let json = r#"{"turnNumber":7,"intents":[
            {"type":"spawn","clientID":"a","tile":1},
            {"type":"attack","clientID":"a","targetID":"BBBBBBBB"},
            {"type":"cancel_attack","clientID":"a","playerID":"AAAAAAAA","attackID":3},
            {"type":"boat","clientID":"a","targetID":null,"dst":9},
            {"type":"cancel_boat","clientID":"a","unitID":2},
            {"type":"build_unit","clientID":"a","unit":"City","tile":4},
            {"type":"allianceRequest","clientID":"a","recipient":"BBBBBBBB"},
            {"type":"allianceRequestReply","clientID":"b","requestor":"AAAAAAAA","accept":true},
            {"type":"breakAlliance","clientID":"a","recipient":"BBBBBBBB"},
            {"type":"targetPlayer","clientID":"a","target":"BBBBBBBB"},
            {"type":"donate_gold","clientID":"a","recipient":"BBBBBBBB","gold":10},
            {"type":"donate_troops","clientID":"a","recipient":"BBBBBBBB"},
            {"type":"embargo","clientID":"a","targetID":"BBBBBBBB","action":"start"},
            {"type":"troop_ratio","clientID":"a","ratio":40},
            {"type":"mark_disconnected","clientID":"a","isDisconnected":true}
        ]}"#;
        let turn = Turn::decode(json).unwrap();
        assert_eq!(turn.turn_number, 7);
        let kinds: Vec<_> = turn.intents.iter().map(Intent::kind).collect();
        assert_eq!(kinds.len(), 15);
        assert_eq!(kinds[0], "spawn");
        assert_eq!(kinds[14], "mark_disconnected");
        assert!(turn.intents.iter().all(|i| !i.client_id().0.is_empty()));
    }

    #[test]
    fn test_unknown_kind_is_protocol_error() {
        let err = Turn::decode(r#"{"turnNumber":0,"intents":[{"type":"teleport","clientID":"a"}]}"#)
            .unwrap_err();
        assert!(matches!(err, GameError::Protocol(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_encode_decode_preserves_order() {
        let turn = Turn::new(
            2,
            vec![
                Intent::TroopRatio {
                    client_id: ClientId::new("x"),
                    ratio: 10,
                },
                Intent::Spawn {
                    client_id: ClientId::new("y"),
                    tile: 5,
                },
            ],
        );
        let decoded = Turn::decode(&turn.encode().unwrap()).unwrap();
        assert_eq!(decoded, turn);
    }
}
