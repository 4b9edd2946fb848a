//! Alliance requests and alliances.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::world::SmallId;
use crate::Tick;

/// Identifier of an alliance request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u32);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request#{}", self.0)
    }
}

/// Resolution state of an alliance request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Waiting for a reply.
    Pending,
    /// Accepted by the recipient (or by a crossing request).
    Accepted,
    /// Rejected by the recipient or expired.
    Rejected,
}

/// A request from one player to ally with another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllianceRequest {
    /// Request id.
    pub id: RequestId,
    /// Player asking.
    pub requestor: SmallId,
    /// Player asked.
    pub recipient: SmallId,
    /// Tick the request was made.
    pub created: Tick,
    /// Current status.
    pub status: RequestStatus,
}

/// An alliance between two players. `a` is always the lower id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alliance {
    /// Lower player id.
    pub a: SmallId,
    /// Higher player id.
    pub b: SmallId,
    /// Tick the alliance formed.
    pub created: Tick,
    /// Tick the alliance ends.
    pub expires: Tick,
}

impl Alliance {
    /// The other member of the alliance, if `player` is one.
    #[must_use]
    pub fn other(&self, player: SmallId) -> Option<SmallId> {
        if self.a == player {
            Some(self.b)
        } else if self.b == player {
            Some(self.a)
        } else {
            None
        }
    }
}

fn pair(x: SmallId, y: SmallId) -> (SmallId, SmallId) {
    if x <= y {
        (x, y)
    } else {
        (y, x)
    }
}

/// All diplomatic state of a game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diplomacy {
    requests: BTreeMap<RequestId, AllianceRequest>,
    alliances: BTreeMap<(SmallId, SmallId), Alliance>,
}

impl Diplomacy {
    /// Whether two players are allied.
    #[must_use]
    pub fn are_allied(&self, x: SmallId, y: SmallId) -> bool {
        x != y && self.alliances.contains_key(&pair(x, y))
    }

    /// Alliance between two players, if any.
    #[must_use]
    pub fn alliance(&self, x: SmallId, y: SmallId) -> Option<&Alliance> {
        self.alliances.get(&pair(x, y))
    }

    /// All alliances ordered by pair.
    pub fn alliances(&self) -> impl Iterator<Item = &Alliance> {
        self.alliances.values()
    }

    /// Allies of a player in id order.
    #[must_use]
    pub fn allies_of(&self, player: SmallId) -> Vec<SmallId> {
        self.alliances
            .values()
            .filter_map(|a| a.other(player))
            .collect()
    }

    /// Form an alliance. Returns false if the players were already allied.
    pub fn form_alliance(&mut self, x: SmallId, y: SmallId, created: Tick, duration: Tick) -> bool {
        if x == y || self.are_allied(x, y) {
            return false;
        }
        let (a, b) = pair(x, y);
        self.alliances.insert(
            (a, b),
            Alliance {
                a,
                b,
                created,
                expires: created.saturating_add(duration),
            },
        );
        true
    }

    /// Remove an alliance. Returns the removed alliance, if any.
    pub fn break_alliance(&mut self, x: SmallId, y: SmallId) -> Option<Alliance> {
        self.alliances.remove(&pair(x, y))
    }

    /// Remove alliances that expire at or before `tick`.
    pub fn expire_alliances(&mut self, tick: Tick) -> Vec<Alliance> {
        let expired: Vec<(SmallId, SmallId)> = self
            .alliances
            .iter()
            .filter(|(_, a)| a.expires <= tick)
            .map(|(k, _)| *k)
            .collect();
        expired
            .into_iter()
            .filter_map(|k| self.alliances.remove(&k))
            .collect()
    }

    /// Remove every alliance involving a player.
    pub fn remove_player(&mut self, player: SmallId) {
        self.alliances.retain(|_, a| a.other(player).is_none());
        for request in self.requests.values_mut() {
            if request.status == RequestStatus::Pending
                && (request.requestor == player || request.recipient == player)
            {
                request.status = RequestStatus::Rejected;
            }
        }
    }

    /// Record a new pending request.
    pub fn add_request(&mut self, request: AllianceRequest) {
        self.requests.insert(request.id, request);
    }

    /// Request by id.
    #[must_use]
    pub fn request(&self, id: RequestId) -> Option<&AllianceRequest> {
        self.requests.get(&id)
    }

    /// Mutable request by id.
    pub fn request_mut(&mut self, id: RequestId) -> Option<&mut AllianceRequest> {
        self.requests.get_mut(&id)
    }

    /// Drop a resolved request.
    pub fn remove_request(&mut self, id: RequestId) -> Option<AllianceRequest> {
        self.requests.remove(&id)
    }

    /// Pending request from `requestor` to `recipient`.
    #[must_use]
    pub fn pending_request(&self, requestor: SmallId, recipient: SmallId) -> Option<&AllianceRequest> {
        self.requests.values().find(|r| {
            r.status == RequestStatus::Pending && r.requestor == requestor && r.recipient == recipient
        })
    }

    /// Pending requests addressed to `recipient`, oldest first.
    #[must_use]
    pub fn incoming_requests(&self, recipient: SmallId) -> Vec<&AllianceRequest> {
        self.requests
            .values()
            .filter(|r| r.status == RequestStatus::Pending && r.recipient == recipient)
            .collect()
    }

    /// All requests in id order.
    pub fn requests(&self) -> impl Iterator<Item = &AllianceRequest> {
        self.requests.values()
    }
}
