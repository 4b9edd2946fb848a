//! Alliance requests, replies and betrayals.

use serde::{Deserialize, Serialize};

use super::{ExecutionBehavior, ExecutionContext};
use crate::world::{
    AllianceRequest, GameEvent, RequestId, RequestStatus, SmallId, MIN_RELATION,
};
use crate::Tick;

/// A pending request that auto-rejects after the configured duration.
///
/// Races are checked against current state in `init`: an existing alliance
/// or an identical pending request rejects; a crossing request from the
/// recipient accepts both at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllianceRequestExecution {
    requestor: SmallId,
    recipient: SmallId,
    request: Option<RequestId>,
    active: bool,
}

impl AllianceRequestExecution {
    /// Create the request.
    #[must_use]
    pub const fn new(requestor: SmallId, recipient: SmallId) -> Self {
        Self {
            requestor,
            recipient,
            request: None,
            active: true,
        }
    }

    /// World-side request, once recorded.
    #[must_use]
    pub const fn request(&self) -> Option<RequestId> {
        self.request
    }

    fn reject(&mut self, reason: &str) {
        tracing::warn!(requestor = %self.requestor, recipient = %self.recipient, reason, "Alliance request rejected");
        self.active = false;
    }
}

impl ExecutionBehavior for AllianceRequestExecution {
    fn init(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        let world = &mut *ctx.world;
        if self.requestor == self.recipient {
            return self.reject("cannot ally with self");
        }
        if !world.is_alive(self.requestor) || !world.is_alive(self.recipient) {
            return self.reject("player not alive");
        }
        if world.are_allied(self.requestor, self.recipient) {
            return self.reject("already allied");
        }
        if world
            .diplomacy()
            .pending_request(self.requestor, self.recipient)
            .is_some()
        {
            return self.reject("request already pending");
        }

        if let Some(crossing) = world
            .diplomacy()
            .pending_request(self.recipient, self.requestor)
            .map(|r| r.id)
        {
            if let Some(r) = world.diplomacy_mut().request_mut(crossing) {
                r.status = RequestStatus::Accepted;
            }
            world.form_alliance(self.requestor, self.recipient);
            self.active = false;
            return;
        }

        let id = world.next_request_id();
        world.diplomacy_mut().add_request(AllianceRequest {
            id,
            requestor: self.requestor,
            recipient: self.recipient,
            created: tick,
            status: RequestStatus::Pending,
        });
        self.request = Some(id);
        tracing::info!(request = %id, requestor = %self.requestor, recipient = %self.recipient, tick, "Alliance requested");
        world.emit(GameEvent::AllianceRequested {
            request: id,
            requestor: self.requestor,
            recipient: self.recipient,
        });
    }

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        let Some(id) = self.request else {
            self.active = false;
            return;
        };
        let world = &mut *ctx.world;
        let Some(request) = world.diplomacy().request(id) else {
            self.active = false;
            return;
        };
        let (status, created) = (request.status, request.created);

        if status != RequestStatus::Pending {
            world.diplomacy_mut().remove_request(id);
            self.active = false;
            return;
        }
        if !world.is_alive(self.requestor) || !world.is_alive(self.recipient) {
            world.diplomacy_mut().remove_request(id);
            self.active = false;
            return;
        }

        let duration = world.config().diplomacy.alliance_request_duration;
        if tick.saturating_sub(created) >= duration {
            world.diplomacy_mut().remove_request(id);
            tracing::info!(request = %id, tick, "Alliance request expired");
            world.emit(GameEvent::AllianceRequestExpired { request: id });
            self.active = false;
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// The recipient's answer to a pending request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllianceReplyExecution {
    requestor: SmallId,
    recipient: SmallId,
    accept: bool,
    active: bool,
}

impl AllianceReplyExecution {
    /// Create the reply. `recipient` is the replying player.
    #[must_use]
    pub const fn new(requestor: SmallId, recipient: SmallId, accept: bool) -> Self {
        Self {
            requestor,
            recipient,
            accept,
            active: true,
        }
    }
}

impl ExecutionBehavior for AllianceReplyExecution {
    fn init(&mut self, _ctx: &mut ExecutionContext<'_>, _tick: Tick) {}

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        self.active = false;
        let world = &mut *ctx.world;
        let Some(id) = world
            .diplomacy()
            .pending_request(self.requestor, self.recipient)
            .map(|r| r.id)
        else {
            tracing::warn!(requestor = %self.requestor, recipient = %self.recipient, "No pending alliance request to answer");
            return;
        };

        let accepted = self.accept && world.is_alive(self.requestor) && world.is_alive(self.recipient);
        if let Some(r) = world.diplomacy_mut().request_mut(id) {
            r.status = if accepted {
                RequestStatus::Accepted
            } else {
                RequestStatus::Rejected
            };
        }
        if accepted {
            world.form_alliance(self.requestor, self.recipient);
        } else {
            tracing::info!(request = %id, tick, "Alliance request rejected");
            world.emit(GameEvent::AllianceRejected { request: id });
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Ends an alliance. The breaker is flagged as traitor and the former ally
/// turns hostile toward them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakAllianceExecution {
    breaker: SmallId,
    other: SmallId,
    active: bool,
}

impl BreakAllianceExecution {
    /// Create the execution.
    #[must_use]
    pub const fn new(breaker: SmallId, other: SmallId) -> Self {
        Self {
            breaker,
            other,
            active: true,
        }
    }
}

impl ExecutionBehavior for BreakAllianceExecution {
    fn init(&mut self, _ctx: &mut ExecutionContext<'_>, _tick: Tick) {}

    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
        self.active = false;
        let world = &mut *ctx.world;
        if world
            .diplomacy_mut()
            .break_alliance(self.breaker, self.other)
            .is_none()
        {
            tracing::warn!(breaker = %self.breaker, other = %self.other, "No alliance to break");
            return;
        }
        let traitor_duration = world.config().diplomacy.traitor_duration;
        if let Some(p) = world.player_mut(self.breaker) {
            p.mark_traitor(tick + traitor_duration);
        }
        if let Some(victim) = world.player_mut(self.other) {
            victim.update_relation(self.breaker, 2 * MIN_RELATION);
        }
        tracing::info!(breaker = %self.breaker, victim = %self.other, tick, "Alliance broken");
        world.emit(GameEvent::AllianceBroken {
            breaker: self.breaker,
            victim: self.other,
        });
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::TerrainMap;
    use crate::world::{PlayerKind, World};

    fn world() -> (World, SmallId, SmallId) {
        let mut world = World::new("ally", GameConfig::default(), TerrainMap::from_ascii("####").unwrap());
        let a = world.add_player("a", PlayerKind::Human, None);
        let b = world.add_player("b", PlayerKind::Human, None);
        (world, a, b)
    }

    fn request(world: &mut World, from: SmallId, to: SmallId, tick: Tick) -> AllianceRequestExecution {
        let mut spawned = Vec::new();
        let mut exec = AllianceRequestExecution::new(from, to);
        exec.init(&mut ExecutionContext::new(world, &mut spawned), tick);
        exec
    }

    #[test]
    fn test_request_is_recorded_and_announced() {
        let (mut world, a, b) = world();
        let exec = request(&mut world, a, b, 3);
        assert!(exec.is_active());
        let id = exec.request().unwrap();
        assert_eq!(world.diplomacy().pending_request(a, b).map(|r| r.id), Some(id));
        assert!(world.drain_events().contains(&GameEvent::AllianceRequested {
            request: id,
            requestor: a,
            recipient: b,
        }));
    }

    #[test]
    fn test_duplicate_request_is_rejected() {
        let (mut world, a, b) = world();
        let first = request(&mut world, a, b, 0);
        let second = request(&mut world, a, b, 1);
        assert!(first.is_active());
        assert!(!second.is_active());
        assert_eq!(second.request(), None);
    }

    #[test]
    fn test_request_between_allies_is_rejected() {
        let (mut world, a, b) = world();
        assert!(world.form_alliance(a, b));
        let exec = request(&mut world, b, a, 0);
        assert!(!exec.is_active());
        assert!(world.diplomacy().pending_request(b, a).is_none());
    }

    #[test]
    fn test_crossing_request_forms_alliance() {
        let (mut world, a, b) = world();
        let first = request(&mut world, a, b, 0);
        let crossing = request(&mut world, b, a, 1);
        assert!(!crossing.is_active());
        assert!(world.are_allied(a, b));
        let id = first.request().unwrap();
        assert_eq!(world.diplomacy().request(id).map(|r| r.status), Some(RequestStatus::Accepted));
    }

    #[test]
    fn test_accepted_reply_forms_alliance_and_clears_request() {
        let (mut world, a, b) = world();
        let mut req = request(&mut world, a, b, 0);
        world.drain_events();

        let mut spawned = Vec::new();
        let mut reply = AllianceReplyExecution::new(a, b, true);
        let mut ctx = ExecutionContext::new(&mut world, &mut spawned);
        reply.init(&mut ctx, 1);
        reply.tick(&mut ctx, 1);
        assert!(!reply.is_active());
        req.tick(&mut ctx, 2);
        assert!(!req.is_active());

        assert!(world.are_allied(a, b));
        assert!(world.diplomacy().pending_request(a, b).is_none());
        assert!(world.drain_events().contains(&GameEvent::AllianceFormed { a, b }));
    }

    #[test]
    fn test_rejected_reply_leaves_players_unallied() {
        let (mut world, a, b) = world();
        let req = request(&mut world, a, b, 0);
        let mut spawned = Vec::new();
        let mut reply = AllianceReplyExecution::new(a, b, false);
        reply.tick(&mut ExecutionContext::new(&mut world, &mut spawned), 1);
        assert!(!world.are_allied(a, b));
        assert!(world.drain_events().contains(&GameEvent::AllianceRejected {
            request: req.request().unwrap(),
        }));
    }

    #[test]
    fn test_request_expires() {
        let (mut world, a, b) = world();
        let duration = world.config().diplomacy.alliance_request_duration;
        let mut req = request(&mut world, a, b, 0);
        let mut spawned = Vec::new();
        let mut ctx = ExecutionContext::new(&mut world, &mut spawned);
        req.tick(&mut ctx, duration - 1);
        assert!(req.is_active());
        req.tick(&mut ctx, duration);
        assert!(!req.is_active());
        assert!(world.diplomacy().pending_request(a, b).is_none());
    }

    #[test]
    fn test_breaking_marks_traitor() {
        let (mut world, a, b) = world();
        world.form_alliance(a, b);
        let mut spawned = Vec::new();
        let mut exec = BreakAllianceExecution::new(a, b);
        exec.tick(&mut ExecutionContext::new(&mut world, &mut spawned), 5);
        assert!(!world.are_allied(a, b));
        assert!(world.player(a).unwrap().is_traitor(6));
        assert!(world
            .drain_events()
            .contains(&GameEvent::AllianceBroken { breaker: a, victim: b }));
    }
}
