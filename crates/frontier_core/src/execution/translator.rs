//! Intent to execution translation.
//!
//! The translator is a pure function of the intent and a read-only view of
//! the world. It resolves wire ids to internal ids and nothing else: every
//! gameplay precondition is checked by the execution itself in `init`.
//! Anything that cannot be resolved becomes a [`NoopExecution`].

use std::fmt;

use super::{
    AllianceReplyExecution, AllianceRequestExecution, AttackExecution, BreakAllianceExecution,
    CancelAttackExecution, CancelBoatExecution, ConstructionExecution, DonationExecution,
    EmbargoExecution, Execution, MarkDisconnectedExecution, NoopExecution, SpawnExecution,
    TargetPlayerExecution, TransportShipExecution, TroopRatioExecution,
};
use crate::intent::Intent;
use crate::map::TileRef;
use crate::world::{PlayerId, Resource, SmallId, World};

/// Why an intent could not be bound to world entities.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Unresolved {
    Client,
    Player(PlayerId),
    Tile(TileRef),
    ForeignAttack,
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => write!(f, "unknown client"),
            Self::Player(id) => write!(f, "unknown player {id}"),
            Self::Tile(tile) => write!(f, "tile {tile} outside the map"),
            Self::ForeignAttack => write!(f, "attack belongs to another player"),
        }
    }
}

/// Turn an intent into the execution that carries it out.
///
/// Never fails: unresolvable intents are logged and become a no-op.
#[must_use]
pub fn translate(intent: &Intent, world: &World) -> Execution {
    match bind(intent, world) {
        Ok(execution) => execution,
        Err(reason) => {
            tracing::warn!(
                kind = intent.kind(),
                client = %intent.client_id().0,
                reason = %reason,
                tick = world.tick(),
                "Intent dropped"
            );
            NoopExecution::new().into()
        }
    }
}

fn player(world: &World, id: &PlayerId) -> Result<SmallId, Unresolved> {
    world
        .player_by_id(id)
        .ok_or_else(|| Unresolved::Player(id.clone()))
}

fn optional_player(world: &World, id: Option<&PlayerId>) -> Result<Option<SmallId>, Unresolved> {
    id.map(|id| player(world, id)).transpose()
}

fn tile(world: &World, tile: TileRef) -> Result<TileRef, Unresolved> {
    if world.map().is_valid(tile) {
        Ok(tile)
    } else {
        Err(Unresolved::Tile(tile))
    }
}

fn bind(intent: &Intent, world: &World) -> Result<Execution, Unresolved> {
    let me = world
        .player_by_client(intent.client_id())
        .ok_or(Unresolved::Client)?;

    let execution = match intent {
        Intent::Spawn { tile: t, .. } => SpawnExecution::new(me, tile(world, *t)?).into(),
        Intent::Attack {
            target_id, troops, ..
        } => AttackExecution::new(me, optional_player(world, target_id.as_ref())?, *troops).into(),
        Intent::CancelAttack {
            player_id,
            attack_id,
            ..
        } => {
            if player(world, player_id)? != me {
                return Err(Unresolved::ForeignAttack);
            }
            CancelAttackExecution::new(me, *attack_id).into()
        }
        Intent::Boat {
            target_id,
            troops,
            dst,
            ..
        } => TransportShipExecution::new(
            me,
            optional_player(world, target_id.as_ref())?,
            *troops,
            tile(world, *dst)?,
        )
        .into(),
        Intent::CancelBoat { unit_id, .. } => CancelBoatExecution::new(me, *unit_id).into(),
        Intent::BuildUnit { unit, tile: t, .. } => {
            ConstructionExecution::new(me, *unit, tile(world, *t)?).into()
        }
        Intent::AllianceRequest { recipient, .. } => {
            AllianceRequestExecution::new(me, player(world, recipient)?).into()
        }
        Intent::AllianceRequestReply {
            requestor, accept, ..
        } => AllianceReplyExecution::new(player(world, requestor)?, me, *accept).into(),
        Intent::BreakAlliance { recipient, .. } => {
            BreakAllianceExecution::new(me, player(world, recipient)?).into()
        }
        Intent::TargetPlayer { target, .. } => {
            TargetPlayerExecution::new(me, player(world, target)?).into()
        }
        Intent::DonateGold {
            recipient, gold, ..
        } => DonationExecution::new(me, player(world, recipient)?, Resource::Gold, *gold).into(),
        Intent::DonateTroops {
            recipient, troops, ..
        } => {
            DonationExecution::new(me, player(world, recipient)?, Resource::Troops, *troops).into()
        }
        Intent::Embargo {
            target_id, action, ..
        } => EmbargoExecution::new(me, player(world, target_id)?, *action).into(),
        Intent::TroopRatio { ratio, .. } => TroopRatioExecution::new(me, *ratio).into(),
        Intent::MarkDisconnected {
            is_disconnected, ..
        } => MarkDisconnectedExecution::new(me, *is_disconnected).into(),
    };
    Ok(execution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::intent::EmbargoAction;
    use crate::map::TerrainMap;
    use crate::world::{AttackId, ClientId, PlayerKind, UnitType};

    fn world() -> (World, SmallId, SmallId) {
        let mut w = World::new(
            "translate",
            GameConfig::default(),
            TerrainMap::from_ascii("#####").unwrap(),
        );
        let a = w.add_player("a", PlayerKind::Human, Some(ClientId::new("ca")));
        let b = w.add_player("b", PlayerKind::Human, Some(ClientId::new("cb")));
        (w, a, b)
    }

    fn wire_id(w: &World, id: SmallId) -> PlayerId {
        w.player(id).unwrap().id().clone()
    }

    #[test]
    fn test_unknown_client_is_noop() {
        let (w, _, _) = world();
        let intent = Intent::Spawn {
            client_id: ClientId::new("ghost"),
            tile: 0,
        };
        assert_eq!(translate(&intent, &w), Execution::from(NoopExecution::new()));
    }

    #[test]
    fn test_unknown_target_is_noop() {
        let (w, _, _) = world();
        let intent = Intent::Attack {
            client_id: ClientId::new("ca"),
            target_id: Some(PlayerId::new("nonexistent")),
            troops: Some(100),
        };
        assert_eq!(translate(&intent, &w).kind(), "noop");
    }

    #[test]
    fn test_invalid_tile_is_noop() {
        let (w, _, _) = world();
        let intent = Intent::BuildUnit {
            client_id: ClientId::new("ca"),
            unit: UnitType::City,
            tile: 99,
        };
        assert_eq!(translate(&intent, &w).kind(), "noop");
    }

    #[test]
    fn test_cancel_attack_of_other_player_is_noop() {
        let (w, _, b) = world();
        let intent = Intent::CancelAttack {
            client_id: ClientId::new("ca"),
            player_id: wire_id(&w, b),
            attack_id: AttackId(0),
        };
        assert_eq!(translate(&intent, &w).kind(), "noop");
    }

    #[test]
    fn test_resolved_intents_map_to_executions() {
        let (w, a, b) = world();
        let client = ClientId::new("ca");
        let b_id = wire_id(&w, b);

        let attack = Intent::Attack {
            client_id: client.clone(),
            target_id: Some(b_id.clone()),
            troops: None,
        };
        assert_eq!(
            translate(&attack, &w),
            Execution::from(AttackExecution::new(a, Some(b), None))
        );

        let reply = Intent::AllianceRequestReply {
            client_id: client.clone(),
            requestor: b_id.clone(),
            accept: true,
        };
        assert_eq!(
            translate(&reply, &w),
            Execution::from(AllianceReplyExecution::new(b, a, true))
        );

        let embargo = Intent::Embargo {
            client_id: client.clone(),
            target_id: b_id,
            action: EmbargoAction::Start,
        };
        assert_eq!(translate(&embargo, &w).kind(), "embargo");

        let unclaimed = Intent::Attack {
            client_id: client,
            target_id: None,
            troops: Some(10),
        };
        assert_eq!(
            translate(&unclaimed, &w),
            Execution::from(AttackExecution::new(a, None, Some(10)))
        );
    }

    #[test]
    fn test_translate_is_pure() {
        let (w, _, b) = world();
        let intent = Intent::DonateGold {
            client_id: ClientId::new("ca"),
            recipient: wire_id(&w, b),
            gold: Some(5),
        };
        let before = w.clone();
        let first = translate(&intent, &w);
        let second = translate(&intent, &w);
        assert_eq!(first, second);
        assert_eq!(w, before);
    }
}
