//! Executions: stateful, possibly multi-tick units of simulation behavior.
//!
//! Every gameplay action, structure and AI agent is an [`Execution`]
//! variant. The [`Scheduler`] drives them through a uniform lifecycle:
//!
//! 1. `init` once, at the end of the tick the execution was created in
//!    (later if it may not run during the spawn phase).
//! 2. `tick` once per tick from the following tick on, while active.
//! 3. Dropped as soon as `is_active` turns false; never ticked again.
//!
//! Executions hold ids only and resolve them against the [`World`] on each
//! call, since other executions may destroy the referenced entities in the
//! same tick.

mod alliance;
mod attack;
mod bot_spawner;
mod construction;
mod donate;
mod embargo;
mod misc;
mod nuke;
mod player;
mod scheduler;
mod spawn;
mod structures;
pub mod translator;
mod transport;
mod win_check;

use serde::{Deserialize, Serialize};

pub use alliance::{AllianceReplyExecution, AllianceRequestExecution, BreakAllianceExecution};
pub use attack::{tile_cost, AttackExecution, CancelAttackExecution};
pub use bot_spawner::BotSpawner;
pub use construction::{
    check_placement, operating_execution, ready_silo, unit_cost, ConstructionExecution,
    ConstructionState, PlacementError,
};
pub use donate::{donation_threshold, DonationExecution};
pub use embargo::EmbargoExecution;
pub use misc::{
    MarkDisconnectedExecution, NoopExecution, TargetPlayerExecution, TroopRatioExecution,
};
pub use nuke::{blast_radii, MirvExecution, NukeExecution};
pub use player::PlayerExecution;
pub use scheduler::Scheduler;
pub use spawn::SpawnExecution;
pub use structures::{
    CityExecution, DefensePostExecution, MissileSiloExecution, PortExecution,
    SamLauncherExecution,
};
pub use translator::translate;
pub use transport::{launch_tile, CancelBoatExecution, TransportShipExecution};
pub use win_check::WinCheckExecution;

use crate::ai::{BotExecution, FakeHumanExecution};
use crate::intent::Intent;
use crate::world::World;
use crate::Tick;

/// Access an execution has to the game while it runs.
pub struct ExecutionContext<'a> {
    /// The world being simulated.
    pub world: &'a mut World,
    spawned: &'a mut Vec<Execution>,
}

impl<'a> ExecutionContext<'a> {
    /// Create a context that collects spawned executions into `spawned`.
    pub fn new(world: &'a mut World, spawned: &'a mut Vec<Execution>) -> Self {
        Self { world, spawned }
    }

    /// Queue an execution. It is initialized at the end of the current tick
    /// and ticked from the next one.
    pub fn spawn(&mut self, execution: impl Into<Execution>) {
        self.spawned.push(execution.into());
    }

    /// Queue the execution for an intent through the translator, exactly as
    /// if it had arrived in a turn.
    pub fn submit(&mut self, intent: &Intent) {
        let execution = translate(intent, self.world);
        self.spawned.push(execution);
    }
}

/// Lifecycle contract shared by every execution kind.
pub trait ExecutionBehavior {
    /// One-time setup. May deactivate if preconditions fail.
    fn init(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick);

    /// Advance one tick.
    fn tick(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick);

    /// Whether the scheduler keeps this execution.
    fn is_active(&self) -> bool;

    /// Whether this execution runs before the spawn phase ends.
    fn active_during_spawn_phase(&self) -> bool {
        false
    }
}

macro_rules! executions {
    ($($variant:ident($ty:ty) => $name:literal),+ $(,)?) => {
        /// Closed set of execution kinds.
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub enum Execution {
            $(
                #[doc = concat!("`", $name, "` execution.")]
                $variant($ty),
            )+
        }

        impl Execution {
            /// Short name for logs.
            #[must_use]
            pub const fn kind(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => $name,)+
                }
            }
        }

        impl ExecutionBehavior for Execution {
            fn init(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
                match self {
                    $(Self::$variant(e) => e.init(ctx, tick),)+
                }
            }

            fn tick(&mut self, ctx: &mut ExecutionContext<'_>, tick: Tick) {
                match self {
                    $(Self::$variant(e) => e.tick(ctx, tick),)+
                }
            }

            fn is_active(&self) -> bool {
                match self {
                    $(Self::$variant(e) => e.is_active(),)+
                }
            }

            fn active_during_spawn_phase(&self) -> bool {
                match self {
                    $(Self::$variant(e) => e.active_during_spawn_phase(),)+
                }
            }
        }

        $(
            impl From<$ty> for Execution {
                fn from(execution: $ty) -> Self {
                    Self::$variant(execution)
                }
            }
        )+
    };
}

executions! {
    Noop(NoopExecution) => "noop",
    Spawn(SpawnExecution) => "spawn",
    Player(PlayerExecution) => "player",
    Attack(AttackExecution) => "attack",
    CancelAttack(CancelAttackExecution) => "cancel_attack",
    TransportShip(TransportShipExecution) => "transport_ship",
    CancelBoat(CancelBoatExecution) => "cancel_boat",
    Construction(ConstructionExecution) => "construction",
    City(CityExecution) => "city",
    Port(PortExecution) => "port",
    DefensePost(DefensePostExecution) => "defense_post",
    SamLauncher(SamLauncherExecution) => "sam_launcher",
    MissileSilo(MissileSiloExecution) => "missile_silo",
    Nuke(NukeExecution) => "nuke",
    Mirv(MirvExecution) => "mirv",
    AllianceRequest(AllianceRequestExecution) => "alliance_request",
    AllianceReply(AllianceReplyExecution) => "alliance_reply",
    BreakAlliance(BreakAllianceExecution) => "break_alliance",
    Donation(DonationExecution) => "donation",
    Embargo(EmbargoExecution) => "embargo",
    TargetPlayer(TargetPlayerExecution) => "target_player",
    TroopRatio(TroopRatioExecution) => "troop_ratio",
    MarkDisconnected(MarkDisconnectedExecution) => "mark_disconnected",
    WinCheck(WinCheckExecution) => "win_check",
    Bot(BotExecution) => "bot",
    FakeHuman(FakeHumanExecution) => "fake_human",
}

/// Capture a structure whose tile changed owner, or destroy it if the tile
/// is no longer owned. Returns false when the unit is gone.
pub(crate) fn follow_structure_owner(world: &mut World, unit: crate::world::UnitId) -> bool {
    let Some(u) = world.unit(unit) else {
        return false;
    };
    let (tile, owner) = (u.tile, u.owner);
    match world.owner(tile) {
        Some(new_owner) if new_owner == owner => true,
        Some(new_owner) => {
            if let Some(u) = world.unit_mut(unit) {
                u.owner = new_owner;
            }
            world.emit(crate::world::GameEvent::UnitCaptured {
                unit,
                from: owner,
                to: new_owner,
            });
            true
        }
        None => {
            world.remove_unit(unit);
            false
        }
    }
}
