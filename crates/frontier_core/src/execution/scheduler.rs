//! Execution scheduler (tick loop).
//!
//! # Ordering
//!
//! Each call to [`Scheduler::tick`] runs in this order:
//! 1. **Tick** every execution of the active list, in list order. Executions
//!    that may not run during the spawn phase are skipped while it lasts.
//!    Anything spawned here goes to a separate buffer, never into the list
//!    being iterated.
//! 2. **Init** pending executions (turn intents first, then executions
//!    spawned in step 1 in the order their parents ran). Executions not
//!    allowed during the spawn phase stay pending until it ends.
//! 3. **Merge**: drop inactive executions and append the freshly initialized
//!    ones. They are first ticked on the next tick.

use serde::{Deserialize, Serialize};

use super::{Execution, ExecutionBehavior, ExecutionContext};
use crate::world::World;

/// Owner of every live execution of a game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheduler {
    active: Vec<Execution>,
    pending: Vec<Execution>,
}

impl Scheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an execution for initialization at the end of the next tick.
    pub fn add(&mut self, execution: impl Into<Execution>) {
        self.pending.push(execution.into());
    }

    /// Queue several executions, preserving order.
    pub fn add_all(&mut self, executions: impl IntoIterator<Item = Execution>) {
        self.pending.extend(executions);
    }

    /// Initialized executions in tick order.
    #[must_use]
    pub fn active(&self) -> &[Execution] {
        &self.active
    }

    /// Executions waiting for `init`.
    #[must_use]
    pub fn pending(&self) -> &[Execution] {
        &self.pending
    }

    /// Number of initialized executions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of executions waiting for `init`.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Run one tick of every execution against the world.
    ///
    /// Does not advance the world's tick counter; the caller does that once
    /// the whole tick (including hashing) is done.
    pub fn tick(&mut self, world: &mut World) {
        let tick = world.tick();
        let in_spawn_phase = world.in_spawn_phase();

        let mut spawned = Vec::new();
        {
            let mut ctx = ExecutionContext::new(world, &mut spawned);
            for execution in &mut self.active {
                if !execution.is_active() {
                    continue;
                }
                if in_spawn_phase && !execution.active_during_spawn_phase() {
                    continue;
                }
                execution.tick(&mut ctx, tick);
            }
        }

        let mut pending = std::mem::take(&mut self.pending);
        pending.append(&mut spawned);

        let mut initialized = Vec::with_capacity(pending.len());
        let mut deferred = Vec::new();
        let mut spawned_during_init = Vec::new();
        {
            let mut ctx = ExecutionContext::new(world, &mut spawned_during_init);
            for mut execution in pending {
                if in_spawn_phase && !execution.active_during_spawn_phase() {
                    deferred.push(execution);
                    continue;
                }
                execution.init(&mut ctx, tick);
                if execution.is_active() {
                    initialized.push(execution);
                } else {
                    tracing::debug!(tick, kind = execution.kind(), "Execution rejected in init");
                }
            }
        }

        self.active.retain(ExecutionBehavior::is_active);
        self.active.extend(initialized);
        deferred.append(&mut spawned_during_init);
        self.pending = deferred;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::execution::{NoopExecution, WinCheckExecution};
    use crate::map::TerrainMap;

    fn world(spawn_phase_ticks: u64) -> World {
        let config = GameConfig {
            spawn_phase_ticks,
            ..GameConfig::default()
        };
        World::new("scheduler", config, TerrainMap::from_ascii("###").unwrap())
    }

    #[test]
    fn test_new_execution_waits_one_tick() {
        let mut w = world(0);
        let mut scheduler = Scheduler::new();
        scheduler.add(NoopExecution::new());

        scheduler.tick(&mut w);
        // Initialized at the end of the tick, not yet ticked.
        assert_eq!(scheduler.active_count(), 1);
        assert!(scheduler.active()[0].is_active());

        w.advance_tick();
        scheduler.tick(&mut w);
        assert_eq!(scheduler.active_count(), 0);
    }

    #[test]
    fn test_spawn_phase_defers_init() {
        let mut w = world(2);
        let mut scheduler = Scheduler::new();
        scheduler.add(WinCheckExecution::new());
        scheduler.add(NoopExecution::new());

        scheduler.tick(&mut w);
        // Noop runs during the spawn phase; the win check waits.
        assert_eq!(scheduler.active_count(), 1);
        assert_eq!(scheduler.pending_count(), 1);

        w.advance_tick();
        scheduler.tick(&mut w);
        assert_eq!(scheduler.pending_count(), 1);

        w.advance_tick();
        scheduler.tick(&mut w);
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(scheduler.active()[0].kind(), "win_check");
    }
}
