// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{info, warn};

use crate::dag::{ScheduledUnit, Scheduler};
use crate::engine::UnitOutcome;
use crate::report::Reason;
use crate::types::UnitName;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Send these units to the worker pool.
    DispatchUnits(Vec<ScheduledUnit>),
    /// Every unit is terminal; the shell can stop.
    RequestExit,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Admit the first wave of ready units.
pub fn handle_start(scheduler: &mut Scheduler) -> CoreStep {
    let step = scheduler.start();
    finish_step(scheduler, step.newly_scheduled)
}

/// Handle a unit completion event.
pub fn handle_unit_completion(
    scheduler: &mut Scheduler,
    unit: UnitName,
    outcome: UnitOutcome,
) -> CoreStep {
    let step = scheduler.complete(&unit, outcome);
    if !step.newly_early_exited.is_empty() {
        info!(
            unit = %unit,
            early_exited = ?step.newly_early_exited,
            "units skipped after failure"
        );
    }
    finish_step(scheduler, step.newly_scheduled)
}

/// Handle a shutdown request.
///
/// Pending units become EarlyExit; running units are allowed to report
/// back so their records are closed.
pub fn handle_shutdown(scheduler: &mut Scheduler) -> CoreStep {
    if scheduler.is_halted() {
        warn!("shutdown already in progress");
    } else {
        let skipped = scheduler.halt(Reason::Interrupted, None);
        warn!(
            skipped = skipped.len(),
            running = scheduler.running_count(),
            "shutdown requested; waiting for running units"
        );
    }
    finish_step(scheduler, Vec::new())
}

fn finish_step(scheduler: &Scheduler, ready: Vec<ScheduledUnit>) -> CoreStep {
    let mut commands = Vec::new();
    if !ready.is_empty() {
        commands.push(CoreCommand::DispatchUnits(ready));
    }

    let keep_running = !scheduler.is_finished();
    if !keep_running {
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}
