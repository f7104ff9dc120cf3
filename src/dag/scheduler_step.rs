// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::unit_info::ScheduledUnit;
use crate::types::UnitName;

/// Structured result of a single scheduler "step".
///
/// This is useful for tests that want to manually step the graph and make
/// assertions about what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Units admitted to the pool as a result of this step.
    pub newly_scheduled: Vec<ScheduledUnit>,
    /// Units marked EarlyExit in this step (ancestor error or halted admission).
    pub newly_early_exited: Vec<UnitName>,
    /// Whether every unit is now terminal.
    pub run_just_finished: bool,
}
