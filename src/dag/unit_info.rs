// src/dag/unit_info.rs

//! Per-unit run state and the work items handed to workers.

use crate::report::RunResult;
use crate::types::{Action, UnitName};

/// Per-run state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Waiting for its gates (dependencies, or dependents when destroying).
    Pending,
    /// Dispatched to a worker.
    Running,
    Succeeded,
    Failed,
    /// Skipped because an ancestor failed or admission was halted.
    EarlyExit,
    /// Skipped by an execution decision.
    Excluded,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunState::Pending | RunState::Running)
    }

    /// Terminal states that stop units gated on this one.
    pub fn blocks_gated(&self) -> bool {
        matches!(self, RunState::Failed | RunState::EarlyExit)
    }

    pub fn result(&self) -> Option<RunResult> {
        match self {
            RunState::Pending | RunState::Running => None,
            RunState::Succeeded => Some(RunResult::Succeeded),
            RunState::Failed => Some(RunResult::Failed),
            RunState::EarlyExit => Some(RunResult::EarlyExit),
            RunState::Excluded => Some(RunResult::Excluded),
        }
    }
}

impl From<RunResult> for RunState {
    fn from(result: RunResult) -> Self {
        match result {
            RunResult::Succeeded => RunState::Succeeded,
            RunResult::Failed => RunState::Failed,
            RunResult::EarlyExit => RunState::EarlyExit,
            RunResult::Excluded => RunState::Excluded,
        }
    }
}

/// Scheduler bookkeeping for one unit.
#[derive(Debug, Clone)]
pub struct UnitInfo {
    pub name: UnitName,
    pub run_state: RunState,
}

impl UnitInfo {
    pub fn new(name: UnitName, run_state: RunState) -> Self {
        Self { name, run_state }
    }
}

/// A unit the scheduler wants a worker to run now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledUnit {
    pub name: UnitName,
    pub action: Action,
}
