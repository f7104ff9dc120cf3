// src/dag/state_manager.rs

//! Per-run state management for units in the scheduler.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::dag::unit_info::{RunState, ScheduledUnit, UnitInfo};
use crate::dag::UnitGraph;
use crate::errors::Result;
use crate::report::{Reason, Report, RunResult};
use crate::types::{Action, Direction, UnitName};

/// Manages per-run state transitions for units, keeping the report in step.
pub struct StateManager<'a> {
    graph: &'a UnitGraph,
    direction: Direction,
    units: &'a mut BTreeMap<UnitName, UnitInfo>,
    report: &'a mut Report,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a UnitGraph,
        direction: Direction,
        units: &'a mut BTreeMap<UnitName, UnitInfo>,
        report: &'a mut Report,
    ) -> Self {
        Self {
            graph,
            direction,
            units,
            report,
        }
    }

    /// Whether every gate of `name` is terminal and, unless
    /// `ignore_dependency_errors`, none of them failed or exited early.
    pub fn gates_satisfied(&self, name: &str, ignore_dependency_errors: bool) -> bool {
        let ro = ReadOnlyStateManager::new(self.graph, self.direction, &*self.units);
        ro.gates_satisfied(name, ignore_dependency_errors)
    }

    /// Mark every pending unit gated (transitively) on `failed` as EarlyExit.
    ///
    /// `cause` is the unit whose failure started the cascade. Returns the
    /// units newly marked, not including `failed` itself.
    pub fn mark_gated_early_exit(&mut self, failed: &str, cause: &str) -> Vec<UnitName> {
        let mut stack: Vec<UnitName> = self.graph.gated_by(failed, self.direction).to_vec();
        let mut visited: BTreeSet<UnitName> = BTreeSet::new();
        let mut newly = Vec::new();

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }

            let Some(info) = self.units.get_mut(&name) else {
                warn!(unit = %name, "node in graph not present in units map");
                continue;
            };

            match info.run_state {
                RunState::Pending => {
                    info.run_state = RunState::EarlyExit;
                    debug!(unit = %name, cause = %cause, "early exit due to ancestor failure");
                    log_report_error(self.report.skip(
                        &name,
                        RunResult::EarlyExit,
                        Reason::AncestorError,
                        Some(cause.to_string()),
                        Utc::now(),
                    ));
                    newly.push(name.clone());
                    stack.extend(self.graph.gated_by(&name, self.direction).iter().cloned());
                }
                RunState::Excluded => {
                    // Excluded units never run, but whatever is gated on them
                    // still inherits the failure.
                    stack.extend(self.graph.gated_by(&name, self.direction).iter().cloned());
                }
                RunState::Running
                | RunState::Succeeded
                | RunState::Failed
                | RunState::EarlyExit => {}
            }
        }

        newly
    }

    /// Mark every pending unit EarlyExit; used by fail-fast and shutdown.
    pub fn halt_pending(&mut self, reason: Reason, cause: Option<&str>) -> Vec<UnitName> {
        let pending: Vec<UnitName> = self
            .units
            .values()
            .filter(|info| info.run_state == RunState::Pending)
            .map(|info| info.name.clone())
            .collect();

        let now = Utc::now();
        for name in &pending {
            if let Some(info) = self.units.get_mut(name) {
                info.run_state = RunState::EarlyExit;
            }
            log_report_error(self.report.skip(
                name,
                RunResult::EarlyExit,
                reason,
                cause.map(str::to_string),
                now,
            ));
        }

        pending
    }

    /// Admit up to `capacity` pending units whose gates are satisfied.
    ///
    /// Candidates are taken in identity order so a pool of one worker runs
    /// deterministically.
    pub fn collect_new_ready_units(
        &mut self,
        capacity: usize,
        action: Action,
        ignore_dependency_errors: bool,
    ) -> Vec<ScheduledUnit> {
        if capacity == 0 {
            return Vec::new();
        }

        // Decide first, then mutate to avoid borrowing issues.
        let candidates: Vec<UnitName> = self
            .units
            .values()
            .filter(|info| {
                info.run_state == RunState::Pending
                    && self.gates_satisfied(&info.name, ignore_dependency_errors)
            })
            .take(capacity)
            .map(|info| info.name.clone())
            .collect();

        let mut ready = Vec::with_capacity(candidates.len());
        for name in candidates {
            if let Some(info) = self.units.get_mut(&name) {
                info!(unit = %name, %action, "admitting unit");
                info.run_state = RunState::Running;
                log_report_error(self.report.begin(&name, Utc::now()));
                ready.push(ScheduledUnit { name, action });
            }
        }

        ready
    }

    /// Check if all units are in a terminal state.
    pub fn all_units_terminal(&self) -> bool {
        self.units.values().all(|info| info.run_state.is_terminal())
    }
}

/// A read-only view for checking gate satisfaction.
///
/// This is used when we only have shared access to the units map (e.g. in
/// `Scheduler::gates_satisfied`).
pub struct ReadOnlyStateManager<'a> {
    graph: &'a UnitGraph,
    direction: Direction,
    units: &'a BTreeMap<UnitName, UnitInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(
        graph: &'a UnitGraph,
        direction: Direction,
        units: &'a BTreeMap<UnitName, UnitInfo>,
    ) -> Self {
        Self {
            graph,
            direction,
            units,
        }
    }

    pub fn gates_satisfied(&self, name: &str, ignore_dependency_errors: bool) -> bool {
        for gate in self.graph.gates_of(name, self.direction) {
            let Some(info) = self.units.get(gate) else {
                warn!(unit = %name, gate = %gate, "gate missing from units map");
                return false;
            };

            if !info.run_state.is_terminal() {
                return false;
            }
            if info.run_state.blocks_gated() && !ignore_dependency_errors {
                return false;
            }
        }

        true
    }
}

fn log_report_error(res: Result<()>) {
    if let Err(e) = res {
        warn!(error = %e, "run report rejected a state transition");
    }
}
