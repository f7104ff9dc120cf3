// src/dag/scheduler.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::dag::UnitGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::unit_info::{RunState, ScheduledUnit, UnitInfo};
use crate::engine::UnitOutcome;
use crate::exclude::Decisions;
use crate::report::{Reason, Report, RunResult};
use crate::types::{Action, Direction, UnitName};

/// Knobs that change how a run is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Maximum number of units running at once (at least 1).
    pub parallelism: usize,
    /// Stop admitting new units after the first failure.
    pub fail_fast: bool,
    /// Let units run even when a gate failed or exited early.
    pub ignore_dependency_errors: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            parallelism: 4,
            fail_fast: false,
            ignore_dependency_errors: false,
        }
    }
}

/// Scheduler holds the immutable graph plus the mutable state of one run.
///
/// It is responsible for:
/// - recording excluded units up front
/// - deciding when a unit is "ready" (all gates terminal and healthy)
/// - bounding admission by the parallelism limit
/// - marking units as succeeded/failed
/// - early-exiting whatever is gated on a failure
///
/// Gates are dependencies for forward actions and dependents for `destroy`.
#[derive(Debug)]
pub struct Scheduler {
    graph: Arc<UnitGraph>,
    action: Action,
    direction: Direction,
    options: SchedulerOptions,
    units: BTreeMap<UnitName, UnitInfo>,
    report: Report,
    halted: bool,
}

impl Scheduler {
    /// Build the per-run state, recording every excluded unit straight away.
    pub fn new(
        graph: Arc<UnitGraph>,
        decisions: &Decisions,
        action: Action,
        options: SchedulerOptions,
    ) -> Self {
        let direction = action.direction();
        let options = SchedulerOptions {
            parallelism: options.parallelism.max(1),
            ..options
        };

        let mut units = BTreeMap::new();
        let mut report = Report::new();
        let now = Utc::now();

        for name in graph.order_for(direction) {
            let decision = decisions.decision_for(&name);
            let state = if decision.is_excluded() {
                let reason = decision.reason().unwrap_or(Reason::ExcludeBlock);
                debug!(unit = %name, %reason, "recording excluded unit");
                if let Err(e) = report.skip(
                    &name,
                    RunResult::Excluded,
                    reason,
                    decision.cause().map(str::to_string),
                    now,
                ) {
                    warn!(unit = %name, error = %e, "could not record excluded unit");
                }
                RunState::Excluded
            } else {
                RunState::Pending
            };
            units.insert(name.clone(), UnitInfo::new(name, state));
        }

        Self {
            graph,
            action,
            direction,
            options,
            units,
            report,
            halted: false,
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn options(&self) -> SchedulerOptions {
        self.options
    }

    pub fn parallelism(&self) -> usize {
        self.options.parallelism
    }

    pub fn graph(&self) -> &UnitGraph {
        &self.graph
    }

    /// Whether admission has been stopped (fail-fast or shutdown).
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Read-only view of the given unit's run state.
    pub fn run_state_of(&self, unit: &str) -> Option<RunState> {
        self.units.get(unit).map(|info| info.run_state)
    }

    pub fn running_count(&self) -> usize {
        self.units
            .values()
            .filter(|info| info.run_state == RunState::Running)
            .count()
    }

    /// All units have reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.units.values().all(|info| info.run_state.is_terminal())
    }

    /// Whether the gates of `unit` allow it to start.
    ///
    /// Returns `None` if the unit is unknown.
    pub fn gates_satisfied(&self, unit: &str) -> Option<bool> {
        if !self.units.contains_key(unit) {
            return None;
        }
        let mgr = ReadOnlyStateManager::new(&self.graph, self.direction, &self.units);
        Some(mgr.gates_satisfied(unit, self.options.ignore_dependency_errors))
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn into_report(self) -> Report {
        self.report
    }

    /// Admit the initial set of ready units.
    pub fn start(&mut self) -> SchedulerStep {
        info!(
            action = %self.action,
            units = self.units.len(),
            parallelism = self.options.parallelism,
            "scheduler: starting run"
        );
        let newly_scheduled = self.collect_ready();
        SchedulerStep {
            newly_scheduled,
            newly_early_exited: Vec::new(),
            run_just_finished: self.is_finished(),
        }
    }

    /// Admit pending units whose gates are satisfied, up to free capacity.
    pub fn collect_ready(&mut self) -> Vec<ScheduledUnit> {
        if self.halted {
            return Vec::new();
        }
        let capacity = self
            .options
            .parallelism
            .saturating_sub(self.running_count());

        let mut manager =
            StateManager::new(&self.graph, self.direction, &mut self.units, &mut self.report);
        manager.collect_new_ready_units(
            capacity,
            self.action,
            self.options.ignore_dependency_errors,
        )
    }

    /// Record the outcome of a running unit and admit whatever it unblocked.
    pub fn complete(&mut self, unit: &str, outcome: UnitOutcome) -> SchedulerStep {
        let mut newly_early_exited = Vec::new();

        match self.units.get_mut(unit) {
            Some(info) if info.run_state == RunState::Running => {
                info.run_state = RunState::from(outcome.result);

                if let Err(e) = self.report.finish(
                    unit,
                    outcome.result,
                    outcome.reason,
                    outcome.cause.clone(),
                    Utc::now(),
                ) {
                    warn!(unit = %unit, error = %e, "could not record unit outcome");
                }

                if outcome.result == RunResult::Failed {
                    warn!(
                        unit = %unit,
                        cause = outcome.cause.as_deref().unwrap_or(""),
                        "unit failed"
                    );

                    if !self.options.ignore_dependency_errors {
                        let mut manager = StateManager::new(
                            &self.graph,
                            self.direction,
                            &mut self.units,
                            &mut self.report,
                        );
                        newly_early_exited.extend(manager.mark_gated_early_exit(unit, unit));
                    }

                    if self.options.fail_fast {
                        info!(unit = %unit, "fail-fast: halting admission");
                        newly_early_exited.extend(self.halt(Reason::FailFast, Some(unit)));
                    }
                } else {
                    debug!(unit = %unit, result = %outcome.result, "unit completed");
                }
            }
            Some(info) => {
                warn!(unit = %unit, state = ?info.run_state, "completion for unit that is not running; ignoring");
            }
            None => {
                warn!(unit = %unit, "completion for unknown unit; ignoring");
            }
        }

        let newly_scheduled = self.collect_ready();
        let run_just_finished = self.is_finished();
        if run_just_finished {
            info!(action = %self.action, "scheduler: all units terminal");
        }

        SchedulerStep {
            newly_scheduled,
            newly_early_exited,
            run_just_finished,
        }
    }

    /// Stop admitting units; every pending unit becomes EarlyExit with
    /// `reason`. Running units are left to finish.
    pub fn halt(&mut self, reason: Reason, cause: Option<&str>) -> Vec<UnitName> {
        self.halted = true;
        let mut manager =
            StateManager::new(&self.graph, self.direction, &mut self.units, &mut self.report);
        manager.halt_pending(reason, cause)
    }
}
