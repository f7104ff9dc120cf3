// src/exclude/decision.rs

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::dag::UnitGraph;
use crate::exclude::flags::FeatureFlags;
use crate::filter::Selection;
use crate::report::Reason;
use crate::types::{Action, UnitName};

/// What the scheduler must do with a unit for the requested action.
///
/// Every exclusion carries a reason; `cause` names the feature flag that
/// switched the exclude block on, or the upstream unit a cascade came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionDecision {
    Run,
    /// `no_run` exclude block: never executed, whatever the action or mode.
    ExcludeNoRun { reason: Reason, cause: Option<String> },
    /// Exclude block scoped to the requested action.
    ExcludeByAction { reason: Reason, cause: Option<String> },
    /// Not part of the filter selection.
    ExcludeByFilter { reason: Reason, cause: Option<String> },
}

impl ExecutionDecision {
    pub fn is_run(&self) -> bool {
        matches!(self, ExecutionDecision::Run)
    }

    pub fn is_excluded(&self) -> bool {
        !self.is_run()
    }

    pub fn reason(&self) -> Option<Reason> {
        match self {
            ExecutionDecision::Run => None,
            ExecutionDecision::ExcludeNoRun { reason, .. }
            | ExecutionDecision::ExcludeByAction { reason, .. }
            | ExecutionDecision::ExcludeByFilter { reason, .. } => Some(*reason),
        }
    }

    pub fn cause(&self) -> Option<&str> {
        match self {
            ExecutionDecision::Run => None,
            ExecutionDecision::ExcludeNoRun { cause, .. }
            | ExecutionDecision::ExcludeByAction { cause, .. }
            | ExecutionDecision::ExcludeByFilter { cause, .. } => cause.as_deref(),
        }
    }

    /// Same kind of exclusion, inherited from an upstream unit.
    fn cascaded_from(&self, origin: &str) -> Self {
        let cause = Some(origin.to_string());
        let reason = Reason::ExcludedDependency;
        match self {
            ExecutionDecision::ExcludeNoRun { .. } => ExecutionDecision::ExcludeNoRun { reason, cause },
            _ => ExecutionDecision::ExcludeByAction { reason, cause },
        }
    }
}

/// Decisions for every unit of a graph, keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct Decisions {
    map: BTreeMap<UnitName, ExecutionDecision>,
}

impl Decisions {
    pub fn get(&self, name: &str) -> Option<&ExecutionDecision> {
        self.map.get(name)
    }

    /// Units without a decision are treated as runnable.
    pub fn decision_for(&self, name: &str) -> ExecutionDecision {
        self.map.get(name).cloned().unwrap_or(ExecutionDecision::Run)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExecutionDecision)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn excluded_count(&self) -> usize {
        self.map.values().filter(|d| d.is_excluded()).count()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Computes [`Decisions`] from exclude blocks, feature flags and an optional
/// filter selection.
///
/// Precedence, highest first: no-run, action-scoped, cascade from an excluded
/// dependency, filter, run.
pub struct ExclusionEngine<'a> {
    graph: &'a UnitGraph,
    flags: &'a dyn FeatureFlags,
}

impl<'a> ExclusionEngine<'a> {
    pub fn new(graph: &'a UnitGraph, flags: &'a dyn FeatureFlags) -> Self {
        Self { graph, flags }
    }

    /// Decision for one unit from its own exclude block only.
    pub fn direct_decision(&self, name: &str, action: Action) -> ExecutionDecision {
        let Some(rule) = self.graph.unit(name).and_then(|u| u.exclude()) else {
            return ExecutionDecision::Run;
        };

        let cause = rule.if_flag.clone();
        if rule.blocks_all_runs(self.flags) {
            ExecutionDecision::ExcludeNoRun {
                reason: Reason::ExcludeBlock,
                cause,
            }
        } else if rule.blocks_action(action, self.flags) {
            ExecutionDecision::ExcludeByAction {
                reason: Reason::ExcludeBlock,
                cause,
            }
        } else {
            ExecutionDecision::Run
        }
    }

    pub fn evaluate(&self, action: Action, selection: Option<&Selection>) -> Decisions {
        let mut map: BTreeMap<UnitName, ExecutionDecision> = self
            .graph
            .names()
            .map(|name| (name.to_string(), self.direct_decision(name, action)))
            .collect();

        // Cascade in dependency order so the most upstream origin wins.
        for origin in self.graph.topological_order() {
            let cascades = self
                .graph
                .unit(&origin)
                .and_then(|u| u.exclude())
                .map(|rule| rule.exclude_dependents)
                .unwrap_or(false);
            let Some(origin_decision) = map.get(&origin).cloned() else {
                continue;
            };
            if !cascades || origin_decision.is_run() {
                continue;
            }

            for dependent in self.graph.transitive_dependents_of(&origin) {
                if let Some(slot) = map.get_mut(&dependent) {
                    if slot.is_run() {
                        debug!(unit = %dependent, origin = %origin, "excluded through dependency");
                        *slot = origin_decision.cascaded_from(&origin);
                    }
                }
            }
        }

        if let Some(selection) = selection {
            for (name, slot) in map.iter_mut() {
                if slot.is_run() && !selection.contains(name) {
                    *slot = ExecutionDecision::ExcludeByFilter {
                        reason: Reason::Filter,
                        cause: None,
                    };
                }
            }
        }

        let decisions = Decisions { map };
        info!(
            %action,
            units = decisions.len(),
            excluded = decisions.excluded_count(),
            "execution decisions computed"
        );
        decisions
    }
}
