// src/engine/single.rs

//! Single-unit mode: one unit, no pool, no graph traversal.

use chrono::Utc;
use tracing::info;

use crate::dag::UnitGraph;
use crate::engine::OutputCache;
use crate::errors::{Result, RundagError};
use crate::exclude::{ExclusionEngine, FeatureFlags};
use crate::exec::UnitInvoker;
use crate::report::{Reason, Report, RunRecord, RunResult};
use crate::retry::RetryExecutor;
use crate::types::Action;

/// Run `unit` through its exclusion decision and the retry executor.
///
/// A unit whose rule blocks the action is recorded as Excluded and the
/// invoker is never called. Dependencies are not consulted.
pub async fn run_single<I>(
    graph: &UnitGraph,
    flags: &dyn FeatureFlags,
    invoker: &I,
    retry: &RetryExecutor,
    cache: &OutputCache,
    unit: &str,
    action: Action,
) -> Result<RunRecord>
where
    I: UnitInvoker + ?Sized,
{
    if !graph.contains(unit) {
        return Err(RundagError::UnitNotFound(unit.to_string()));
    }

    let mut report = Report::new();
    let decision = ExclusionEngine::new(graph, flags).direct_decision(unit, action);

    if decision.is_excluded() {
        info!(unit = %unit, %action, "unit excluded; not invoking");
        report.skip(
            unit,
            RunResult::Excluded,
            decision.reason().unwrap_or(Reason::ExcludeBlock),
            decision.cause().map(str::to_string),
            Utc::now(),
        )?;
    } else {
        report.begin(unit, Utc::now())?;
        let outcome = retry.execute(invoker, unit, action).await;
        if outcome.is_success() {
            if let Some(output) = &outcome.output {
                cache.insert(unit, output.clone());
            }
        }
        report.finish(unit, outcome.result, outcome.reason, outcome.cause, Utc::now())?;
    }

    report
        .get(unit)
        .cloned()
        .ok_or_else(|| RundagError::Report(format!("no record for unit '{unit}'")))
}
