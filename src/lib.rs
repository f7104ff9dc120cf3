// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exclude;
pub mod exec;
pub mod filter;
pub mod logging;
pub mod report;
pub mod retry;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::{Scheduler, SchedulerOptions, UnitGraph};
use crate::engine::{OutputCache, Runtime, RuntimeEvent, run_single};
use crate::exclude::{Decisions, ExclusionEngine, FeatureFlagSet};
use crate::exec::CommandInvoker;
use crate::filter::{FilterContext, GitChangeSet, Selection};
use crate::report::Report;
use crate::retry::{RetryExecutor, TokioSleeper};
use crate::types::{Action, ReportFormat};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - filter selection and exclusion decisions
/// - scheduler / runtime / worker pool
/// - Ctrl-C handling
/// - report and summary output
///
/// Returns `Ok(true)` when no unit failed.
pub async fn run(args: CliArgs) -> Result<bool> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    let root_dir = config_root_dir(&config_path);
    let options = scheduler_options(&cfg, &args);

    let retry = RetryExecutor::new(
        cfg.retry.clone(),
        cfg.ignore.clone(),
        Arc::new(TokioSleeper),
    );
    let invoker = Arc::new(CommandInvoker::from_graph(&cfg.graph).with_working_dir(&root_dir));
    let cache = Arc::new(OutputCache::new());

    if let Some(unit) = &args.unit {
        let record = run_single(
            &cfg.graph,
            &cfg.features,
            invoker.as_ref(),
            &retry,
            &cache,
            unit,
            args.action,
        )
        .await?;

        let report = Report::from_records(vec![record]);
        return finish_report(&report, &args);
    }

    let selection = {
        // Change-set terms shell out to git synchronously.
        let graph = cfg.graph.clone();
        let flags = cfg.features.clone();
        let filters = args.filters.clone();
        let root_dir = root_dir.clone();
        tokio::task::spawn_blocking(move || select_units(&graph, &flags, &filters, &root_dir))
            .await
            .context("unit selection task failed")??
    };
    let decisions = ExclusionEngine::new(&cfg.graph, &cfg.features)
        .evaluate(args.action, Some(&selection));

    if args.dry_run {
        print_dry_run(&cfg, args.action, &decisions, &options);
        return Ok(true);
    }

    let graph = Arc::new(cfg.graph.clone());
    let scheduler = Scheduler::new(graph, &decisions, args.action, options);
    let runtime = Runtime::new(scheduler, invoker, retry, cache);

    // Ctrl-C → graceful shutdown.
    let ctrl_c = {
        let tx = runtime.event_sender();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        })
    };

    let report = runtime.run().await;
    ctrl_c.abort();
    finish_report(&report?, &args)
}

/// `[run]` settings with CLI flags layered on top.
fn scheduler_options(cfg: &ConfigFile, args: &CliArgs) -> SchedulerOptions {
    SchedulerOptions {
        parallelism: args.parallelism.unwrap_or(cfg.run.parallelism).max(1),
        fail_fast: args.fail_fast || cfg.run.fail_fast,
        ignore_dependency_errors: args.ignore_dependency_errors
            || cfg.run.ignore_dependency_errors,
    }
}

fn select_units(
    graph: &UnitGraph,
    flags: &FeatureFlagSet,
    filters: &[String],
    root_dir: &Path,
) -> Result<Selection> {
    let changes = GitChangeSet::new(root_dir);
    let ctx = FilterContext {
        changes: &changes,
        flags,
    };
    let selection = filter::select(graph, filters, &ctx)?;
    info!(
        selected = selection.len(),
        total = graph.len(),
        "units selected"
    );
    Ok(selection)
}

/// Persist the report artifacts, print the summary and compute success.
fn finish_report(report: &Report, args: &CliArgs) -> Result<bool> {
    if let Some(path) = &args.report_file {
        let format = args
            .report_format
            .map(ReportFormat::from)
            .unwrap_or_else(|| ReportFormat::from_path(path));
        report
            .write_file(path, format)
            .with_context(|| format!("writing report to {}", path.display()))?;
        info!(path = %path.display(), ?format, "report written");
    }

    if let Some(path) = &args.report_schema_file {
        report::json::write_schema_file(path)
            .with_context(|| format!("writing report schema to {}", path.display()))?;
        info!(path = %path.display(), "report schema written");
    }

    println!("{}", report.summary().render(args.summary_per_unit));

    let ok = !report.has_failures();
    debug!(ok, converged = report.all_converged(), "run finished");
    Ok(ok)
}

/// Figure out the project root for commands and change detection.
///
/// - If the config path has a non-empty parent (e.g. "infra/Rundag.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Rundag.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Print the schedule for `action` with each unit's decision.
fn print_dry_run(cfg: &ConfigFile, action: Action, decisions: &Decisions, options: &SchedulerOptions) {
    println!("rundag dry-run");
    println!("  action = {action} ({:?} order)", action.direction());
    println!("  parallelism = {}", options.parallelism);
    println!("  fail_fast = {}", options.fail_fast);
    println!("  ignore_dependency_errors = {}", options.ignore_dependency_errors);
    println!();

    let order = cfg.graph.order_for(action.direction());
    println!("units ({}):", order.len());
    for (idx, name) in order.iter().enumerate() {
        let decision = decisions.decision_for(name);
        match decision.reason() {
            Some(reason) => match decision.cause() {
                Some(cause) => println!("  {:>3}. {name}: excluded ({reason}: {cause})", idx + 1),
                None => println!("  {:>3}. {name}: excluded ({reason})", idx + 1),
            },
            None => println!("  {:>3}. {name}: run", idx + 1),
        }
        let deps = cfg.graph.dependencies_of(name);
        if !deps.is_empty() {
            println!("       after: {deps:?}");
        }
    }

    debug!("dry-run complete (no execution)");
}
