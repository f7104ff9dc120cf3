// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::{Action, ReportFormat};

/// Command-line arguments for `rundag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rundag",
    version,
    about = "Run provisioning actions across a graph of dependent units.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Rundag.toml")]
    pub config: String,

    /// Action to run for every selected unit (plan, apply, destroy, ...).
    #[arg(long, value_name = "ACTION", default_value = "plan", value_parser = parse_action)]
    pub action: Action,

    /// Maximum number of units running at the same time.
    ///
    /// Overrides `[run].parallelism`.
    #[arg(long, value_name = "N")]
    pub parallelism: Option<usize>,

    /// Stop admitting new units after the first failure.
    #[arg(long)]
    pub fail_fast: bool,

    /// Run dependents even when one of their dependencies failed.
    #[arg(long)]
    pub ignore_dependency_errors: bool,

    /// Graph-query filter selecting which units run (repeatable).
    ///
    /// Examples: `apps/*`, `vpc...`, `...db`, `^vpc...`, `[main...HEAD]`, `!legacy/*`.
    #[arg(long = "filter", value_name = "EXPR")]
    pub filters: Vec<String>,

    /// Run a single unit instead of the whole graph.
    #[arg(long, value_name = "ID", conflicts_with = "filters")]
    pub unit: Option<String>,

    /// Write the run report to this file.
    #[arg(long, value_name = "PATH")]
    pub report_file: Option<PathBuf>,

    /// Report format; inferred from the report file extension when omitted.
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub report_format: Option<CliReportFormat>,

    /// Write the JSON schema of the report to this file.
    #[arg(long, value_name = "PATH")]
    pub report_schema_file: Option<PathBuf>,

    /// Include per-unit elapsed time in the printed summary.
    #[arg(long)]
    pub summary_per_unit: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RUNDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the schedule and decisions, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Report format as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum CliReportFormat {
    Csv,
    Json,
}

impl From<CliReportFormat> for ReportFormat {
    fn from(f: CliReportFormat) -> Self {
        match f {
            CliReportFormat::Csv => ReportFormat::Csv,
            CliReportFormat::Json => ReportFormat::Json,
        }
    }
}

fn parse_action(s: &str) -> Result<Action, String> {
    s.parse()
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
