// tests/end_to_end_run.rs

#![cfg(unix)]

mod common;

use std::fs;
use std::path::Path;

use clap::Parser;

use rundag::cli::CliArgs;
use rundag::report::{Reason, Report, RunResult};
use rundag::types::ReportFormat;

use crate::common::{init_tracing, with_timeout};

const CONFIG: &str = r#"
[run]
parallelism = 2

[unit."net/vpc"]
cmd = "echo {unit}"

[unit."apps/web"]
after = ["net/vpc"]
cmd = "echo {unit}"

[unit."apps/api"]
after = ["net/vpc"]
cmd = "echo {unit}"
"#;

fn args(dir: &Path, extra: &[&str]) -> CliArgs {
    let config = dir.join("Rundag.toml");
    let mut argv = vec![
        "rundag".to_string(),
        "--config".to_string(),
        config.display().to_string(),
        "--action".to_string(),
        "apply".to_string(),
    ];
    argv.extend(extra.iter().map(|s| s.to_string()));
    CliArgs::parse_from(argv)
}

// Selection runs before the runtime starts; a single-threaded runtime keeps
// the test honest about not blocking the only worker.
#[tokio::test(flavor = "current_thread")]
async fn filtered_run_writes_report_for_every_unit() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Rundag.toml"), CONFIG).unwrap();
    let report_path = dir.path().join("report.json");

    let ok = with_timeout(rundag::run(args(
        dir.path(),
        &["--filter", "apps/web...", "--report-file", &report_path.display().to_string()],
    )))
    .await
    .unwrap();

    assert!(ok);
    let report = Report::read_file(&report_path, ReportFormat::Json).unwrap();
    assert_eq!(report.len(), 3);
    assert_eq!(report.count(RunResult::Succeeded), 2);

    let api = report.get("apps/api").unwrap();
    assert_eq!(api.result, Some(RunResult::Excluded));
    assert_eq!(api.reason, Some(Reason::Filter));
}

#[tokio::test(flavor = "current_thread")]
async fn change_set_lookup_failure_aborts_before_running() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Rundag.toml"), CONFIG).unwrap();
    let report_path = dir.path().join("report.json");

    // Not a git repository, so the diff cannot be computed.
    let result = with_timeout(rundag::run(args(
        dir.path(),
        &[
            "--filter",
            "[no-such-ref]",
            "--report-file",
            &report_path.display().to_string(),
        ],
    )))
    .await;

    assert!(result.is_err());
    assert!(!report_path.exists());
}

#[tokio::test(flavor = "current_thread")]
async fn option_like_change_set_reference_is_rejected() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Rundag.toml"), CONFIG).unwrap();
    let written = dir.path().join("diff.txt");
    let filter = format!("[--output={}]", written.display());

    let result = with_timeout(rundag::run(args(dir.path(), &["--filter", &filter]))).await;

    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("may not start with '-'"), "{err:#}");
    assert!(!written.exists());
}
