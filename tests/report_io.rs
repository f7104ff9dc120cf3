// tests/report_io.rs

use chrono::{TimeZone, Utc};
use tempfile::tempdir;

use rundag::errors::RundagError;
use rundag::report::json::{report_schema_pretty_json, required_fields, validate_json};
use rundag::report::{Reason, Report, RunResult};
use rundag::types::ReportFormat;

fn sample_report() -> Report {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let t1 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 42).unwrap();

    let mut report = Report::new();
    report.begin("net/vpc", t0).unwrap();
    report
        .finish("net/vpc", RunResult::Succeeded, Some(Reason::RetrySucceeded), Some("client timeout".into()), t1)
        .unwrap();
    report.begin("apps/web", t0).unwrap();
    report
        .finish(
            "apps/web",
            RunResult::Failed,
            Some(Reason::RunError),
            Some("Error: \"quoted\", with comma".into()),
            t1,
        )
        .unwrap();
    report
        .skip("apps/api", RunResult::EarlyExit, Reason::AncestorError, Some("apps/web".into()), t1)
        .unwrap();
    report.begin("data/db", t0).unwrap();
    report.finish("data/db", RunResult::Succeeded, None, None, t1).unwrap();
    report
}

#[test]
fn csv_and_json_describe_the_same_records() {
    let report = sample_report();

    let csv = report.to_string_as(ReportFormat::Csv).unwrap();
    let json = report.to_string_as(ReportFormat::Json).unwrap();

    let from_csv = Report::parse_as(&csv, ReportFormat::Csv).unwrap();
    let from_json = Report::parse_as(&json, ReportFormat::Json).unwrap();

    assert_eq!(from_csv.rows().unwrap(), report.rows().unwrap());
    assert_eq!(from_json.rows().unwrap(), report.rows().unwrap());

    // Convert CSV → JSON and back.
    let converted = from_csv.to_string_as(ReportFormat::Json).unwrap();
    assert_eq!(converted, json);
}

#[test]
fn csv_has_header_and_quotes_special_fields() {
    let csv = sample_report().to_string_as(ReportFormat::Csv).unwrap();
    let mut lines = csv.lines();

    assert_eq!(lines.next(), Some("Name,Started,Ended,Result,Reason,Cause"));
    assert!(csv.contains("\"Error: \"\"quoted\"\", with comma\""));
    assert!(csv.contains("data/db,2024-05-01T12:00:00Z,2024-05-01T12:00:42Z,succeeded,,"));
}

#[test]
fn json_uses_pascal_case_and_omits_empty_optionals() {
    let json = sample_report().to_string_as(ReportFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let rows = value.as_array().unwrap();

    assert_eq!(rows[0]["Name"], "net/vpc");
    assert_eq!(rows[0]["Result"], "succeeded");
    assert_eq!(rows[0]["Reason"], "retry succeeded");
    assert_eq!(rows[2]["Result"], "early exit");
    assert!(rows[3].get("Reason").is_none());
    assert!(rows[3].get("Cause").is_none());
}

#[test]
fn schema_requires_core_fields() {
    let mut required = required_fields();
    required.sort();
    assert_eq!(required, vec!["Ended", "Name", "Result", "Started"]);

    let schema = report_schema_pretty_json().unwrap();
    assert!(schema.contains("\"Name\""));
    assert!(schema.contains("early exit"));
}

#[test]
fn validation_rejects_missing_required_field() {
    let doc = r#"[{"Name": "a", "Started": "2024-05-01T12:00:00Z", "Result": "succeeded"}]"#;
    match validate_json(doc) {
        Err(RundagError::Report(msg)) => assert!(msg.contains("Ended")),
        other => panic!("expected Report error, got {other:?}"),
    }
}

#[test]
fn validation_rejects_unknown_result() {
    let doc = r#"[{"Name": "a", "Started": "2024-05-01T12:00:00Z", "Ended": "2024-05-01T12:00:01Z", "Result": "maybe"}]"#;
    assert!(validate_json(doc).is_err());
    assert!(validate_json(r#"{"Name": "a"}"#).is_err());
}

#[test]
fn csv_rejects_wrong_header_and_short_rows() {
    assert!(Report::parse_as("Name,Result\n", ReportFormat::Csv).is_err());

    let short = "Name,Started,Ended,Result,Reason,Cause\na,2024-05-01T12:00:00Z\n";
    assert!(Report::parse_as(short, ReportFormat::Csv).is_err());
}

#[test]
fn files_round_trip_through_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out").join("report.json");
    let report = sample_report();

    report.write_file(&path, ReportFormat::from_path(&path)).unwrap();
    let back = Report::read_file(&path, ReportFormat::Json).unwrap();

    assert_eq!(back.len(), 4);
    assert_eq!(back.get("apps/api").unwrap().cause.as_deref(), Some("apps/web"));
}

#[test]
fn open_records_cannot_be_written() {
    let mut report = Report::new();
    report.begin("a", Utc::now()).unwrap();
    assert!(report.to_string_as(ReportFormat::Csv).is_err());
}

#[test]
fn records_cannot_be_finished_twice() {
    let mut report = Report::new();
    let now = Utc::now();
    report.skip("a", RunResult::Excluded, Reason::Filter, None, now).unwrap();

    assert!(report.finish("a", RunResult::Succeeded, None, None, now).is_err());
    assert!(report.begin("a", now).is_err());
}

#[test]
fn summary_counts_and_per_unit_lines() {
    let report = sample_report();
    let summary = report.summary();

    assert_eq!(summary.total(), 4);
    assert_eq!(summary.count(RunResult::Succeeded), 2);
    assert_eq!(summary.count(RunResult::Failed), 1);
    assert_eq!(summary.count(RunResult::EarlyExit), 1);

    let short = summary.render(false);
    assert!(short.starts_with("Run summary: 4 units"));
    assert!(!short.contains("net/vpc"));

    let long = summary.render(true);
    assert!(long.contains("net/vpc"));
    assert!(long.contains("42000ms"));
}

#[test]
fn exit_status_follows_failures() {
    let report = sample_report();
    assert!(report.has_failures());
    assert!(!report.all_converged());

    let mut ok = Report::new();
    ok.skip("a", RunResult::Excluded, Reason::Filter, None, Utc::now()).unwrap();
    assert!(!ok.has_failures());
    assert!(ok.all_converged());
}
