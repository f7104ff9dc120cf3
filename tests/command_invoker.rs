// tests/command_invoker.rs

#![cfg(unix)]

mod common;

use std::collections::BTreeMap;

use rundag::dag::{UnitGraph, UnitSpec};
use rundag::exec::{CommandInvoker, UnitInvoker};
use rundag::types::Action;

use crate::common::{init_tracing, with_timeout};

#[test]
fn render_substitutes_action_and_unit() {
    let mut commands = BTreeMap::new();
    commands.insert("vpc".to_string(), "make {action} UNIT={unit}".to_string());
    let invoker = CommandInvoker::new(commands);

    assert_eq!(invoker.render("vpc", Action::Apply), "make apply UNIT=vpc");
    assert_eq!(invoker.render("other", Action::Plan), "terraform plan");
}

#[tokio::test]
async fn successful_command_returns_stdout() {
    init_tracing();
    let graph = UnitGraph::build(vec![
        UnitSpec::new("vpc").command("echo \"$RUNDAG_UNIT:$RUNDAG_ACTION\""),
    ])
    .unwrap();
    let invoker = CommandInvoker::from_graph(&graph);

    let out = with_timeout(invoker.invoke("vpc", Action::Output)).await.unwrap();
    assert_eq!(out.stdout.trim(), "vpc:output");
}

#[tokio::test]
async fn failing_command_reports_stderr_and_exit_code() {
    init_tracing();
    let graph = UnitGraph::build(vec![
        UnitSpec::new("db").command("echo 'Error: quota exceeded' >&2; exit 3"),
    ])
    .unwrap();
    let invoker = CommandInvoker::from_graph(&graph);

    let err = with_timeout(invoker.invoke("db", Action::Apply)).await.unwrap_err();
    assert!(err.detail.starts_with("Error: quota exceeded"));
    assert!(err.detail.ends_with("exit code 3"));
}

#[tokio::test]
async fn working_dir_is_respected() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("marker.txt"), "here").unwrap();

    let graph = UnitGraph::build(vec![UnitSpec::new("u").command("cat marker.txt")]).unwrap();
    let invoker = CommandInvoker::from_graph(&graph).with_working_dir(dir.path());

    let out = with_timeout(invoker.invoke("u", Action::Plan)).await.unwrap();
    assert_eq!(out.stdout, "here");
}
