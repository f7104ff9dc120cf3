// tests/single_unit.rs

mod common;

use rundag::dag::{UnitGraph, UnitSpec};
use rundag::engine::{OutputCache, run_single};
use rundag::errors::RundagError;
use rundag::exclude::{ExcludeRule, FeatureFlagSet};
use rundag::report::{Reason, RunResult};
use rundag::types::Action;

use crate::common::fake_invoker::FakeInvoker;
use crate::common::{init_tracing, retry_executor, with_timeout};

fn graph() -> UnitGraph {
    UnitGraph::build(vec![
        UnitSpec::new("vpc"),
        UnitSpec::new("app").after("vpc"),
        UnitSpec::new("legacy").exclude(ExcludeRule::no_run()),
    ])
    .unwrap()
}

#[tokio::test]
async fn runs_only_the_requested_unit() {
    init_tracing();
    let g = graph();
    let flags = FeatureFlagSet::default();
    let invoker = FakeInvoker::new().with_output("app", "url = \"https://app\"");
    let (retry, _) = retry_executor(3);
    let cache = OutputCache::new();

    let record = with_timeout(run_single(&g, &flags, &invoker, &retry, &cache, "app", Action::Apply))
        .await
        .unwrap();

    assert_eq!(record.name, "app");
    assert_eq!(record.result, Some(RunResult::Succeeded));
    assert!(record.is_finished());
    assert_eq!(invoker.invoked_units(), vec!["app"]);
    assert_eq!(cache.get("app").as_deref(), Some("url = \"https://app\""));
}

#[tokio::test]
async fn no_run_unit_is_never_invoked() {
    init_tracing();
    let g = graph();
    let flags = FeatureFlagSet::default();
    let invoker = FakeInvoker::new();
    let (retry, _) = retry_executor(3);

    let record = with_timeout(run_single(
        &g,
        &flags,
        &invoker,
        &retry,
        &OutputCache::new(),
        "legacy",
        Action::Plan,
    ))
    .await
    .unwrap();

    assert_eq!(record.result, Some(RunResult::Excluded));
    assert_eq!(record.reason, Some(Reason::ExcludeBlock));
    assert!(invoker.calls().is_empty());
}

#[tokio::test]
async fn failure_is_recorded_not_returned() {
    init_tracing();
    let g = graph();
    let flags = FeatureFlagSet::default();
    let invoker = FakeInvoker::new().failing("vpc", "Error: quota exceeded");
    let (retry, _) = retry_executor(2);

    let record = with_timeout(run_single(
        &g,
        &flags,
        &invoker,
        &retry,
        &OutputCache::new(),
        "vpc",
        Action::Apply,
    ))
    .await
    .unwrap();

    assert_eq!(record.result, Some(RunResult::Failed));
    assert_eq!(record.reason, Some(Reason::RunError));
    assert_eq!(record.cause.as_deref(), Some("Error: quota exceeded"));
}

#[tokio::test]
async fn unknown_unit_is_an_error() {
    let g = graph();
    let flags = FeatureFlagSet::default();
    let invoker = FakeInvoker::new();
    let (retry, _) = retry_executor(1);

    let err = run_single(&g, &flags, &invoker, &retry, &OutputCache::new(), "ghost", Action::Plan)
        .await
        .unwrap_err();

    assert!(matches!(err, RundagError::UnitNotFound(ref u) if u == "ghost"));
}
