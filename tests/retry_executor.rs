// tests/retry_executor.rs

mod common;

use std::sync::Arc;
use std::time::Duration;

use rundag::errors::RundagError;
use rundag::exec::{InvokeError, InvokeOutput};
use rundag::report::{Reason, RunResult};
use rundag::retry::{ErrorPattern, IgnoreRule, RetryExecutor, RetryPolicy, truncate_cause};
use rundag::types::Action;

use crate::common::fake_invoker::{FakeInvoker, RecordingSleeper};
use crate::common::{init_tracing, retry_executor, with_timeout};

const TRANSIENT: &str = "Error installing provider: tcp 10.0.0.1:443: i/o timeout";

fn ok(stdout: &str) -> Result<InvokeOutput, InvokeError> {
    Ok(InvokeOutput {
        stdout: stdout.to_string(),
    })
}

#[tokio::test]
async fn success_on_first_attempt() {
    init_tracing();
    let (executor, sleeper) = retry_executor(3);
    let invoker = FakeInvoker::new().with_output("a", "done");

    let outcome = with_timeout(executor.execute(&invoker, "a", Action::Apply)).await;

    assert_eq!(outcome.result, RunResult::Succeeded);
    assert_eq!(outcome.reason, None);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.output.as_deref(), Some("done"));
    assert_eq!(sleeper.count(), 0);
}

#[tokio::test]
async fn persistent_retryable_error_sleeps_between_every_attempt() {
    init_tracing();
    let (executor, sleeper) = retry_executor(5);
    let invoker = FakeInvoker::new().failing("a", TRANSIENT);

    let outcome = with_timeout(executor.execute(&invoker, "a", Action::Apply)).await;

    assert_eq!(outcome.result, RunResult::Failed);
    assert_eq!(outcome.reason, Some(Reason::RunError));
    assert_eq!(outcome.cause.as_deref(), Some("provider tcp timeout"));
    assert_eq!(outcome.attempts, 5);
    assert_eq!(invoker.call_count("a"), 5);
    assert_eq!(sleeper.count(), 4);
}

#[tokio::test]
async fn success_after_retry_records_the_label() {
    init_tracing();
    let (executor, sleeper) = retry_executor(3);
    let invoker = FakeInvoker::new().script(
        "a",
        vec![Err(InvokeError::new(TRANSIENT)), ok("second time lucky")],
    );

    let outcome = with_timeout(executor.execute(&invoker, "a", Action::Plan)).await;

    assert_eq!(outcome.result, RunResult::Succeeded);
    assert_eq!(outcome.reason, Some(Reason::RetrySucceeded));
    assert_eq!(outcome.cause.as_deref(), Some("provider tcp timeout"));
    assert_eq!(outcome.attempts, 2);
    assert_eq!(sleeper.count(), 1);
}

#[tokio::test]
async fn non_retryable_error_fails_immediately() {
    init_tracing();
    let (executor, sleeper) = retry_executor(5);
    let invoker = FakeInvoker::new().failing("a", "Error: invalid resource name\nexit code 1");

    let outcome = with_timeout(executor.execute(&invoker, "a", Action::Apply)).await;

    assert_eq!(outcome.result, RunResult::Failed);
    assert_eq!(outcome.cause.as_deref(), Some("Error: invalid resource name"));
    assert_eq!(outcome.attempts, 1);
    assert_eq!(sleeper.count(), 0);
}

#[tokio::test]
async fn max_attempts_one_never_retries() {
    init_tracing();
    let (executor, sleeper) = retry_executor(1);
    let invoker = FakeInvoker::new().failing("a", TRANSIENT);

    let outcome = with_timeout(executor.execute(&invoker, "a", Action::Apply)).await;

    assert_eq!(outcome.result, RunResult::Failed);
    assert_eq!(invoker.call_count("a"), 1);
    assert_eq!(sleeper.count(), 0);
}

#[tokio::test]
async fn ignore_rule_takes_precedence_over_retry() {
    init_tracing();
    let policy = RetryPolicy::new(
        4,
        0,
        vec![ErrorPattern::new("timeout", "timeout").unwrap()],
    )
    .unwrap();
    let ignore = vec![IgnoreRule::new("known-flake", &["i/o timeout"], None).unwrap()];
    let sleeper = Arc::new(RecordingSleeper::new());
    let executor = RetryExecutor::new(policy, ignore, sleeper.clone());
    let invoker = FakeInvoker::new().failing("a", TRANSIENT);

    let outcome = with_timeout(executor.execute(&invoker, "a", Action::Apply)).await;

    assert_eq!(outcome.result, RunResult::Succeeded);
    assert_eq!(outcome.reason, Some(Reason::ErrorIgnored));
    assert_eq!(outcome.cause.as_deref(), Some("known-flake"));
    assert_eq!(invoker.call_count("a"), 1);
    assert_eq!(sleeper.count(), 0);
}

#[tokio::test]
async fn vetoed_ignore_rule_does_not_apply() {
    init_tracing();
    let (retry, _) = retry_executor(1);
    let ignore = vec![IgnoreRule::new("flaky", &["timeout", "!provider"], None).unwrap()];
    let executor = RetryExecutor::new(
        retry.policy().clone(),
        ignore,
        Arc::new(RecordingSleeper::new()),
    );
    let invoker = FakeInvoker::new().failing("a", TRANSIENT);

    let outcome = with_timeout(executor.execute(&invoker, "a", Action::Apply)).await;
    assert_eq!(outcome.result, RunResult::Failed);
}

#[tokio::test]
async fn sleeper_receives_configured_interval() {
    let policy = RetryPolicy::new(3, 7, vec![ErrorPattern::new("flaky", "flaky").unwrap()]).unwrap();
    let sleeper = Arc::new(RecordingSleeper::new());
    let executor = RetryExecutor::new(policy, Vec::new(), sleeper.clone());
    let invoker = FakeInvoker::new().failing("a", "flaky backend");

    with_timeout(executor.execute(&invoker, "a", Action::Apply)).await;

    assert_eq!(sleeper.durations(), vec![Duration::from_secs(7); 2]);
}

#[test]
fn invalid_bounds_are_configuration_errors() {
    let err = RetryPolicy::new(0, 5, Vec::new()).unwrap_err();
    assert!(matches!(err, RundagError::ConfigError(ref m) if m.contains("max_attempts")));
    assert!(err.is_configuration());

    let err = RetryPolicy::new(3, -1, Vec::new()).unwrap_err();
    assert!(matches!(err, RundagError::ConfigError(ref m) if m.contains("sleep_interval_secs")));
}

#[test]
fn ignore_rule_needs_a_positive_pattern() {
    assert!(IgnoreRule::new("only-vetoes", &["!x"], None).is_err());
    assert!(IgnoreRule::new("bad-regex", &["("], None).is_err());
}

#[test]
fn first_matching_pattern_wins() {
    let policy = RetryPolicy::new(
        2,
        0,
        vec![
            ErrorPattern::new("first", "timeout").unwrap(),
            ErrorPattern::new("second", "i/o timeout").unwrap(),
        ],
    )
    .unwrap();
    assert_eq!(policy.classify(TRANSIENT).map(|p| p.label()), Some("first"));
    assert!(policy.classify("permission denied").is_none());
}

#[test]
fn cause_is_first_line_and_bounded() {
    assert_eq!(truncate_cause("\n  boom  \nsecond"), "boom");
    assert_eq!(truncate_cause(""), "unknown error");

    let long = "x".repeat(500);
    let cut = truncate_cause(&long);
    assert_eq!(cut.chars().count(), 200);
    assert!(cut.ends_with('…'));
}
