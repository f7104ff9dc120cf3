// src/retry/executor.rs

//! Per-unit retry state machine.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::UnitOutcome;
use crate::exec::UnitInvoker;
use crate::report::Reason;
use crate::retry::policy::{IgnoreRule, RetryPolicy};
use crate::types::Action;

/// Longest error text carried as a failure cause.
pub const MAX_CAUSE_LEN: usize = 200;

/// Blocking wait between attempts, injectable so tests don't sleep.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Production sleeper backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

#[derive(Debug)]
enum RetryState {
    Attempting {
        attempt: u32,
        retried_for: Option<String>,
    },
    ClassifyError {
        attempt: u32,
        detail: String,
    },
    Sleeping {
        next_attempt: u32,
        label: String,
    },
    Done(UnitOutcome),
}

/// Wraps a unit invocation with ignore rules and bounded retries.
///
/// Ignore rules are checked before retry patterns, so an error matching
/// both is ignored and never retried.
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    ignore: Vec<IgnoreRule>,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("policy", &self.policy)
            .field("ignore", &self.ignore)
            .finish_non_exhaustive()
    }
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy, ignore: Vec<IgnoreRule>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            policy,
            ignore,
            sleeper,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn execute<I>(&self, invoker: &I, unit: &str, action: Action) -> UnitOutcome
    where
        I: UnitInvoker + ?Sized,
    {
        let mut state = RetryState::Attempting {
            attempt: 1,
            retried_for: None,
        };

        loop {
            state = match state {
                RetryState::Attempting {
                    attempt,
                    retried_for,
                } => {
                    debug!(unit = %unit, %action, attempt, "invoking unit");
                    match invoker.invoke(unit, action).await {
                        Ok(output) => {
                            let outcome = match retried_for {
                                Some(label) => {
                                    info!(unit = %unit, attempt, label = %label, "unit succeeded after retry");
                                    UnitOutcome::succeeded_with(Reason::RetrySucceeded, Some(label))
                                }
                                None => UnitOutcome::succeeded(),
                            };
                            RetryState::Done(outcome.with_attempts(attempt).with_output(output.stdout))
                        }
                        Err(err) => RetryState::ClassifyError {
                            attempt,
                            detail: err.detail,
                        },
                    }
                }

                RetryState::ClassifyError { attempt, detail } => {
                    if let Some(rule) = self.ignore.iter().find(|r| r.matches(&detail)) {
                        warn!(
                            unit = %unit,
                            rule = %rule.name(),
                            message = rule.message().unwrap_or(""),
                            "ignoring unit error"
                        );
                        RetryState::Done(
                            UnitOutcome::succeeded_with(
                                Reason::ErrorIgnored,
                                Some(rule.name().to_string()),
                            )
                            .with_attempts(attempt),
                        )
                    } else {
                        match self.policy.classify(&detail) {
                            Some(pattern) if attempt < self.policy.max_attempts() => {
                                RetryState::Sleeping {
                                    next_attempt: attempt + 1,
                                    label: pattern.label().to_string(),
                                }
                            }
                            Some(pattern) => {
                                warn!(
                                    unit = %unit,
                                    attempt,
                                    label = %pattern.label(),
                                    "retryable error but attempts exhausted"
                                );
                                RetryState::Done(
                                    UnitOutcome::failed(pattern.label().to_string())
                                        .with_attempts(attempt),
                                )
                            }
                            None => {
                                warn!(unit = %unit, attempt, "unit failed with non-retryable error");
                                RetryState::Done(
                                    UnitOutcome::failed(truncate_cause(&detail)).with_attempts(attempt),
                                )
                            }
                        }
                    }
                }

                RetryState::Sleeping {
                    next_attempt,
                    label,
                } => {
                    info!(
                        unit = %unit,
                        next_attempt,
                        max_attempts = self.policy.max_attempts(),
                        label = %label,
                        sleep_ms = self.policy.sleep_interval().as_millis() as u64,
                        "retryable error; sleeping before next attempt"
                    );
                    self.sleeper.sleep(self.policy.sleep_interval()).await;
                    RetryState::Attempting {
                        attempt: next_attempt,
                        retried_for: Some(label),
                    }
                }

                RetryState::Done(outcome) => {
                    debug!(unit = %unit, result = %outcome.result, attempts = outcome.attempts, "retry loop done");
                    return outcome;
                }
            };
        }
    }
}

/// First non-empty line of the error, cut at [`MAX_CAUSE_LEN`] characters.
pub fn truncate_cause(detail: &str) -> String {
    let line = detail
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("unknown error");

    if line.chars().count() <= MAX_CAUSE_LEN {
        line.to_string()
    } else {
        let mut cut: String = line.chars().take(MAX_CAUSE_LEN - 1).collect();
        cut.push('…');
        cut
    }
}
