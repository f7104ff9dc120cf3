#![allow(dead_code)]

pub use rundag_test_utils::builders;
pub use rundag_test_utils::fake_invoker;
pub use rundag_test_utils::{init_tracing, with_timeout};

use std::sync::Arc;
use std::time::Duration;

use rundag::retry::{RetryExecutor, RetryPolicy};

use self::fake_invoker::RecordingSleeper;

/// Retry executor with the built-in retryable patterns and a recording sleeper.
pub fn retry_executor(max_attempts: i64) -> (RetryExecutor, Arc<RecordingSleeper>) {
    let policy = RetryPolicy::new(
        max_attempts,
        0,
        rundag::retry::default_retryable_errors().expect("default patterns compile"),
    )
    .expect("valid retry policy")
    .with_sleep_interval(Duration::from_millis(1));
    let sleeper = Arc::new(RecordingSleeper::new());
    let executor = RetryExecutor::new(policy, Vec::new(), sleeper.clone());
    (executor, sleeper)
}
