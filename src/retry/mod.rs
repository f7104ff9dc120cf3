// src/retry/mod.rs

//! Retry and ignore handling around a single unit invocation.
//!
//! - [`policy`] holds retry bounds, labelled retryable-error patterns and
//!   ignore rules.
//! - [`executor`] runs the attempt / classify / sleep state machine.

pub mod executor;
pub mod policy;

pub use executor::{RetryExecutor, Sleeper, TokioSleeper, truncate_cause};
pub use policy::{ErrorPattern, IgnoreRule, RetryPolicy, default_retryable_errors};
