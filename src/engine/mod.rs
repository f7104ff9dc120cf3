// src/engine/mod.rs

//! Orchestration engine for rundag.
//!
//! This module ties together:
//! - the graph scheduler
//! - the retry executor wrapped around each invocation
//! - the main runtime event loop that reacts to:
//!   - unit completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`]. [`single`] runs one unit without a pool.

use crate::report::{Reason, RunResult};
use crate::types::UnitName;

/// Outcome of one unit after the retry executor is done with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOutcome {
    pub result: RunResult,
    pub reason: Option<Reason>,
    pub cause: Option<String>,
    /// Number of attempts made, including the first.
    pub attempts: u32,
    /// Captured stdout of the successful attempt.
    pub output: Option<String>,
}

impl UnitOutcome {
    pub fn succeeded() -> Self {
        Self {
            result: RunResult::Succeeded,
            reason: None,
            cause: None,
            attempts: 1,
            output: None,
        }
    }

    pub fn succeeded_with(reason: Reason, cause: Option<String>) -> Self {
        Self {
            reason: Some(reason),
            cause,
            ..Self::succeeded()
        }
    }

    pub fn failed(cause: String) -> Self {
        Self {
            result: RunResult::Failed,
            reason: Some(Reason::RunError),
            cause: Some(cause),
            attempts: 1,
            output: None,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_output(mut self, output: String) -> Self {
        self.output = Some(output);
        self
    }

    pub fn is_success(&self) -> bool {
        self.result == RunResult::Succeeded
    }
}

/// Events flowing into the runtime from workers and signal handlers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A worker finished a unit (after all retries).
    UnitCompleted { unit: UnitName, outcome: UnitOutcome },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod cache;
pub mod core;
pub mod event_handlers;
pub mod runtime;
pub mod single;

pub use cache::OutputCache;
pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
pub use single::run_single;
