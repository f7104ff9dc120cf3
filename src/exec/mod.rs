// src/exec/mod.rs

//! Tool-invocation boundary.
//!
//! The engine calls a single contract, [`UnitInvoker::invoke`], once per
//! attempt. It never retries on its own; all retry policy lives in
//! [`crate::retry`], which calls the same contract again.
//!
//! - [`command`] provides [`CommandInvoker`], the production invoker that
//!   runs each unit's command template in a shell via `tokio::process`.
//! - [`pool`] runs scheduled units on a fixed number of Tokio workers.
//! - Tests can provide their own `UnitInvoker` that scripts outcomes without
//!   spawning processes.

pub mod command;
pub mod pool;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::types::Action;

pub use command::CommandInvoker;
pub use pool::WorkerPool;

/// Successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvokeOutput {
    pub stdout: String,
}

/// Failed invocation; `detail` is the raw error output used for retry and
/// ignore classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeError {
    pub detail: String,
}

impl InvokeError {
    pub fn new<S: Into<String>>(detail: S) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for InvokeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

impl std::error::Error for InvokeError {}

pub type InvokeResult = std::result::Result<InvokeOutput, InvokeError>;

/// Runs one action for one unit.
pub trait UnitInvoker: Send + Sync {
    fn invoke<'a>(
        &'a self,
        unit: &'a str,
        action: Action,
    ) -> Pin<Box<dyn Future<Output = InvokeResult> + Send + 'a>>;
}
