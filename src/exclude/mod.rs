// src/exclude/mod.rs

//! Per-unit execution decisions.
//!
//! Every unit gets exactly one [`ExecutionDecision`] before scheduling
//! starts. The decision table is closed: the scheduler never re-evaluates
//! exclude blocks or filters while a run is in progress.
//!
//! - [`rule`] holds the compiled form of an `exclude` block.
//! - [`decision`] holds the decision type and the engine computing it.
//! - [`flags`] provides the feature-flag lookup consulted by both.

pub mod decision;
pub mod flags;
pub mod rule;

pub use decision::{Decisions, ExclusionEngine, ExecutionDecision};
pub use flags::{FeatureFlagSet, FeatureFlags};
pub use rule::{ActionScope, ExcludeRule};
