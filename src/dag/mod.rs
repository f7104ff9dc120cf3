// src/dag/mod.rs

//! Unit graph representation and scheduling.
//!
//! - [`graph`] holds the immutable, validated graph of units.
//! - [`scheduler`] contains the per-run state machine that decides
//!   which units are ready to run, and how failures propagate.
//! - [`unit_info`] provides per-unit run state and scheduled work items.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod unit_info;

pub use graph::{Unit, UnitGraph, UnitSpec};
pub use scheduler::{Scheduler, SchedulerOptions};
pub use scheduler_step::SchedulerStep;
pub use unit_info::{RunState, ScheduledUnit};
