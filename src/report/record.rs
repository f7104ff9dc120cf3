// src/report/record.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::UnitName;

/// Terminal result of a unit in a run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub enum RunResult {
    #[serde(rename = "succeeded")]
    Succeeded,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "early exit")]
    EarlyExit,
    #[serde(rename = "excluded")]
    Excluded,
}

impl RunResult {
    pub const ALL: [RunResult; 4] = [
        RunResult::Succeeded,
        RunResult::Failed,
        RunResult::EarlyExit,
        RunResult::Excluded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunResult::Succeeded => "succeeded",
            RunResult::Failed => "failed",
            RunResult::EarlyExit => "early exit",
            RunResult::Excluded => "excluded",
        }
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RunResult::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| format!("unknown result: {s}"))
    }
}

/// Why a unit ended up with its result.
///
/// Plain successes carry no reason at all.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub enum Reason {
    #[serde(rename = "retry succeeded")]
    RetrySucceeded,
    #[serde(rename = "error ignored")]
    ErrorIgnored,
    #[serde(rename = "run error")]
    RunError,
    #[serde(rename = "ancestor error")]
    AncestorError,
    #[serde(rename = "fail fast")]
    FailFast,
    #[serde(rename = "interrupted")]
    Interrupted,
    #[serde(rename = "exclude block")]
    ExcludeBlock,
    #[serde(rename = "excluded dependency")]
    ExcludedDependency,
    #[serde(rename = "filter")]
    Filter,
}

impl Reason {
    pub const ALL: [Reason; 9] = [
        Reason::RetrySucceeded,
        Reason::ErrorIgnored,
        Reason::RunError,
        Reason::AncestorError,
        Reason::FailFast,
        Reason::Interrupted,
        Reason::ExcludeBlock,
        Reason::ExcludedDependency,
        Reason::Filter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::RetrySucceeded => "retry succeeded",
            Reason::ErrorIgnored => "error ignored",
            Reason::RunError => "run error",
            Reason::AncestorError => "ancestor error",
            Reason::FailFast => "fail fast",
            Reason::Interrupted => "interrupted",
            Reason::ExcludeBlock => "exclude block",
            Reason::ExcludedDependency => "excluded dependency",
            Reason::Filter => "filter",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Reason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Reason::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| format!("unknown reason: {s}"))
    }
}

/// One unit's entry in the run report.
///
/// `ended`, `result`, `reason` and `cause` are written exactly once, when
/// the unit reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub name: UnitName,
    pub started: DateTime<Utc>,
    pub ended: Option<DateTime<Utc>>,
    pub result: Option<RunResult>,
    pub reason: Option<Reason>,
    pub cause: Option<String>,
}

impl RunRecord {
    pub fn started(name: UnitName, at: DateTime<Utc>) -> Self {
        Self {
            name,
            started: at,
            ended: None,
            result: None,
            reason: None,
            cause: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.ended.is_some()
    }

    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.ended.map(|end| end - self.started)
    }
}
