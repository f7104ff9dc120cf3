// src/report/row.rs

//! Flat report row, the unit of both report file formats.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::RundagError;
use crate::report::record::{Reason, RunRecord, RunResult};
use crate::types::UnitName;

/// Column order of the tabular form.
pub const COLUMNS: [&str; 6] = ["Name", "Started", "Ended", "Result", "Reason", "Cause"];

/// A finished [`RunRecord`] with every terminal field present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct ReportRow {
    pub name: UnitName,
    pub started: DateTime<Utc>,
    pub ended: DateTime<Utc>,
    pub result: RunResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl TryFrom<&RunRecord> for ReportRow {
    type Error = RundagError;

    fn try_from(record: &RunRecord) -> Result<Self, Self::Error> {
        let (ended, result) = match (record.ended, record.result) {
            (Some(ended), Some(result)) => (ended, result),
            _ => {
                return Err(RundagError::Report(format!(
                    "record for unit '{}' is not finished",
                    record.name
                )));
            }
        };

        Ok(Self {
            name: record.name.clone(),
            started: record.started,
            ended,
            result,
            reason: record.reason,
            cause: record.cause.clone().filter(|c| !c.is_empty()),
        })
    }
}
