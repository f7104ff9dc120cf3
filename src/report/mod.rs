// src/report/mod.rs

//! Run report: one [`RunRecord`] per unit the scheduler touched.
//!
//! - [`record`] holds the record, result and reason types.
//! - [`row`] is the flat, fully-terminal form shared by both file formats,
//!   plus the JSON schema for it.
//! - [`csv`] and [`json`] read and write report files.
//! - [`summary`] groups records by result.

pub mod csv;
pub mod json;
pub mod record;
pub mod row;
pub mod summary;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::{Result, RundagError};
use crate::types::{ReportFormat, UnitName};

pub use record::{Reason, RunRecord, RunResult};
pub use row::ReportRow;
pub use summary::Summary;

/// Ordered collection of run records, indexed by unit name.
///
/// Records are kept in the order units entered the scheduler.
#[derive(Debug, Clone, Default)]
pub struct Report {
    records: Vec<RunRecord>,
    index: BTreeMap<UnitName, usize>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a record for a unit that is about to run.
    pub fn begin(&mut self, name: &str, at: DateTime<Utc>) -> Result<()> {
        if self.index.contains_key(name) {
            return Err(RundagError::Report(format!(
                "unit '{name}' already has a record"
            )));
        }
        self.index.insert(name.to_string(), self.records.len());
        self.records.push(RunRecord::started(name.to_string(), at));
        Ok(())
    }

    /// Close an open record. A record can only be closed once.
    pub fn finish(
        &mut self,
        name: &str,
        result: RunResult,
        reason: Option<Reason>,
        cause: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let idx = *self
            .index
            .get(name)
            .ok_or_else(|| RundagError::Report(format!("unit '{name}' has no open record")))?;
        let record = &mut self.records[idx];

        if record.is_finished() {
            return Err(RundagError::Report(format!(
                "record for unit '{name}' is already finished"
            )));
        }

        record.ended = Some(at);
        record.result = Some(result);
        record.reason = reason;
        record.cause = cause;
        debug!(unit = %name, result = %result, "record finished");
        Ok(())
    }

    /// Record a unit that never ran (excluded or early exit).
    pub fn skip(
        &mut self,
        name: &str,
        result: RunResult,
        reason: Reason,
        cause: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.begin(name, at)?;
        self.finish(name, result, Some(reason), cause, at)
    }

    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    pub fn get(&self, name: &str) -> Option<&RunRecord> {
        self.index.get(name).map(|idx| &self.records[*idx])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count(&self, result: RunResult) -> usize {
        self.records
            .iter()
            .filter(|r| r.result == Some(result))
            .count()
    }

    /// The run failed iff at least one unit failed.
    pub fn has_failures(&self) -> bool {
        self.count(RunResult::Failed) > 0
    }

    /// Stricter than `!has_failures()`: early exits also mean some unit did
    /// not reach its desired state.
    pub fn all_converged(&self) -> bool {
        !self.has_failures() && self.count(RunResult::EarlyExit) == 0
    }

    pub fn summary(&self) -> Summary {
        Summary::from_records(&self.records)
    }

    /// Flat rows for serialization. Fails if any record is still open.
    pub fn rows(&self) -> Result<Vec<ReportRow>> {
        self.records.iter().map(ReportRow::try_from).collect()
    }

    /// Build a report from already finished records, keeping their order.
    pub fn from_records(records: Vec<RunRecord>) -> Self {
        let index = records
            .iter()
            .enumerate()
            .map(|(idx, r)| (r.name.clone(), idx))
            .collect();
        Self { records, index }
    }

    /// Rebuild a report from rows read back from a file.
    pub fn from_rows(rows: Vec<ReportRow>) -> Result<Self> {
        let mut report = Report::new();
        for row in rows {
            report.begin(&row.name, row.started)?;
            report.finish(&row.name, row.result, row.reason, row.cause, row.ended)?;
        }
        Ok(report)
    }

    pub fn to_string_as(&self, format: ReportFormat) -> Result<String> {
        let rows = self.rows()?;
        match format {
            ReportFormat::Csv => Ok(csv::write_rows(&rows)),
            ReportFormat::Json => json::write_rows(&rows),
        }
    }

    pub fn parse_as(contents: &str, format: ReportFormat) -> Result<Self> {
        let rows = match format {
            ReportFormat::Csv => csv::read_rows(contents)?,
            ReportFormat::Json => json::read_rows(contents)?,
        };
        Self::from_rows(rows)
    }

    pub fn write_file(&self, path: impl AsRef<Path>, format: ReportFormat) -> Result<()> {
        let path = path.as_ref();
        let rendered = self.to_string_as(format)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, rendered)?;
        debug!(path = %path.display(), ?format, records = self.len(), "report written");
        Ok(())
    }

    pub fn read_file(path: impl AsRef<Path>, format: ReportFormat) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::parse_as(&contents, format)
    }
}
