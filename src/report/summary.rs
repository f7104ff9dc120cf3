// src/report/summary.rs

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::report::record::{RunRecord, RunResult};
use crate::types::UnitName;

/// Records grouped by result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    groups: BTreeMap<RunResult, Vec<(UnitName, chrono::Duration)>>,
    total: usize,
}

impl Summary {
    /// Open records count towards `total` only, so callers can spot them.
    pub fn from_records(records: &[RunRecord]) -> Self {
        let mut groups: BTreeMap<RunResult, Vec<(UnitName, chrono::Duration)>> = BTreeMap::new();

        for record in records {
            if let (Some(result), Some(elapsed)) = (record.result, record.elapsed()) {
                groups
                    .entry(result)
                    .or_default()
                    .push((record.name.clone(), elapsed));
            }
        }

        for units in groups.values_mut() {
            units.sort_by(|a, b| a.0.cmp(&b.0));
        }

        Self {
            groups,
            total: records.len(),
        }
    }

    pub fn count(&self, result: RunResult) -> usize {
        self.groups.get(&result).map(Vec::len).unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn units(&self, result: RunResult) -> &[(UnitName, chrono::Duration)] {
        self.groups.get(&result).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn render(&self, per_unit: bool) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Run summary: {} units", self.total);

        for result in RunResult::ALL {
            let count = self.count(result);
            if count == 0 {
                continue;
            }
            let _ = writeln!(out, "  {:<12} {}", result.as_str(), count);
            if per_unit {
                for (name, elapsed) in self.units(result) {
                    let _ = writeln!(
                        out,
                        "    {:<40} {}ms",
                        name,
                        elapsed.num_milliseconds()
                    );
                }
            }
        }

        out
    }
}
