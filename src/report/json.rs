// src/report/json.rs

//! JSON report form and its schema.

use std::fs;
use std::path::Path;

use schemars::schema::RootSchema;
use serde_json::Value;

use crate::errors::{Result, RundagError};
use crate::report::row::ReportRow;

pub fn write_rows(rows: &[ReportRow]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rows)?)
}

pub fn read_rows(contents: &str) -> Result<Vec<ReportRow>> {
    let value: Value = serde_json::from_str(contents)?;
    validate_value(&value)?;
    Ok(serde_json::from_value(value)?)
}

/// Schema of a JSON report: an array of [`ReportRow`] objects.
pub fn report_schema() -> RootSchema {
    schemars::schema_for!(Vec<ReportRow>)
}

pub fn report_schema_pretty_json() -> Result<String> {
    Ok(serde_json::to_string_pretty(&report_schema())?)
}

pub fn write_schema_file(path: impl AsRef<Path>) -> Result<()> {
    fs::write(path, report_schema_pretty_json()?)?;
    Ok(())
}

/// Fields every row must carry, as declared by the row schema.
pub fn required_fields() -> Vec<String> {
    let schema = schemars::schema_for!(ReportRow);
    schema
        .schema
        .object
        .map(|obj| obj.required.iter().cloned().collect())
        .unwrap_or_default()
}

/// Check a JSON document against the report schema.
pub fn validate_json(contents: &str) -> Result<()> {
    let value: Value = serde_json::from_str(contents)?;
    validate_value(&value)
}

fn validate_value(value: &Value) -> Result<()> {
    let items = value
        .as_array()
        .ok_or_else(|| RundagError::Report("JSON report must be an array".to_string()))?;
    let required = required_fields();

    for (idx, item) in items.iter().enumerate() {
        let obj = item.as_object().ok_or_else(|| {
            RundagError::Report(format!("JSON report entry {idx} is not an object"))
        })?;

        for field in &required {
            if !obj.contains_key(field) {
                return Err(RundagError::Report(format!(
                    "JSON report entry {idx} is missing required field '{field}'"
                )));
            }
        }

        serde_json::from_value::<ReportRow>(item.clone()).map_err(|e| {
            RundagError::Report(format!("JSON report entry {idx} is invalid: {e}"))
        })?;
    }

    Ok(())
}
