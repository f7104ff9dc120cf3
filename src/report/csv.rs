// src/report/csv.rs

//! Comma-separated report form with RFC 4180 quoting.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::errors::{Result, RundagError};
use crate::report::row::{COLUMNS, ReportRow};

pub fn write_rows(rows: &[ReportRow]) -> String {
    let mut out = String::new();
    out.push_str(&COLUMNS.join(","));
    out.push('\n');

    for row in rows {
        let fields = [
            row.name.clone(),
            format_time(&row.started),
            format_time(&row.ended),
            row.result.to_string(),
            row.reason.map(|r| r.to_string()).unwrap_or_default(),
            row.cause.clone().unwrap_or_default(),
        ];
        let line: Vec<String> = fields.iter().map(|f| quote(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }

    out
}

pub fn read_rows(contents: &str) -> Result<Vec<ReportRow>> {
    let mut records = split_records(contents)?.into_iter();

    let header = records
        .next()
        .ok_or_else(|| RundagError::Report("CSV report is empty".to_string()))?;
    if header != COLUMNS {
        return Err(RundagError::Report(format!(
            "unexpected CSV header {:?} (expected {:?})",
            header, COLUMNS
        )));
    }

    let mut rows = Vec::new();
    for (line_no, fields) in records.enumerate() {
        if fields.len() != COLUMNS.len() {
            return Err(RundagError::Report(format!(
                "CSV row {} has {} fields (expected {})",
                line_no + 2,
                fields.len(),
                COLUMNS.len()
            )));
        }

        let result = fields[3].parse().map_err(RundagError::Report)?;
        let reason = if fields[4].is_empty() {
            None
        } else {
            Some(fields[4].parse().map_err(RundagError::Report)?)
        };

        rows.push(ReportRow {
            name: fields[0].clone(),
            started: parse_time(&fields[1])?,
            ended: parse_time(&fields[2])?,
            result,
            reason,
            cause: Some(fields[5].clone()).filter(|c| !c.is_empty()),
        });
    }

    Ok(rows)
}

fn format_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| RundagError::Report(format!("invalid timestamp '{s}': {e}")))
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split CSV text into records of unquoted fields. Blank lines are skipped.
fn split_records(contents: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = contents.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                other => field.push(other),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                if !(fields.len() == 1 && fields[0].is_empty()) {
                    records.push(std::mem::take(&mut fields));
                } else {
                    fields.clear();
                }
            }
            other => field.push(other),
        }
    }

    if in_quotes {
        return Err(RundagError::Report(
            "unterminated quoted field in CSV report".to_string(),
        ));
    }

    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push(fields);
    }

    Ok(records)
}
