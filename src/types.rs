use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Canonical unit identity type used throughout the engine.
///
/// Identities are unit paths or names (e.g. `"apps/vpc"`), unique within a
/// graph.
pub type UnitName = String;

/// Action requested for every unit in a run.
///
/// `Destroy` is the only action that tears infrastructure down, and so the
/// only one scheduled in reverse dependency order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[default]
    Plan,
    Apply,
    Destroy,
    Output,
    Validate,
    Init,
    Refresh,
    Import,
    Show,
}

impl Action {
    pub const ALL: [Action; 9] = [
        Action::Plan,
        Action::Apply,
        Action::Destroy,
        Action::Output,
        Action::Validate,
        Action::Init,
        Action::Refresh,
        Action::Import,
        Action::Show,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Plan => "plan",
            Action::Apply => "apply",
            Action::Destroy => "destroy",
            Action::Output => "output",
            Action::Validate => "validate",
            Action::Init => "init",
            Action::Refresh => "refresh",
            Action::Import => "import",
            Action::Show => "show",
        }
    }

    /// Scheduling direction for this action.
    pub fn direction(&self) -> Direction {
        match self {
            Action::Destroy => Direction::Reverse,
            _ => Direction::Forward,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Action::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == needle)
            .ok_or_else(|| {
                let known: Vec<&str> = Action::ALL.iter().map(|a| a.as_str()).collect();
                format!("invalid action: {} (expected one of {})", s.trim(), known.join(", "))
            })
    }
}

/// Which edges gate a unit's start.
///
/// - `Forward`: a unit waits for its declared dependencies (apply-like).
/// - `Reverse`: a unit waits for its declared dependents (destroy-like).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

/// On-disk representation of a run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Csv,
    Json,
}

impl ReportFormat {
    /// Guess the format from a file extension, defaulting to CSV.
    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ReportFormat::Json,
            _ => ReportFormat::Csv,
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!(
                "invalid report format: {other} (expected \"csv\" or \"json\")"
            )),
        }
    }
}
