// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RundagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unit not found: {0}")]
    UnitNotFound(String),

    #[error("Cycle detected in unit graph: {}", cycle.join(" -> "))]
    DagCycle { cycle: Vec<String> },

    #[error("Invalid filter expression '{expr}': {message}")]
    FilterParse { expr: String, message: String },

    #[error("Report error: {0}")]
    Report(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RundagError {
    /// Whether this error is detected before any unit executes.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RundagError::ConfigError(_)
                | RundagError::DagCycle { .. }
                | RundagError::FilterParse { .. }
                | RundagError::UnitNotFound(_)
                | RundagError::TomlError(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RundagError>;
