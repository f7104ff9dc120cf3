// src/retry/policy.rs

use std::time::Duration;

use regex::Regex;

use crate::config::model::{IgnoreSection, RetrySection};
use crate::errors::{Result, RundagError};

/// Transient failures of common provisioning tools and their backends.
const DEFAULT_RETRYABLE_ERRORS: &[(&str, &str)] = &[
    ("state load timeout", r"(?s).*Failed to load state.*tcp.*timeout.*"),
    ("backend tls timeout", r"(?s).*Failed to load backend.*TLS handshake timeout.*"),
    (
        "alarm update in progress",
        r"(?s).*Creating metric alarm failed.*request to update this alarm is in progress.*",
    ),
    ("provider tls timeout", r"(?s).*Error installing provider.*TLS handshake timeout.*"),
    ("backend config tls timeout", r"(?s).*Error configuring the backend.*TLS handshake timeout.*"),
    ("provider tcp timeout", r"(?s).*Error installing provider.*tcp.*timeout.*"),
    (
        "provider connection reset",
        r"(?s).*Error installing provider.*tcp.*connection reset by peer.*",
    ),
    ("missing bucket", r"NoSuchBucket: The specified bucket does not exist"),
    ("ssm too many updates", r"(?s).*Error creating SSM parameter: TooManyUpdates:.*"),
    ("registry rate limit", r"(?s).*app.terraform.io.*: 429 Too Many Requests.*"),
    (
        "ssh connection closed",
        r"(?s).*ssh_exchange_identification.*Connection closed by remote host.*",
    ),
    ("client timeout", r"(?s).*Client\.Timeout exceeded while awaiting headers.*"),
    (
        "module download rate limit",
        r"(?s).*Could not download module.*The requested URL returned error: 429.*",
    ),
];

/// A labelled regex classifying error output.
#[derive(Debug, Clone)]
pub struct ErrorPattern {
    label: String,
    regex: Regex,
}

impl ErrorPattern {
    pub fn new(label: &str, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| {
            RundagError::ConfigError(format!("invalid retry pattern '{label}': {e}"))
        })?;
        Ok(Self {
            label: label.to_string(),
            regex,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

pub fn default_retryable_errors() -> Result<Vec<ErrorPattern>> {
    DEFAULT_RETRYABLE_ERRORS
        .iter()
        .map(|(label, pattern)| ErrorPattern::new(label, pattern))
        .collect()
}

/// Bounded retry settings.
///
/// `max_attempts` counts the first attempt, so `max_attempts = 1` never
/// retries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    sleep_interval: Duration,
    patterns: Vec<ErrorPattern>,
}

impl RetryPolicy {
    /// Validate bounds; both are configuration errors when out of range.
    pub fn new(max_attempts: i64, sleep_interval_secs: i64, patterns: Vec<ErrorPattern>) -> Result<Self> {
        if max_attempts < 1 {
            return Err(RundagError::ConfigError(format!(
                "[retry].max_attempts must be >= 1 (got {max_attempts})"
            )));
        }
        if sleep_interval_secs < 0 {
            return Err(RundagError::ConfigError(format!(
                "[retry].sleep_interval_secs must be >= 0 (got {sleep_interval_secs})"
            )));
        }
        let max_attempts = u32::try_from(max_attempts).map_err(|_| {
            RundagError::ConfigError(format!("[retry].max_attempts is too large ({max_attempts})"))
        })?;

        Ok(Self {
            max_attempts,
            sleep_interval: Duration::from_secs(sleep_interval_secs.unsigned_abs()),
            patterns,
        })
    }

    pub fn from_section(section: &RetrySection) -> Result<Self> {
        let mut patterns = if section.use_default_errors {
            default_retryable_errors()?
        } else {
            Vec::new()
        };
        for entry in &section.errors {
            patterns.push(ErrorPattern::new(&entry.label, &entry.pattern)?);
        }
        Self::new(section.max_attempts, section.sleep_interval_secs, patterns)
    }

    /// Override the interval with sub-second precision.
    pub fn with_sleep_interval(mut self, interval: Duration) -> Self {
        self.sleep_interval = interval;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn sleep_interval(&self) -> Duration {
        self.sleep_interval
    }

    pub fn patterns(&self) -> &[ErrorPattern] {
        &self.patterns
    }

    /// First matching pattern wins.
    pub fn classify(&self, error: &str) -> Option<&ErrorPattern> {
        self.patterns.iter().find(|p| p.is_match(error))
    }
}

/// Named rule turning matching errors into successes.
#[derive(Debug, Clone)]
pub struct IgnoreRule {
    name: String,
    patterns: Vec<Regex>,
    vetoes: Vec<Regex>,
    message: Option<String>,
}

impl IgnoreRule {
    /// Patterns starting with `!` veto the rule instead of triggering it.
    pub fn new<S: AsRef<str>>(name: &str, patterns: &[S], message: Option<String>) -> Result<Self> {
        let compile = |p: &str| {
            Regex::new(p).map_err(|e| {
                RundagError::ConfigError(format!("invalid ignore pattern in rule '{name}': {e}"))
            })
        };

        let mut positive = Vec::new();
        let mut vetoes = Vec::new();
        for pattern in patterns {
            match pattern.as_ref().strip_prefix('!') {
                Some(negated) => vetoes.push(compile(negated)?),
                None => positive.push(compile(pattern.as_ref())?),
            }
        }

        if positive.is_empty() {
            return Err(RundagError::ConfigError(format!(
                "ignore rule '{name}' needs at least one non-negated pattern"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            patterns: positive,
            vetoes,
            message,
        })
    }

    pub fn from_section(section: &IgnoreSection) -> Result<Self> {
        Self::new(&section.name, &section.patterns, section.message.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn matches(&self, error: &str) -> bool {
        !self.vetoes.iter().any(|r| r.is_match(error))
            && self.patterns.iter().any(|r| r.is_match(error))
    }
}
