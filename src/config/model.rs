use std::collections::BTreeMap;

use serde::Deserialize;

use crate::dag::UnitGraph;
use crate::exclude::FeatureFlagSet;
use crate::retry::{IgnoreRule, RetryPolicy};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [run]
/// parallelism = 4
/// fail_fast = false
///
/// [retry]
/// max_attempts = 3
/// sleep_interval_secs = 5
///
/// [[retry.errors]]
/// label = "lock contention"
/// pattern = "(?s).*Error acquiring the state lock.*"
///
/// [[ignore]]
/// name = "no changes"
/// patterns = [".*nothing to destroy.*"]
///
/// [features]
/// skip_db = true
///
/// [unit."apps/db"]
/// cmd = "terraform {action}"
/// after = ["apps/vpc"]
///
/// [unit."apps/db".exclude]
/// if_flag = "skip_db"
/// actions = ["apply", "destroy"]
/// exclude_dependents = true
/// ```
///
/// All sections except `[unit.*]` are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub run: RunSection,

    #[serde(default)]
    pub retry: RetrySection,

    #[serde(default)]
    pub ignore: Vec<IgnoreSection>,

    /// Feature flags consulted by exclude blocks and `flag=` filter terms.
    #[serde(default)]
    pub features: BTreeMap<String, bool>,

    /// All units from `[unit."<identity>"]`.
    #[serde(default)]
    pub unit: BTreeMap<String, UnitConfig>,
}

/// Validated configuration.
///
/// Constructed via `TryFrom<RawConfigFile>` (see `config::validate`), which
/// compiles every regex, checks retry bounds and builds the acyclic
/// [`UnitGraph`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub run: RunSection,
    pub retry: RetryPolicy,
    pub ignore: Vec<IgnoreRule>,
    pub features: FeatureFlagSet,
    pub unit: BTreeMap<String, UnitConfig>,
    pub graph: UnitGraph,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        run: RunSection,
        retry: RetryPolicy,
        ignore: Vec<IgnoreRule>,
        features: FeatureFlagSet,
        unit: BTreeMap<String, UnitConfig>,
        graph: UnitGraph,
    ) -> Self {
        Self {
            run,
            retry,
            ignore,
            features,
            unit,
            graph,
        }
    }
}

/// `[run]` section: scheduler knobs that the CLI can override.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    #[serde(default)]
    pub fail_fast: bool,

    #[serde(default)]
    pub ignore_dependency_errors: bool,
}

fn default_parallelism() -> usize {
    4
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            fail_fast: false,
            ignore_dependency_errors: false,
        }
    }
}

/// `[retry]` section.
///
/// Numbers are signed on purpose: a negative value is a configuration error
/// we want to report with a clear message rather than a TOML type error.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,

    #[serde(default = "default_sleep_interval_secs")]
    pub sleep_interval_secs: i64,

    /// Prepend the built-in list of transient errors to `errors`.
    #[serde(default = "default_true")]
    pub use_default_errors: bool,

    #[serde(default)]
    pub errors: Vec<RetryErrorSection>,
}

fn default_max_attempts() -> i64 {
    3
}

fn default_sleep_interval_secs() -> i64 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            sleep_interval_secs: default_sleep_interval_secs(),
            use_default_errors: true,
            errors: Vec::new(),
        }
    }
}

/// `[[retry.errors]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryErrorSection {
    pub label: String,
    pub pattern: String,
}

/// `[[ignore]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct IgnoreSection {
    pub name: String,

    /// Regexes; a leading `!` marks a pattern that vetoes the rule.
    pub patterns: Vec<String>,

    /// Optional message logged whenever the rule swallows an error.
    #[serde(default)]
    pub message: Option<String>,
}

/// `[unit."<identity>"]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UnitConfig {
    /// Command template; `{action}` and `{unit}` are substituted.
    ///
    /// If `None`, the unit falls back to `terraform {action}`.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Dependency list: this unit runs after all units listed here.
    #[serde(default)]
    pub after: Vec<String>,

    /// Discovered only because something depends on it.
    #[serde(default)]
    pub external: bool,

    #[serde(default)]
    pub exclude: Option<ExcludeConfig>,
}

/// `[unit."<identity>".exclude]` block.
#[derive(Debug, Clone, Deserialize)]
pub struct ExcludeConfig {
    /// Static condition; the block is inert when false.
    #[serde(rename = "if", default = "default_true")]
    pub condition: bool,

    /// Feature flag that must be enabled for the block to apply.
    #[serde(default)]
    pub if_flag: Option<String>,

    /// Action names, or `"all"` / `"all_except_output"`.
    #[serde(default)]
    pub actions: Vec<String>,

    /// Never execute the unit, whatever the action.
    #[serde(default)]
    pub no_run: bool,

    /// Also exclude every unit that (transitively) depends on this one.
    #[serde(default)]
    pub exclude_dependents: bool,
}

impl Default for ExcludeConfig {
    fn default() -> Self {
        Self {
            condition: true,
            if_flag: None,
            actions: Vec::new(),
            no_run: false,
            exclude_dependents: false,
        }
    }
}
