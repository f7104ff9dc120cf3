#![allow(dead_code)]

use rundag::config::{ConfigFile, ExcludeConfig, RawConfigFile, UnitConfig};
use rundag::dag::{UnitGraph, UnitSpec};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_unit(mut self, name: &str, unit: UnitConfig) -> Self {
        self.config.unit.insert(name.to_string(), unit);
        self
    }

    pub fn with_flag(mut self, name: &str, enabled: bool) -> Self {
        self.config.features.insert(name.to_string(), enabled);
        self
    }

    pub fn with_parallelism(mut self, n: usize) -> Self {
        self.config.run.parallelism = n;
        self
    }

    pub fn with_fail_fast(mut self, val: bool) -> Self {
        self.config.run.fail_fast = val;
        self
    }

    pub fn with_max_attempts(mut self, n: i64) -> Self {
        self.config.retry.max_attempts = n;
        self
    }

    pub fn with_sleep_interval_secs(mut self, secs: i64) -> Self {
        self.config.retry.sleep_interval_secs = secs;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `UnitConfig`.
pub struct UnitConfigBuilder {
    unit: UnitConfig,
}

impl UnitConfigBuilder {
    pub fn new() -> Self {
        Self {
            unit: UnitConfig::default(),
        }
    }

    pub fn cmd(mut self, cmd: &str) -> Self {
        self.unit.cmd = Some(cmd.to_string());
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.unit.after.push(dep.to_string());
        self
    }

    pub fn external(mut self, val: bool) -> Self {
        self.unit.external = val;
        self
    }

    pub fn exclude(mut self, exclude: ExcludeConfig) -> Self {
        self.unit.exclude = Some(exclude);
        self
    }

    pub fn build(self) -> UnitConfig {
        self.unit
    }
}

impl Default for UnitConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a graph from `(name, dependencies)` pairs.
pub fn graph_from(edges: &[(&str, &[&str])]) -> UnitGraph {
    let specs = edges
        .iter()
        .map(|(name, deps)| {
            deps.iter()
                .fold(UnitSpec::new(*name), |spec, dep| spec.after(*dep))
        })
        .collect();
    UnitGraph::build(specs).expect("test graph should be valid")
}
