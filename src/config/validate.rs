// src/config/validate.rs

use tracing::warn;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dag::{UnitGraph, UnitSpec};
use crate::errors::{Result, RundagError};
use crate::exclude::{ExcludeRule, FeatureFlagSet};
use crate::retry::{IgnoreRule, RetryPolicy};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::RundagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_units(&raw)?;
        validate_run_section(&raw)?;

        let retry = RetryPolicy::from_section(&raw.retry)?;
        let ignore = raw
            .ignore
            .iter()
            .map(IgnoreRule::from_section)
            .collect::<Result<Vec<_>>>()?;
        let features = FeatureFlagSet::new(raw.features.clone());
        let graph = build_graph(&raw, &features)?;

        Ok(ConfigFile::new_unchecked(
            raw.run, retry, ignore, features, raw.unit, graph,
        ))
    }
}

fn ensure_has_units(cfg: &RawConfigFile) -> Result<()> {
    if cfg.unit.is_empty() {
        return Err(RundagError::ConfigError(
            "config must contain at least one [unit.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_run_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.run.parallelism == 0 {
        return Err(RundagError::ConfigError(
            "[run].parallelism must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

/// Turn `[unit.*]` tables into a validated graph.
///
/// Unknown `after` references and cycles are rejected by [`UnitGraph::build`].
fn build_graph(cfg: &RawConfigFile, features: &FeatureFlagSet) -> Result<UnitGraph> {
    let mut specs = Vec::with_capacity(cfg.unit.len());

    for (name, unit) in cfg.unit.iter() {
        let mut spec = UnitSpec::new(name.as_str()).external(unit.external);
        for dep in unit.after.iter() {
            spec = spec.after(dep.as_str());
        }
        if let Some(cmd) = &unit.cmd {
            spec = spec.command(cmd.as_str());
        }
        if let Some(exclude) = &unit.exclude {
            if let Some(flag) = &exclude.if_flag {
                if !features.is_defined(flag) {
                    warn!(
                        unit = %name,
                        flag = %flag,
                        "exclude block refers to an undefined feature flag; treating it as disabled"
                    );
                }
            }
            let rule = ExcludeRule::from_config(exclude).map_err(|e| {
                RundagError::ConfigError(format!("unit '{name}' has an invalid exclude block: {e}"))
            })?;
            spec = spec.exclude(rule);
        }
        specs.push(spec);
    }

    UnitGraph::build(specs)
}
