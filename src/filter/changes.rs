// src/filter/changes.rs

//! Change-set collaborators used by `[ref]` filter terms.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, bail};
use tracing::debug;

use crate::dag::UnitGraph;
use crate::errors::Result;
use crate::filter::parser::normalize_path;
use crate::types::UnitName;

/// Returns the units changed relative to a reference point.
pub trait ChangeSetProvider: Send + Sync {
    fn changed_units(&self, reference: &str, graph: &UnitGraph) -> Result<BTreeSet<UnitName>>;
}

/// Fixed change set, for tests and callers that computed it elsewhere.
///
/// The reference is ignored.
#[derive(Debug, Clone, Default)]
pub struct StaticChangeSet {
    units: BTreeSet<UnitName>,
}

impl StaticChangeSet {
    pub fn new<I, S>(units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<UnitName>,
    {
        Self {
            units: units.into_iter().map(Into::into).collect(),
        }
    }
}

impl ChangeSetProvider for StaticChangeSet {
    fn changed_units(&self, _reference: &str, graph: &UnitGraph) -> Result<BTreeSet<UnitName>> {
        Ok(self
            .units
            .iter()
            .filter(|u| graph.contains(u))
            .cloned()
            .collect())
    }
}

/// `git diff --name-only <reference>` mapped onto unit identities.
///
/// Unit identities are taken to be directories relative to `repo_root`; a
/// changed file belongs to the deepest unit whose path prefixes it.
#[derive(Debug, Clone)]
pub struct GitChangeSet {
    repo_root: PathBuf,
}

impl GitChangeSet {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    fn changed_files(&self, reference: &str) -> anyhow::Result<Vec<String>> {
        let output = Command::new("git")
            .arg("diff")
            .arg("--name-only")
            .arg("--end-of-options")
            .arg(reference)
            .current_dir(&self.repo_root)
            .output()
            .with_context(|| format!("running git diff for '{reference}'"))?;

        if !output.status.success() {
            bail!(
                "git diff --name-only {} failed: {}",
                reference,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }
}

impl ChangeSetProvider for GitChangeSet {
    fn changed_units(&self, reference: &str, graph: &UnitGraph) -> Result<BTreeSet<UnitName>> {
        let files = self.changed_files(reference)?;
        let units = units_for_files(&files, graph);
        debug!(reference, files = files.len(), units = units.len(), "change set resolved");
        Ok(units)
    }
}

/// Map file paths onto the deepest enclosing unit.
pub fn units_for_files(files: &[String], graph: &UnitGraph) -> BTreeSet<UnitName> {
    let mut units = BTreeSet::new();

    for file in files {
        let file = normalize_path(file);
        let owner = graph
            .names()
            .filter(|unit| {
                let unit = normalize_path(unit);
                file == unit
                    || file
                        .strip_prefix(unit)
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|unit| normalize_path(unit).len());

        if let Some(owner) = owner {
            units.insert(owner.to_string());
        }
    }

    units
}
