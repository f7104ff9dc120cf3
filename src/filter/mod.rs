// src/filter/mod.rs

//! Graph-query filters selecting which units take part in a run.
//!
//! Evaluation is pure: the same graph, expressions and collaborators always
//! produce the same [`Selection`].

pub mod changes;
pub mod parser;

use std::collections::BTreeSet;

use tracing::debug;

use crate::dag::UnitGraph;
use crate::errors::Result;
use crate::exclude::FeatureFlags;
use crate::types::UnitName;

pub use changes::{ChangeSetProvider, GitChangeSet, StaticChangeSet};
pub use parser::{FilterExpr, Target, UnitPattern, parse_filter, parse_filters};

/// Set of selected unit identities; always a subset of the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    units: BTreeSet<UnitName>,
}

impl Selection {
    /// Every unit that was not discovered as an external dependency.
    pub fn default_for(graph: &UnitGraph) -> Self {
        Self {
            units: graph
                .units()
                .filter(|u| !u.is_external())
                .map(|u| u.name().to_string())
                .collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn into_set(self) -> BTreeSet<UnitName> {
        self.units
    }
}

impl FromIterator<UnitName> for Selection {
    fn from_iter<I: IntoIterator<Item = UnitName>>(iter: I) -> Self {
        Self {
            units: iter.into_iter().collect(),
        }
    }
}

/// External collaborators consulted by base predicates.
pub struct FilterContext<'a> {
    pub changes: &'a dyn ChangeSetProvider,
    pub flags: &'a dyn FeatureFlags,
}

/// Evaluate filter terms against the graph.
///
/// Positive terms are unioned (all non-external units if there are none);
/// negated terms are then subtracted.
pub fn evaluate(
    graph: &UnitGraph,
    exprs: &[FilterExpr],
    ctx: &FilterContext<'_>,
) -> Result<Selection> {
    let mut positive: Option<BTreeSet<UnitName>> = None;
    let mut negative: BTreeSet<UnitName> = BTreeSet::new();

    for expr in exprs {
        let matched = evaluate_term(graph, expr, ctx)?;
        debug!(filter = %expr.raw, matched = matched.len(), "filter term evaluated");
        if expr.negated {
            negative.extend(matched);
        } else {
            positive.get_or_insert_with(BTreeSet::new).extend(matched);
        }
    }

    let base = positive.unwrap_or_else(|| Selection::default_for(graph).into_set());
    Ok(base.difference(&negative).cloned().collect())
}

/// Parse and evaluate in one go.
pub fn select<S: AsRef<str>>(
    graph: &UnitGraph,
    exprs: &[S],
    ctx: &FilterContext<'_>,
) -> Result<Selection> {
    let parsed = parse_filters(exprs)?;
    evaluate(graph, &parsed, ctx)
}

/// Matches of a single term, after traversal and `^`.
pub fn evaluate_term(
    graph: &UnitGraph,
    expr: &FilterExpr,
    ctx: &FilterContext<'_>,
) -> Result<BTreeSet<UnitName>> {
    let seeds = match_target(graph, &expr.target, ctx)?;
    let mut matched = seeds.clone();

    for seed in &seeds {
        if expr.dependencies {
            matched.extend(graph.transitive_dependencies_of(seed));
        }
        if expr.dependents {
            matched.extend(graph.transitive_dependents_of(seed));
        }
    }

    if expr.exclude_target {
        matched.retain(|u| !seeds.contains(u));
    }

    Ok(matched)
}

fn match_target(
    graph: &UnitGraph,
    target: &Target,
    ctx: &FilterContext<'_>,
) -> Result<BTreeSet<UnitName>> {
    let pick = |pred: &dyn Fn(&str, bool) -> bool| -> BTreeSet<UnitName> {
        graph
            .units()
            .filter(|u| pred(u.name(), u.is_external()))
            .map(|u| u.name().to_string())
            .collect()
    };

    let set = match target {
        Target::Path(pattern) => pick(&|name, _| pattern.is_match(name)),
        Target::Name(pattern) => pick(&|name, _| {
            let last = parser::normalize_path(name).rsplit('/').next().unwrap_or(name);
            pattern.is_match(last)
        }),
        Target::External(want) => pick(&|_, external| external == *want),
        Target::Flag(flag) => {
            if ctx.flags.is_enabled(flag) {
                pick(&|_, _| true)
            } else {
                BTreeSet::new()
            }
        }
        Target::Changed(reference) => ctx
            .changes
            .changed_units(reference, graph)?
            .into_iter()
            .filter(|u| graph.contains(u))
            .collect(),
    };

    Ok(set)
}
