// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Control, DfsEvent, depth_first_search};
use tracing::debug;

use crate::errors::{Result, RundagError};
use crate::exclude::ExcludeRule;
use crate::types::{Direction, UnitName};

/// A unit record as handed over by discovery.
#[derive(Debug, Clone, Default)]
pub struct UnitSpec {
    pub name: UnitName,
    /// Declared dependencies, in declaration order.
    pub dependencies: Vec<UnitName>,
    /// Discovered only because something depends on it.
    pub external: bool,
    /// Exclude block, the only part of the unit configuration the engine reads.
    pub exclude: Option<ExcludeRule>,
    /// Command template handed to the tool-invocation layer.
    pub command: Option<String>,
}

impl UnitSpec {
    pub fn new<N: Into<UnitName>>(name: N) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn after<N: Into<UnitName>>(mut self, dep: N) -> Self {
        self.dependencies.push(dep.into());
        self
    }

    pub fn external(mut self, external: bool) -> Self {
        self.external = external;
        self
    }

    pub fn exclude(mut self, rule: ExcludeRule) -> Self {
        self.exclude = Some(rule);
        self
    }

    pub fn command<C: Into<String>>(mut self, cmd: C) -> Self {
        self.command = Some(cmd.into());
        self
    }
}

/// A node of the graph.
///
/// Only `dependencies` is authoritative; `dependents` is derived once after
/// every unit is known and never edited afterwards.
#[derive(Debug, Clone)]
pub struct Unit {
    name: UnitName,
    dependencies: Vec<UnitName>,
    dependents: Vec<UnitName>,
    external: bool,
    exclude: Option<ExcludeRule>,
    command: Option<String>,
}

impl Unit {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[UnitName] {
        &self.dependencies
    }

    pub fn dependents(&self) -> &[UnitName] {
        &self.dependents
    }

    pub fn is_external(&self) -> bool {
        self.external
    }

    pub fn exclude(&self) -> Option<&ExcludeRule> {
        self.exclude.as_ref()
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }
}

/// Immutable in-memory graph of units keyed by identity.
///
/// Construction rejects duplicate identities, unknown dependencies and
/// cycles, so every other method can assume a well-formed DAG.
#[derive(Debug, Clone)]
pub struct UnitGraph {
    units: BTreeMap<UnitName, Unit>,
}

impl UnitGraph {
    /// Build a graph from discovered unit records.
    pub fn build(specs: Vec<UnitSpec>) -> Result<Self> {
        let mut units: BTreeMap<UnitName, Unit> = BTreeMap::new();

        // First pass: create nodes with their dependency lists.
        for spec in specs {
            if units.contains_key(&spec.name) {
                return Err(RundagError::ConfigError(format!(
                    "unit '{}' is declared more than once",
                    spec.name
                )));
            }

            let mut seen = BTreeSet::new();
            let dependencies: Vec<UnitName> = spec
                .dependencies
                .into_iter()
                .filter(|d| seen.insert(d.clone()))
                .collect();

            units.insert(
                spec.name.clone(),
                Unit {
                    name: spec.name,
                    dependencies,
                    dependents: Vec::new(),
                    external: spec.external,
                    exclude: spec.exclude,
                    command: spec.command,
                },
            );
        }

        for unit in units.values() {
            for dep in &unit.dependencies {
                if !units.contains_key(dep) {
                    return Err(RundagError::ConfigError(format!(
                        "unit '{}' has unknown dependency '{}' in `after`",
                        unit.name, dep
                    )));
                }
            }
        }

        detect_cycle(&units)?;

        // Second pass: populate dependents based on deps. Iterating the
        // BTreeMap keeps every dependents list sorted.
        let edges: Vec<(UnitName, UnitName)> = units
            .values()
            .flat_map(|u| u.dependencies.iter().map(|d| (d.clone(), u.name.clone())))
            .collect();
        for (dep, dependent) in edges {
            if let Some(node) = units.get_mut(&dep) {
                node.dependents.push(dependent);
            }
        }

        debug!(units = units.len(), "unit graph built");
        Ok(Self { units })
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    pub fn unit(&self, name: &str) -> Option<&Unit> {
        self.units.get(name)
    }

    /// All unit names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(|s| s.as_str())
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Immediate dependencies of a unit (the units listed in its `after`).
    pub fn dependencies_of(&self, name: &str) -> &[UnitName] {
        self.units
            .get(name)
            .map(|n| n.dependencies.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a unit (units that list this one in their `after`).
    pub fn dependents_of(&self, name: &str) -> &[UnitName] {
        self.units
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Units that must reach a terminal state before `name` may start.
    pub fn gates_of(&self, name: &str, direction: Direction) -> &[UnitName] {
        match direction {
            Direction::Forward => self.dependencies_of(name),
            Direction::Reverse => self.dependents_of(name),
        }
    }

    /// Units whose start is gated on `name`.
    pub fn gated_by(&self, name: &str, direction: Direction) -> &[UnitName] {
        match direction {
            Direction::Forward => self.dependents_of(name),
            Direction::Reverse => self.dependencies_of(name),
        }
    }

    pub fn transitive_dependencies_of(&self, name: &str) -> BTreeSet<UnitName> {
        self.walk(name, |n| self.dependencies_of(n))
    }

    pub fn transitive_dependents_of(&self, name: &str) -> BTreeSet<UnitName> {
        self.walk(name, |n| self.dependents_of(n))
    }

    /// Dependencies first; ties broken by identity.
    pub fn topological_order(&self) -> Vec<UnitName> {
        self.kahn(Direction::Forward)
    }

    /// Dependents first (destroy order); ties broken by identity.
    pub fn reverse_topological_order(&self) -> Vec<UnitName> {
        self.kahn(Direction::Reverse)
    }

    pub fn order_for(&self, direction: Direction) -> Vec<UnitName> {
        self.kahn(direction)
    }

    /// Breadth-first closure over `next`, excluding the start node itself.
    fn walk<'a, F>(&'a self, start: &str, next: F) -> BTreeSet<UnitName>
    where
        F: Fn(&str) -> &'a [UnitName],
    {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<&str> = next(start).iter().map(|s| s.as_str()).collect();

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.to_string()) {
                continue;
            }
            queue.extend(next(current).iter().map(|s| s.as_str()));
        }

        seen
    }

    fn kahn(&self, direction: Direction) -> Vec<UnitName> {
        let mut in_degree: BTreeMap<&str, usize> = self
            .units
            .keys()
            .map(|name| (name.as_str(), self.gates_of(name, direction).len()))
            .collect();

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(name, _)| *name)
            .collect();

        let mut order = Vec::with_capacity(self.units.len());

        while let Some(name) = ready.pop_first() {
            order.push(name.to_string());
            for next in self.gated_by(name, direction) {
                if let Some(deg) = in_degree.get_mut(next.as_str()) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.insert(next.as_str());
                    }
                }
            }
        }

        order
    }
}

/// Depth-first search over `unit -> dependency` edges.
///
/// petgraph's DFS keeps the three-colour marking for us; a `BackEdge` event
/// means we reached a node that is still on the current path.
fn detect_cycle(units: &BTreeMap<UnitName, Unit>) -> Result<()> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in units.keys() {
        graph.add_node(name.as_str());
    }
    for unit in units.values() {
        for dep in &unit.dependencies {
            graph.add_edge(unit.name.as_str(), dep.as_str(), ());
        }
    }

    let mut path: Vec<&str> = Vec::new();
    let starts: Vec<&str> = graph.nodes().collect();

    let control = depth_first_search(&graph, starts, |event| match event {
        DfsEvent::Discover(n, _) => {
            path.push(n);
            Control::Continue
        }
        DfsEvent::Finish(_, _) => {
            path.pop();
            Control::Continue
        }
        DfsEvent::BackEdge(_, target) => Control::Break(target),
        _ => Control::Continue,
    });

    if let Some(target) = control.break_value() {
        let start = path.iter().position(|n| *n == target).unwrap_or(0);
        let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
        cycle.push(target.to_string());
        return Err(RundagError::DagCycle { cycle });
    }

    Ok(())
}
