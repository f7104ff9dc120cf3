// tests/graph_property.rs

use std::collections::BTreeSet;

use proptest::prelude::*;
use rundag::dag::{UnitGraph, UnitSpec};

// We ensure acyclicity by only allowing unit N to depend on units 0..N-1.
fn dag_strategy(max_units: usize) -> impl Strategy<Value = UnitGraph> {
    (1..=max_units).prop_flat_map(|num_units| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_units),
            num_units,
        )
        .prop_map(move |raw_deps| {
            let specs = raw_deps
                .into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    let deps: BTreeSet<usize> = if i == 0 {
                        BTreeSet::new()
                    } else {
                        potential.into_iter().map(|d| d % i).collect()
                    };
                    deps.into_iter().fold(UnitSpec::new(format!("unit_{i:02}")), |spec, d| {
                        spec.after(format!("unit_{d:02}"))
                    })
                })
                .collect();
            UnitGraph::build(specs).unwrap()
        })
    })
}

proptest! {
    #[test]
    fn topological_order_is_a_permutation_respecting_edges(graph in dag_strategy(12)) {
        let order = graph.topological_order();
        prop_assert_eq!(order.len(), graph.len());

        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
        for unit in graph.units() {
            for dep in unit.dependencies() {
                prop_assert!(pos(dep) < pos(unit.name()));
            }
        }
    }

    #[test]
    fn reverse_order_puts_dependents_first(graph in dag_strategy(12)) {
        let order = graph.reverse_topological_order();
        prop_assert_eq!(order.len(), graph.len());

        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
        for unit in graph.units() {
            for dep in unit.dependencies() {
                prop_assert!(pos(unit.name()) < pos(dep));
            }
        }
    }

    #[test]
    fn ordering_is_deterministic(graph in dag_strategy(12)) {
        prop_assert_eq!(graph.topological_order(), graph.topological_order());
        prop_assert_eq!(graph.reverse_topological_order(), graph.reverse_topological_order());
    }

    #[test]
    fn dependents_mirror_dependencies(graph in dag_strategy(12)) {
        for unit in graph.units() {
            for dep in unit.dependencies() {
                prop_assert!(graph.dependents_of(dep).contains(&unit.name().to_string()));
            }
        }
    }
}
