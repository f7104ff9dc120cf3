// tests/graph_ordering.rs

use rundag::dag::{UnitGraph, UnitSpec};
use rundag::errors::RundagError;
use rundag::types::{Action, Direction};
use rundag_test_utils::builders::graph_from;

fn position(order: &[String], name: &str) -> usize {
    order.iter().position(|n| n == name).unwrap()
}

#[test]
fn topological_order_puts_dependencies_first() {
    // app depends on db and vpc; db depends on vpc.
    let graph = graph_from(&[("app", &["db", "vpc"]), ("db", &["vpc"]), ("vpc", &[])]);

    let order = graph.topological_order();
    assert_eq!(order, vec!["vpc", "db", "app"]);
    assert_eq!(graph.reverse_topological_order(), vec!["app", "db", "vpc"]);
}

#[test]
fn destroy_uses_reverse_order() {
    let graph = graph_from(&[("a", &["b"]), ("b", &[])]);

    assert_eq!(Action::Destroy.direction(), Direction::Reverse);
    assert_eq!(graph.order_for(Action::Destroy.direction()), vec!["a", "b"]);
    assert_eq!(graph.order_for(Action::Apply.direction()), vec!["b", "a"]);
}

#[test]
fn default_action_is_a_forward_plan() {
    assert_eq!(Action::default(), Action::Plan);
    assert_eq!(Action::default().direction(), Direction::Forward);
}

#[test]
fn independent_units_are_ordered_by_name() {
    let graph = graph_from(&[("c", &[]), ("a", &[]), ("b", &[])]);
    assert_eq!(graph.topological_order(), vec!["a", "b", "c"]);
}

#[test]
fn diamond_respects_every_edge() {
    let graph = graph_from(&[
        ("top", &["left", "right"]),
        ("left", &["base"]),
        ("right", &["base"]),
        ("base", &[]),
    ]);
    let order = graph.topological_order();

    for unit in graph.units() {
        for dep in unit.dependencies() {
            assert!(position(&order, dep) < position(&order, unit.name()));
        }
    }
    assert_eq!(graph.dependents_of("base"), ["left", "right"]);
}

#[test]
fn transitive_queries_exclude_self() {
    let graph = graph_from(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]);

    let deps: Vec<_> = graph.transitive_dependencies_of("a").into_iter().collect();
    assert_eq!(deps, vec!["b", "c"]);
    let dependents: Vec<_> = graph.transitive_dependents_of("c").into_iter().collect();
    assert_eq!(dependents, vec!["a", "b"]);
}

#[test]
fn cycle_is_a_structured_error() {
    let result = UnitGraph::build(vec![
        UnitSpec::new("a").after("b"),
        UnitSpec::new("b").after("a"),
    ]);

    match result {
        Err(RundagError::DagCycle { cycle }) => {
            assert!(cycle.contains(&"a".to_string()));
            assert!(cycle.contains(&"b".to_string()));
            assert_eq!(cycle.first(), cycle.last());
        }
        other => panic!("expected DagCycle, got {other:?}"),
    }
}

#[test]
fn self_dependency_is_a_cycle() {
    let result = UnitGraph::build(vec![UnitSpec::new("a").after("a")]);

    match result {
        Err(RundagError::DagCycle { cycle }) => assert_eq!(cycle, vec!["a", "a"]),
        other => panic!("expected DagCycle, got {other:?}"),
    }
}

#[test]
fn unknown_dependency_is_a_config_error() {
    let result = UnitGraph::build(vec![UnitSpec::new("a").after("ghost")]);

    match result {
        Err(RundagError::ConfigError(msg)) => {
            assert!(msg.contains("unknown dependency"));
            assert!(msg.contains("ghost"));
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn duplicate_unit_is_rejected() {
    let result = UnitGraph::build(vec![UnitSpec::new("a"), UnitSpec::new("a")]);
    assert!(matches!(result, Err(RundagError::ConfigError(_))));
}
