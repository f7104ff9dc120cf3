// tests/filter_selection.rs

use std::collections::BTreeSet;

use rundag::dag::{UnitGraph, UnitSpec};
use rundag::errors::RundagError;
use rundag::exclude::FeatureFlagSet;
use rundag::filter::changes::units_for_files;
use rundag::filter::{
    ChangeSetProvider, FilterContext, GitChangeSet, StaticChangeSet, Target, parse_filter, select,
};
use rundag_test_utils::builders::graph_from;

fn names(selection: &rundag::filter::Selection) -> Vec<&str> {
    selection.iter().collect()
}

fn select_with(graph: &UnitGraph, exprs: &[&str]) -> Vec<String> {
    let changes = StaticChangeSet::default();
    let flags = FeatureFlagSet::default();
    let ctx = FilterContext {
        changes: &changes,
        flags: &flags,
    };
    let selection = select(graph, exprs, &ctx).unwrap();
    names(&selection).into_iter().map(str::to_string).collect()
}

/// a depends on b.
fn two_units() -> UnitGraph {
    graph_from(&[("a", &["b"]), ("b", &[])])
}

#[test]
fn trailing_traversal_adds_dependencies() {
    assert_eq!(select_with(&two_units(), &["a..."]), vec!["a", "b"]);
}

#[test]
fn leading_traversal_adds_dependents() {
    assert_eq!(select_with(&two_units(), &["...b"]), vec!["a", "b"]);
}

#[test]
fn caret_drops_the_target_itself() {
    assert_eq!(select_with(&two_units(), &["^a..."]), vec!["b"]);
}

#[test]
fn plain_name_matches_only_that_unit() {
    assert_eq!(select_with(&two_units(), &["a"]), vec!["a"]);
}

#[test]
fn evaluation_is_idempotent() {
    let graph = graph_from(&[
        ("apps/web", &["net/vpc"]),
        ("apps/api", &["net/vpc", "data/db"]),
        ("data/db", &["net/vpc"]),
        ("net/vpc", &[]),
    ]);
    let exprs = ["apps/*...", "!data/db"];

    let first = select_with(&graph, &exprs);
    let second = select_with(&graph, &exprs);
    assert_eq!(first, second);
    assert_eq!(first, vec!["apps/api", "apps/web", "net/vpc"]);
}

#[test]
fn glob_does_not_cross_path_separators() {
    let graph = graph_from(&[("apps/web", &[]), ("apps/web/cdn", &[]), ("db", &[])]);
    assert_eq!(select_with(&graph, &["apps/*"]), vec!["apps/web"]);
    assert_eq!(select_with(&graph, &["{apps/**}"]), vec!["apps/web", "apps/web/cdn"]);
}

#[test]
fn name_attribute_matches_last_component() {
    let graph = graph_from(&[("prod/vpc", &[]), ("stage/vpc", &[]), ("prod/db", &[])]);
    assert_eq!(select_with(&graph, &["name=vpc"]), vec!["prod/vpc", "stage/vpc"]);
}

#[test]
fn no_terms_selects_every_non_external_unit() {
    let graph = UnitGraph::build(vec![
        UnitSpec::new("local"),
        UnitSpec::new("shared").external(true),
    ])
    .unwrap();

    assert_eq!(select_with(&graph, &[]), vec!["local"]);
    assert_eq!(select_with(&graph, &["external=true"]), vec!["shared"]);
}

#[test]
fn negation_alone_subtracts_from_default_selection() {
    let graph = graph_from(&[("a", &["b"]), ("b", &[]), ("c", &[])]);
    assert_eq!(select_with(&graph, &["!b"]), vec!["a", "c"]);
}

#[test]
fn change_set_term_uses_collaborator() {
    let graph = graph_from(&[("a", &["b"]), ("b", &[]), ("c", &[])]);
    let changes = StaticChangeSet::new(["b", "not-a-unit"]);
    let flags = FeatureFlagSet::default();
    let ctx = FilterContext {
        changes: &changes,
        flags: &flags,
    };

    let selection = select(&graph, &["...[main...HEAD]"], &ctx).unwrap();
    assert_eq!(names(&selection), vec!["a", "b"]);
}

#[test]
fn flag_term_follows_feature_flag() {
    let graph = graph_from(&[("a", &[]), ("b", &[])]);
    let changes = StaticChangeSet::default();

    let on = FeatureFlagSet::default().with("canary", true);
    let ctx = FilterContext {
        changes: &changes,
        flags: &on,
    };
    assert_eq!(select(&graph, &["flag=canary"], &ctx).unwrap().len(), 2);

    let off = FeatureFlagSet::default().with("canary", false);
    let ctx = FilterContext {
        changes: &changes,
        flags: &off,
    };
    assert!(select(&graph, &["flag=canary"], &ctx).unwrap().is_empty());
}

#[test]
fn parse_recognises_change_set_target() {
    let expr = parse_filter("[main...HEAD]...").unwrap();
    assert_eq!(expr.target, Target::Changed("main...HEAD".to_string()));
    assert!(expr.dependencies);
    assert!(!expr.dependents);
}

#[test]
fn malformed_expressions_are_parse_errors() {
    for bad in ["", "[main", "{apps/*", "colour=red", "^a"] {
        match parse_filter(bad) {
            Err(RundagError::FilterParse { expr, .. }) => assert_eq!(expr, bad),
            other => panic!("expected FilterParse for {bad:?}, got {other:?}"),
        }
    }
}

#[test]
fn change_set_reference_cannot_look_like_an_option() {
    for bad in ["[--output=/tmp/rundag-out]", "[ -p ]...", "!...[-R]"] {
        match parse_filter(bad) {
            Err(RundagError::FilterParse { message, .. }) => {
                assert!(message.contains("'-'"), "unexpected message: {message}")
            }
            other => panic!("expected FilterParse for {bad:?}, got {other:?}"),
        }
    }

    // A dash inside a range is still a plain revision.
    let expr = parse_filter("[main...feature-x]").unwrap();
    assert_eq!(expr.target, Target::Changed("main...feature-x".to_string()));
}

#[test]
fn git_change_set_never_treats_reference_as_option() {
    let repo = tempfile::tempdir().unwrap();
    let _ = std::process::Command::new("git")
        .arg("init")
        .arg("--quiet")
        .current_dir(repo.path())
        .status();

    let target = repo.path().join("written-by-git.txt");
    let reference = format!("--output={}", target.display());
    let graph = graph_from(&[("apps", &[])]);

    let result = GitChangeSet::new(repo.path()).changed_units(&reference, &graph);

    assert!(result.is_err(), "expected an error, got {result:?}");
    assert!(!target.exists());
}

#[test]
fn filter_parse_errors_are_configuration_errors() {
    let err = parse_filter("[main").unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn changed_files_map_to_deepest_unit() {
    let graph = graph_from(&[("apps", &[]), ("apps/web", &[]), ("db", &[])]);
    let files = vec![
        "apps/web/main.tf".to_string(),
        "apps/variables.tf".to_string(),
        "README.md".to_string(),
    ];

    let units: Vec<String> = units_for_files(&files, &graph).into_iter().collect();
    let expected: BTreeSet<&str> = ["apps", "apps/web"].into_iter().collect();
    assert_eq!(units.iter().map(String::as_str).collect::<BTreeSet<_>>(), expected);
}
