// tests/graph_delta.rs

use std::collections::BTreeSet;

use serde_json::json;

use recipeflow::{Combine, NodeChange, RecipeGraph, RecipeGraphDelta};
use recipeflow_test_utils::builders::{chain, filter, GraphBuilder, NodeBuilder};
use recipeflow_test_utils::init_tracing;

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// A -> B -> C where every node's job revision is given.
fn revisions(a: u32, b: u32, c: u32) -> RecipeGraph {
    GraphBuilder::new()
        .with_node(NodeBuilder::job_revision("A", a).build())
        .with_node(NodeBuilder::job_revision("B", b).after("A").build())
        .with_node(NodeBuilder::job_revision("C", c).after("B").build())
        .build()
}

#[test]
fn graph_diffed_with_itself_is_identical() {
    init_tracing();
    let graph = revisions(1, 1, 1);
    let delta = RecipeGraphDelta::diff(&graph, &graph);

    assert!(delta.is_empty());
    assert_eq!(delta.reusable(), set(&["A", "B", "C"]));
    assert!(delta.must_recreate().is_empty());
}

#[test]
fn change_at_the_root_taints_everything_below() {
    init_tracing();
    let delta = RecipeGraphDelta::diff(&revisions(1, 1, 1), &revisions(2, 1, 1));

    assert_eq!(delta.change_of("A"), Some(NodeChange::Changed));
    assert_eq!(delta.change_of("B"), Some(NodeChange::Changed));
    assert_eq!(delta.change_of("C"), Some(NodeChange::Changed));
    assert!(delta.reusable().is_empty());
}

#[test]
fn change_at_the_leaf_keeps_its_ancestors() {
    let delta = RecipeGraphDelta::diff(&revisions(1, 1, 1), &revisions(1, 1, 2));

    assert!(delta.is_reusable("A"));
    assert!(delta.is_reusable("B"));
    assert_eq!(delta.changed(), set(&["C"]));
    assert!(!delta.is_empty());
}

#[test]
fn added_and_removed_nodes() {
    let old = chain(&["A", "B", "X"]);
    let new = GraphBuilder::new()
        .job("A", &[])
        .job("B", &["A"])
        .job("D", &["B"])
        .job("E", &["A"])
        .build();

    let delta = RecipeGraphDelta::diff(&old, &new);
    assert_eq!(delta.added(), set(&["D", "E"]));
    assert_eq!(delta.removed(), set(&["X"]));
    assert_eq!(delta.reusable(), set(&["A", "B"]));
    assert_eq!(delta.change_of("X"), Some(NodeChange::Removed));
    assert_eq!(delta.change_of("nope"), None);
}

#[test]
fn dependency_set_change_is_a_change() {
    let old = GraphBuilder::new().job("A", &[]).job("B", &[]).job("C", &["A"]).build();
    let new = GraphBuilder::new()
        .job("A", &[])
        .job("B", &[])
        .job("C", &["A", "B"])
        .build();

    let delta = RecipeGraphDelta::diff(&old, &new);
    assert_eq!(delta.changed(), set(&["C"]));
    assert_eq!(delta.reusable(), set(&["A", "B"]));
}

fn gated(threshold: i64) -> RecipeGraph {
    let gate = filter(Combine::All, &[("age", "integer", ">", vec![json!(threshold)])]);
    GraphBuilder::new()
        .with_json_input("age", "integer", true)
        .job("A", &[])
        .with_node(NodeBuilder::condition("gate", gate, &["age"]).after("A").build())
        .job("B", &["gate"])
        .build()
}

#[test]
fn condition_filters_compare_structurally() {
    init_tracing();
    let delta = RecipeGraphDelta::diff(&gated(18), &gated(18));
    assert!(delta.is_empty());

    let delta = RecipeGraphDelta::diff(&gated(18), &gated(21));
    assert!(delta.is_reusable("A"));
    assert_eq!(delta.changed(), set(&["B", "gate"]));
}

#[test]
fn changed_inputs_demote_readers_and_conditions() {
    init_tracing();
    let graph = GraphBuilder::new()
        .with_file_input("INPUT_IMAGE", &["image/png"])
        .with_json_input("age", "integer", true)
        .with_node(NodeBuilder::job("A").recipe_input("IMAGE", "INPUT_IMAGE").build())
        .job("B", &[])
        .with_node(
            NodeBuilder::condition("gate", filter(Combine::All, &[]), &["age"])
                .after("B")
                .build(),
        )
        .job("C", &["gate"])
        .job("D", &["A"])
        .build();

    let delta = RecipeGraphDelta::diff(&graph, &graph);
    assert!(delta.is_empty());

    let unchanged = delta.clone().with_changed_inputs(&graph, &BTreeSet::new());
    assert!(unchanged.is_empty());

    let delta = delta.with_changed_inputs(&graph, &set(&["INPUT_IMAGE"]));
    assert_eq!(delta.reusable(), set(&["B"]));
    assert_eq!(delta.changed(), set(&["A", "C", "D", "gate"]));
}
