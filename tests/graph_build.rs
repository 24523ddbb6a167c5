// tests/graph_build.rs

use std::error::Error;
use std::fs;

use serde_json::json;
use tempfile::tempdir;

use recipeflow::dag::NodeKind;
use recipeflow::definition::{load_and_build, parse_json, parse_toml};
use recipeflow::errors::{DefinitionError, GraphError};
use recipeflow::{build_graph, Combine, RecipeflowError};
use recipeflow_test_utils::builders::{chain, filter, GraphBuilder, NodeBuilder};
use recipeflow_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn names(list: &[String]) -> Vec<&str> {
    list.iter().map(String::as_str).collect()
}

#[test]
fn two_node_cycle_is_rejected() {
    init_tracing();
    let result = GraphBuilder::new()
        .job("A", &["B"])
        .job("B", &["A"])
        .try_build();

    assert!(matches!(
        result,
        Err(RecipeflowError::Graph(GraphError::CyclicGraph { .. }))
    ));
}

#[test]
fn long_cycle_is_rejected() {
    init_tracing();
    let result = GraphBuilder::new()
        .job("A", &["E"])
        .job("B", &["A"])
        .job("C", &["B"])
        .job("D", &["C"])
        .job("E", &["D"])
        .job("F", &[])
        .try_build();

    assert!(matches!(
        result,
        Err(RecipeflowError::Graph(GraphError::CyclicGraph { .. }))
    ));
}

#[test]
fn self_dependency_is_a_cycle() {
    let result = GraphBuilder::new().job("A", &["A"]).try_build();
    assert!(matches!(
        result,
        Err(RecipeflowError::Graph(GraphError::CyclicGraph { node })) if node == "A"
    ));
}

#[test]
fn unknown_and_duplicate_nodes() {
    let result = GraphBuilder::new().job("A", &["ghost"]).try_build();
    assert!(matches!(
        result,
        Err(RecipeflowError::Graph(GraphError::UnknownNode { node, referenced_by }))
            if node == "ghost" && referenced_by == "A"
    ));

    let result = GraphBuilder::new().job("A", &[]).job("A", &[]).try_build();
    assert!(matches!(
        result,
        Err(RecipeflowError::Graph(GraphError::DuplicateNode { node })) if node == "A"
    ));
}

#[test]
fn topological_order_breaks_ties_by_name() {
    //     root
    //    /  |  \
    //   c   a   b
    //    \     /
    //     join
    let graph = GraphBuilder::new()
        .job("root", &[])
        .job("c", &["root"])
        .job("a", &["root"])
        .job("b", &["root"])
        .job("join", &["b", "c"])
        .build();

    assert_eq!(
        names(graph.topological_order()),
        vec!["root", "a", "b", "c", "join"]
    );
    assert_eq!(graph.roots().collect::<Vec<_>>(), vec!["root"]);
    assert_eq!(names(graph.dependents_of("root")), vec!["a", "b", "c"]);
    assert_eq!(names(graph.dependencies_of("join")), vec!["b", "c"]);
}

#[test]
fn ancestors_and_descendants_are_transitive() {
    let graph = chain(&["A", "B", "C", "D"]);

    let ancestors: Vec<String> = graph.ancestors("C").into_iter().collect();
    assert_eq!(ancestors, vec!["A", "B"]);

    let descendants: Vec<String> = graph.descendants("B").into_iter().collect();
    assert_eq!(descendants, vec!["C", "D"]);

    assert!(graph.ancestors("A").is_empty());
    assert!(graph.descendants("D").is_empty());
}

#[test]
fn dependency_bindings_imply_edges() {
    let graph = GraphBuilder::new()
        .job("A", &[])
        .with_node(
            NodeBuilder::job("B")
                .dependency_input("IMAGE", "A", "OUTPUT_IMAGE")
                .build(),
        )
        .build();

    assert_eq!(names(graph.dependencies_of("B")), vec!["A"]);
}

#[test]
fn binding_to_undeclared_recipe_input_is_rejected() {
    let result = GraphBuilder::new()
        .with_file_input("INPUT_IMAGE", &["image/png"])
        .with_node(NodeBuilder::job("A").recipe_input("IMAGE", "OTHER").build())
        .try_build();

    assert!(matches!(
        result,
        Err(RecipeflowError::Definition(DefinitionError::UnknownRecipeInput { recipe_input, .. }))
            if recipe_input == "OTHER"
    ));
}

#[test]
fn binding_to_unaccepted_condition_output_is_rejected() {
    let gate = filter(Combine::All, &[("age", "integer", ">", vec![json!(18)])]);
    let result = GraphBuilder::new()
        .with_json_input("age", "integer", true)
        .with_node(NodeBuilder::condition("gate", gate, &["age"]).build())
        .with_node(
            NodeBuilder::job("B")
                .dependency_input("value", "gate", "name")
                .build(),
        )
        .try_build();

    assert!(matches!(
        result,
        Err(RecipeflowError::Definition(DefinitionError::UnknownConditionOutput { condition, output, .. }))
            if condition == "gate" && output == "name"
    ));
}

#[test]
fn condition_filter_on_invisible_parameter_is_a_warning() {
    init_tracing();
    let gate = filter(Combine::All, &[("nope", "string", "==", vec![json!("x")])]);
    let graph = GraphBuilder::new()
        .with_json_input("age", "integer", true)
        .with_node(NodeBuilder::condition("gate", gate, &[]).build())
        .build();

    assert_eq!(graph.warnings().len(), 1);
    assert!(graph.warnings()[0].contains("'nope'"));
}

#[test]
fn fingerprint_follows_content() {
    let a = chain(&["A", "B"]);
    let b = chain(&["A", "B"]);
    let c = chain(&["A", "C"]);
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_ne!(a.fingerprint(), c.fingerprint());
}

const DEFINITION_TOML: &str = r#"
version = "6"

[[input.files]]
name = "INPUT_IMAGE"
media_types = ["image/png"]

[[input.json]]
name = "threshold"
type = "number"
required = false

[nodes.node_a]
input = { INPUT_IMAGE = { type = "recipe", input = "INPUT_IMAGE" } }
node_type = { node_type = "job", job_type_name = "my-job-type", job_type_version = "1.0.0", job_type_revision = 1 }

[nodes.gate]
dependencies = ["node_a"]
node_type = { node_type = "condition", accepted_outputs = ["threshold"], data_filter = { all = true, filters = [
    { name = "threshold", type = "number", condition = ">", values = [0.5] },
] } }

[nodes.node_b]
dependencies = [{ name = "gate" }]
input = { IMAGE = { type = "dependency", node = "node_a", output = "OUTPUT_IMAGE" } }
node_type = { node_type = "recipe", recipe_type_name = "sub-recipe", recipe_type_revision = 1 }
"#;

#[test]
fn toml_definition_builds_a_graph() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let path = dir.path().join("recipe.toml");
    fs::write(&path, DEFINITION_TOML)?;

    let graph = load_and_build(&path)?;
    assert_eq!(names(graph.topological_order()), vec!["node_a", "gate", "node_b"]);
    assert_eq!(names(graph.dependencies_of("node_b")), vec!["gate", "node_a"]);

    let gate = graph.node("gate").and_then(|n| n.condition_definition());
    assert!(gate.is_some_and(|c| c.accepted_outputs.contains("threshold")));
    assert!(matches!(
        graph.node("node_b").map(|n| &n.kind),
        Some(NodeKind::SubRecipe(r)) if r.name == "sub-recipe" && r.revision == 1
    ));
    Ok(())
}

#[test]
fn json_definition_builds_the_same_graph() -> TestResult {
    let doc = json!({
        "version": "6",
        "input": {
            "files": [{ "name": "INPUT_IMAGE", "media_types": ["image/png"] }],
            "json": [{ "name": "threshold", "type": "number", "required": false }],
        },
        "nodes": {
            "node_a": {
                "input": { "INPUT_IMAGE": { "type": "recipe", "input": "INPUT_IMAGE" } },
                "node_type": {
                    "node_type": "job",
                    "job_type_name": "my-job-type",
                    "job_type_version": "1.0.0",
                    "job_type_revision": 1,
                },
            },
            "gate": {
                "dependencies": ["node_a"],
                "node_type": {
                    "node_type": "condition",
                    "accepted_outputs": ["threshold"],
                    "data_filter": {
                        "all": true,
                        "filters": [
                            { "name": "threshold", "type": "number", "condition": ">", "values": [0.5] },
                        ],
                    },
                },
            },
            "node_b": {
                "dependencies": [{ "name": "gate" }],
                "input": { "IMAGE": { "type": "dependency", "node": "node_a", "output": "OUTPUT_IMAGE" } },
                "node_type": {
                    "node_type": "recipe",
                    "recipe_type_name": "sub-recipe",
                    "recipe_type_revision": 1,
                },
            },
        },
    });

    let dir = tempdir()?;
    let json_path = dir.path().join("recipe.json");
    fs::write(&json_path, serde_json::to_string_pretty(&doc)?)?;
    let toml_path = dir.path().join("recipe.toml");
    fs::write(&toml_path, DEFINITION_TOML)?;

    let from_json = load_and_build(&json_path)?;
    let from_toml = load_and_build(&toml_path)?;
    assert_eq!(from_json.fingerprint(), from_toml.fingerprint());
    Ok(())
}

#[test]
fn repeated_json_node_name_is_a_duplicate() -> TestResult {
    init_tracing();
    let doc = r#"{
        "nodes": {
            "a": { "node_type": { "node_type": "job", "job_type_name": "x", "job_type_version": "1.0.0", "job_type_revision": 1 } },
            "a": { "node_type": { "node_type": "job", "job_type_name": "y", "job_type_version": "1.0.0", "job_type_revision": 1 } }
        }
    }"#;
    let raw = parse_json(doc)?;
    assert_eq!(raw.nodes.len(), 2);

    let result = build_graph(raw);
    assert!(matches!(
        result,
        Err(RecipeflowError::Graph(GraphError::DuplicateNode { node })) if node == "a"
    ));
    Ok(())
}

#[test]
fn unsupported_version_is_rejected() -> TestResult {
    let raw = parse_toml("version = \"5\"\n")?;
    let result = build_graph(raw);
    assert!(matches!(
        result,
        Err(RecipeflowError::Definition(DefinitionError::UnsupportedVersion(v))) if v == "5"
    ));
    Ok(())
}

#[test]
fn invalid_filter_clause_fails_the_definition() -> TestResult {
    let raw = parse_toml(
        r#"
[nodes.gate]
node_type = { node_type = "condition", data_filter = { filters = [
    { name = "age", type = "integer", values = [1] },
] } }
"#,
    )?;
    let result = build_graph(raw);
    assert!(matches!(
        result,
        Err(RecipeflowError::Definition(DefinitionError::MissingCondition { name })) if name == "age"
    ));
    Ok(())
}
