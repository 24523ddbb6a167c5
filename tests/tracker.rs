// tests/tracker.rs

use std::error::Error;
use std::sync::Arc;

use serde_json::json;

use recipeflow::dag::NodeTransition;
use recipeflow::recipe::IdAllocator;
use recipeflow::{
    materialize, Combine, DataBag, InMemoryFileCatalog, NodeOutcome, NodeState, RecipeGraph,
    RecipeStatus, RecipeTracker,
};
use recipeflow_test_utils::builders::{chain, filter, GraphBuilder, NodeBuilder};
use recipeflow_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn tracker_for(graph: RecipeGraph, input: DataBag) -> Result<RecipeTracker, Box<dyn Error>> {
    let ids = IdAllocator::new();
    let recipe = materialize(Arc::new(graph), input, None, &ids)?;
    Ok(RecipeTracker::new(recipe, Arc::new(InMemoryFileCatalog::new())))
}

/// A -> gate(age > 18) -> B, with B reading the gate's `age` output.
fn gated_graph() -> RecipeGraph {
    let gate = filter(Combine::All, &[("age", "integer", ">", vec![json!(18)])]);
    GraphBuilder::new()
        .with_json_input("age", "integer", true)
        .job("A", &[])
        .with_node(NodeBuilder::condition("gate", gate, &["age"]).after("A").build())
        .with_node(
            NodeBuilder::job("B")
                .after("gate")
                .dependency_input("AGE", "gate", "age")
                .build(),
        )
        .build()
}

#[test]
fn roots_become_eligible_on_start() -> TestResult {
    init_tracing();
    let graph = GraphBuilder::new()
        .job("A", &[])
        .job("B", &[])
        .job("C", &["A", "B"])
        .build();
    let mut tracker = tracker_for(graph, DataBag::new())?;

    let step = tracker.start();
    assert_eq!(step.eligible_names(), vec!["A", "B"]);
    assert_eq!(tracker.state_of("C"), Some(NodeState::Blocked));
    assert_eq!(tracker.status(), RecipeStatus::Active);
    assert!(!step.recipe_just_finished);
    Ok(())
}

#[test]
fn chain_completes_in_order() -> TestResult {
    init_tracing();
    let mut tracker = tracker_for(chain(&["A", "B", "C"]), DataBag::new())?;
    assert_eq!(tracker.start().eligible_names(), vec!["A"]);

    tracker.handle_dispatched("A");
    assert_eq!(tracker.state_of("A"), Some(NodeState::Running));

    let step = tracker.handle_outcome("A", NodeOutcome::Completed(DataBag::new()));
    assert_eq!(step.eligible_names(), vec!["B"]);
    assert_eq!(
        step.transitions,
        vec![
            NodeTransition::new("A", NodeState::Running, NodeState::Completed),
            NodeTransition::new("B", NodeState::Blocked, NodeState::Eligible),
        ]
    );

    let step = tracker.handle_outcome("B", NodeOutcome::Completed(DataBag::new()));
    assert_eq!(step.eligible_names(), vec!["C"]);

    let step = tracker.handle_outcome("C", NodeOutcome::Completed(DataBag::new()));
    assert!(step.newly_eligible.is_empty());
    assert!(step.recipe_just_finished);
    assert_eq!(tracker.status(), RecipeStatus::Completed);
    Ok(())
}

#[test]
fn accepted_condition_opens_the_gate() -> TestResult {
    init_tracing();
    let mut tracker = tracker_for(gated_graph(), DataBag::new().with("age", 20i64))?;
    tracker.start();

    let step = tracker.handle_outcome("A", NodeOutcome::Completed(DataBag::new()));
    assert_eq!(tracker.state_of("gate"), Some(NodeState::Completed));
    assert_eq!(step.eligible_names(), vec!["B"]);

    // B sees the gate's accepted output under its own input name.
    let request = &step.newly_eligible[0];
    assert_eq!(request.inputs, DataBag::new().with("AGE", 20i64));

    let gate = tracker.recipe().node("gate").and_then(|n| n.condition());
    assert!(gate.is_some_and(|c| c.is_processed && c.is_accepted));
    Ok(())
}

#[test]
fn rejected_condition_skips_everything_behind_it() -> TestResult {
    init_tracing();
    let graph = GraphBuilder::new()
        .with_json_input("age", "integer", true)
        .job("A", &[])
        .with_node(
            NodeBuilder::condition(
                "gate",
                filter(Combine::All, &[("age", "integer", ">", vec![json!(18)])]),
                &["age"],
            )
            .after("A")
            .build(),
        )
        .job("B", &["gate"])
        .job("C", &["B"])
        .job("D", &["A"])
        .build();
    let mut tracker = tracker_for(graph, DataBag::new().with("age", 15i64))?;
    tracker.start();

    let step = tracker.handle_outcome("A", NodeOutcome::Completed(DataBag::new()));
    assert_eq!(step.eligible_names(), vec!["D"]);
    assert_eq!(tracker.state_of("gate"), Some(NodeState::Completed));
    assert_eq!(tracker.state_of("B"), Some(NodeState::Skipped));
    assert_eq!(tracker.state_of("C"), Some(NodeState::Skipped));

    let gate = tracker.recipe().node("gate");
    assert!(gate.is_some_and(|n| n.outputs.is_none()));

    let step = tracker.handle_outcome("D", NodeOutcome::Completed(DataBag::new()));
    assert!(step.recipe_just_finished);
    assert_eq!(tracker.status(), RecipeStatus::Completed);
    Ok(())
}

#[test]
fn duplicate_outcome_is_a_no_op() -> TestResult {
    init_tracing();
    let mut tracker = tracker_for(chain(&["A", "B"]), DataBag::new())?;
    tracker.start();

    let first = tracker.handle_outcome("A", NodeOutcome::Completed(DataBag::new()));
    assert_eq!(first.eligible_names(), vec!["B"]);

    let second = tracker.handle_outcome("A", NodeOutcome::Completed(DataBag::new()));
    assert!(second.is_empty());

    // A conflicting late report does not overwrite the first outcome.
    let conflicting = tracker.handle_outcome("A", NodeOutcome::Failed("late".into()));
    assert!(conflicting.is_empty());
    assert_eq!(tracker.state_of("A"), Some(NodeState::Completed));
    assert_eq!(tracker.state_of("B"), Some(NodeState::Eligible));
    Ok(())
}

#[test]
fn failure_keeps_dependents_blocked() -> TestResult {
    init_tracing();
    let graph = GraphBuilder::new()
        .job("A", &[])
        .job("B", &["A"])
        .job("C", &[])
        .build();
    let mut tracker = tracker_for(graph, DataBag::new())?;
    tracker.start();

    let step = tracker.handle_outcome("A", NodeOutcome::Failed("boom".into()));
    assert!(step.newly_eligible.is_empty());
    assert_eq!(tracker.state_of("B"), Some(NodeState::Blocked));
    // C is still eligible, so the recipe is not finished yet.
    assert_eq!(tracker.status(), RecipeStatus::Active);

    let step = tracker.handle_outcome("C", NodeOutcome::Completed(DataBag::new()));
    assert!(step.recipe_just_finished);
    assert_eq!(tracker.status(), RecipeStatus::Failed);
    Ok(())
}

#[test]
fn cancel_applies_to_active_nodes_only() -> TestResult {
    init_tracing();
    let mut tracker = tracker_for(chain(&["A", "B"]), DataBag::new())?;
    tracker.start();

    assert!(tracker.cancel("B").is_empty());

    let step = tracker.cancel("A");
    assert_eq!(
        step.transitions,
        vec![NodeTransition::new("A", NodeState::Eligible, NodeState::Canceled)]
    );
    assert!(step.recipe_just_finished);
    assert_eq!(tracker.status(), RecipeStatus::Canceled);

    // An outcome arriving after the cancel is ignored.
    assert!(tracker
        .handle_outcome("A", NodeOutcome::Completed(DataBag::new()))
        .is_empty());
    assert_eq!(tracker.state_of("A"), Some(NodeState::Canceled));
    Ok(())
}

#[test]
fn outcomes_for_blocked_unknown_or_condition_nodes_are_ignored() -> TestResult {
    init_tracing();
    let mut tracker = tracker_for(gated_graph(), DataBag::new().with("age", 20i64))?;
    tracker.start();

    assert!(tracker
        .handle_outcome("B", NodeOutcome::Completed(DataBag::new()))
        .is_empty());
    assert!(tracker
        .handle_outcome("ghost", NodeOutcome::Completed(DataBag::new()))
        .is_empty());
    assert!(tracker
        .handle_outcome("gate", NodeOutcome::Completed(DataBag::new()))
        .is_empty());
    assert_eq!(tracker.state_of("B"), Some(NodeState::Blocked));
    assert_eq!(tracker.state_of("gate"), Some(NodeState::Blocked));
    Ok(())
}

#[test]
fn outcomes_route_by_execution() -> TestResult {
    init_tracing();
    let mut tracker = tracker_for(chain(&["A", "B"]), DataBag::new())?;
    let step = tracker.start();
    let execution = step.newly_eligible[0].execution;

    let step = tracker.handle_execution_outcome(execution, NodeOutcome::Completed(DataBag::new()));
    assert_eq!(step.eligible_names(), vec!["B"]);
    Ok(())
}

#[test]
fn recipe_inputs_are_resolved_for_dispatch() -> TestResult {
    init_tracing();
    let graph = GraphBuilder::new()
        .with_json_input("threshold", "number", true)
        .with_node(NodeBuilder::job("A").recipe_input("LIMIT", "threshold").build())
        .build();
    let mut tracker = tracker_for(graph, DataBag::new().with("threshold", 0.5))?;

    let step = tracker.start();
    assert_eq!(step.newly_eligible.len(), 1);
    assert_eq!(step.newly_eligible[0].inputs, DataBag::new().with("LIMIT", 0.5));
    Ok(())
}

#[test]
fn missing_required_input_fails_materialization() {
    let ids = IdAllocator::new();
    let result = materialize(Arc::new(gated_graph()), DataBag::new(), None, &ids);
    assert!(result.is_err());
}

#[test]
fn root_condition_is_evaluated_on_start() -> TestResult {
    init_tracing();
    let gate = filter(Combine::All, &[("age", "integer", ">", vec![json!(18)])]);
    let graph = GraphBuilder::new()
        .with_json_input("age", "integer", true)
        .with_node(NodeBuilder::condition("gate", gate, &["age"]).build())
        .job("B", &["gate"])
        .build();
    let mut tracker = tracker_for(graph, DataBag::new().with("age", 3i64))?;

    let step = tracker.start();
    assert!(step.newly_eligible.is_empty());
    assert_eq!(tracker.state_of("B"), Some(NodeState::Skipped));
    assert!(step.recipe_just_finished);
    assert_eq!(tracker.status(), RecipeStatus::Completed);
    Ok(())
}
