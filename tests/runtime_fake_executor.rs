// tests/runtime_fake_executor.rs

use std::error::Error;
use std::sync::Arc;

use serde_json::json;
use tokio::task::JoinHandle;

use recipeflow::engine::{self, EngineHandle, EngineStats, NodeEvent, Runtime, RuntimeOptions};
use recipeflow::errors::Result as EngineResult;
use recipeflow::recipe::RecipeId;
use recipeflow::{
    Combine, DataBag, InMemoryFileCatalog, NodeOutcome, NodeState, RecipeGraph, RecipeStatus,
    RecipeflowError,
};
use recipeflow_test_utils::builders::{chain, filter, GraphBuilder, NodeBuilder};
use recipeflow_test_utils::fake_executor::FakeExecutor;
use recipeflow_test_utils::{init_tracing, wait_for_node_state, wait_until_finished, with_timeout};

type TestResult = std::result::Result<(), Box<dyn Error>>;

struct Harness {
    handle: EngineHandle,
    executor: FakeExecutor,
    events: tokio::sync::broadcast::Receiver<NodeEvent>,
    join: JoinHandle<EngineResult<()>>,
}

impl Harness {
    fn start() -> Self {
        Self::start_with(RuntimeOptions::default())
    }

    fn start_with(options: RuntimeOptions) -> Self {
        init_tracing();
        let (handle, rx) = engine::channel(options.queue_capacity);
        let executor = FakeExecutor::new(handle.clone());
        let runtime = Runtime::new(
            options,
            rx,
            Arc::new(InMemoryFileCatalog::new()),
            executor.clone(),
        );
        let events = runtime.subscribe();
        let join = tokio::spawn(runtime.run());
        Self {
            handle,
            executor,
            events,
            join,
        }
    }

    async fn stop(self) -> TestResult {
        self.handle.shutdown().await?;
        self.join.await??;
        Ok(())
    }
}

fn gated_graph() -> Arc<RecipeGraph> {
    let gate = filter(Combine::All, &[("age", "integer", ">", vec![json!(18)])]);
    Arc::new(
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
            .build(),
    )
}

#[tokio::test]
async fn chain_runs_to_completion() -> TestResult {
    let h = Harness::start();

    with_timeout(async {
        let id = h
            .handle
            .submit(Arc::new(chain(&["A", "B", "C"])), DataBag::new())
            .await?;
        let snapshot = wait_until_finished(&h.handle, id).await;

        assert_eq!(snapshot.status, RecipeStatus::Completed);
        assert_eq!(h.executor.dispatched_nodes(), vec!["A", "B", "C"]);
        TestResult::Ok(())
    })
    .await?;

    h.stop().await
}

#[tokio::test]
async fn condition_gates_downstream_work() -> TestResult {
    let h = Harness::start();

    with_timeout(async {
        let open = h
            .handle
            .submit(gated_graph(), DataBag::new().with("age", 20i64))
            .await?;
        let snapshot = wait_until_finished(&h.handle, open).await;
        assert_eq!(snapshot.status, RecipeStatus::Completed);
        assert_eq!(snapshot.recipe.state_of("B"), Some(NodeState::Completed));

        let b = h
            .executor
            .requests()
            .into_iter()
            .find(|r| r.recipe == open && r.node == "B")
            .ok_or("B was not dispatched")?;
        assert_eq!(b.inputs, DataBag::new().with("AGE", 20i64));

        let closed = h
            .handle
            .submit(gated_graph(), DataBag::new().with("age", 15i64))
            .await?;
        let snapshot = wait_until_finished(&h.handle, closed).await;
        assert_eq!(snapshot.status, RecipeStatus::Completed);
        assert_eq!(snapshot.recipe.state_of("B"), Some(NodeState::Skipped));
        assert!(
            !h.executor
                .requests()
                .iter()
                .any(|r| r.recipe == closed && r.node == "B")
        );
        TestResult::Ok(())
    })
    .await?;

    h.stop().await
}

#[tokio::test]
async fn failed_node_fails_the_recipe() -> TestResult {
    let h = Harness::start();
    h.executor.fail("B");

    with_timeout(async {
        let id = h
            .handle
            .submit(Arc::new(chain(&["A", "B", "C"])), DataBag::new())
            .await?;
        let snapshot = wait_until_finished(&h.handle, id).await;

        assert_eq!(snapshot.status, RecipeStatus::Failed);
        assert_eq!(snapshot.recipe.state_of("C"), Some(NodeState::Blocked));
        assert_eq!(h.executor.dispatched_nodes(), vec!["A", "B"]);
        TestResult::Ok(())
    })
    .await?;

    h.stop().await
}

#[tokio::test]
async fn cancel_running_node() -> TestResult {
    let h = Harness::start();
    h.executor.hold("A");

    with_timeout(async {
        let id = h
            .handle
            .submit(Arc::new(chain(&["A", "B"])), DataBag::new())
            .await?;
        wait_for_node_state(&h.handle, id, "A", NodeState::Running).await;

        h.handle.cancel(id, "A").await?;
        let snapshot = wait_until_finished(&h.handle, id).await;
        assert_eq!(snapshot.status, RecipeStatus::Canceled);
        assert_eq!(snapshot.recipe.state_of("B"), Some(NodeState::Blocked));
        TestResult::Ok(())
    })
    .await?;

    h.stop().await
}

#[tokio::test]
async fn supersede_while_a_node_is_running() -> TestResult {
    let h = Harness::start();
    h.executor.hold("B");

    let v1_graph = Arc::new(chain(&["A", "B", "C"]));
    let v2_graph = Arc::new(
        GraphBuilder::new()
            .job("A", &[])
            .job("B", &["A"])
            .with_node(NodeBuilder::job_revision("C", 2).after("B").build())
            .build(),
    );

    with_timeout(async {
        let v1 = h.handle.submit(v1_graph, DataBag::new()).await?;
        let running = wait_for_node_state(&h.handle, v1, "B", NodeState::Running).await;
        let b_exec = running
            .recipe
            .node("B")
            .and_then(|n| n.execution())
            .ok_or("B has no execution")?;

        let v2 = h.handle.supersede(v1, v2_graph, DataBag::new()).await?;
        assert_ne!(v1, v2);

        let old = h.handle.snapshot(v1).await?;
        assert_eq!(old.status, RecipeStatus::Superseded);
        assert_eq!(old.recipe.superseded_by(), Some(v2));

        // The held execution now reports into the superseding recipe.
        h.handle
            .report(b_exec, NodeOutcome::Completed(DataBag::new()))
            .await?;
        let snapshot = wait_until_finished(&h.handle, v2).await;
        assert_eq!(snapshot.status, RecipeStatus::Completed);
        assert!(snapshot.recipe.node("B").is_some_and(|n| n.is_original));
        assert_eq!(snapshot.recipe.superseded_recipe(), Some(v1));

        // A and B ran once; only the changed C ran again, for v2.
        let requests = h.executor.requests();
        let nodes: Vec<(RecipeId, &str)> =
            requests.iter().map(|r| (r.recipe, r.node.as_str())).collect();
        assert_eq!(nodes, vec![(v1, "A"), (v1, "B"), (v2, "C")]);
        TestResult::Ok(())
    })
    .await?;

    h.stop().await
}

#[tokio::test]
async fn node_events_are_published() -> TestResult {
    let mut h = Harness::start();

    with_timeout(async {
        let id = h
            .handle
            .submit(Arc::new(chain(&["A"])), DataBag::new())
            .await?;
        wait_until_finished(&h.handle, id).await;

        let mut seen = Vec::new();
        while let Ok(event) = h.events.try_recv() {
            assert_eq!(event.recipe, id);
            seen.push((event.node, event.from, event.to));
        }
        assert_eq!(
            seen,
            vec![
                ("A".to_string(), NodeState::Blocked, NodeState::Eligible),
                ("A".to_string(), NodeState::Eligible, NodeState::Running),
                ("A".to_string(), NodeState::Running, NodeState::Completed),
            ]
        );
        TestResult::Ok(())
    })
    .await?;

    h.stop().await
}

#[tokio::test]
async fn unknown_recipe_is_reported() -> TestResult {
    let h = Harness::start();

    let result = with_timeout(h.handle.snapshot(RecipeId(999))).await;
    assert!(matches!(result, Err(RecipeflowError::UnknownRecipe(RecipeId(999)))));

    let result = with_timeout(h.handle.supersede(
        RecipeId(999),
        Arc::new(chain(&["A"])),
        DataBag::new(),
    ))
    .await;
    assert!(matches!(result, Err(RecipeflowError::UnknownRecipe(_))));

    h.stop().await
}

#[tokio::test]
async fn invalid_input_is_rejected_on_submit() -> TestResult {
    let h = Harness::start();

    let result = with_timeout(h.handle.submit(gated_graph(), DataBag::new())).await;
    assert!(matches!(result, Err(RecipeflowError::InvalidInput(_))));

    h.stop().await
}

#[tokio::test]
async fn handle_fails_after_shutdown() -> TestResult {
    let h = Harness::start();
    let handle = h.handle.clone();
    h.stop().await?;

    let result = handle.submit(Arc::new(chain(&["A"])), DataBag::new()).await;
    assert!(matches!(result, Err(RecipeflowError::EngineStopped)));
    Ok(())
}

/// Poll until no recipe actor is left alive.
async fn wait_until_idle(handle: &EngineHandle) -> EngineStats {
    loop {
        let stats = handle.stats().await.expect("stats failed");
        if stats.live_recipes == 0 {
            return stats;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn finished_recipes_are_retired() -> TestResult {
    let h = Harness::start();

    with_timeout(async {
        let id = h
            .handle
            .submit(Arc::new(chain(&["A", "B", "C"])), DataBag::new())
            .await?;
        wait_until_finished(&h.handle, id).await;

        let stats = wait_until_idle(&h.handle).await;
        assert_eq!(stats.routes, 0);
        assert_eq!(stats.retained_recipes, 1);

        // The final state is still available after the actor is gone.
        let snapshot = h.handle.snapshot(id).await?;
        assert_eq!(snapshot.status, RecipeStatus::Completed);
        TestResult::Ok(())
    })
    .await?;

    h.stop().await
}

#[tokio::test]
async fn retired_recipe_can_be_superseded() -> TestResult {
    let h = Harness::start();
    let v2_graph = Arc::new(
        GraphBuilder::new()
            .job("A", &[])
            .job("B", &["A"])
            .with_node(NodeBuilder::job_revision("C", 2).after("B").build())
            .build(),
    );

    with_timeout(async {
        let v1 = h
            .handle
            .submit(Arc::new(chain(&["A", "B", "C"])), DataBag::new())
            .await?;
        wait_until_finished(&h.handle, v1).await;
        wait_until_idle(&h.handle).await;

        let v2 = h.handle.supersede(v1, v2_graph, DataBag::new()).await?;
        let snapshot = wait_until_finished(&h.handle, v2).await;
        assert_eq!(snapshot.status, RecipeStatus::Completed);
        assert_eq!(h.handle.snapshot(v1).await?.status, RecipeStatus::Superseded);

        let requests = h.executor.requests();
        let nodes: Vec<(RecipeId, &str)> =
            requests.iter().map(|r| (r.recipe, r.node.as_str())).collect();
        assert_eq!(nodes, vec![(v1, "A"), (v1, "B"), (v1, "C"), (v2, "C")]);

        let stats = wait_until_idle(&h.handle).await;
        assert_eq!(stats.retained_recipes, 2);
        TestResult::Ok(())
    })
    .await?;

    h.stop().await
}

#[tokio::test]
async fn finished_history_is_bounded() -> TestResult {
    let h = Harness::start_with(RuntimeOptions {
        finished_history: 1,
        ..RuntimeOptions::default()
    });

    with_timeout(async {
        let first = h
            .handle
            .submit(Arc::new(chain(&["A"])), DataBag::new())
            .await?;
        wait_until_finished(&h.handle, first).await;
        wait_until_idle(&h.handle).await;

        let second = h
            .handle
            .submit(Arc::new(chain(&["A"])), DataBag::new())
            .await?;
        wait_until_finished(&h.handle, second).await;
        let stats = wait_until_idle(&h.handle).await;
        assert_eq!(stats.retained_recipes, 1);

        assert!(matches!(
            h.handle.snapshot(first).await,
            Err(RecipeflowError::UnknownRecipe(_))
        ));
        assert_eq!(h.handle.snapshot(second).await?.status, RecipeStatus::Completed);
        TestResult::Ok(())
    })
    .await?;

    h.stop().await
}

#[tokio::test]
async fn refused_dispatch_fails_the_nodes() -> TestResult {
    let h = Harness::start();
    h.executor.reject("B");

    with_timeout(async {
        let graph = GraphBuilder::new()
            .job("A", &[])
            .job("B", &["A"])
            .job("C", &["B"])
            .build();
        let id = h.handle.submit(Arc::new(graph), DataBag::new()).await?;
        let snapshot = wait_until_finished(&h.handle, id).await;

        assert_eq!(snapshot.status, RecipeStatus::Failed);
        assert_eq!(snapshot.recipe.state_of("A"), Some(NodeState::Completed));
        assert_eq!(snapshot.recipe.state_of("B"), Some(NodeState::Failed));
        assert_eq!(snapshot.recipe.state_of("C"), Some(NodeState::Blocked));
        assert_eq!(h.executor.dispatched_nodes(), vec!["A"]);

        let stats = wait_until_idle(&h.handle).await;
        assert_eq!(stats.routes, 0);
        TestResult::Ok(())
    })
    .await?;

    h.stop().await
}
