pub mod builders;
pub mod fake_executor;

use std::sync::Once;
use std::time::Duration;

use recipeflow::dag::NodeState;
use recipeflow::engine::{EngineHandle, RecipeSnapshot};
use recipeflow::RecipeId;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Poll a recipe until its status is no longer `Active`.
pub async fn wait_until_finished(handle: &EngineHandle, recipe: RecipeId) -> RecipeSnapshot {
    loop {
        let snapshot = handle.snapshot(recipe).await.expect("snapshot failed");
        if snapshot.status.is_finished() {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Poll a recipe until `node` reaches `state`.
pub async fn wait_for_node_state(
    handle: &EngineHandle,
    recipe: RecipeId,
    node: &str,
    state: NodeState,
) -> RecipeSnapshot {
    loop {
        let snapshot = handle.snapshot(recipe).await.expect("snapshot failed");
        if snapshot.recipe.state_of(node) == Some(state) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
