use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use recipeflow::dag::{DispatchRequest, NodeOutcome};
use recipeflow::engine::EngineHandle;
use recipeflow::errors::Result;
use recipeflow::exec::ExecutorBackend;
use recipeflow::DataBag;

/// A fake executor that:
/// - records which nodes were dispatched
/// - reports an outcome for each of them from a spawned task (so the
///   dispatching actor never waits on the engine channel)
///
/// Nodes marked with [`FakeExecutor::hold`] are left running; nodes marked
/// with [`FakeExecutor::fail`] report `Failed`; everything else completes
/// with the outputs registered through [`FakeExecutor::outputs`] (or none).
/// A batch containing a node marked with [`FakeExecutor::reject`] is
/// refused as a whole and nothing in it is recorded.
#[derive(Clone)]
pub struct FakeExecutor {
    handle: EngineHandle,
    dispatched: Arc<Mutex<Vec<DispatchRequest>>>,
    outputs: Arc<Mutex<HashMap<String, DataBag>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    held: Arc<Mutex<HashSet<String>>>,
    rejected: Arc<Mutex<HashSet<String>>>,
}

impl FakeExecutor {
    pub fn new(handle: EngineHandle) -> Self {
        Self {
            handle,
            dispatched: Arc::new(Mutex::new(Vec::new())),
            outputs: Arc::new(Mutex::new(HashMap::new())),
            failing: Arc::new(Mutex::new(HashSet::new())),
            held: Arc::new(Mutex::new(HashSet::new())),
            rejected: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn outputs(&self, node: &str, bag: DataBag) -> &Self {
        self.outputs.lock().unwrap().insert(node.to_string(), bag);
        self
    }

    pub fn fail(&self, node: &str) -> &Self {
        self.failing.lock().unwrap().insert(node.to_string());
        self
    }

    pub fn hold(&self, node: &str) -> &Self {
        self.held.lock().unwrap().insert(node.to_string());
        self
    }

    pub fn reject(&self, node: &str) -> &Self {
        self.rejected.lock().unwrap().insert(node.to_string());
        self
    }

    /// Names of dispatched nodes, in dispatch order.
    pub fn dispatched_nodes(&self) -> Vec<String> {
        self.dispatched
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.node.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<DispatchRequest> {
        self.dispatched.lock().unwrap().clone()
    }
}

impl ExecutorBackend for FakeExecutor {
    fn dispatch(
        &self,
        requests: Vec<DispatchRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            {
                let rejected = self.rejected.lock().unwrap();
                if let Some(r) = requests.iter().find(|r| rejected.contains(&r.node)) {
                    return Err(anyhow::anyhow!("executor refused {}", r.node).into());
                }
            }

            let mut reports = Vec::new();
            for request in requests {
                let node = request.node.clone();
                let execution = request.execution;
                self.dispatched.lock().unwrap().push(request);

                if self.held.lock().unwrap().contains(&node) {
                    continue;
                }
                let outcome = if self.failing.lock().unwrap().contains(&node) {
                    NodeOutcome::Failed(format!("{node} failed"))
                } else {
                    let outputs = self
                        .outputs
                        .lock()
                        .unwrap()
                        .get(&node)
                        .cloned()
                        .unwrap_or_default();
                    NodeOutcome::Completed(outputs)
                };
                reports.push((execution, outcome));
            }

            let handle = self.handle.clone();
            tokio::spawn(async move {
                for (execution, outcome) in reports {
                    let _ = handle.report(execution, outcome).await;
                }
            });
            Ok(())
        })
    }
}
