// src/engine/handle.rs

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::dag::{NodeOutcome, RecipeGraph};
use crate::data::DataBag;
use crate::engine::{EngineEvent, EngineStats, RecipeSnapshot};
use crate::errors::{RecipeflowError, Result};
use crate::recipe::{ExecutionRef, RecipeId};

/// Create the engine event channel.
pub fn channel(capacity: usize) -> (EngineHandle, mpsc::Receiver<EngineEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EngineHandle { tx }, rx)
}

/// Cloneable client of a running [`crate::engine::Runtime`].
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineEvent>,
}

impl EngineHandle {
    /// Materialize a recipe for `graph` against `input` and start it.
    pub async fn submit(&self, graph: Arc<RecipeGraph>, input: DataBag) -> Result<RecipeId> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineEvent::Submit { graph, input, reply }).await?;
        rx.await.map_err(|_| RecipeflowError::EngineStopped)?
    }

    /// Supersede `recipe`; returns the id of the new instance.
    pub async fn supersede(
        &self,
        recipe: RecipeId,
        graph: Arc<RecipeGraph>,
        input: DataBag,
    ) -> Result<RecipeId> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineEvent::Supersede {
            recipe,
            graph,
            input,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RecipeflowError::EngineStopped)?
    }

    /// Report a terminal outcome for an execution. Duplicates are harmless.
    pub async fn report(&self, execution: ExecutionRef, outcome: NodeOutcome) -> Result<()> {
        self.send(EngineEvent::NodeOutcome { execution, outcome })
            .await
    }

    pub async fn cancel(&self, recipe: RecipeId, node: impl Into<String>) -> Result<()> {
        self.send(EngineEvent::Cancel {
            recipe,
            node: node.into(),
        })
        .await
    }

    pub async fn snapshot(&self, recipe: RecipeId) -> Result<RecipeSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineEvent::Snapshot { recipe, reply }).await?;
        rx.await
            .map_err(|_| RecipeflowError::EngineStopped)?
            .ok_or(RecipeflowError::UnknownRecipe(recipe))
    }

    pub async fn stats(&self) -> Result<EngineStats> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineEvent::Stats { reply }).await?;
        rx.await.map_err(|_| RecipeflowError::EngineStopped)
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(EngineEvent::Shutdown).await
    }

    async fn send(&self, event: EngineEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| RecipeflowError::EngineStopped)
    }
}
