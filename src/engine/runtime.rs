// src/engine/runtime.rs

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::catalog::FileCatalog;
use crate::dag::{RecipeGraph, RecipeStatus, RecipeTracker};
use crate::data::DataBag;
use crate::errors::{RecipeflowError, Result};
use crate::exec::ExecutorBackend;
use crate::recipe::{materialize, supersede, IdAllocator, Recipe, RecipeId};

use super::actor::{ActorCommand, RecipeActor};
use super::core::EngineCore;
use super::{EngineEvent, EngineStats, NodeEvent, RecipeSnapshot, RuntimeOptions};

/// Command sender and task of a live recipe actor.
struct ActorSlot {
    commands: mpsc::Sender<ActorCommand>,
    task: JoinHandle<()>,
}

/// Router between clients, executor, and recipe actors.
///
/// Owns the routing core and one command sender per recipe actor. Events
/// are handled one at a time, so a supersession is fully registered before
/// the next executor outcome is routed.
///
/// Settled recipes are retired: their actor stops, their routes are
/// dropped, and their final snapshot joins a bounded history.
pub struct Runtime<E: ExecutorBackend + 'static> {
    core: EngineCore,
    event_rx: mpsc::Receiver<EngineEvent>,
    settled_tx: mpsc::UnboundedSender<RecipeId>,
    settled_rx: mpsc::UnboundedReceiver<RecipeId>,
    executor: Arc<E>,
    catalog: Arc<dyn FileCatalog>,
    ids: Arc<IdAllocator>,
    options: RuntimeOptions,
    events: broadcast::Sender<NodeEvent>,
    actors: HashMap<RecipeId, ActorSlot>,
    finished: HashMap<RecipeId, RecipeSnapshot>,
    finished_order: VecDeque<RecipeId>,
}

impl<E: ExecutorBackend + 'static> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("options", &self.options)
            .field("actors", &self.actors.len())
            .field("finished", &self.finished.len())
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend + 'static> Runtime<E> {
    pub fn new(
        options: RuntimeOptions,
        event_rx: mpsc::Receiver<EngineEvent>,
        catalog: Arc<dyn FileCatalog>,
        executor: E,
    ) -> Self {
        let (events, _) = broadcast::channel(options.event_capacity);
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        Self {
            core: EngineCore::new(),
            event_rx,
            settled_tx,
            settled_rx,
            executor: Arc::new(executor),
            catalog,
            ids: Arc::new(IdAllocator::new()),
            options,
            events,
            actors: HashMap::new(),
            finished: HashMap::new(),
            finished_order: VecDeque::new(),
        }
    }

    /// Receive every node state change from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.events.subscribe()
    }

    /// Main event loop.
    ///
    /// Runs until a `Shutdown` event arrives or every handle is dropped,
    /// then stops all actors.
    pub async fn run(mut self) -> Result<()> {
        info!("recipeflow runtime started");

        loop {
            let event = tokio::select! {
                Some(recipe) = self.settled_rx.recv() => {
                    self.retire(recipe).await;
                    continue;
                }
                event = self.event_rx.recv() => match event {
                    Some(e) => e,
                    None => {
                        info!("engine event channel closed; exiting");
                        break;
                    }
                },
            };

            debug!(?event, "runtime received event");

            match event {
                EngineEvent::Submit { graph, input, reply } => {
                    let result = self.submit(graph, input);
                    let _ = reply.send(result);
                }
                EngineEvent::Supersede {
                    recipe,
                    graph,
                    input,
                    reply,
                } => {
                    let result = self.supersede(recipe, graph, input).await;
                    let _ = reply.send(result);
                }
                EngineEvent::NodeOutcome { execution, outcome } => {
                    let Some(recipe) = self.core.route(execution) else {
                        warn!(%execution, "outcome for unknown execution; ignoring");
                        continue;
                    };
                    self.forward(recipe, ActorCommand::Outcome { execution, outcome })
                        .await;
                }
                EngineEvent::Cancel { recipe, node } => {
                    if self.finished.contains_key(&recipe) {
                        debug!(recipe = %recipe, node = %node, "cancel for finished recipe; ignoring");
                        continue;
                    }
                    self.forward(recipe, ActorCommand::Cancel(node)).await;
                }
                EngineEvent::Snapshot { recipe, reply } => {
                    if let Some(snapshot) = self.finished.get(&recipe) {
                        let _ = reply.send(Some(snapshot.clone()));
                        continue;
                    }
                    let (tx, rx) = oneshot::channel();
                    if self.forward(recipe, ActorCommand::Snapshot(tx)).await {
                        let _ = reply.send(rx.await.ok());
                    } else {
                        let _ = reply.send(None);
                    }
                }
                EngineEvent::Stats { reply } => {
                    let _ = reply.send(self.stats());
                }
                EngineEvent::Shutdown => {
                    info!("shutdown requested; stopping runtime");
                    break;
                }
            }
        }

        self.stop_actors().await;
        info!("runtime exiting");
        Ok(())
    }

    fn submit(&mut self, graph: Arc<RecipeGraph>, input: DataBag) -> Result<RecipeId> {
        let recipe = materialize(graph, input, None, &self.ids)?;
        Ok(self.spawn_actor(recipe))
    }

    async fn supersede(
        &mut self,
        recipe: RecipeId,
        graph: Arc<RecipeGraph>,
        input: DataBag,
    ) -> Result<RecipeId> {
        if let Some(snapshot) = self.finished.get_mut(&recipe) {
            let newer = supersede(&mut snapshot.recipe, graph, input, &self.ids)?;
            snapshot.status = RecipeStatus::Superseded;
            info!(recipe = %recipe, superseded_by = %newer.id(), "finished recipe superseded");
            return Ok(self.spawn_actor(newer));
        }

        let Some(slot) = self.actors.get(&recipe) else {
            return Err(RecipeflowError::UnknownRecipe(recipe));
        };

        let (reply, rx) = oneshot::channel();
        slot.commands.send(ActorCommand::Supersede {
            graph,
            input,
            ids: Arc::clone(&self.ids),
            reply,
        })
        .await
        .map_err(|_| RecipeflowError::EngineStopped)?;

        let newer = rx.await.map_err(|_| RecipeflowError::EngineStopped)??;
        Ok(self.spawn_actor(newer))
    }

    /// Register the recipe's routes and start its actor.
    fn spawn_actor(&mut self, recipe: Recipe) -> RecipeId {
        let id = recipe.id();
        let repointed = self.core.register(&recipe);
        if repointed > 0 {
            debug!(recipe = %id, repointed, "executions carried over to new recipe");
        }

        let (tx, rx) = mpsc::channel(self.options.instance_queue_capacity);
        let tracker = RecipeTracker::new(recipe, Arc::clone(&self.catalog));
        let actor = RecipeActor::new(
            tracker,
            rx,
            Arc::clone(&self.executor),
            self.events.clone(),
            self.settled_tx.clone(),
        );

        let task = tokio::spawn(actor.run());
        self.actors.insert(id, ActorSlot { commands: tx, task });
        info!(recipe = %id, "recipe started");
        id
    }

    /// Stop a settled recipe's actor, drop its routes, and keep its final
    /// snapshot.
    async fn retire(&mut self, recipe: RecipeId) {
        let Some(slot) = self.actors.remove(&recipe) else {
            return;
        };

        // Commands queued before this one are served first.
        let (reply, rx) = oneshot::channel();
        let snapshot = match slot.commands.send(ActorCommand::Retire(reply)).await {
            Ok(()) => rx.await.ok(),
            Err(_) => None,
        };
        drop(slot.commands);
        if let Err(e) = slot.task.await {
            warn!(recipe = %recipe, error = %e, "recipe actor task failed");
        }

        let routes = self.core.retire(recipe);
        match snapshot {
            Some(snapshot) => {
                info!(recipe = %recipe, status = %snapshot.status, routes, "recipe retired");
                self.remember(snapshot);
            }
            None => warn!(recipe = %recipe, "recipe actor gone before retirement"),
        }
    }

    fn remember(&mut self, snapshot: RecipeSnapshot) {
        let id = snapshot.recipe.id();
        if self.finished.insert(id, snapshot).is_none() {
            self.finished_order.push_back(id);
        }
        while self.finished_order.len() > self.options.finished_history {
            if let Some(oldest) = self.finished_order.pop_front() {
                self.finished.remove(&oldest);
                debug!(recipe = %oldest, "dropped from finished history");
            }
        }
    }

    fn stats(&self) -> EngineStats {
        EngineStats {
            live_recipes: self.actors.len(),
            retained_recipes: self.finished.len(),
            routes: self.core.route_count(),
        }
    }

    /// Send a command to a recipe's actor. Returns `false` if there is none.
    async fn forward(&self, recipe: RecipeId, command: ActorCommand) -> bool {
        let Some(slot) = self.actors.get(&recipe) else {
            warn!(recipe = %recipe, "no such recipe; dropping command");
            return false;
        };
        if slot.commands.send(command).await.is_err() {
            warn!(recipe = %recipe, "recipe actor gone; dropping command");
            return false;
        }
        true
    }

    async fn stop_actors(&mut self) {
        // Dropping the senders ends each actor's command loop.
        for (recipe, slot) in self.actors.drain() {
            drop(slot.commands);
            if let Err(e) = slot.task.await {
                warn!(recipe = %recipe, error = %e, "recipe actor task failed");
            }
        }
    }
}
