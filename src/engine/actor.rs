// src/engine/actor.rs

//! One task per recipe instance.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info};

use crate::dag::{NodeName, NodeOutcome, NodeState, RecipeGraph, RecipeTracker, TrackerStep};
use crate::data::DataBag;
use crate::engine::{NodeEvent, RecipeSnapshot};
use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::recipe::{supersede, ExecutionRef, IdAllocator, Recipe, RecipeId};

/// Commands the router sends to a recipe actor.
#[derive(Debug)]
pub enum ActorCommand {
    Outcome {
        execution: ExecutionRef,
        outcome: NodeOutcome,
    },
    Cancel(NodeName),
    Snapshot(oneshot::Sender<RecipeSnapshot>),
    /// Build the superseding recipe from this one's current state.
    Supersede {
        graph: Arc<RecipeGraph>,
        input: DataBag,
        ids: Arc<IdAllocator>,
        reply: oneshot::Sender<Result<Recipe>>,
    },
    /// Hand back the final state and stop.
    Retire(oneshot::Sender<RecipeSnapshot>),
}

/// Owns a [`RecipeTracker`]; every mutation of the instance happens here.
///
/// Once the instance is settled (finished, or superseded with no
/// executions of its own left outstanding) the actor tells the router on
/// `settled` and keeps serving until it is retired.
pub struct RecipeActor<E: ExecutorBackend> {
    tracker: RecipeTracker,
    commands: mpsc::Receiver<ActorCommand>,
    executor: Arc<E>,
    events: broadcast::Sender<NodeEvent>,
    settled: mpsc::UnboundedSender<RecipeId>,
    announced: bool,
    /// Executions now owned by the superseding recipe.
    handed_over: Option<HashSet<ExecutionRef>>,
}

impl<E: ExecutorBackend> RecipeActor<E> {
    pub fn new(
        tracker: RecipeTracker,
        commands: mpsc::Receiver<ActorCommand>,
        executor: Arc<E>,
        events: broadcast::Sender<NodeEvent>,
        settled: mpsc::UnboundedSender<RecipeId>,
    ) -> Self {
        Self {
            tracker,
            commands,
            executor,
            events,
            settled,
            announced: false,
            handed_over: None,
        }
    }

    /// Start the recipe, then serve commands until retired or until the
    /// router drops the sending side.
    pub async fn run(mut self) {
        let id = self.tracker.id();
        debug!(recipe = %id, "recipe actor started");

        let step = self.tracker.start();
        self.apply(step).await;
        self.announce_if_settled();

        while let Some(command) = self.commands.recv().await {
            match command {
                ActorCommand::Outcome { execution, outcome } => {
                    let step = self.tracker.handle_execution_outcome(execution, outcome);
                    self.apply(step).await;
                }
                ActorCommand::Cancel(node) => {
                    let step = self.tracker.cancel(&node);
                    self.apply(step).await;
                }
                ActorCommand::Snapshot(reply) => {
                    let _ = reply.send(self.snapshot());
                }
                ActorCommand::Supersede {
                    graph,
                    input,
                    ids,
                    reply,
                } => {
                    let result = supersede(self.tracker.recipe_mut(), graph, input, &ids);
                    if let Ok(newer) = &result {
                        info!(recipe = %id, superseded_by = %newer.id(), "recipe superseded");
                        self.handed_over = Some(newer.executions().collect());
                    }
                    let _ = reply.send(result);
                }
                ActorCommand::Retire(reply) => {
                    let _ = reply.send(self.snapshot());
                    break;
                }
            }
            self.announce_if_settled();
        }

        debug!(recipe = %id, status = %self.tracker.status(), "recipe actor stopped");
    }

    fn snapshot(&self) -> RecipeSnapshot {
        RecipeSnapshot {
            recipe: self.tracker.recipe().clone(),
            status: self.tracker.status(),
        }
    }

    /// Nothing can change this instance any more.
    fn is_settled(&self) -> bool {
        match &self.handed_over {
            None => self.tracker.status().is_finished(),
            Some(carried) => !self.tracker.recipe().nodes().any(|n| {
                n.state.is_active() && n.execution().is_some_and(|e| !carried.contains(&e))
            }),
        }
    }

    fn announce_if_settled(&mut self) {
        if self.announced || !self.is_settled() {
            return;
        }
        self.announced = true;
        let id = self.tracker.id();
        debug!(recipe = %id, status = %self.tracker.status(), "recipe settled");
        // The router only goes away on shutdown.
        let _ = self.settled.send(id);
    }

    /// Publish transitions and hand newly eligible nodes to the executor.
    ///
    /// Nodes the executor refuses are failed, so the instance can still
    /// finish.
    async fn apply(&mut self, step: TrackerStep) {
        let recipe = self.tracker.id();
        let mut pending = VecDeque::from([step]);

        while let Some(step) = pending.pop_front() {
            self.publish(&step);

            if !step.newly_eligible.is_empty() {
                let names = step.eligible_names().join(", ");
                debug!(recipe = %recipe, nodes = %names, "dispatching eligible nodes");

                let nodes: Vec<NodeName> =
                    step.newly_eligible.iter().map(|r| r.node.clone()).collect();
                match self.executor.dispatch(step.newly_eligible).await {
                    Ok(()) => {
                        for node in nodes {
                            let ack = self.tracker.handle_dispatched(&node);
                            self.publish(&ack);
                        }
                    }
                    Err(e) => {
                        error!(recipe = %recipe, nodes = %names, error = %e, "executor rejected dispatch; failing nodes");
                        let reason = format!("dispatch rejected: {e}");
                        for node in nodes {
                            if self.tracker.state_of(&node) == Some(NodeState::Eligible) {
                                pending.push_back(
                                    self.tracker
                                        .handle_outcome(&node, NodeOutcome::Failed(reason.clone())),
                                );
                            }
                        }
                    }
                }
            }

            if step.recipe_just_finished {
                info!(recipe = %recipe, status = %self.tracker.status(), "recipe finished");
            }
        }
    }

    fn publish(&self, step: &TrackerStep) {
        let recipe = self.tracker.id();
        for t in step.transitions.iter() {
            // No subscribers is fine.
            let _ = self.events.send(NodeEvent {
                recipe,
                node: t.node.clone(),
                from: t.from,
                to: t.to,
            });
        }
    }
}
