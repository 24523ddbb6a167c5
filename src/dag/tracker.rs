// src/dag/tracker.rs

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::catalog::FileCatalog;
use crate::dag::node_state::{NodeOutcome, NodeState, NodeTransition, RecipeStatus};
use crate::dag::state_manager::{derive_status, ReadOnlyStateManager, StateManager};
use crate::dag::tracker_step::{DispatchRequest, TrackerStep};
use crate::recipe::{ExecutionRef, Recipe, RecipeId};

/// Owns one recipe instance and moves its nodes through their lifecycle.
///
/// It is responsible for:
/// - deciding which nodes are eligible (dependencies satisfied, gates open)
/// - evaluating conditions as soon as they become eligible
/// - consuming terminal outcomes reported by the executor, idempotently
/// - deriving the overall recipe status
///
/// All mutation goes through `&mut self`, so a tracker owned by a single
/// task serialises every transition of its instance.
pub struct RecipeTracker {
    recipe: Recipe,
    catalog: Arc<dyn FileCatalog>,
}

impl fmt::Debug for RecipeTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecipeTracker")
            .field("recipe", &self.recipe.id())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl RecipeTracker {
    pub fn new(recipe: Recipe, catalog: Arc<dyn FileCatalog>) -> Self {
        Self { recipe, catalog }
    }

    pub fn id(&self) -> RecipeId {
        self.recipe.id()
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub(crate) fn recipe_mut(&mut self) -> &mut Recipe {
        &mut self.recipe
    }

    pub fn into_recipe(self) -> Recipe {
        self.recipe
    }

    pub fn state_of(&self, node: &str) -> Option<NodeState> {
        self.recipe.state_of(node)
    }

    pub fn status(&self) -> RecipeStatus {
        if self.recipe.is_superseded() {
            return RecipeStatus::Superseded;
        }
        derive_status(&self.recipe.nodes)
    }

    /// Initial propagation: roots (and anything already satisfied by
    /// carried-over nodes) become eligible.
    pub fn start(&mut self) -> TrackerStep {
        debug!(recipe = %self.recipe.id(), "starting recipe tracker");
        let before = self.status();
        self.step(Vec::new(), before)
    }

    /// The executor accepted an eligible node: `Eligible -> Running`.
    pub fn handle_dispatched(&mut self, node: &str) -> TrackerStep {
        let mut transitions = Vec::new();
        match self.recipe.node_mut(node) {
            Some(n) if n.state == NodeState::Eligible => {
                n.state = NodeState::Running;
                transitions.push(NodeTransition::new(node, NodeState::Eligible, NodeState::Running));
            }
            Some(n) => {
                debug!(node = %node, state = %n.state, "dispatch ack for non-eligible node; ignoring");
            }
            None => warn!(node = %node, "dispatch ack for unknown node; ignoring"),
        }

        TrackerStep {
            newly_eligible: Vec::new(),
            transitions,
            recipe_just_finished: false,
        }
    }

    /// Outcome reported for one of this recipe's executions.
    pub fn handle_execution_outcome(
        &mut self,
        execution: ExecutionRef,
        outcome: NodeOutcome,
    ) -> TrackerStep {
        let node = self
            .recipe
            .node_for_execution(execution)
            .map(|n| n.node_name.clone());
        match node {
            Some(name) => self.handle_outcome(&name, outcome),
            None => {
                warn!(recipe = %self.recipe.id(), %execution, "outcome for unknown execution; ignoring");
                TrackerStep::default()
            }
        }
    }

    /// Record a terminal outcome for a job or sub-recipe node.
    ///
    /// Only `Eligible` and `Running` nodes accept an outcome; a second report
    /// for a node that is already terminal is a no-op, so duplicate delivery
    /// never triggers dependents twice.
    pub fn handle_outcome(&mut self, node: &str, outcome: NodeOutcome) -> TrackerStep {
        let before = self.status();
        let recipe_id = self.recipe.id();

        let Some(n) = self.recipe.node_mut(node) else {
            warn!(recipe = %recipe_id, node = %node, "outcome for unknown node; ignoring");
            return TrackerStep::default();
        };

        if n.condition().is_some() {
            warn!(recipe = %recipe_id, node = %node, "conditions are evaluated internally; ignoring outcome");
            return TrackerStep::default();
        }

        let from = n.state;
        let to = outcome.target_state();
        match from {
            NodeState::Eligible | NodeState::Running => {}
            s if s.is_terminal() => {
                if s != to {
                    warn!(
                        recipe = %recipe_id,
                        node = %node,
                        recorded = %s,
                        reported = %to,
                        "conflicting outcome for terminal node; keeping first"
                    );
                } else {
                    debug!(recipe = %recipe_id, node = %node, "duplicate outcome; ignoring");
                }
                return TrackerStep::default();
            }
            _ => {
                warn!(recipe = %recipe_id, node = %node, state = %from, "outcome for blocked node; ignoring");
                return TrackerStep::default();
            }
        }

        n.state = to;
        match outcome {
            NodeOutcome::Completed(outputs) => {
                n.outputs = Some(outputs);
                debug!(recipe = %recipe_id, node = %node, "node completed");
            }
            NodeOutcome::Failed(reason) => {
                warn!(recipe = %recipe_id, node = %node, %reason, "node failed; dependents stay blocked");
            }
            NodeOutcome::Canceled => {
                info!(recipe = %recipe_id, node = %node, "node canceled");
            }
        }

        self.step(vec![NodeTransition::new(node, from, to)], before)
    }

    /// External cancel: applies to eligible or running nodes only.
    pub fn cancel(&mut self, node: &str) -> TrackerStep {
        let before = self.status();

        let transition = match self.recipe.node_mut(node) {
            Some(n) if n.state.is_active() => {
                let from = n.state;
                n.state = NodeState::Canceled;
                NodeTransition::new(node, from, NodeState::Canceled)
            }
            Some(n) => {
                debug!(node = %node, state = %n.state, "cancel for inactive node; ignoring");
                return TrackerStep::default();
            }
            None => {
                warn!(node = %node, "cancel for unknown node; ignoring");
                return TrackerStep::default();
            }
        };

        info!(recipe = %self.recipe.id(), node = %node, "node canceled on request");
        self.step(vec![transition], before)
    }

    /// Propagate (unless superseded), collect eligible dispatches, and work
    /// out whether this step finished the recipe.
    fn step(&mut self, mut transitions: Vec<NodeTransition>, before: RecipeStatus) -> TrackerStep {
        if self.recipe.is_superseded() {
            debug!(recipe = %self.recipe.id(), "recipe superseded; not propagating");
        } else {
            let recipe = &mut self.recipe;
            let mut manager = StateManager::new(&recipe.graph, &mut recipe.nodes, &recipe.input);
            transitions.extend(manager.propagate(self.catalog.as_ref()));
        }

        let newly_eligible = self.dispatch_requests(&transitions);

        let after = self.status();
        let recipe_just_finished = !before.is_finished() && after.is_finished();
        if recipe_just_finished {
            info!(recipe = %self.recipe.id(), status = %after, "recipe finished");
        }

        TrackerStep {
            newly_eligible,
            transitions,
            recipe_just_finished,
        }
    }

    fn dispatch_requests(&self, transitions: &[NodeTransition]) -> Vec<DispatchRequest> {
        let recipe = &self.recipe;
        let view = ReadOnlyStateManager::new(&recipe.graph, &recipe.nodes, &recipe.input);

        transitions
            .iter()
            .filter(|t| t.to == NodeState::Eligible)
            .filter(|t| recipe.state_of(&t.node) == Some(NodeState::Eligible))
            .filter_map(|t| {
                let node = recipe.node(&t.node)?;
                let execution = node.execution()?;
                let kind = recipe.graph().node(&t.node)?.kind.clone();
                Some(DispatchRequest {
                    recipe: recipe.id(),
                    node: t.node.clone(),
                    execution,
                    kind,
                    inputs: view.resolve_inputs(&t.node),
                })
            })
            .collect()
    }
}
