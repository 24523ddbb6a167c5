// src/dag/state_manager.rs

//! Readiness propagation over the nodes of one recipe instance.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::catalog::FileCatalog;
use crate::dag::graph::RecipeGraph;
use crate::dag::node::{InputBinding, NodeName};
use crate::dag::node_state::{NodeState, NodeTransition, RecipeStatus};
use crate::data::DataBag;
use crate::recipe::node::RecipeNode;

/// Whether a blocked node can move on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Every dependency completed (and every condition dependency accepted).
    Ready,
    /// Some dependency has not completed, or failed/was canceled.
    Waiting,
    /// Behind a rejected condition or a skipped node; can never run.
    Pruned,
}

/// Borrowed view over one instance's nodes, used to move them along.
pub struct StateManager<'a> {
    graph: &'a RecipeGraph,
    nodes: &'a mut BTreeMap<NodeName, RecipeNode>,
    input: &'a DataBag,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a RecipeGraph,
        nodes: &'a mut BTreeMap<NodeName, RecipeNode>,
        input: &'a DataBag,
    ) -> Self {
        Self {
            graph,
            nodes,
            input,
        }
    }

    pub fn readiness(&self, name: &str) -> Readiness {
        self.read_only().readiness(name)
    }

    pub fn resolve_inputs(&self, name: &str) -> DataBag {
        self.read_only().resolve_inputs(name)
    }

    fn read_only(&self) -> ReadOnlyStateManager<'_> {
        ReadOnlyStateManager::new(self.graph, &*self.nodes, self.input)
    }

    /// One pass over the graph in topological order.
    ///
    /// Blocked nodes whose dependencies are satisfied become `Eligible`;
    /// blocked nodes behind a rejected gate become `Skipped`. Conditions that
    /// become eligible are evaluated on the spot, so everything downstream of
    /// them is settled within the same pass.
    pub fn propagate(&mut self, catalog: &dyn FileCatalog) -> Vec<NodeTransition> {
        let graph = self.graph;
        let mut transitions = Vec::new();

        for name in graph.topological_order() {
            if self.nodes.get(name).map(|n| n.state) != Some(NodeState::Blocked) {
                continue;
            }

            match self.readiness(name) {
                Readiness::Waiting => {}
                Readiness::Pruned => {
                    self.set_state(name, NodeState::Skipped, &mut transitions);
                    debug!(node = %name, "node skipped behind rejected condition");
                }
                Readiness::Ready => {
                    self.set_state(name, NodeState::Eligible, &mut transitions);
                    if self.is_condition(name) {
                        self.evaluate_condition(name, catalog, &mut transitions);
                    }
                }
            }
        }

        transitions
    }

    /// Evaluate an eligible condition against the recipe input overlaid with
    /// its resolved bindings, record the result, and complete it.
    fn evaluate_condition(
        &mut self,
        name: &str,
        catalog: &dyn FileCatalog,
        transitions: &mut Vec<NodeTransition>,
    ) {
        let graph = self.graph;
        let Some(cond) = graph.node(name).and_then(|d| d.condition_definition()) else {
            return;
        };

        let bag = self.input.overlay(&self.resolve_inputs(name));
        let evaluation = cond.data_filter.evaluate(&bag, catalog);
        for diag in evaluation.diagnostics.iter() {
            warn!(condition = %name, diagnostic = %diag, "condition evaluation diagnostic");
        }

        let outputs = evaluation
            .accepted
            .then(|| bag.restrict(cond.accepted_outputs.iter()));

        let Some(node) = self.nodes.get_mut(name) else {
            return;
        };
        let processed = node
            .condition_mut()
            .map(|c| c.process(evaluation.accepted))
            .unwrap_or(false);
        if !processed {
            warn!(condition = %name, "condition already processed; keeping first result");
        }
        node.outputs = outputs;

        info!(condition = %name, accepted = evaluation.accepted, "condition processed");
        self.set_state(name, NodeState::Completed, transitions);
    }

    fn is_condition(&self, name: &str) -> bool {
        self.graph.node(name).is_some_and(|d| d.is_condition())
    }

    fn set_state(&mut self, name: &str, to: NodeState, transitions: &mut Vec<NodeTransition>) {
        if let Some(node) = self.nodes.get_mut(name) {
            let from = node.state;
            if from != to {
                node.state = to;
                debug!(node = %name, %from, %to, "node state changed");
                transitions.push(NodeTransition::new(name, from, to));
            }
        }
    }
}

/// Read-only status derived from node states.
///
/// Does not know about supersession; the tracker layers that on top.
pub fn derive_status(nodes: &BTreeMap<NodeName, RecipeNode>) -> RecipeStatus {
    let states = || nodes.values().map(|n| n.state);

    if states().any(NodeState::is_active) {
        return RecipeStatus::Active;
    }
    if states().any(|s| s == NodeState::Failed) {
        return RecipeStatus::Failed;
    }
    if states().any(|s| s == NodeState::Canceled) {
        return RecipeStatus::Canceled;
    }
    if states().any(|s| s == NodeState::Blocked) {
        return RecipeStatus::Active;
    }
    RecipeStatus::Completed
}

/// Shared-access view for readiness checks and input resolution.
pub struct ReadOnlyStateManager<'a> {
    graph: &'a RecipeGraph,
    nodes: &'a BTreeMap<NodeName, RecipeNode>,
    input: &'a DataBag,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(
        graph: &'a RecipeGraph,
        nodes: &'a BTreeMap<NodeName, RecipeNode>,
        input: &'a DataBag,
    ) -> Self {
        Self {
            graph,
            nodes,
            input,
        }
    }

    pub fn readiness(&self, name: &str) -> Readiness {
        let mut readiness = Readiness::Ready;

        for dep_name in self.graph.dependencies_of(name) {
            let Some(dep) = self.nodes.get(dep_name) else {
                warn!(node = %name, dep = %dep_name, "dependency missing from recipe instance");
                return Readiness::Waiting;
            };

            match dep.state {
                NodeState::Skipped => return Readiness::Pruned,
                NodeState::Completed if !dep.passes() => return Readiness::Pruned,
                NodeState::Completed => {}
                NodeState::Blocked
                | NodeState::Eligible
                | NodeState::Running
                | NodeState::Failed
                | NodeState::Canceled => readiness = Readiness::Waiting,
            }
        }

        readiness
    }

    /// Bag a node sees for its declared inputs: recipe inputs and upstream
    /// outputs, by binding. Unresolvable bindings are left out.
    pub fn resolve_inputs(&self, name: &str) -> DataBag {
        let mut bag = DataBag::new();
        let Some(def) = self.graph.node(name) else {
            return bag;
        };

        for (input, binding) in def.inputs.iter() {
            let value = match binding {
                InputBinding::RecipeInput { input: recipe_input } => self.input.get(recipe_input),
                InputBinding::Dependency { node, output } => self
                    .nodes
                    .get(node)
                    .and_then(|n| n.outputs.as_ref())
                    .and_then(|outputs| outputs.get(output)),
            };
            match value {
                Some(v) => bag.insert(input.clone(), v.clone()),
                None => debug!(node = %name, input = %input, "input binding unresolved"),
            }
        }

        bag
    }
}
