// src/recipe/instance.rs

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

use crate::dag::graph::RecipeGraph;
use crate::dag::node::NodeName;
use crate::dag::node_state::NodeState;
use crate::data::DataBag;
use crate::recipe::ids::RecipeId;
use crate::recipe::node::{ExecutionRef, RecipeNode};

/// One execution of a [`RecipeGraph`] against an input bag.
///
/// Superseding instances form a chain: `superseded_recipe` points one step
/// back, `root_superseded_recipe` straight to the oldest instance.
#[derive(Debug, Clone)]
pub struct Recipe {
    id: RecipeId,
    pub(crate) graph: Arc<RecipeGraph>,
    pub(crate) input: DataBag,
    created: SystemTime,
    pub(crate) root_superseded_recipe: Option<RecipeId>,
    pub(crate) superseded_recipe: Option<RecipeId>,
    pub(crate) superseded_by: Option<RecipeId>,
    pub(crate) nodes: BTreeMap<NodeName, RecipeNode>,
}

impl Recipe {
    pub(crate) fn new(
        id: RecipeId,
        graph: Arc<RecipeGraph>,
        input: DataBag,
        nodes: BTreeMap<NodeName, RecipeNode>,
    ) -> Self {
        Self {
            id,
            graph,
            input,
            created: SystemTime::now(),
            root_superseded_recipe: None,
            superseded_recipe: None,
            superseded_by: None,
            nodes,
        }
    }

    pub fn id(&self) -> RecipeId {
        self.id
    }

    pub fn graph(&self) -> &Arc<RecipeGraph> {
        &self.graph
    }

    /// Graph revision this instance runs (the graph fingerprint).
    pub fn revision(&self) -> &str {
        self.graph.fingerprint()
    }

    pub fn input(&self) -> &DataBag {
        &self.input
    }

    pub fn created(&self) -> SystemTime {
        self.created
    }

    pub fn root_superseded_recipe(&self) -> Option<RecipeId> {
        self.root_superseded_recipe
    }

    pub fn superseded_recipe(&self) -> Option<RecipeId> {
        self.superseded_recipe
    }

    pub fn superseded_by(&self) -> Option<RecipeId> {
        self.superseded_by
    }

    pub fn is_superseded(&self) -> bool {
        self.superseded_by.is_some()
    }

    pub fn node(&self, name: &str) -> Option<&RecipeNode> {
        self.nodes.get(name)
    }

    pub(crate) fn node_mut(&mut self, name: &str) -> Option<&mut RecipeNode> {
        self.nodes.get_mut(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &RecipeNode> {
        self.nodes.values()
    }

    pub fn state_of(&self, name: &str) -> Option<NodeState> {
        self.nodes.get(name).map(|n| n.state)
    }

    /// Node backed by the given execution, if any.
    pub fn node_for_execution(&self, execution: ExecutionRef) -> Option<&RecipeNode> {
        self.nodes
            .values()
            .find(|n| n.execution() == Some(execution))
    }

    /// Every execution reference held by this instance.
    pub fn executions(&self) -> impl Iterator<Item = ExecutionRef> + '_ {
        self.nodes.values().filter_map(RecipeNode::execution)
    }

    /// Record the newer instance. Only the first call has an effect.
    pub(crate) fn mark_superseded_by(&mut self, newer: RecipeId) -> bool {
        if self.superseded_by.is_some() {
            return false;
        }
        self.superseded_by = Some(newer);
        true
    }
}
