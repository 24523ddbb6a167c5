// src/dag/tracker_step.rs

//! Step results of the recipe tracker.

use crate::dag::node::{NodeKind, NodeName};
use crate::dag::node_state::NodeTransition;
use crate::data::DataBag;
use crate::recipe::{ExecutionRef, RecipeId};

/// A job or sub-recipe node the executor should start now.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    pub recipe: RecipeId,
    pub node: NodeName,
    pub execution: ExecutionRef,
    pub kind: NodeKind,
    /// Resolved node inputs.
    pub inputs: DataBag,
}

/// What changed as a result of a single tracker call.
///
/// Handy for tests that drive a recipe by hand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerStep {
    /// Nodes that became eligible and should be dispatched.
    pub newly_eligible: Vec<DispatchRequest>,
    /// Every node state change, in the order it happened.
    pub transitions: Vec<NodeTransition>,
    /// The recipe went from active to finished in this step.
    pub recipe_just_finished: bool,
}

impl TrackerStep {
    pub fn is_empty(&self) -> bool {
        self.newly_eligible.is_empty() && self.transitions.is_empty()
    }

    pub fn eligible_names(&self) -> Vec<&str> {
        self.newly_eligible.iter().map(|r| r.node.as_str()).collect()
    }
}
