// src/dag/node_state.rs

//! Per-node state of a recipe instance, and what the executor reports back.

use std::fmt;

use serde::Serialize;

use crate::dag::node::NodeName;
use crate::data::DataBag;

/// Lifecycle of one instance node.
///
/// `Blocked -> Eligible -> Running -> {Completed | Failed | Canceled}`, plus
/// `Blocked -> Skipped` for nodes behind a rejected condition. Conditions go
/// `Eligible -> Completed` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeState {
    Blocked,
    Eligible,
    Running,
    Completed,
    Failed,
    Canceled,
    Skipped,
}

impl NodeState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeState::Completed | NodeState::Failed | NodeState::Canceled | NodeState::Skipped
        )
    }

    /// Eligible or Running.
    pub fn is_active(self) -> bool {
        matches!(self, NodeState::Eligible | NodeState::Running)
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeState::Blocked => "blocked",
            NodeState::Eligible => "eligible",
            NodeState::Running => "running",
            NodeState::Completed => "completed",
            NodeState::Failed => "failed",
            NodeState::Canceled => "canceled",
            NodeState::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Terminal outcome of a job or sub-recipe execution.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome {
    /// Finished; carries the node's outputs.
    Completed(DataBag),
    Failed(String),
    Canceled,
}

impl NodeOutcome {
    pub fn target_state(&self) -> NodeState {
        match self {
            NodeOutcome::Completed(_) => NodeState::Completed,
            NodeOutcome::Failed(_) => NodeState::Failed,
            NodeOutcome::Canceled => NodeState::Canceled,
        }
    }
}

/// One observed state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTransition {
    pub node: NodeName,
    pub from: NodeState,
    pub to: NodeState,
}

impl NodeTransition {
    pub fn new(node: impl Into<String>, from: NodeState, to: NodeState) -> Self {
        Self {
            node: node.into(),
            from,
            to,
        }
    }
}

/// Overall status of a recipe instance, derived from its nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RecipeStatus {
    /// Something is eligible, running, or still waiting on a live branch.
    Active,
    Completed,
    /// Nothing can move any more and at least one node failed.
    Failed,
    /// Nothing can move any more, no failures, at least one cancel.
    Canceled,
    /// Replaced by a newer instance.
    Superseded,
}

impl RecipeStatus {
    pub fn is_finished(self) -> bool {
        !matches!(self, RecipeStatus::Active)
    }
}

impl fmt::Display for RecipeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecipeStatus::Active => "active",
            RecipeStatus::Completed => "completed",
            RecipeStatus::Failed => "failed",
            RecipeStatus::Canceled => "canceled",
            RecipeStatus::Superseded => "superseded",
        };
        f.write_str(s)
    }
}
