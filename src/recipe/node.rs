// src/recipe/node.rs

//! Materialized nodes of a recipe instance.

use std::fmt;
use std::time::SystemTime;

use crate::dag::node::NodeName;
use crate::dag::node_state::NodeState;
use crate::data::DataBag;
use crate::recipe::ids::{ConditionId, JobId, RecipeId};

/// Gate state of one condition node.
///
/// Starts pending and is processed exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeCondition {
    pub id: ConditionId,
    pub is_processed: bool,
    pub is_accepted: bool,
    pub processed: Option<SystemTime>,
}

impl RecipeCondition {
    pub fn new(id: ConditionId) -> Self {
        Self {
            id,
            is_processed: false,
            is_accepted: false,
            processed: None,
        }
    }

    /// Record the evaluation result. Returns `false` (and changes nothing)
    /// if the condition was already processed.
    pub fn process(&mut self, accepted: bool) -> bool {
        if self.is_processed {
            return false;
        }
        self.is_processed = true;
        self.is_accepted = accepted;
        self.processed = Some(SystemTime::now());
        true
    }
}

/// Reference the executor uses when reporting an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExecutionRef {
    Job(JobId),
    SubRecipe(RecipeId),
}

impl fmt::Display for ExecutionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionRef::Job(id) => write!(f, "{id}"),
            ExecutionRef::SubRecipe(id) => write!(f, "sub-{id}"),
        }
    }
}

/// Exactly one payload per node; which one follows from the node kind.
#[derive(Debug, Clone, PartialEq)]
pub enum NodePayload {
    Job(JobId),
    SubRecipe(RecipeId),
    Condition(RecipeCondition),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeNode {
    pub recipe: RecipeId,
    pub node_name: NodeName,
    /// Carried over unchanged from a superseded instance.
    pub is_original: bool,
    pub payload: NodePayload,
    pub state: NodeState,
    /// Set once the node completes (for conditions, only when accepted).
    pub outputs: Option<DataBag>,
}

impl RecipeNode {
    pub fn new(recipe: RecipeId, node_name: impl Into<String>, payload: NodePayload) -> Self {
        Self {
            recipe,
            node_name: node_name.into(),
            is_original: false,
            payload,
            state: NodeState::Blocked,
            outputs: None,
        }
    }

    /// External execution backing this node; conditions have none.
    pub fn execution(&self) -> Option<ExecutionRef> {
        match &self.payload {
            NodePayload::Job(id) => Some(ExecutionRef::Job(*id)),
            NodePayload::SubRecipe(id) => Some(ExecutionRef::SubRecipe(*id)),
            NodePayload::Condition(_) => None,
        }
    }

    pub fn condition(&self) -> Option<&RecipeCondition> {
        match &self.payload {
            NodePayload::Condition(c) => Some(c),
            _ => None,
        }
    }

    pub fn condition_mut(&mut self) -> Option<&mut RecipeCondition> {
        match &mut self.payload {
            NodePayload::Condition(c) => Some(c),
            _ => None,
        }
    }

    /// Completed, and if this is a condition, accepted.
    pub fn passes(&self) -> bool {
        self.state == NodeState::Completed
            && self.condition().is_none_or(|c| c.is_accepted)
    }
}
