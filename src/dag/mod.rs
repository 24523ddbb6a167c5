// src/dag/mod.rs

//! Recipe graph templates and per-instance readiness tracking.
//!
//! - [`node`] holds template node definitions and input bindings.
//! - [`interface`] describes the inputs a recipe declares.
//! - [`graph`] builds and validates the immutable [`RecipeGraph`].
//! - [`delta`] classifies nodes between two graph revisions.
//! - [`node_state`] defines node states, outcomes, and recipe status.
//! - [`state_manager`] propagates readiness and evaluates conditions.
//! - [`tracker`] owns one recipe instance and consumes executor outcomes.
//! - [`tracker_step`] defines the result type for tracker steps.

pub mod delta;
pub mod graph;
pub mod interface;
pub mod node;
pub mod node_state;
pub mod state_manager;
pub mod tracker;
pub mod tracker_step;

pub use delta::{NodeChange, RecipeGraphDelta};
pub use graph::RecipeGraph;
pub use interface::{FileInput, InputInterface, JsonInput};
pub use node::{
    ConditionDefinition, InputBinding, JobTypeRef, NodeDefinition, NodeKind, NodeName,
    RecipeTypeRef,
};
pub use node_state::{NodeOutcome, NodeState, NodeTransition, RecipeStatus};
pub use state_manager::Readiness;
pub use tracker::RecipeTracker;
pub use tracker_step::{DispatchRequest, TrackerStep};
