// src/recipe/mod.rs

//! Recipe instances.
//!
//! - [`ids`]: recipe/job/condition ids and the allocator handing them out.
//! - [`node`]: one materialized node and its payload.
//! - [`instance`]: the [`Recipe`] itself, including its supersession chain.
//! - [`materialize`]: building a fresh or superseding instance from a graph.

pub mod ids;
pub mod instance;
pub mod materialize;
pub mod node;

pub use ids::{ConditionId, IdAllocator, JobId, RecipeId};
pub use instance::Recipe;
pub use materialize::{materialize, supersede};
pub use node::{ExecutionRef, NodePayload, RecipeCondition, RecipeNode};
