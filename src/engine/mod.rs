// src/engine/mod.rs

//! Async orchestration engine.
//!
//! - The pure routing state (which recipe owns which execution) lives in
//!   [`core`].
//! - Every recipe instance is owned by one actor task ([`actor`]), so all
//!   transitions of an instance are serialised while different instances
//!   proceed in parallel.
//! - [`runtime`] is the async router shell: it reads [`EngineEvent`]s,
//!   materializes recipes, spawns actors, and routes executor outcomes.
//! - [`handle`] is the cloneable client side.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::config::EngineConfig;
use crate::dag::{NodeName, NodeOutcome, NodeState, RecipeGraph, RecipeStatus};
use crate::data::DataBag;
use crate::errors::Result;
use crate::recipe::{ExecutionRef, Recipe, RecipeId};

pub mod actor;
pub mod core;
pub mod handle;
pub mod runtime;

pub use self::core::EngineCore;
pub use handle::{channel, EngineHandle};
pub use runtime::Runtime;

/// Channel sizes and retention used by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeOptions {
    pub queue_capacity: usize,
    pub instance_queue_capacity: usize,
    pub event_capacity: usize,
    pub finished_history: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for RuntimeOptions {
    fn from(cfg: &EngineConfig) -> Self {
        Self {
            queue_capacity: cfg.engine.queue_capacity,
            instance_queue_capacity: cfg.engine.instance_queue_capacity,
            event_capacity: cfg.engine.event_capacity,
            finished_history: cfg.engine.finished_history,
        }
    }
}

/// A node state change, published for executors and persistence to observe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEvent {
    pub recipe: RecipeId,
    pub node: NodeName,
    pub from: NodeState,
    pub to: NodeState,
}

/// Point-in-time copy of a recipe instance.
#[derive(Debug, Clone)]
pub struct RecipeSnapshot {
    pub recipe: Recipe,
    pub status: RecipeStatus,
}

/// Bookkeeping counters of a running engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStats {
    /// Recipes with a live actor.
    pub live_recipes: usize,
    /// Finished recipes kept for snapshots and supersession.
    pub retained_recipes: usize,
    /// Executions the router can still route an outcome for.
    pub routes: usize,
}

/// Events flowing into the runtime from handles and executors.
#[derive(Debug)]
pub enum EngineEvent {
    /// Materialize and start a new recipe.
    Submit {
        graph: Arc<RecipeGraph>,
        input: DataBag,
        reply: oneshot::Sender<Result<RecipeId>>,
    },
    /// Replace a recipe with one running `graph` against `input`.
    Supersede {
        recipe: RecipeId,
        graph: Arc<RecipeGraph>,
        input: DataBag,
        reply: oneshot::Sender<Result<RecipeId>>,
    },
    /// Terminal outcome of an execution, from the executor.
    NodeOutcome {
        execution: ExecutionRef,
        outcome: NodeOutcome,
    },
    /// External cancel of one node.
    Cancel { recipe: RecipeId, node: NodeName },
    Snapshot {
        recipe: RecipeId,
        reply: oneshot::Sender<Option<RecipeSnapshot>>,
    },
    Stats {
        reply: oneshot::Sender<EngineStats>,
    },
    /// Stop the router and every actor.
    Shutdown,
}
