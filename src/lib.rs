// src/lib.rs

pub mod catalog;
pub mod config;
pub mod dag;
pub mod data;
pub mod definition;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod filter;
pub mod logging;
pub mod recipe;
pub mod registry;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::catalog::FileCatalog;
use crate::config::EngineConfig;
use crate::engine::{EngineHandle, Runtime, RuntimeOptions};
use crate::errors::Result;
use crate::exec::ExecutorBackend;

pub use crate::catalog::{FileRecord, InMemoryFileCatalog};
pub use crate::dag::{
    NodeChange, NodeDefinition, NodeOutcome, NodeState, RecipeGraph, RecipeGraphDelta,
    RecipeStatus, RecipeTracker,
};
pub use crate::data::{DataBag, ParameterValue};
pub use crate::definition::build_graph;
pub use crate::errors::RecipeflowError;
pub use crate::filter::{Combine, DataFilter, FilterClause};
pub use crate::recipe::{materialize, Recipe, RecipeId};
pub use crate::registry::RecipeTypeRegistry;

/// Load an engine config file and set up logging from it.
///
/// Convenience for embedding applications; the level from `[logging]` wins
/// over `RECIPEFLOW_LOG`.
pub fn init_from_config(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let cfg = config::load_and_validate(path)?;
    logging::init_logging(cfg.logging.level)?;
    info!(?cfg, "engine configuration loaded");
    Ok(cfg)
}

/// Wire up a runtime and its handle.
///
/// The caller spawns `runtime.run()` (subscribing to node events first if
/// needed) and talks to it through the handle.
pub fn start_engine<E: ExecutorBackend + 'static>(
    cfg: &EngineConfig,
    catalog: Arc<dyn FileCatalog>,
    executor: E,
) -> (EngineHandle, Runtime<E>) {
    let options = RuntimeOptions::from(cfg);
    let (handle, rx) = engine::channel(options.queue_capacity);
    let runtime = Runtime::new(options, rx, catalog, executor);
    (handle, runtime)
}
