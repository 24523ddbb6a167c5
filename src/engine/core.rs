// src/engine/core.rs

//! Pure routing state of the engine.
//!
//! No channels, no Tokio types, no IO: it only remembers which recipe
//! currently owns each execution. When a superseding recipe carries an
//! execution over, registering it re-points the route to the new owner.
//! Retiring a recipe forgets every route it still owns.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::recipe::{ExecutionRef, Recipe, RecipeId};

#[derive(Debug, Default)]
pub struct EngineCore {
    routes: HashMap<ExecutionRef, RecipeId>,
    superseded_by: BTreeMap<RecipeId, Option<RecipeId>>,
}

impl EngineCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly materialized recipe and claim its executions.
    ///
    /// Returns how many executions were taken over from another recipe.
    pub fn register(&mut self, recipe: &Recipe) -> usize {
        let id = recipe.id();
        let mut repointed = 0;

        for execution in recipe.executions() {
            if let Some(previous) = self.routes.insert(execution, id) {
                if previous != id {
                    repointed += 1;
                }
            }
        }

        if let Some(prior) = recipe.superseded_recipe() {
            self.superseded_by.insert(prior, Some(id));
        }
        self.superseded_by.entry(id).or_insert(None);

        debug!(recipe = %id, repointed, "registered recipe routes");
        repointed
    }

    /// Recipe that should receive outcomes for `execution`.
    pub fn route(&self, execution: ExecutionRef) -> Option<RecipeId> {
        self.routes.get(&execution).copied()
    }

    /// Forget a recipe that will not receive outcomes any more.
    ///
    /// Returns how many routes were dropped. Routes already re-pointed to a
    /// superseding recipe are kept.
    pub fn retire(&mut self, recipe: RecipeId) -> usize {
        let before = self.routes.len();
        self.routes.retain(|_, owner| *owner != recipe);
        self.superseded_by.remove(&recipe);

        let dropped = before - self.routes.len();
        debug!(recipe = %recipe, dropped, "retired recipe routes");
        dropped
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn knows(&self, recipe: RecipeId) -> bool {
        self.superseded_by.contains_key(&recipe)
    }

    pub fn superseded_by(&self, recipe: RecipeId) -> Option<RecipeId> {
        self.superseded_by.get(&recipe).copied().flatten()
    }

    pub fn recipe_ids(&self) -> impl Iterator<Item = RecipeId> + '_ {
        self.superseded_by.keys().copied()
    }
}
