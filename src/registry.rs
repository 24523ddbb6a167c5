// src/registry.rs

//! Explicit registry of recipe type revisions.
//!
//! Built once by the embedding application and passed around by reference;
//! there is no global lookup.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::info;

use crate::dag::graph::RecipeGraph;
use crate::dag::node::{NodeKind, RecipeTypeRef};
use crate::errors::{DefinitionError, Result};

#[derive(Debug, Default, Clone)]
pub struct RecipeTypeRegistry {
    types: BTreeMap<String, BTreeMap<u32, Arc<RecipeGraph>>>,
}

impl RecipeTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `graph` as the next revision of `name` (starting at 1) and
    /// return that revision.
    ///
    /// Every sub-recipe node must reference an already registered type and
    /// revision, and the type must not end up containing itself.
    pub fn register(&mut self, name: &str, graph: RecipeGraph) -> Result<u32> {
        self.validate_sub_recipes(name, &graph)?;

        let revisions = self.types.entry(name.to_string()).or_default();
        let revision = revisions.keys().next_back().map_or(1, |last| last + 1);
        revisions.insert(revision, Arc::new(graph));

        info!(recipe_type = %name, revision, "registered recipe type revision");
        Ok(revision)
    }

    pub fn revision(&self, name: &str, revision: u32) -> Option<Arc<RecipeGraph>> {
        self.types.get(name)?.get(&revision).cloned()
    }

    pub fn latest(&self, name: &str) -> Option<(u32, Arc<RecipeGraph>)> {
        let (rev, graph) = self.types.get(name)?.iter().next_back()?;
        Some((*rev, Arc::clone(graph)))
    }

    pub fn resolve(&self, reference: &RecipeTypeRef) -> Option<Arc<RecipeGraph>> {
        self.revision(&reference.name, reference.revision)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(|s| s.as_str())
    }

    /// Check the sub-recipe references of a graph about to be registered as
    /// `name`.
    pub fn validate_sub_recipes(&self, name: &str, graph: &RecipeGraph) -> Result<()> {
        for def in graph.nodes() {
            let NodeKind::SubRecipe(reference) = &def.kind else {
                continue;
            };

            if reference.name == name {
                return Err(DefinitionError::RecursiveSubRecipe(name.to_string()).into());
            }

            let Some(sub_graph) = self.resolve(reference) else {
                return Err(DefinitionError::UnknownRecipeType {
                    node: def.name.clone(),
                    recipe_type: reference.name.clone(),
                    revision: reference.revision,
                }
                .into());
            };

            if self.reaches(&sub_graph, name, &mut BTreeSet::new()) {
                return Err(DefinitionError::RecursiveSubRecipe(name.to_string()).into());
            }
        }
        Ok(())
    }

    /// Whether `graph` nests a sub-recipe of type `target` at any depth.
    fn reaches(&self, graph: &RecipeGraph, target: &str, seen: &mut BTreeSet<(String, u32)>) -> bool {
        for def in graph.nodes() {
            let NodeKind::SubRecipe(reference) = &def.kind else {
                continue;
            };
            if reference.name == target {
                return true;
            }
            if !seen.insert((reference.name.clone(), reference.revision)) {
                continue;
            }
            if let Some(sub) = self.resolve(reference) {
                if self.reaches(&sub, target, seen) {
                    return true;
                }
            }
        }
        false
    }
}
