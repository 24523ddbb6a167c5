// src/dag/delta.rs

//! Structural diff between two graph revisions.
//!
//! Every node name present in either graph gets one [`NodeChange`]. A node
//! can only stay `Identical` if its own definition is unchanged AND nothing
//! upstream of it changed.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::dag::graph::RecipeGraph;
use crate::dag::node::{NodeDefinition, NodeKind, NodeName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeChange {
    /// Same definition and untouched ancestry; prior instance data is reusable.
    Identical,
    /// Different definition, or downstream of something that is not identical.
    Changed,
    /// Only in the new graph.
    Added,
    /// Only in the old graph.
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeGraphDelta {
    changes: BTreeMap<NodeName, NodeChange>,
}

impl RecipeGraphDelta {
    /// Compare `old` against `new`.
    pub fn diff(old: &RecipeGraph, new: &RecipeGraph) -> Self {
        let mut changes: BTreeMap<NodeName, NodeChange> = BTreeMap::new();

        for def in new.nodes() {
            let change = match old.node(&def.name) {
                Some(prior) if definitions_match(prior, def) => NodeChange::Identical,
                Some(_) => NodeChange::Changed,
                None => NodeChange::Added,
            };
            changes.insert(def.name.clone(), change);
        }

        for name in old.node_names() {
            if !new.contains(name) {
                changes.insert(name.to_string(), NodeChange::Removed);
            }
        }

        let mut delta = Self { changes };
        delta.propagate(new);

        debug!(
            reusable = delta.reusable().len(),
            changed = delta.changed().len(),
            added = delta.added().len(),
            removed = delta.removed().len(),
            "recipe graph delta computed"
        );

        delta
    }

    /// Reclassify nodes that read recipe input which changed between the
    /// superseded and the superseding instance.
    ///
    /// Nodes bound to a changed input are marked `Changed`, and so is every
    /// condition (a condition evaluates against the whole recipe input).
    /// Taint is then propagated again.
    pub fn with_changed_inputs(mut self, new: &RecipeGraph, changed_inputs: &BTreeSet<String>) -> Self {
        if changed_inputs.is_empty() {
            return self;
        }

        for def in new.nodes() {
            let reads_changed_input = match def.kind {
                NodeKind::Condition(_) => true,
                _ => def
                    .bound_recipe_inputs()
                    .any(|input| changed_inputs.contains(input)),
            };
            if reads_changed_input {
                self.demote(&def.name);
            }
        }

        self.propagate(new);
        self
    }

    pub fn change_of(&self, name: &str) -> Option<NodeChange> {
        self.changes.get(name).copied()
    }

    pub fn changes(&self) -> impl Iterator<Item = (&str, NodeChange)> {
        self.changes.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_reusable(&self, name: &str) -> bool {
        self.change_of(name) == Some(NodeChange::Identical)
    }

    /// True if nothing changed at all.
    pub fn is_empty(&self) -> bool {
        self.changes.values().all(|c| *c == NodeChange::Identical)
    }

    /// Nodes whose prior instance data can be carried over.
    pub fn reusable(&self) -> BTreeSet<NodeName> {
        self.names_where(|c| c == NodeChange::Identical)
    }

    /// Everything that is not reusable, `Removed` included.
    pub fn must_recreate(&self) -> BTreeSet<NodeName> {
        self.names_where(|c| c != NodeChange::Identical)
    }

    pub fn changed(&self) -> BTreeSet<NodeName> {
        self.names_where(|c| c == NodeChange::Changed)
    }

    pub fn added(&self) -> BTreeSet<NodeName> {
        self.names_where(|c| c == NodeChange::Added)
    }

    pub fn removed(&self) -> BTreeSet<NodeName> {
        self.names_where(|c| c == NodeChange::Removed)
    }

    fn names_where<F: Fn(NodeChange) -> bool>(&self, pred: F) -> BTreeSet<NodeName> {
        self.changes
            .iter()
            .filter(|(_, c)| pred(**c))
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn demote(&mut self, name: &str) {
        if let Some(change) = self.changes.get_mut(name) {
            if *change == NodeChange::Identical {
                *change = NodeChange::Changed;
            }
        }
    }

    /// Walk `new` in topological order; an identical node with any
    /// non-identical direct dependency becomes `Changed`. Because parents are
    /// settled before children, one pass covers the whole ancestry.
    fn propagate(&mut self, new: &RecipeGraph) {
        for name in new.topological_order() {
            if self.change_of(name) != Some(NodeChange::Identical) {
                continue;
            }
            let tainted = new
                .dependencies_of(name)
                .iter()
                .any(|dep| self.change_of(dep) != Some(NodeChange::Identical));
            if tainted {
                debug!(node = %name, "upstream change taints node");
                self.demote(name);
            }
        }
    }
}

/// Same kind (condition filters compared structurally), same dependencies,
/// same bindings.
fn definitions_match(old: &NodeDefinition, new: &NodeDefinition) -> bool {
    let kinds_match = match (&old.kind, &new.kind) {
        (NodeKind::Job(a), NodeKind::Job(b)) => a == b,
        (NodeKind::SubRecipe(a), NodeKind::SubRecipe(b)) => a == b,
        (NodeKind::Condition(a), NodeKind::Condition(b)) => {
            a.data_filter.is_equal(&b.data_filter) && a.accepted_outputs == b.accepted_outputs
        }
        _ => false,
    };

    kinds_match && old.dependencies == new.dependencies && old.inputs == new.inputs
}
