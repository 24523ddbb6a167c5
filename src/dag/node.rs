// src/dag/node.rs

//! Template node definitions.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::filter::DataFilter;

/// Canonical node name type.
pub type NodeName = String;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct JobTypeRef {
    pub name: String,
    pub version: String,
    pub revision: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RecipeTypeRef {
    pub name: String,
    pub revision: u32,
}

/// A pure gate: evaluates its filter and declares accept/reject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionDefinition {
    pub data_filter: DataFilter,
    /// Outputs dependents may bind to; only published when accepted.
    pub accepted_outputs: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node_type", rename_all = "lowercase")]
pub enum NodeKind {
    Job(JobTypeRef),
    #[serde(rename = "recipe")]
    SubRecipe(RecipeTypeRef),
    Condition(ConditionDefinition),
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Job(_) => "job",
            NodeKind::SubRecipe(_) => "recipe",
            NodeKind::Condition(_) => "condition",
        }
    }
}

/// Where a node input comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InputBinding {
    /// The enclosing recipe's own input.
    #[serde(rename = "recipe")]
    RecipeInput { input: String },
    /// An output of an upstream node.
    Dependency { node: NodeName, output: String },
}

impl InputBinding {
    pub fn recipe(input: impl Into<String>) -> Self {
        InputBinding::RecipeInput {
            input: input.into(),
        }
    }

    pub fn dependency(node: impl Into<String>, output: impl Into<String>) -> Self {
        InputBinding::Dependency {
            node: node.into(),
            output: output.into(),
        }
    }
}

/// One template node.
///
/// `dependencies` is kept sorted and de-duplicated; once the node is part of
/// a [`crate::dag::RecipeGraph`] it also includes every node named by a
/// `Dependency` binding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDefinition {
    pub name: NodeName,
    pub dependencies: Vec<NodeName>,
    pub kind: NodeKind,
    pub inputs: BTreeMap<String, InputBinding>,
}

impl NodeDefinition {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            kind,
            inputs: BTreeMap::new(),
        }
    }

    pub fn job(name: impl Into<String>, job_type: &str, version: &str, revision: u32) -> Self {
        Self::new(
            name,
            NodeKind::Job(JobTypeRef {
                name: job_type.to_string(),
                version: version.to_string(),
                revision,
            }),
        )
    }

    pub fn sub_recipe(name: impl Into<String>, recipe_type: &str, revision: u32) -> Self {
        Self::new(
            name,
            NodeKind::SubRecipe(RecipeTypeRef {
                name: recipe_type.to_string(),
                revision,
            }),
        )
    }

    pub fn condition<I, S>(name: impl Into<String>, data_filter: DataFilter, accepted_outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            NodeKind::Condition(ConditionDefinition {
                data_filter,
                accepted_outputs: accepted_outputs.into_iter().map(Into::into).collect(),
            }),
        )
    }

    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        self.dependencies.push(dep.into());
        self.normalise_dependencies();
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, binding: InputBinding) -> Self {
        self.inputs.insert(name.into(), binding);
        self
    }

    pub fn condition_definition(&self) -> Option<&ConditionDefinition> {
        match &self.kind {
            NodeKind::Condition(cond) => Some(cond),
            _ => None,
        }
    }

    pub fn is_condition(&self) -> bool {
        self.condition_definition().is_some()
    }

    /// Nodes referenced by `Dependency` bindings.
    pub fn bound_nodes(&self) -> impl Iterator<Item = &str> {
        self.inputs.values().filter_map(|binding| match binding {
            InputBinding::Dependency { node, .. } => Some(node.as_str()),
            InputBinding::RecipeInput { .. } => None,
        })
    }

    /// Recipe inputs referenced by `RecipeInput` bindings.
    pub fn bound_recipe_inputs(&self) -> impl Iterator<Item = &str> {
        self.inputs.values().filter_map(|binding| match binding {
            InputBinding::RecipeInput { input } => Some(input.as_str()),
            InputBinding::Dependency { .. } => None,
        })
    }

    /// Add binding-implied dependencies, then sort and de-duplicate.
    pub(crate) fn normalise_dependencies(&mut self) {
        let implied: Vec<String> = self.bound_nodes().map(str::to_string).collect();
        self.dependencies.extend(implied);
        self.dependencies.sort();
        self.dependencies.dedup();
    }
}
