// src/definition/validate.rs

use tracing::debug;

use crate::dag::graph::RecipeGraph;
use crate::dag::node::NodeDefinition;
use crate::definition::model::{RawNode, RawNodeType, RawRecipeDefinition};
use crate::errors::{DefinitionError, RecipeflowError, Result};
use crate::filter::DataFilter;

/// Only this definition layout is understood.
pub const SUPPORTED_VERSION: &str = "6";

impl TryFrom<RawRecipeDefinition> for RecipeGraph {
    type Error = RecipeflowError;

    fn try_from(raw: RawRecipeDefinition) -> std::result::Result<Self, Self::Error> {
        build_graph(raw)
    }
}

/// Validate a raw definition document and build its graph.
///
/// Filter clauses are checked first (per node, in name order), then the
/// graph structure and bindings. Either a fully valid graph comes back or
/// the first error found.
pub fn build_graph(raw: RawRecipeDefinition) -> Result<RecipeGraph> {
    if let Some(version) = raw.version.as_deref() {
        if version != SUPPORTED_VERSION {
            return Err(DefinitionError::UnsupportedVersion(version.to_string()).into());
        }
    }

    let mut nodes = raw.nodes;
    nodes.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut definitions = Vec::with_capacity(nodes.len());
    for (name, node) in nodes {
        definitions.push(node_definition(name, node)?);
    }

    debug!(nodes = definitions.len(), "building recipe graph from definition");
    RecipeGraph::build(definitions, raw.input)
}

fn node_definition(name: String, raw: RawNode) -> Result<NodeDefinition> {
    let mut def = match raw.node_type {
        RawNodeType::Job {
            job_type_name,
            job_type_version,
            job_type_revision,
        } => NodeDefinition::job(name, &job_type_name, &job_type_version, job_type_revision),
        RawNodeType::Recipe {
            recipe_type_name,
            recipe_type_revision,
        } => NodeDefinition::sub_recipe(name, &recipe_type_name, recipe_type_revision),
        RawNodeType::Condition {
            data_filter,
            accepted_outputs,
            interface,
        } => {
            let filter = DataFilter::from_raw(&data_filter)?;
            let outputs: Vec<String> = if accepted_outputs.is_empty() {
                interface
                    .map(|i| i.parameter_kinds().into_keys().collect())
                    .unwrap_or_default()
            } else {
                accepted_outputs
            };
            NodeDefinition::condition(name, filter, outputs)
        }
    };

    for dep in raw.dependencies.iter() {
        def = def.with_dependency(dep.name());
    }
    for (input, binding) in raw.input {
        def = def.with_input(input, binding);
    }

    Ok(def)
}
