// src/recipe/materialize.rs

//! Turning a validated graph plus input into a recipe instance.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::delta::RecipeGraphDelta;
use crate::dag::graph::RecipeGraph;
use crate::dag::node::{NodeDefinition, NodeKind, NodeName};
use crate::dag::node_state::NodeState;
use crate::data::DataBag;
use crate::errors::{RecipeflowError, Result};
use crate::recipe::ids::{IdAllocator, RecipeId};
use crate::recipe::instance::Recipe;
use crate::recipe::node::{NodePayload, RecipeCondition, RecipeNode};

/// Create a recipe instance.
///
/// Without `prior` every node is fresh. With `prior`, the graphs are diffed
/// (taking input changes into account) and reusable nodes are carried over
/// with `is_original = true`; everything else is fresh. The prior instance
/// itself is not modified; see [`supersede`].
pub fn materialize(
    graph: Arc<RecipeGraph>,
    input: DataBag,
    prior: Option<&Recipe>,
    ids: &IdAllocator,
) -> Result<Recipe> {
    for w in graph.interface().validate_data(&input)? {
        warn!(warning = %w, "recipe input");
    }

    let id = ids.recipe();

    let delta = prior.map(|p| {
        let changed_inputs = p.input().changed_names(&input);
        RecipeGraphDelta::diff(p.graph(), &graph).with_changed_inputs(&graph, &changed_inputs)
    });

    let mut nodes: BTreeMap<NodeName, RecipeNode> = BTreeMap::new();
    let mut carried = 0usize;

    for name in graph.topological_order() {
        let Some(def) = graph.node(name) else {
            continue;
        };

        let reused = match (prior, &delta) {
            (Some(p), Some(d)) if d.is_reusable(name) => {
                p.node(name).and_then(|old| carry_over(id, old))
            }
            _ => None,
        };

        let node = match reused {
            Some(node) => {
                carried += 1;
                node
            }
            None => fresh_node(id, def, ids),
        };
        nodes.insert(name.clone(), node);
    }

    let mut recipe = Recipe::new(id, graph, input, nodes);

    if let Some(p) = prior {
        recipe.superseded_recipe = Some(p.id());
        recipe.root_superseded_recipe = p.root_superseded_recipe().or(Some(p.id()));
        info!(
            recipe = %id,
            superseded = %p.id(),
            carried,
            "materialized superseding recipe"
        );
    } else {
        info!(recipe = %id, nodes = recipe.nodes.len(), "materialized recipe");
    }

    Ok(recipe)
}

/// Materialize a superseding instance and mark `prior` as superseded by it.
pub fn supersede(
    prior: &mut Recipe,
    graph: Arc<RecipeGraph>,
    input: DataBag,
    ids: &IdAllocator,
) -> Result<Recipe> {
    if let Some(newer) = prior.superseded_by() {
        return Err(RecipeflowError::InvalidInput(format!(
            "{} is already superseded by {newer}",
            prior.id()
        )));
    }

    let recipe = materialize(graph, input, Some(prior), ids)?;
    prior.mark_superseded_by(recipe.id());
    Ok(recipe)
}

/// Work already done (or in flight) is kept as-is. Nodes that never ran keep
/// their payload but are re-derived from `Blocked`. Failed or canceled work
/// is not reusable.
fn carry_over(recipe: RecipeId, old: &RecipeNode) -> Option<RecipeNode> {
    let state = match old.state {
        NodeState::Completed | NodeState::Running => old.state,
        NodeState::Blocked | NodeState::Eligible | NodeState::Skipped => NodeState::Blocked,
        NodeState::Failed | NodeState::Canceled => {
            debug!(node = %old.node_name, state = %old.state, "prior node not reusable");
            return None;
        }
    };

    let mut node = old.clone();
    node.recipe = recipe;
    node.is_original = true;
    node.state = state;
    if state == NodeState::Blocked {
        node.outputs = None;
    }
    Some(node)
}

fn fresh_node(recipe: RecipeId, def: &NodeDefinition, ids: &IdAllocator) -> RecipeNode {
    let payload = match &def.kind {
        NodeKind::Job(_) => NodePayload::Job(ids.job()),
        NodeKind::SubRecipe(_) => NodePayload::SubRecipe(ids.recipe()),
        NodeKind::Condition(_) => NodePayload::Condition(RecipeCondition::new(ids.condition())),
    };
    RecipeNode::new(recipe, def.name.clone(), payload)
}
