// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};

use blake3::Hasher;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::dag::interface::InputInterface;
use crate::dag::node::{InputBinding, NodeDefinition, NodeKind, NodeName};
use crate::errors::{DefinitionError, GraphError, Result};
use crate::filter::ParameterKind;

/// Internal adjacency entry: immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    deps: Vec<NodeName>,
    dependents: Vec<NodeName>,
}

/// Validated recipe template.
///
/// Built once through [`RecipeGraph::build`] and immutable afterwards: it is
/// acyclic, every dependency names an existing node, and every binding
/// refers to a declared recipe input or to a direct dependency.
#[derive(Debug, Clone)]
pub struct RecipeGraph {
    nodes: BTreeMap<NodeName, NodeDefinition>,
    adjacency: HashMap<NodeName, DagNode>,
    order: Vec<NodeName>,
    interface: InputInterface,
    warnings: Vec<String>,
    fingerprint: String,
}

#[derive(Serialize)]
struct CanonicalGraph<'a> {
    interface: &'a InputInterface,
    nodes: &'a BTreeMap<NodeName, NodeDefinition>,
}

impl RecipeGraph {
    /// Validate node definitions and build the graph.
    ///
    /// Fails with the first problem found; no partially valid graph is ever
    /// returned.
    pub fn build(definitions: Vec<NodeDefinition>, interface: InputInterface) -> Result<Self> {
        let mut nodes: BTreeMap<NodeName, NodeDefinition> = BTreeMap::new();

        for mut def in definitions {
            if nodes.contains_key(&def.name) {
                return Err(GraphError::DuplicateNode { node: def.name }.into());
            }
            def.normalise_dependencies();
            nodes.insert(def.name.clone(), def);
        }

        validate_dependencies(&nodes)?;
        validate_acyclic(&nodes)?;
        validate_bindings(&nodes, &interface)?;

        let adjacency = build_adjacency(&nodes);
        let order = topological_order(&nodes, &adjacency);
        let warnings = condition_warnings(&nodes, &interface);
        for w in &warnings {
            warn!(warning = %w, "recipe graph validation");
        }

        let canonical = serde_json::to_vec(&CanonicalGraph {
            interface: &interface,
            nodes: &nodes,
        })?;
        let mut hasher = Hasher::new();
        hasher.update(&canonical);
        let fingerprint = hasher.finalize().to_hex().to_string();

        debug!(nodes = nodes.len(), %fingerprint, "recipe graph built");

        Ok(Self {
            nodes,
            adjacency,
            order,
            interface,
            warnings,
            fingerprint,
        })
    }

    pub fn node(&self, name: &str) -> Option<&NodeDefinition> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeDefinition> {
        self.nodes.values()
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn interface(&self) -> &InputInterface {
        &self.interface
    }

    /// Non-fatal findings from construction (e.g. filter clauses naming
    /// parameters their condition cannot see).
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// BLAKE3 hex digest of the canonical node set and interface.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Immediate dependencies of a node.
    pub fn dependencies_of(&self, name: &str) -> &[NodeName] {
        self.adjacency
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a node.
    pub fn dependents_of(&self, name: &str) -> &[NodeName] {
        self.adjacency
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Nodes without dependencies.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .filter(|name| self.dependencies_of(name).is_empty())
            .map(|s| s.as_str())
    }

    /// All transitive dependencies of `name` (excluding itself).
    pub fn ancestors(&self, name: &str) -> BTreeSet<NodeName> {
        self.walk(name, |n| self.dependencies_of(n))
    }

    /// All transitive dependents of `name` (excluding itself).
    pub fn descendants(&self, name: &str) -> BTreeSet<NodeName> {
        self.walk(name, |n| self.dependents_of(n))
    }

    /// Dependencies before dependents; ties broken by ascending name.
    pub fn topological_order(&self) -> &[NodeName] {
        &self.order
    }

    fn walk<'a, F>(&'a self, start: &str, next: F) -> BTreeSet<NodeName>
    where
        F: Fn(&str) -> &'a [NodeName],
    {
        let mut stack: Vec<&NodeName> = next(start).iter().collect();
        let mut visited: BTreeSet<NodeName> = BTreeSet::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            stack.extend(next(current.as_str()));
        }

        visited
    }
}

fn validate_dependencies(nodes: &BTreeMap<NodeName, NodeDefinition>) -> Result<()> {
    for (name, def) in nodes.iter() {
        for dep in def.dependencies.iter() {
            if dep == name {
                return Err(GraphError::CyclicGraph { node: name.clone() }.into());
            }
            if !nodes.contains_key(dep) {
                return Err(GraphError::UnknownNode {
                    node: dep.clone(),
                    referenced_by: name.clone(),
                }
                .into());
            }
        }
    }
    Ok(())
}

fn validate_acyclic(nodes: &BTreeMap<NodeName, NodeDefinition>) -> Result<()> {
    // Edge direction: dep -> node.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in nodes.keys() {
        graph.add_node(name.as_str());
    }
    for (name, def) in nodes.iter() {
        for dep in def.dependencies.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(GraphError::CyclicGraph {
            node: cycle.node_id().to_string(),
        }
        .into()),
    }
}

fn validate_bindings(
    nodes: &BTreeMap<NodeName, NodeDefinition>,
    interface: &InputInterface,
) -> Result<()> {
    for (name, def) in nodes.iter() {
        for (input, binding) in def.inputs.iter() {
            match binding {
                InputBinding::RecipeInput { input: recipe_input } => {
                    if !interface.contains(recipe_input) {
                        return Err(DefinitionError::UnknownRecipeInput {
                            node: name.clone(),
                            input: input.clone(),
                            recipe_input: recipe_input.clone(),
                        }
                        .into());
                    }
                }
                InputBinding::Dependency { node, output } => {
                    let Some(upstream) = nodes.get(node) else {
                        return Err(GraphError::UnknownNode {
                            node: node.clone(),
                            referenced_by: name.clone(),
                        }
                        .into());
                    };
                    if let Some(cond) = upstream.condition_definition() {
                        if !cond.accepted_outputs.contains(output) {
                            return Err(DefinitionError::UnknownConditionOutput {
                                node: name.clone(),
                                input: input.clone(),
                                condition: node.clone(),
                                output: output.clone(),
                            }
                            .into());
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn build_adjacency(nodes: &BTreeMap<NodeName, NodeDefinition>) -> HashMap<NodeName, DagNode> {
    let mut adjacency: HashMap<NodeName, DagNode> = nodes
        .iter()
        .map(|(name, def)| {
            (
                name.clone(),
                DagNode {
                    deps: def.dependencies.clone(),
                    dependents: Vec::new(),
                },
            )
        })
        .collect();

    // BTreeMap iteration keeps each dependents list sorted by name.
    for (name, def) in nodes.iter() {
        for dep in def.dependencies.iter() {
            if let Some(dep_node) = adjacency.get_mut(dep) {
                dep_node.dependents.push(name.clone());
            }
        }
    }

    adjacency
}

/// Kahn's algorithm with a name-ordered ready set. Assumes an acyclic graph.
fn topological_order(
    nodes: &BTreeMap<NodeName, NodeDefinition>,
    adjacency: &HashMap<NodeName, DagNode>,
) -> Vec<NodeName> {
    let mut in_degree: HashMap<&str, usize> = nodes
        .iter()
        .map(|(name, def)| (name.as_str(), def.dependencies.len()))
        .collect();

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| *name)
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(name) = ready.pop_first() {
        order.push(name.to_string());
        if let Some(entry) = adjacency.get(name) {
            for dependent in entry.dependents.iter() {
                if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(dependent.as_str());
                    }
                }
            }
        }
    }

    order
}

/// Check each condition's filter against what the condition can see: the
/// recipe inputs plus its own bound inputs.
fn condition_warnings(
    nodes: &BTreeMap<NodeName, NodeDefinition>,
    interface: &InputInterface,
) -> Vec<String> {
    let mut warnings = Vec::new();

    for (name, def) in nodes.iter() {
        let NodeKind::Condition(cond) = &def.kind else {
            continue;
        };

        let mut visible = interface.parameter_kinds();
        for (input, binding) in def.inputs.iter() {
            let kind = match binding {
                InputBinding::RecipeInput { input: recipe_input } => interface
                    .kind_of(recipe_input)
                    .unwrap_or(ParameterKind::Unknown),
                InputBinding::Dependency { .. } => ParameterKind::Unknown,
            };
            visible.insert(input.clone(), kind);
        }

        warnings.extend(
            cond.data_filter
                .validate(&visible)
                .into_iter()
                .map(|w| format!("condition '{name}': {w}")),
        );
    }

    warnings
}
