#![allow(dead_code)]

use recipeflow::dag::{FileInput, InputBinding, InputInterface, JsonInput, NodeDefinition};
use recipeflow::errors::Result;
use recipeflow::filter::{Combine, DataFilter};
use recipeflow::RecipeGraph;
use serde_json::Value;

/// Builder for `RecipeGraph` to simplify test setup.
pub struct GraphBuilder {
    nodes: Vec<NodeDefinition>,
    interface: InputInterface,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            interface: InputInterface::default(),
        }
    }

    pub fn with_node(mut self, node: NodeDefinition) -> Self {
        self.nodes.push(node);
        self
    }

    /// Job node `name` depending on `deps`.
    pub fn job(self, name: &str, deps: &[&str]) -> Self {
        self.with_node(NodeBuilder::job(name).after_all(deps).build())
    }

    pub fn with_file_input(mut self, name: &str, media_types: &[&str]) -> Self {
        self.interface.files.push(FileInput {
            name: name.to_string(),
            media_types: media_types.iter().map(|s| s.to_string()).collect(),
            required: true,
            multiple: false,
        });
        self
    }

    pub fn with_json_input(mut self, name: &str, json_type: &str, required: bool) -> Self {
        self.interface.json.push(JsonInput {
            name: name.to_string(),
            json_type: json_type.to_string(),
            required,
        });
        self
    }

    pub fn try_build(self) -> Result<RecipeGraph> {
        RecipeGraph::build(self.nodes, self.interface)
    }

    pub fn build(self) -> RecipeGraph {
        self.try_build().expect("Failed to build valid graph from builder")
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Linear chain of jobs: `names[i]` depends on `names[i - 1]`.
pub fn chain(names: &[&str]) -> RecipeGraph {
    let mut builder = GraphBuilder::new();
    for (i, name) in names.iter().enumerate() {
        let deps: Vec<&str> = if i == 0 { vec![] } else { vec![names[i - 1]] };
        builder = builder.job(name, &deps);
    }
    builder.build()
}

/// Builder for `NodeDefinition`.
pub struct NodeBuilder {
    node: NodeDefinition,
}

impl NodeBuilder {
    pub fn job(name: &str) -> Self {
        Self {
            node: NodeDefinition::job(name, "my-job-type", "1.0.0", 1),
        }
    }

    pub fn job_revision(name: &str, revision: u32) -> Self {
        Self {
            node: NodeDefinition::job(name, "my-job-type", "1.0.0", revision),
        }
    }

    pub fn sub_recipe(name: &str, recipe_type: &str, revision: u32) -> Self {
        Self {
            node: NodeDefinition::sub_recipe(name, recipe_type, revision),
        }
    }

    pub fn condition(name: &str, filter: DataFilter, outputs: &[&str]) -> Self {
        Self {
            node: NodeDefinition::condition(name, filter, outputs.iter().copied()),
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.node = self.node.with_dependency(dep);
        self
    }

    pub fn after_all(mut self, deps: &[&str]) -> Self {
        for dep in deps {
            self = self.after(dep);
        }
        self
    }

    pub fn recipe_input(mut self, input: &str, recipe_input: &str) -> Self {
        self.node = self.node.with_input(input, InputBinding::recipe(recipe_input));
        self
    }

    pub fn dependency_input(mut self, input: &str, node: &str, output: &str) -> Self {
        self.node = self.node.with_input(input, InputBinding::dependency(node, output));
        self
    }

    pub fn build(self) -> NodeDefinition {
        self.node
    }
}

/// Filter from `(name, type, condition, values)` tuples.
pub fn filter(combine: Combine, clauses: &[(&str, &str, &str, Vec<Value>)]) -> DataFilter {
    let mut f = DataFilter::new(combine);
    for (name, ty, condition, values) in clauses {
        f.add_clause(name, ty, condition, values)
            .expect("invalid filter clause in test");
    }
    f
}
