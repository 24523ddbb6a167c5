// src/definition/model.rs

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::dag::interface::InputInterface;
use crate::dag::node::InputBinding;
use crate::filter::RawDataFilter;

/// Recipe definition document (version 6 layout), as read from TOML or JSON.
///
/// ```toml
/// version = "6"
///
/// [[input.files]]
/// name = "INPUT_IMAGE"
/// media_types = ["image/png"]
///
/// [nodes.node_a]
/// input = { INPUT_IMAGE = { type = "recipe", input = "INPUT_IMAGE" } }
/// node_type = { node_type = "job", job_type_name = "my-job-type", job_type_version = "1.0.0", job_type_revision = 1 }
///
/// [nodes.node_b]
/// dependencies = [{ name = "node_a" }]
/// input = { INPUT_IMAGE = { type = "dependency", node = "node_a", output = "OUTPUT_IMAGE" } }
/// node_type = { node_type = "recipe", recipe_type_name = "sub-recipe", recipe_type_revision = 1 }
/// ```
///
/// Nothing here is validated; see [`crate::definition::build_graph`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecipeDefinition {
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub input: InputInterface,

    /// `(name, node)` pairs in document order. A repeated name is kept as a
    /// second entry so graph building can reject it.
    #[serde(default, deserialize_with = "node_entries")]
    pub nodes: Vec<(String, RawNode)>,
}

fn node_entries<'de, D>(deserializer: D) -> Result<Vec<(String, RawNode)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct NodeEntries;

    impl<'de> Visitor<'de> for NodeEntries {
        type Value = Vec<(String, RawNode)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a table of nodes keyed by name")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, RawNode>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(NodeEntries)
}

/// `[nodes.<name>]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    #[serde(default)]
    pub dependencies: Vec<RawDependency>,

    /// Node input name -> where its value comes from.
    #[serde(default)]
    pub input: BTreeMap<String, InputBinding>,

    pub node_type: RawNodeType,
}

/// A dependency, written either as `"node_a"` or `{ name = "node_a" }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawDependency {
    Name(String),
    Named { name: String },
}

impl RawDependency {
    pub fn name(&self) -> &str {
        match self {
            RawDependency::Name(name) | RawDependency::Named { name } => name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "node_type", rename_all = "lowercase")]
pub enum RawNodeType {
    Job {
        job_type_name: String,
        job_type_version: String,
        job_type_revision: u32,
    },
    Recipe {
        recipe_type_name: String,
        recipe_type_revision: u32,
    },
    Condition {
        #[serde(default)]
        data_filter: RawDataFilter,

        /// Outputs published to dependents when the condition accepts.
        #[serde(default)]
        accepted_outputs: Vec<String>,

        /// Condition interface. When `accepted_outputs` is empty, the
        /// declared input names are published instead.
        #[serde(default)]
        interface: Option<InputInterface>,
    },
}
