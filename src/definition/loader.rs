// src/definition/loader.rs

use std::fs;
use std::path::Path;

use crate::dag::graph::RecipeGraph;
use crate::definition::model::RawRecipeDefinition;
use crate::definition::validate::build_graph;
use crate::errors::Result;

/// Read a definition document. `.json` files are parsed as JSON, anything
/// else as TOML. No semantic validation happens here.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawRecipeDefinition> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        parse_json(&contents)
    } else {
        parse_toml(&contents)
    }
}

pub fn parse_toml(contents: &str) -> Result<RawRecipeDefinition> {
    let raw: RawRecipeDefinition = toml::from_str(contents)?;
    Ok(raw)
}

pub fn parse_json(contents: &str) -> Result<RawRecipeDefinition> {
    let raw: RawRecipeDefinition = serde_json::from_str(contents)?;
    Ok(raw)
}

/// Read a definition document and build its graph.
pub fn load_and_build(path: impl AsRef<Path>) -> Result<RecipeGraph> {
    let raw = load_from_path(path)?;
    build_graph(raw)
}
