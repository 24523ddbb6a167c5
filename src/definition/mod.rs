// src/definition/mod.rs

//! Recipe definition documents.
//!
//! - Define the serde data model of the document (`model.rs`).
//! - Load it from disk as TOML or JSON (`loader.rs`).
//! - Validate it into a [`crate::dag::RecipeGraph`] (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_build, load_from_path, parse_json, parse_toml};
pub use model::{RawDependency, RawNode, RawNodeType, RawRecipeDefinition};
pub use validate::{build_graph, SUPPORTED_VERSION};
