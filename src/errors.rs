// src/errors.rs

//! Crate-wide error types.
//!
//! Construction-time problems (`DefinitionError`, `GraphError`) abort the
//! operation that hit them. `EvaluationError` is never returned as an `Err`
//! from filter evaluation; it travels next to the boolean outcome as a
//! diagnostic.

use thiserror::Error;

use crate::data::FileId;
use crate::recipe::RecipeId;

/// A malformed definition: filter clauses, bindings, versions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("missing name for filter clause")]
    MissingName,

    #[error("missing type for '{name}'")]
    MissingType { name: String },

    #[error("missing condition for '{name}'")]
    MissingCondition { name: String },

    #[error("unknown filter type '{type_name}' for '{name}'")]
    UnknownType { name: String, type_name: String },

    #[error("invalid condition '{condition}' for '{name}'; valid conditions are: {valid}")]
    InvalidCondition {
        name: String,
        condition: String,
        valid: String,
    },

    #[error("missing values for '{name}'")]
    MissingValues { name: String },

    #[error("expected {expected} for '{name}', found {found}")]
    ValueError {
        name: String,
        expected: String,
        found: String,
    },

    #[error("'{name}' has type '{type_name}', which needs at least one field path")]
    MissingFields { name: String, type_name: String },

    #[error("invalid field paths for '{name}': {reason}")]
    InvalidFields { name: String, reason: String },

    #[error("node '{node}' binds input '{input}' to unknown recipe input '{recipe_input}'")]
    UnknownRecipeInput {
        node: String,
        input: String,
        recipe_input: String,
    },

    #[error(
        "node '{node}' binds input '{input}' to output '{output}' of condition '{condition}', which is not an accepted output"
    )]
    UnknownConditionOutput {
        node: String,
        input: String,
        condition: String,
        output: String,
    },

    #[error("unsupported definition version '{0}' (expected \"6\")")]
    UnsupportedVersion(String),

    #[error("node '{node}' references unknown recipe type '{recipe_type}' revision {revision}")]
    UnknownRecipeType {
        node: String,
        recipe_type: String,
        revision: u32,
    },

    #[error("recipe type '{0}' contains itself through its sub-recipes")]
    RecursiveSubRecipe(String),
}

/// Structural problems with the node/dependency graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("cycle detected in recipe graph involving node '{node}'")]
    CyclicGraph { node: String },

    #[error("node '{referenced_by}' references unknown node '{node}'")]
    UnknownNode { node: String, referenced_by: String },

    #[error("duplicate node '{node}'")]
    DuplicateNode { node: String },
}

/// Failure reported by the external file catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("unknown file id(s): {0:?}")]
    NotFound(Vec<FileId>),

    #[error("file catalog unavailable: {0}")]
    Unavailable(String),
}

/// A clause could not be evaluated; the clause counts as not passed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("file lookup failed for clause '{clause}': {source}")]
    FileLookup {
        clause: String,
        #[source]
        source: CatalogError,
    },

    #[error("type mismatch for clause '{clause}': expected {expected}, found {found}")]
    TypeMismatch {
        clause: String,
        expected: String,
        found: String,
    },
}

#[derive(Error, Debug)]
pub enum RecipeflowError {
    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid recipe input: {0}")]
    InvalidInput(String),

    #[error("Recipe not found: {0}")]
    UnknownRecipe(RecipeId),

    #[error("engine is not running")]
    EngineStopped,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RecipeflowError>;
