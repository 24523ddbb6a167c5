// src/dag/interface.rs

//! Recipe input interface: which inputs a recipe declares, and validation of
//! submitted data against it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::data::{DataBag, ParameterValue};
use crate::errors::{RecipeflowError, Result};
use crate::filter::ParameterKind;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputInterface {
    #[serde(default)]
    pub files: Vec<FileInput>,
    #[serde(default)]
    pub json: Vec<JsonInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInput {
    pub name: String,
    #[serde(default)]
    pub media_types: Vec<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub multiple: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonInput {
    pub name: String,
    #[serde(rename = "type")]
    pub json_type: String,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl InputInterface {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.json.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kind_of(name).is_some()
    }

    pub fn kind_of(&self, name: &str) -> Option<ParameterKind> {
        if self.files.iter().any(|f| f.name == name) {
            Some(ParameterKind::File)
        } else if self.json.iter().any(|j| j.name == name) {
            Some(ParameterKind::Json)
        } else {
            None
        }
    }

    /// Every declared input and its kind.
    pub fn parameter_kinds(&self) -> BTreeMap<String, ParameterKind> {
        let files = self
            .files
            .iter()
            .map(|f| (f.name.clone(), ParameterKind::File));
        let json = self
            .json
            .iter()
            .map(|j| (j.name.clone(), ParameterKind::Json));
        files.chain(json).collect()
    }

    /// Check submitted recipe input against the declared interface.
    ///
    /// Returns warnings for values the interface does not declare; fails with
    /// [`RecipeflowError::InvalidInput`] for anything that would leave a node
    /// without usable input.
    pub fn validate_data(&self, data: &DataBag) -> Result<Vec<String>> {
        for file in &self.files {
            match data.get(&file.name) {
                None if file.required => {
                    return Err(invalid(format!("required file input '{}' is missing", file.name)));
                }
                None => {}
                Some(ParameterValue::Files(ids)) => {
                    if ids.is_empty() && file.required {
                        return Err(invalid(format!(
                            "required file input '{}' has no files",
                            file.name
                        )));
                    }
                    if ids.len() > 1 && !file.multiple {
                        return Err(invalid(format!(
                            "file input '{}' accepts a single file, got {}",
                            file.name,
                            ids.len()
                        )));
                    }
                }
                Some(other) => {
                    return Err(invalid(format!(
                        "file input '{}' got a {} value",
                        file.name,
                        other.type_name()
                    )));
                }
            }
        }

        for json in &self.json {
            match data.get(&json.name) {
                None if json.required => {
                    return Err(invalid(format!("required json input '{}' is missing", json.name)));
                }
                None => {}
                Some(value) if !json_type_accepts(&json.json_type, value) => {
                    return Err(invalid(format!(
                        "json input '{}' expects {}, got {}",
                        json.name,
                        json.json_type,
                        value.type_name()
                    )));
                }
                Some(_) => {}
            }
        }

        let warnings: Vec<String> = data
            .names()
            .filter(|name| !self.contains(name))
            .map(|name| format!("input '{name}' is not declared by the recipe interface"))
            .collect();
        for w in &warnings {
            warn!(warning = %w, "recipe input validation");
        }
        Ok(warnings)
    }
}

fn json_type_accepts(declared: &str, value: &ParameterValue) -> bool {
    match (declared, value) {
        (_, ParameterValue::Files(_)) => false,
        ("number", ParameterValue::Integer(_)) => true,
        (declared, value) => declared == value.type_name(),
    }
}

fn invalid(msg: String) -> RecipeflowError {
    RecipeflowError::InvalidInput(msg)
}
