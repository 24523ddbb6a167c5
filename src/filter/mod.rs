// src/filter/mod.rs

//! Data filter engine used by condition nodes.
//!
//! - [`clause`] builds validated [`FilterClause`]s.
//! - [`conditions`] holds the pure comparison predicates.
//! - [`evaluate`] runs a [`DataFilter`] against a [`crate::data::DataBag`].

pub mod clause;
pub mod conditions;
pub mod evaluate;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::DefinitionError;

pub use clause::{Condition, FieldPath, FilterClause, FilterType, Operand, RawFilterClause};
pub use evaluate::Evaluation;

/// How clause results are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Combine {
    /// Every clause must pass.
    All,
    /// The first passing clause accepts.
    Any,
}

/// Kind of a parameter a condition can see, for [`DataFilter::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    File,
    Json,
    /// Produced by an upstream node; its kind is not declared anywhere.
    Unknown,
}

/// Filter as written in a definition document:
///
/// ```toml
/// data_filter = { all = true, filters = [
///     { name = "age", type = "integer", condition = ">", values = [18] },
/// ] }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawDataFilter {
    #[serde(default)]
    pub filters: Vec<RawFilterClause>,
    #[serde(default = "default_all")]
    pub all: bool,
}

fn default_all() -> bool {
    true
}

impl Default for RawDataFilter {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            all: default_all(),
        }
    }
}

/// An ordered list of clauses plus a combination rule.
///
/// Stateless after construction. Equality is structural: the same combine
/// rule and the same ordered clause list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataFilter {
    clauses: Vec<FilterClause>,
    combine: Combine,
}

impl DataFilter {
    pub fn new(combine: Combine) -> Self {
        Self {
            clauses: Vec::new(),
            combine,
        }
    }

    /// A filter with no clauses; it accepts everything.
    pub fn accept_all() -> Self {
        Self::new(Combine::All)
    }

    pub fn from_raw(raw: &RawDataFilter) -> Result<Self, DefinitionError> {
        let combine = if raw.all { Combine::All } else { Combine::Any };
        let clauses = raw
            .filters
            .iter()
            .map(FilterClause::from_raw)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { clauses, combine })
    }

    /// Validate and append one clause.
    pub fn add_clause(
        &mut self,
        name: &str,
        type_name: &str,
        condition: &str,
        values: &[serde_json::Value],
    ) -> Result<(), DefinitionError> {
        let clause = FilterClause::new(name, type_name, condition, values)?;
        self.clauses.push(clause);
        Ok(())
    }

    /// Builder-style [`DataFilter::add_clause`].
    pub fn with_clause(
        mut self,
        name: &str,
        type_name: &str,
        condition: &str,
        values: &[serde_json::Value],
    ) -> Result<Self, DefinitionError> {
        self.add_clause(name, type_name, condition, values)?;
        Ok(self)
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn combine(&self) -> Combine {
        self.combine
    }

    /// Structural equality; used to tell whether a condition node changed
    /// between two graph revisions.
    pub fn is_equal(&self, other: &DataFilter) -> bool {
        self == other
    }

    /// Check the filter against the parameters its condition can see.
    ///
    /// Returns human-readable warnings; a filter with warnings is still
    /// usable, its affected clauses simply never pass.
    pub fn validate(&self, visible: &BTreeMap<String, ParameterKind>) -> Vec<String> {
        let mut warnings = Vec::new();

        for clause in &self.clauses {
            match visible.get(&clause.name) {
                None => warnings.push(format!(
                    "filter clause '{}' tests a parameter the condition cannot see",
                    clause.name
                )),
                Some(ParameterKind::Json) if clause.filter_type.is_file_type() => {
                    warnings.push(format!(
                        "filter clause '{}' has file type '{}' but the parameter is JSON",
                        clause.name, clause.filter_type
                    ))
                }
                Some(ParameterKind::File) if !clause.filter_type.is_file_type() => {
                    warnings.push(format!(
                        "filter clause '{}' has type '{}' but the parameter is a file",
                        clause.name, clause.filter_type
                    ))
                }
                Some(_) => {}
            }
        }

        warnings
    }
}
