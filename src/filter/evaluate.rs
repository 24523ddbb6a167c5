// src/filter/evaluate.rs

//! Filter evaluation against a data bag.
//!
//! Evaluation never fails: a clause that cannot be evaluated (wrong value
//! type, unknown files) counts as not passed and leaves a diagnostic.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::catalog::FileCatalog;
use crate::data::{DataBag, FileId, ParameterValue};
use crate::errors::EvaluationError;
use crate::filter::clause::{field_value, FieldPath, FilterClause, FilterType, Operand};
use crate::filter::conditions::check;
use crate::filter::{Combine, DataFilter};

/// Outcome of one filter evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub accepted: bool,
    /// Clauses that could not be evaluated, in evaluation order.
    pub diagnostics: Vec<EvaluationError>,
}

impl Evaluation {
    fn new(accepted: bool, diagnostics: Vec<EvaluationError>) -> Self {
        Self {
            accepted,
            diagnostics,
        }
    }
}

impl DataFilter {
    /// Decide whether `bag` passes this filter.
    ///
    /// - `All`: every clause must pass; stops at the first failing clause.
    /// - `Any`: stops at the first passing clause.
    /// - A clause whose parameter is absent from the bag does not pass.
    /// - A filter without clauses accepts.
    pub fn evaluate(&self, bag: &DataBag, catalog: &dyn FileCatalog) -> Evaluation {
        let mut diagnostics = Vec::new();

        if self.clauses().is_empty() {
            return Evaluation::new(true, diagnostics);
        }

        let accepted = match self.combine() {
            Combine::All => self
                .clauses()
                .iter()
                .all(|clause| evaluate_clause(clause, bag, catalog, &mut diagnostics)),
            Combine::Any => self
                .clauses()
                .iter()
                .any(|clause| evaluate_clause(clause, bag, catalog, &mut diagnostics)),
        };

        debug!(
            accepted,
            combine = ?self.combine(),
            diagnostics = diagnostics.len(),
            "data filter evaluated"
        );

        Evaluation::new(accepted, diagnostics)
    }
}

fn evaluate_clause(
    clause: &FilterClause,
    bag: &DataBag,
    catalog: &dyn FileCatalog,
    diagnostics: &mut Vec<EvaluationError>,
) -> bool {
    let Some(value) = bag.get(&clause.name) else {
        debug!(clause = %clause.name, "parameter absent from data; clause not passed");
        return false;
    };

    let result = match clause.filter_type {
        FilterType::Object => evaluate_object_clause(clause, value),
        ty if ty.is_file_type() => evaluate_file_clause(clause, value, catalog),
        _ => evaluate_value_clause(clause, value),
    };

    match result {
        Ok(passed) => passed,
        Err(err) => {
            warn!(clause = %clause.name, error = %err, "filter clause could not be evaluated");
            diagnostics.push(err);
            false
        }
    }
}

fn evaluate_value_clause(
    clause: &FilterClause,
    value: &ParameterValue,
) -> Result<bool, EvaluationError> {
    let input = Operand::from_parameter(value, clause.filter_type).ok_or_else(|| {
        EvaluationError::TypeMismatch {
            clause: clause.name.clone(),
            expected: clause.filter_type.to_string(),
            found: value.type_name().to_string(),
        }
    })?;
    Ok(check(clause.condition, &input, &clause.values))
}

fn evaluate_object_clause(
    clause: &FilterClause,
    value: &ParameterValue,
) -> Result<bool, EvaluationError> {
    let ParameterValue::Object(object) = value else {
        return Err(EvaluationError::TypeMismatch {
            clause: clause.name.clone(),
            expected: "object".to_string(),
            found: value.type_name().to_string(),
        });
    };
    Ok(any_or_every(clause, &field_operands(object, &clause.fields)))
}

/// Resolve the referenced files and test one attribute of each.
fn evaluate_file_clause(
    clause: &FilterClause,
    value: &ParameterValue,
    catalog: &dyn FileCatalog,
) -> Result<bool, EvaluationError> {
    let ids = value
        .file_ids()
        .ok_or_else(|| EvaluationError::TypeMismatch {
            clause: clause.name.clone(),
            expected: "file".to_string(),
            found: value.type_name().to_string(),
        })?;

    let ids: Vec<FileId> = ids.iter().copied().collect();
    let records = catalog
        .lookup(&ids)
        .map_err(|source| EvaluationError::FileLookup {
            clause: clause.name.clone(),
            source,
        })?;

    let mut attributes = Vec::with_capacity(records.len());
    for record in records {
        match clause.filter_type {
            FilterType::MediaType => attributes.push(Operand::Str(record.media_type)),
            FilterType::DataType => attributes.push(Operand::List(
                record.data_types.into_iter().map(Operand::Str).collect(),
            )),
            FilterType::MetaData => {
                attributes.extend(field_operands(&record.metadata, &clause.fields))
            }
            _ => attributes.push(Operand::Str(record.filename)),
        }
    }

    Ok(any_or_every(clause, &attributes))
}

/// Positive conditions pass if any datum satisfies them; `!=` and `not in`
/// need every datum to satisfy them. No datum at all never passes.
fn any_or_every(clause: &FilterClause, data: &[Operand]) -> bool {
    if data.is_empty() {
        return false;
    }
    let passes = |datum: &Operand| check(clause.condition, datum, &clause.values);
    if clause.condition.is_negative() {
        data.iter().all(passes)
    } else {
        data.iter().any(passes)
    }
}

/// Values found at the clause's field paths. Missing paths, objects and
/// `null`s contribute nothing.
fn field_operands(root: &Map<String, Value>, fields: &[FieldPath]) -> Vec<Operand> {
    fields
        .iter()
        .filter_map(|path| field_value(root, path))
        .filter_map(Operand::from_value)
        .collect()
}
