// src/data/value.rs

use std::collections::BTreeSet;
use std::fmt;

use serde_json::{Map, Value};

/// Identifier of a file known to the external file catalog.
pub type FileId = u64;

/// One typed datum.
///
/// File references only carry ids; filename, media type and metadata are
/// resolved through a [`crate::catalog::FileCatalog`] when needed.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Object(Map<String, Value>),
    Array(Vec<Value>),
    Files(BTreeSet<FileId>),
}

impl ParameterValue {
    /// Convert a JSON value into a parameter value.
    ///
    /// `null` has no parameter representation and yields `None`; the caller
    /// treats it as an absent parameter.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(ParameterValue::Boolean(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(ParameterValue::Integer(i)),
                None => n.as_f64().map(ParameterValue::Number),
            },
            Value::String(s) => Some(ParameterValue::String(s)),
            Value::Array(items) => Some(ParameterValue::Array(items)),
            Value::Object(map) => Some(ParameterValue::Object(map)),
        }
    }

    /// File reference built from any iterator of ids.
    pub fn files<I: IntoIterator<Item = FileId>>(ids: I) -> Self {
        ParameterValue::Files(ids.into_iter().collect())
    }

    /// Short type label used in diagnostics and interface validation.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::String(_) => "string",
            ParameterValue::Integer(_) => "integer",
            ParameterValue::Number(_) => "number",
            ParameterValue::Boolean(_) => "boolean",
            ParameterValue::Object(_) => "object",
            ParameterValue::Array(_) => "array",
            ParameterValue::Files(_) => "file",
        }
    }

    pub fn file_ids(&self) -> Option<&BTreeSet<FileId>> {
        match self {
            ParameterValue::Files(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, ParameterValue::Files(_))
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::String(s) => write!(f, "{s:?}"),
            ParameterValue::Integer(i) => write!(f, "{i}"),
            ParameterValue::Number(n) => write!(f, "{n}"),
            ParameterValue::Boolean(b) => write!(f, "{b}"),
            ParameterValue::Object(map) => write!(f, "{}", Value::Object(map.clone())),
            ParameterValue::Array(items) => write!(f, "{}", Value::Array(items.clone())),
            ParameterValue::Files(ids) => write!(f, "files{ids:?}"),
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(s: &str) -> Self {
        ParameterValue::String(s.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(s: String) -> Self {
        ParameterValue::String(s)
    }
}

impl From<i64> for ParameterValue {
    fn from(i: i64) -> Self {
        ParameterValue::Integer(i)
    }
}

impl From<f64> for ParameterValue {
    fn from(n: f64) -> Self {
        ParameterValue::Number(n)
    }
}

impl From<bool> for ParameterValue {
    fn from(b: bool) -> Self {
        ParameterValue::Boolean(b)
    }
}
