// src/filter/clause.rs

//! Filter clause construction.
//!
//! Everything that can be wrong with a clause is detected here, when the
//! clause is built; a constructed clause never fails structurally later.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data::ParameterValue;
use crate::errors::DefinitionError;

/// Declared type of the datum a clause tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterType {
    String,
    Filename,
    MediaType,
    Integer,
    Number,
    Boolean,
    /// A JSON array parameter.
    Array,
    /// Fields of a JSON object parameter, addressed by key paths.
    Object,
    /// Fields of the catalog metadata of referenced files.
    MetaData,
    /// Data type tags of referenced files.
    DataType,
}

const STRING_CONDITIONS: &[Condition] = &[
    Condition::Equal,
    Condition::NotEqual,
    Condition::In,
    Condition::NotIn,
    Condition::Contains,
];

const NUMBER_CONDITIONS: &[Condition] = &[
    Condition::LessThan,
    Condition::LessThanEqual,
    Condition::GreaterThan,
    Condition::GreaterThanEqual,
    Condition::Equal,
    Condition::NotEqual,
    Condition::Between,
    Condition::In,
    Condition::NotIn,
];

const BOOL_CONDITIONS: &[Condition] = &[Condition::Equal, Condition::NotEqual];

const LIST_CONDITIONS: &[Condition] = &[
    Condition::Equal,
    Condition::NotEqual,
    Condition::In,
    Condition::NotIn,
    Condition::Contains,
    Condition::SubsetOf,
    Condition::SupersetOf,
];

const ALL_CONDITIONS: &[Condition] = &[
    Condition::LessThan,
    Condition::LessThanEqual,
    Condition::GreaterThan,
    Condition::GreaterThanEqual,
    Condition::Equal,
    Condition::NotEqual,
    Condition::Between,
    Condition::In,
    Condition::NotIn,
    Condition::Contains,
    Condition::SubsetOf,
    Condition::SupersetOf,
];

impl FilterType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "string" => Some(FilterType::String),
            "filename" => Some(FilterType::Filename),
            "media-type" => Some(FilterType::MediaType),
            "integer" => Some(FilterType::Integer),
            "number" => Some(FilterType::Number),
            "boolean" => Some(FilterType::Boolean),
            "array" => Some(FilterType::Array),
            "object" => Some(FilterType::Object),
            "meta-data" => Some(FilterType::MetaData),
            "data-type" => Some(FilterType::DataType),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterType::String => "string",
            FilterType::Filename => "filename",
            FilterType::MediaType => "media-type",
            FilterType::Integer => "integer",
            FilterType::Number => "number",
            FilterType::Boolean => "boolean",
            FilterType::Array => "array",
            FilterType::Object => "object",
            FilterType::MetaData => "meta-data",
            FilterType::DataType => "data-type",
        }
    }

    /// Conditions a clause of this type may use.
    ///
    /// Field values have no declared type, so field clauses may use any
    /// condition.
    pub fn legal_conditions(&self) -> &'static [Condition] {
        match self {
            FilterType::String | FilterType::Filename | FilterType::MediaType => STRING_CONDITIONS,
            FilterType::Integer | FilterType::Number => NUMBER_CONDITIONS,
            FilterType::Boolean => BOOL_CONDITIONS,
            FilterType::Array | FilterType::DataType => LIST_CONDITIONS,
            FilterType::Object | FilterType::MetaData => ALL_CONDITIONS,
        }
    }

    /// File-typed clauses test catalog attributes of referenced files.
    pub fn is_file_type(&self) -> bool {
        matches!(
            self,
            FilterType::Filename | FilterType::MediaType | FilterType::MetaData | FilterType::DataType
        )
    }

    /// Field clauses read their datum through key paths.
    pub fn uses_fields(&self) -> bool {
        matches!(self, FilterType::Object | FilterType::MetaData)
    }

    /// Clause values of these types are taken as plain JSON data.
    fn is_untyped(&self) -> bool {
        matches!(
            self,
            FilterType::Array | FilterType::Object | FilterType::MetaData | FilterType::DataType
        )
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison applied between the datum and the clause values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Condition {
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "between")]
    Between,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in")]
    NotIn,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "subset of")]
    SubsetOf,
    #[serde(rename = "superset of")]
    SupersetOf,
}

impl Condition {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "<" => Some(Condition::LessThan),
            "<=" => Some(Condition::LessThanEqual),
            ">" => Some(Condition::GreaterThan),
            ">=" => Some(Condition::GreaterThanEqual),
            "==" => Some(Condition::Equal),
            "!=" => Some(Condition::NotEqual),
            "between" => Some(Condition::Between),
            "in" => Some(Condition::In),
            "not in" => Some(Condition::NotIn),
            "contains" => Some(Condition::Contains),
            "subset of" => Some(Condition::SubsetOf),
            "superset of" => Some(Condition::SupersetOf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::LessThan => "<",
            Condition::LessThanEqual => "<=",
            Condition::GreaterThan => ">",
            Condition::GreaterThanEqual => ">=",
            Condition::Equal => "==",
            Condition::NotEqual => "!=",
            Condition::Between => "between",
            Condition::In => "in",
            Condition::NotIn => "not in",
            Condition::Contains => "contains",
            Condition::SubsetOf => "subset of",
            Condition::SupersetOf => "superset of",
        }
    }

    /// Negative conditions must hold for every file of a file-typed clause.
    pub fn is_negative(&self) -> bool {
        matches!(self, Condition::NotEqual | Condition::NotIn)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn condition_list(conditions: &[Condition]) -> String {
    conditions
        .iter()
        .map(|c| format!("'{c}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A typed value taking part in a comparison.
///
/// Clause values are normalised to the clause type at construction, so
/// structural equality of two clauses is plain `==` on their operands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Operand {
    Str(String),
    Int(i64),
    Num(f64),
    Bool(bool),
    List(Vec<Operand>),
}

impl Operand {
    /// Lenient conversion used when building clauses: numeric and boolean
    /// types also accept their string spelling (`"18"`, `"true"`).
    pub fn parse(value: &Value, ty: FilterType) -> Option<Operand> {
        if ty.is_untyped() {
            return Operand::from_value(value);
        }
        if let Value::Array(items) = value {
            return items
                .iter()
                .map(|item| Operand::parse(item, ty))
                .collect::<Option<Vec<_>>>()
                .map(Operand::List);
        }
        if let Some(strict) = Operand::from_json(value, ty) {
            return Some(strict);
        }
        let text = value.as_str()?.trim();
        match ty {
            FilterType::Integer => text.parse::<i64>().ok().map(Operand::Int),
            FilterType::Number => text.parse::<f64>().ok().and_then(finite).map(Operand::Num),
            FilterType::Boolean => text.parse::<bool>().ok().map(Operand::Bool),
            _ => None,
        }
    }

    /// Untyped conversion of a JSON datum. Objects and `null` have no
    /// operand form.
    pub fn from_value(value: &Value) -> Option<Operand> {
        match value {
            Value::String(s) => Some(Operand::Str(s.clone())),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Operand::Int(i)),
                None => n.as_f64().and_then(finite).map(Operand::Num),
            },
            Value::Bool(b) => Some(Operand::Bool(*b)),
            Value::Array(items) => items
                .iter()
                .map(Operand::from_value)
                .collect::<Option<Vec<_>>>()
                .map(Operand::List),
            Value::Object(_) | Value::Null => None,
        }
    }

    /// Strict conversion of a JSON datum to the clause type.
    pub fn from_json(value: &Value, ty: FilterType) -> Option<Operand> {
        if ty.is_untyped() {
            return Operand::from_value(value);
        }
        match (ty, value) {
            (_, Value::Array(items)) => items
                .iter()
                .map(|item| Operand::from_json(item, ty))
                .collect::<Option<Vec<_>>>()
                .map(Operand::List),
            (FilterType::String | FilterType::Filename | FilterType::MediaType, Value::String(s)) => {
                Some(Operand::Str(s.clone()))
            }
            (FilterType::Integer, Value::Number(n)) => match n.as_i64() {
                Some(i) => Some(Operand::Int(i)),
                None => n.as_f64().and_then(integral).map(Operand::Int),
            },
            (FilterType::Number, Value::Number(n)) => n.as_f64().and_then(finite).map(Operand::Num),
            (FilterType::Boolean, Value::Bool(b)) => Some(Operand::Bool(*b)),
            _ => None,
        }
    }

    /// Convert a bag value to the clause type; `None` is a type mismatch.
    pub fn from_parameter(value: &ParameterValue, ty: FilterType) -> Option<Operand> {
        match (ty, value) {
            (FilterType::String, ParameterValue::String(s)) => Some(Operand::Str(s.clone())),
            (FilterType::Integer, ParameterValue::Integer(i)) => Some(Operand::Int(*i)),
            (FilterType::Integer, ParameterValue::Number(n)) => integral(*n).map(Operand::Int),
            (FilterType::Number, ParameterValue::Integer(i)) => Some(Operand::Num(*i as f64)),
            (FilterType::Number, ParameterValue::Number(n)) => Some(Operand::Num(*n)),
            (FilterType::Boolean, ParameterValue::Boolean(b)) => Some(Operand::Bool(*b)),
            (FilterType::Array, ParameterValue::Array(items)) => {
                Operand::from_value(&Value::Array(items.clone()))
            }
            (FilterType::Array | FilterType::Object, _) => None,
            (_, ParameterValue::Array(items)) if !ty.is_file_type() => items
                .iter()
                .map(|item| Operand::from_json(item, ty))
                .collect::<Option<Vec<_>>>()
                .map(Operand::List),
            _ => None,
        }
    }

    /// Loose equality: integers and floats compare numerically, lists
    /// element-wise.
    pub fn matches(&self, other: &Operand) -> bool {
        match (self, other) {
            (Operand::List(a), Operand::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.matches(y))
            }
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => self == other,
            },
        }
    }

    /// Ordering between numbers, or between strings. Anything else is
    /// unordered.
    pub fn compare(&self, other: &Operand) -> Option<Ordering> {
        match (self, other) {
            (Operand::Str(a), Operand::Str(b)) => Some(a.cmp(b)),
            _ => self.as_f64()?.partial_cmp(&other.as_f64()?),
        }
    }

    /// Elements of a list; a scalar is its own single element.
    pub fn elements(&self) -> &[Operand] {
        match self {
            Operand::List(items) => items,
            other => std::slice::from_ref(other),
        }
    }

    /// Membership: a list holds a matching element, or a string holds a
    /// substring.
    pub fn holds(&self, item: &Operand) -> bool {
        match (self, item) {
            (Operand::List(items), _) => items.iter().any(|x| x.matches(item)),
            (Operand::Str(haystack), Operand::Str(needle)) => haystack.contains(needle.as_str()),
            _ => false,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Operand::Int(i) => Some(*i as f64),
            Operand::Num(n) => Some(*n),
            _ => None,
        }
    }
}

/// NaN and infinities are not legal clause values.
fn finite(n: f64) -> Option<f64> {
    n.is_finite().then_some(n)
}

fn integral(n: f64) -> Option<i64> {
    if n.is_finite() && n.fract() == 0.0 {
        Some(n as i64)
    } else {
        None
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Str(s) => write!(f, "{s:?}"),
            Operand::Int(i) => write!(f, "{i}"),
            Operand::Num(n) => write!(f, "{n}"),
            Operand::Bool(b) => write!(f, "{b}"),
            Operand::List(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

/// Key path into a JSON object, one key per nesting level.
pub type FieldPath = Vec<String>;

/// One validated predicate: `<name> <condition> <values>` over a datum of
/// type `filter_type`.
///
/// `object` and `meta-data` clauses read their datum from `fields`; every
/// other type has none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterClause {
    pub name: String,
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    pub condition: Condition,
    pub values: Vec<Operand>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldPath>,
}

/// Clause as written in a definition document. Every field is optional so
/// that a missing field is reported with the clause name instead of as a
/// parse error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFilterClause {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub filter_type: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub values: Vec<Value>,
    #[serde(default)]
    pub fields: Vec<FieldPath>,
}

impl FilterClause {
    pub fn new(
        name: &str,
        type_name: &str,
        condition: &str,
        values: &[Value],
    ) -> Result<Self, DefinitionError> {
        Self::with_fields(name, type_name, condition, values, &[])
    }

    /// Build a clause that may address fields of its datum.
    pub fn with_fields(
        name: &str,
        type_name: &str,
        condition: &str,
        values: &[Value],
        fields: &[FieldPath],
    ) -> Result<Self, DefinitionError> {
        if name.trim().is_empty() {
            return Err(DefinitionError::MissingName);
        }
        let name = name.to_string();

        if type_name.trim().is_empty() {
            return Err(DefinitionError::MissingType { name });
        }
        if condition.trim().is_empty() {
            return Err(DefinitionError::MissingCondition { name });
        }

        let filter_type = FilterType::parse(type_name).ok_or_else(|| DefinitionError::UnknownType {
            name: name.clone(),
            type_name: type_name.to_string(),
        })?;

        let parsed = Condition::parse(condition).ok_or_else(|| DefinitionError::InvalidCondition {
            name: name.clone(),
            condition: condition.to_string(),
            valid: condition_list(ALL_CONDITIONS),
        })?;

        let legal = filter_type.legal_conditions();
        if !legal.contains(&parsed) {
            return Err(DefinitionError::InvalidCondition {
                name,
                condition: condition.to_string(),
                valid: condition_list(legal),
            });
        }

        if values.is_empty() {
            return Err(DefinitionError::MissingValues { name });
        }

        let mut operands = Vec::with_capacity(values.len());
        for value in values {
            let operand =
                Operand::parse(value, filter_type).ok_or_else(|| DefinitionError::ValueError {
                    name: name.clone(),
                    expected: filter_type.to_string(),
                    found: value.to_string(),
                })?;
            operands.push(operand);
        }

        check_fields(&name, filter_type, fields)?;

        Ok(Self {
            name,
            filter_type,
            condition: parsed,
            values: operands,
            fields: fields.to_vec(),
        })
    }

    pub fn from_raw(raw: &RawFilterClause) -> Result<Self, DefinitionError> {
        let name = raw.name.as_deref().unwrap_or_default();
        Self::with_fields(
            name,
            raw.filter_type.as_deref().unwrap_or_default(),
            raw.condition.as_deref().unwrap_or_default(),
            &raw.values,
            &raw.fields,
        )
    }
}

fn check_fields(name: &str, ty: FilterType, fields: &[FieldPath]) -> Result<(), DefinitionError> {
    if !ty.uses_fields() {
        if fields.is_empty() {
            return Ok(());
        }
        return Err(DefinitionError::InvalidFields {
            name: name.to_string(),
            reason: format!("type '{ty}' does not take field paths"),
        });
    }

    if fields.is_empty() {
        return Err(DefinitionError::MissingFields {
            name: name.to_string(),
            type_name: ty.to_string(),
        });
    }
    if let Some(path) = fields
        .iter()
        .find(|path| path.is_empty() || path.iter().any(|key| key.is_empty()))
    {
        return Err(DefinitionError::InvalidFields {
            name: name.to_string(),
            reason: format!("empty key in path {path:?}"),
        });
    }
    Ok(())
}

/// Value at `path` inside `root`, if every key along the way exists.
pub fn field_value<'a>(root: &'a Map<String, Value>, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(root.get(first)?, |value, key| value.as_object()?.get(key))
}
