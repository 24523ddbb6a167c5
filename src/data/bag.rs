// src/data/bag.rs

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::data::value::{FileId, ParameterValue};

/// Named, typed values: recipe input, node outputs, or the data a condition
/// evaluates against.
///
/// A bag handed to an evaluation is only ever borrowed, so it cannot change
/// while the evaluation runs.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "RawDataBag")]
pub struct DataBag {
    values: BTreeMap<String, ParameterValue>,
}

/// On-disk shape of a data bag, split by value family:
///
/// ```toml
/// [files]
/// INPUT_IMAGE = [12, 13]
///
/// [json]
/// bar = "hello"
/// threshold = 0.5
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDataBag {
    #[serde(default)]
    pub files: BTreeMap<String, Vec<FileId>>,
    #[serde(default)]
    pub json: BTreeMap<String, Value>,
}

impl From<RawDataBag> for DataBag {
    fn from(raw: RawDataBag) -> Self {
        let mut bag = DataBag::new();
        for (name, ids) in raw.files {
            bag.insert(name, ParameterValue::files(ids));
        }
        for (name, value) in raw.json {
            match ParameterValue::from_json(value) {
                Some(v) => bag.insert(name, v),
                None => debug!(parameter = %name, "null value dropped from data bag"),
            }
        }
        bag
    }
}

impl DataBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParameterValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// A new bag holding `self` with every entry of `other` laid on top.
    pub fn overlay(&self, other: &DataBag) -> DataBag {
        let mut merged = self.clone();
        for (name, value) in other.values.iter() {
            merged.values.insert(name.clone(), value.clone());
        }
        merged
    }

    /// A new bag holding only the listed names (missing names are skipped).
    pub fn restrict<'a, I>(&self, names: I) -> DataBag
    where
        I: IntoIterator<Item = &'a String>,
    {
        names
            .into_iter()
            .filter_map(|name| self.values.get(name).map(|v| (name.clone(), v.clone())))
            .collect()
    }

    /// Names whose value differs between the two bags, including names
    /// present in only one of them.
    pub fn changed_names(&self, other: &DataBag) -> BTreeSet<String> {
        let mut changed = BTreeSet::new();
        for (name, value) in self.values.iter() {
            if other.values.get(name) != Some(value) {
                changed.insert(name.clone());
            }
        }
        for name in other.values.keys() {
            if !self.values.contains_key(name) {
                changed.insert(name.clone());
            }
        }
        changed
    }
}

impl FromIterator<(String, ParameterValue)> for DataBag {
    fn from_iter<T: IntoIterator<Item = (String, ParameterValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
