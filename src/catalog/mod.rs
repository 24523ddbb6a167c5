// src/catalog/mod.rs

//! Narrow contract to the external file catalog.
//!
//! File-typed filter clauses only see file ids in the data bag; the catalog
//! turns those ids into filenames, media types, data type tags and metadata.

use std::collections::BTreeSet;
use std::fmt::Debug;

use serde_json::{Map, Value};

use crate::data::FileId;
use crate::errors::CatalogError;

pub mod memory;

pub use memory::InMemoryFileCatalog;

/// One file as known to the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub id: FileId,
    pub filename: String,
    pub media_type: String,
    pub data_types: BTreeSet<String>,
    /// Free-form metadata, read by `meta-data` filter clauses.
    pub metadata: Map<String, Value>,
}

impl FileRecord {
    pub fn new(id: FileId, filename: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            id,
            filename: filename.into(),
            media_type: media_type.into(),
            data_types: BTreeSet::new(),
            metadata: Map::new(),
        }
    }

    pub fn with_data_type(mut self, tag: impl Into<String>) -> Self {
        self.data_types.insert(tag.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Abstract file catalog.
pub trait FileCatalog: Send + Sync + Debug {
    /// Resolve every id to its record.
    ///
    /// Fails with [`CatalogError::NotFound`] if any id is unknown.
    fn lookup(&self, ids: &[FileId]) -> Result<Vec<FileRecord>, CatalogError>;
}
