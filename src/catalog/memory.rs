// src/catalog/memory.rs

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{FileCatalog, FileRecord};
use crate::data::FileId;
use crate::errors::CatalogError;

/// Catalog backed by a shared in-process map.
///
/// Clones share the same storage, so a test can keep a handle and add files
/// after the catalog was handed to the engine.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFileCatalog {
    files: Arc<RwLock<HashMap<FileId, FileRecord>>>,
}

impl InMemoryFileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, record: FileRecord) {
        match self.files.write() {
            Ok(mut files) => {
                files.insert(record.id, record);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(record.id, record);
            }
        }
    }

    pub fn with_file(self, record: FileRecord) -> Self {
        self.add_file(record);
        self
    }
}

impl FileCatalog for InMemoryFileCatalog {
    fn lookup(&self, ids: &[FileId]) -> Result<Vec<FileRecord>, CatalogError> {
        let files = self
            .files
            .read()
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        let missing: Vec<FileId> = ids
            .iter()
            .copied()
            .filter(|id| !files.contains_key(id))
            .collect();
        if !missing.is_empty() {
            return Err(CatalogError::NotFound(missing));
        }

        Ok(ids.iter().filter_map(|id| files.get(id).cloned()).collect())
    }
}
