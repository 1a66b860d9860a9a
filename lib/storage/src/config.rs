//! Storage location configuration.

use crate::{ClientStorage, FileStorage, MemoryStorage, StorageError};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Where client state is kept between runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding all stored keys. Without a path, state lives in
    /// memory and is lost on exit.
    #[serde(default = "default_path")]
    pub path: Option<PathBuf>,
}

fn default_path() -> Option<PathBuf> {
    Some(PathBuf::from("pawtag-state.json"))
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
        }
    }
}

impl StorageConfig {
    /// A configuration that keeps everything in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self { path: None }
    }

    /// Opens the configured store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file store cannot be prepared.
    pub fn open(&self) -> Result<Arc<dyn ClientStorage>, StorageError> {
        match &self.path {
            Some(path) => Ok(Arc::new(FileStorage::open(path)?)),
            None => Ok(Arc::new(MemoryStorage::new())),
        }
    }
}
