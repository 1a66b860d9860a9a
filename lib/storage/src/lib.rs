//! Durable client-side storage.
//!
//! The client persists three opaque blobs between runs: the session token,
//! the selected backend environment and the shopping cart. Each lives under
//! a fixed key in a [`ClientStorage`] implementation.

pub mod config;
pub mod error;
pub mod file;
pub mod keys;
pub mod memory;

pub use config::StorageConfig;
pub use error::StorageError;
pub use file::FileStorage;
pub use memory::MemoryStorage;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Key/value store for opaque string values.
pub trait ClientStorage: Send + Sync {
    /// Returns the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes the value stored under `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Reads and decodes a JSON value stored under `key`.
///
/// # Errors
///
/// Returns an error if the store cannot be read or the stored value is not
/// valid JSON for `T`.
pub fn get_json<T: DeserializeOwned>(
    storage: &dyn ClientStorage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = storage.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| StorageError::Decode {
            key: key.to_string(),
            details: e.to_string(),
        })
}

/// Encodes `value` as JSON and stores it under `key`.
///
/// # Errors
///
/// Returns an error if encoding fails or the store cannot be written.
pub fn set_json<T: Serialize>(
    storage: &dyn ClientStorage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|e| StorageError::Encode {
        key: key.to_string(),
        details: e.to_string(),
    })?;
    storage.set(key, &raw)
}
