//! Storage error types.

use std::fmt;

/// Errors from client storage operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backing store could not be read.
    Read { details: String },
    /// The backing store could not be written.
    Write { details: String },
    /// A stored value could not be decoded.
    Decode { key: String, details: String },
    /// A value could not be encoded for storage.
    Encode { key: String, details: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { details } => write!(f, "failed to read client storage: {details}"),
            Self::Write { details } => write!(f, "failed to write client storage: {details}"),
            Self::Decode { key, details } => {
                write!(f, "stored value under '{key}' is invalid: {details}")
            }
            Self::Encode { key, details } => {
                write!(f, "failed to encode value for '{key}': {details}")
            }
        }
    }
}

impl std::error::Error for StorageError {}
