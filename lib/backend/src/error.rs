//! Backend client error types.

use std::fmt;

/// Errors raised while setting up the backend client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The HTTP client could not be built.
    ClientBuild { details: String },
    /// The configuration is unusable.
    InvalidConfig { details: String },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientBuild { details } => {
                write!(f, "failed to build backend HTTP client: {details}")
            }
            Self::InvalidConfig { details } => {
                write!(f, "invalid backend configuration: {details}")
            }
        }
    }
}

impl std::error::Error for BackendError {}
