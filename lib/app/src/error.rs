//! Application error types.

use std::fmt;

/// Errors raised while assembling or driving the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// Client storage could not be opened or written.
    Storage { details: String },
    /// The backend client could not be created.
    Backend { details: String },
    /// The storefront client could not be created or rejected a request.
    Commerce { details: String },
    /// Checkout needs a configured storefront.
    CommerceDisabled,
    /// Checkout needs at least one cart line.
    EmptyCart,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "configuration error: {details}"),
            Self::Storage { details } => write!(f, "client storage error: {details}"),
            Self::Backend { details } => write!(f, "backend client error: {details}"),
            Self::Commerce { details } => write!(f, "storefront error: {details}"),
            Self::CommerceDisabled => write!(f, "storefront is not configured"),
            Self::EmptyCart => write!(f, "cart is empty"),
        }
    }
}

impl std::error::Error for AppError {}
