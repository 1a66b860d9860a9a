//! Error types for the commerce crate.

use std::fmt;

/// Errors from the storefront API client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommerceError {
    /// The HTTP client could not be built.
    ClientBuild { details: String },
    /// The configuration is unusable.
    InvalidConfig { details: String },
    /// The request could not be sent or did not complete.
    Request { operation: String, details: String },
    /// The API answered with a non-success status.
    Status {
        operation: String,
        status: u16,
        body: String,
    },
    /// The response body did not have the expected shape.
    Decode { operation: String, details: String },
}

impl fmt::Display for CommerceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientBuild { details } => {
                write!(f, "failed to build commerce HTTP client: {details}")
            }
            Self::InvalidConfig { details } => {
                write!(f, "invalid commerce configuration: {details}")
            }
            Self::Request { operation, details } => {
                write!(f, "{operation} request failed: {details}")
            }
            Self::Status {
                operation,
                status,
                body,
            } => write!(f, "{operation} returned status {status}: {body}"),
            Self::Decode { operation, details } => {
                write!(f, "{operation} returned an unexpected body: {details}")
            }
        }
    }
}

impl std::error::Error for CommerceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_names_operation() {
        let err = CommerceError::Status {
            operation: "list_products".to_string(),
            status: 401,
            body: "woocommerce_rest_cannot_view".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("list_products"));
        assert!(text.contains("401"));
    }
}
