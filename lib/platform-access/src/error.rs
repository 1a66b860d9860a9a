//! Error types for the platform-access crate.
//!
//! - `AuthenticationError`: sign in/up/out and session failures
//! - `AuthorizationError`: failed access requirements and profile updates
//! - `DirectoryError`: failures talking to the backend database

use pawtag_core::PrincipalId;
use std::fmt;

/// Errors from authentication operations.
///
/// These are returned to the caller as values; none of them is fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// Email/password pair was rejected.
    InvalidCredentials,
    /// The email address has not been confirmed yet.
    EmailNotConfirmed,
    /// Sign-up was attempted for an address that already has an account.
    AlreadyRegistered { email: String },
    /// An operation needed a session and there is none.
    NotSignedIn,
    /// The session has expired and could not be refreshed.
    SessionExpired,
    /// The auth provider rejected the request.
    ProviderError { status: u16, reason: String },
    /// The auth provider could not be reached.
    Network { details: String },
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid email or password"),
            Self::EmailNotConfirmed => write!(f, "email address has not been confirmed"),
            Self::AlreadyRegistered { email } => {
                write!(f, "an account already exists for {email}")
            }
            Self::NotSignedIn => write!(f, "no user is signed in"),
            Self::SessionExpired => write!(f, "session has expired"),
            Self::ProviderError { status, reason } => {
                write!(f, "auth provider error ({status}): {reason}")
            }
            Self::Network { details } => write!(f, "auth provider unreachable: {details}"),
        }
    }
}

impl std::error::Error for AuthenticationError {}

/// Errors from the backend database contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The request could not be sent or did not complete.
    Request { operation: String, details: String },
    /// The backend answered with a non-success status.
    Status {
        operation: String,
        status: u16,
        body: String,
    },
    /// The response body did not have the expected shape.
    Decode { operation: String, details: String },
    /// An update matched no row.
    NotFound { what: String },
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
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
            Self::NotFound { what } => write!(f, "{what} not found"),
        }
    }
}

impl std::error::Error for DirectoryError {}

/// Errors from authorization requirements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// User is not authenticated.
    NotAuthenticated,
    /// User lacks a named role.
    RoleRequired { role: String },
    /// User lacks a role at or above a level.
    LevelRequired { level: i32 },
    /// User lacks a resource/action permission.
    PermissionDenied {
        principal_id: PrincipalId,
        action: String,
        resource: String,
    },
    /// The profile update was rejected by the backend.
    ProfileUpdateFailed { source: DirectoryError },
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "user is not authenticated"),
            Self::RoleRequired { role } => write!(f, "role '{role}' is required"),
            Self::LevelRequired { level } => {
                write!(f, "a role of level {level} or higher is required")
            }
            Self::PermissionDenied {
                principal_id,
                action,
                resource,
            } => write!(
                f,
                "user {principal_id} lacks permission to {action} on {resource}"
            ),
            Self::ProfileUpdateFailed { source } => {
                write!(f, "profile update failed: {source}")
            }
        }
    }
}

impl std::error::Error for AuthorizationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ProfileUpdateFailed { source } => Some(source),
            _ => None,
        }
    }
}
