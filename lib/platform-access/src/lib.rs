//! Platform access types and backend contracts for pawtag.
//!
//! This crate provides:
//! - Sessions and session-change events (`Session`, `SessionEvent`)
//! - User profiles (`Profile`, `ProfileUpdate`, `ProfileSeed`)
//! - Role assignments (`RoleAssignment`, `RoleSet`)
//! - The authorization state machine (`AuthorizationState`, `AuthPhase`)
//! - The contracts of the hosted backend (`AuthProvider`, `Directory`)
//! - Tuning for the authorization cache (`AuthConfig`)
//!
//! # Access Control Model
//!
//! Users hold leveled roles. A higher level is more privileged, so a
//! "minimum level" check admits every role at or above the threshold.
//! Finer-grained resource/action permissions are evaluated by the backend.
//!
//! # Example
//!
//! ```
//! use pawtag_platform_access::{Principal, RoleAssignment, RoleSet, Session};
//! use pawtag_core::PrincipalId;
//! use chrono::Duration;
//!
//! let principal = Principal::new(PrincipalId::new("u-1"), Some("vet@example.com".into()));
//! let session = Session::new(principal, "access".into(), None, Duration::hours(1));
//! assert!(session.is_valid());
//!
//! let roles = RoleSet::new(vec![RoleAssignment::new("super_admin", 100)]);
//! assert!(roles.is_super_admin());
//! assert!(roles.has_minimum_role(50));
//! assert!(!roles.has_minimum_role(150));
//! ```

pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod profile;
pub mod role;
pub mod session;
pub mod state;

// Re-export main types at crate root
pub use auth::{AuthProvider, SignUpOutcome};
pub use config::AuthConfig;
pub use directory::Directory;
pub use error::{AuthenticationError, AuthorizationError, DirectoryError};
pub use profile::{Profile, ProfileSeed, ProfileUpdate};
pub use role::{Role, RoleAssignment, RoleAssignmentRecord, RoleSet};
pub use session::{Principal, Session, SessionEvent, SessionEventKind};
pub use state::{AuthPhase, AuthorizationState, LoadOutcome, UserData};
