//! Session-driven authorization cache for pawtag.
//!
//! The [`AuthManager`] follows the auth provider's session notifications,
//! resolves the signed-in principal into a profile and a role set, and
//! answers role and permission queries. Profiles, roles and permission
//! results are cached with a time-to-live, concurrent loads of the same
//! principal are merged, and replayed notifications are suppressed.

mod caches;
mod dedup;
mod loader;
mod manager;
mod permission;

#[cfg(test)]
mod testing;

pub use caches::AuthCaches;
pub use dedup::{EventDecision, EventDeduplicator, IgnoreReason};
pub use loader::UserDataLoader;
pub use manager::AuthManager;
pub use permission::PermissionChecker;
