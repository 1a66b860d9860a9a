//! Contract of the hosted database, as seen by the authorization layer.

use crate::error::DirectoryError;
use crate::profile::{Profile, ProfileUpdate};
use crate::role::{RoleAssignment, RoleAssignmentRecord};
use async_trait::async_trait;
use pawtag_core::PrincipalId;

/// Profile, role and permission lookups.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Fetches the profile row of `principal_id`.
    ///
    /// A missing row is `Ok(None)`, not an error.
    async fn fetch_profile(
        &self,
        principal_id: &PrincipalId,
    ) -> Result<Option<Profile>, DirectoryError>;

    /// Applies `update` to the profile of `principal_id` and returns the
    /// stored row.
    async fn update_profile(
        &self,
        principal_id: &PrincipalId,
        update: &ProfileUpdate,
    ) -> Result<Profile, DirectoryError>;

    /// Returns the active role assignments through the role procedure.
    async fn user_roles(
        &self,
        principal_id: &PrincipalId,
    ) -> Result<Vec<RoleAssignment>, DirectoryError>;

    /// Returns raw assignment rows through a direct query.
    ///
    /// Used only when [`Directory::user_roles`] fails.
    async fn role_assignment_records(
        &self,
        principal_id: &PrincipalId,
    ) -> Result<Vec<RoleAssignmentRecord>, DirectoryError>;

    /// Asks the backend whether `principal_id` may perform `action` on
    /// `resource`.
    async fn user_has_permission(
        &self,
        principal_id: &PrincipalId,
        resource: &str,
        action: &str,
    ) -> Result<bool, DirectoryError>;
}
