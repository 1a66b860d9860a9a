//! Profile, role and permission queries against the hosted database.

use crate::client::BackendClient;
use crate::wire::{AssignmentRow, PermissionArgs, UserRolesArgs};
use async_trait::async_trait;
use pawtag_core::PrincipalId;
use pawtag_platform_access::{
    Directory, DirectoryError, Profile, ProfileUpdate, RoleAssignment, RoleAssignmentRecord,
};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, instrument};

const PROFILES: &str = "user_profiles";
const ASSIGNMENT_SELECT: &str = "is_active,expires_at,roles!inner(name,level)";

/// Row shape returned by `get_user_roles`.
#[derive(Debug, Deserialize)]
struct RoleRow {
    role_name: String,
    role_level: i32,
}

/// PostgREST equality filter on the owning user.
fn user_filter(principal_id: &PrincipalId) -> String {
    format!("eq.{principal_id}")
}

#[async_trait]
impl Directory for BackendClient {
    #[instrument(skip(self))]
    async fn fetch_profile(
        &self,
        principal_id: &PrincipalId,
    ) -> Result<Option<Profile>, DirectoryError> {
        let request = self
            .request(Method::GET, &self.rest_url(PROFILES))
            .query(&[("user_id", user_filter(principal_id).as_str()), ("select", "*")]);
        let rows: Vec<Profile> = Self::send_json("fetch_profile", request).await?;
        debug!(found = !rows.is_empty(), "profile fetched");
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self, update))]
    async fn update_profile(
        &self,
        principal_id: &PrincipalId,
        update: &ProfileUpdate,
    ) -> Result<Profile, DirectoryError> {
        let request = self
            .request(Method::PATCH, &self.rest_url(PROFILES))
            .query(&[("user_id", user_filter(principal_id))])
            .header("Prefer", "return=representation")
            .json(update);
        let rows: Vec<Profile> = Self::send_json("update_profile", request).await?;
        rows.into_iter().next().ok_or_else(|| DirectoryError::NotFound {
            what: "profile".to_string(),
        })
    }

    #[instrument(skip(self))]
    async fn user_roles(
        &self,
        principal_id: &PrincipalId,
    ) -> Result<Vec<RoleAssignment>, DirectoryError> {
        let request = self
            .request(Method::POST, &self.rest_url("rpc/get_user_roles"))
            .json(&UserRolesArgs {
                user_uuid: principal_id,
            });
        let rows: Vec<RoleRow> = Self::send_json("get_user_roles", request).await?;
        Ok(rows
            .into_iter()
            .map(|row| RoleAssignment::new(row.role_name, row.role_level))
            .collect())
    }

    #[instrument(skip(self))]
    async fn role_assignment_records(
        &self,
        principal_id: &PrincipalId,
    ) -> Result<Vec<RoleAssignmentRecord>, DirectoryError> {
        let request = self
            .request(Method::GET, &self.rest_url("user_roles"))
            .query(&[
                ("select", ASSIGNMENT_SELECT),
                ("user_id", user_filter(principal_id).as_str()),
                ("is_active", "eq.true"),
            ]);
        let rows: Vec<AssignmentRow> = Self::send_json("role_assignment_records", request).await?;
        Ok(rows.into_iter().map(RoleAssignmentRecord::from).collect())
    }

    #[instrument(skip(self))]
    async fn user_has_permission(
        &self,
        principal_id: &PrincipalId,
        resource: &str,
        action: &str,
    ) -> Result<bool, DirectoryError> {
        let request = self
            .request(Method::POST, &self.rest_url("rpc/user_has_permission"))
            .json(&PermissionArgs {
                user_uuid: principal_id,
                resource_name: resource,
                action_name: action,
            });
        Self::send_json("user_has_permission", request).await
    }
}
