//! Request and response bodies of the backend's HTTP API.

use chrono::{DateTime, Duration, Utc};
use pawtag_core::PrincipalId;
use pawtag_platform_access::{Principal, ProfileSeed, RoleAssignmentRecord, Session};
use serde::{Deserialize, Serialize};

/// Body of the password grant.
#[derive(Debug, Serialize)]
pub(crate) struct PasswordGrant<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of the refresh grant.
#[derive(Debug, Serialize)]
pub(crate) struct RefreshGrant<'a> {
    pub refresh_token: &'a str,
}

/// Body of the sign-up call; `data` becomes the user's metadata.
#[derive(Debug, Serialize)]
pub(crate) struct SignUpRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub data: &'a ProfileSeed,
}

/// The user object returned by the auth endpoints.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserRecord {
    pub id: PrincipalId,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserRecord {
    pub fn into_principal(self) -> Principal {
        Principal::new(self.id, self.email)
    }
}

/// A granted session.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    pub user: UserRecord,
}

impl TokenResponse {
    pub fn into_session(self) -> Session {
        Session::new(
            self.user.into_principal(),
            self.access_token,
            self.refresh_token,
            Duration::seconds(self.expires_in),
        )
    }
}

/// Sign-up answers with a session when no confirmation is required and
/// with the bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SignUpResponse {
    Session(TokenResponse),
    Pending(UserRecord),
}

/// Error body of the auth endpoints. Different versions use different
/// field names.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AuthErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
}

impl AuthErrorBody {
    /// The most specific human-readable reason.
    pub fn reason(&self) -> String {
        self.error_description
            .as_deref()
            .or(self.msg.as_deref())
            .or(self.error.as_deref())
            .unwrap_or("unknown error")
            .to_string()
    }

    fn code(&self) -> &str {
        self.error_code
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or_default()
    }

    pub fn is_invalid_credentials(&self) -> bool {
        self.code() == "invalid_credentials"
            || self.code() == "invalid_grant"
            || self.reason().contains("Invalid login credentials")
    }

    pub fn is_email_not_confirmed(&self) -> bool {
        self.code() == "email_not_confirmed" || self.reason().contains("Email not confirmed")
    }

    pub fn is_already_registered(&self) -> bool {
        self.code() == "user_already_exists" || self.reason().contains("already registered")
    }
}

/// Arguments of `get_user_roles`.
#[derive(Debug, Serialize)]
pub(crate) struct UserRolesArgs<'a> {
    pub user_uuid: &'a PrincipalId,
}

/// Arguments of `user_has_permission`.
#[derive(Debug, Serialize)]
pub(crate) struct PermissionArgs<'a> {
    pub user_uuid: &'a PrincipalId,
    pub resource_name: &'a str,
    pub action_name: &'a str,
}

/// Role definition embedded in an assignment row.
#[derive(Debug, Deserialize)]
pub(crate) struct RoleRef {
    pub name: String,
    pub level: i32,
}

/// Row of the direct assignment query.
#[derive(Debug, Deserialize)]
pub(crate) struct AssignmentRow {
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub roles: RoleRef,
}

fn default_active() -> bool {
    true
}

impl From<AssignmentRow> for RoleAssignmentRecord {
    fn from(row: AssignmentRow) -> Self {
        Self {
            role_name: row.roles.name,
            role_level: row.roles.level,
            is_active: row.is_active,
            expires_at: row.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn token_response_becomes_session() {
        let response: TokenResponse = serde_json::from_value(json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "r1",
            "user": {"id": "u-1", "email": "a@example.com", "role": "authenticated"}
        }))
        .expect("deserialize");

        let session = response.into_session();
        assert_eq!(session.principal_id(), &PrincipalId::new("u-1"));
        assert_eq!(session.principal().email(), Some("a@example.com"));
        assert_eq!(session.refresh_token(), Some("r1"));
        assert!(session.is_valid());
    }

    #[test]
    fn sign_up_without_session_is_pending() {
        let response: SignUpResponse =
            serde_json::from_value(json!({"id": "u-2", "email": "b@example.com"}))
                .expect("deserialize");
        assert!(matches!(response, SignUpResponse::Pending(user) if user.id.as_str() == "u-2"));
    }

    #[test]
    fn sign_up_with_session() {
        let response: SignUpResponse = serde_json::from_value(json!({
            "access_token": "jwt",
            "expires_in": 60,
            "user": {"id": "u-3"}
        }))
        .expect("deserialize");
        assert!(matches!(response, SignUpResponse::Session(_)));
    }

    #[test]
    fn error_body_classification() {
        let body: AuthErrorBody = serde_json::from_value(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        }))
        .expect("deserialize");
        assert!(body.is_invalid_credentials());
        assert_eq!(body.reason(), "Invalid login credentials");

        let body: AuthErrorBody =
            serde_json::from_value(json!({"code": 400, "msg": "Email not confirmed"}))
                .expect("deserialize");
        assert!(body.is_email_not_confirmed());

        let body: AuthErrorBody = serde_json::from_value(
            json!({"error_code": "user_already_exists", "msg": "User already registered"}),
        )
        .expect("deserialize");
        assert!(body.is_already_registered());
        assert!(!body.is_invalid_credentials());
    }

    #[test]
    fn assignment_row_maps_to_record() {
        let row: AssignmentRow = serde_json::from_value(json!({
            "is_active": true,
            "expires_at": null,
            "roles": {"name": "branch_admin", "level": 60}
        }))
        .expect("deserialize");

        let record = RoleAssignmentRecord::from(row);
        assert_eq!(record.role_name, "branch_admin");
        assert_eq!(record.role_level, 60);
        assert!(record.is_effective_at(Utc::now()));
    }

    #[test]
    fn permission_args_wire_names() {
        let id = PrincipalId::new("u-1");
        let args = PermissionArgs {
            user_uuid: &id,
            resource_name: "qr_tags",
            action_name: "create",
        };
        assert_eq!(
            serde_json::to_value(&args).expect("serialize"),
            json!({"user_uuid": "u-1", "resource_name": "qr_tags", "action_name": "create"})
        );
    }
}
