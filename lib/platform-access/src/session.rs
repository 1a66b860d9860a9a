//! Sessions and session-change notifications.
//!
//! A session is issued by the auth provider after sign-in and carries the
//! principal plus the tokens used for backend calls. The provider announces
//! every change to the session through a [`SessionEvent`].

use chrono::{DateTime, Duration, Utc};
use pawtag_core::PrincipalId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The authenticated identity, as issued by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    id: PrincipalId,
    email: Option<String>,
}

impl Principal {
    /// Creates a principal.
    #[must_use]
    pub fn new(id: PrincipalId, email: Option<String>) -> Self {
        Self { id, email }
    }

    /// Returns the principal identifier.
    #[must_use]
    pub fn id(&self) -> &PrincipalId {
        &self.id
    }

    /// Returns the email address, if the provider supplied one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

/// An active authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The signed-in principal.
    principal: Principal,
    /// Bearer token for backend calls.
    access_token: String,
    /// Token used to obtain a new access token.
    refresh_token: Option<String>,
    /// When the session was issued.
    created_at: DateTime<Utc>,
    /// When the access token expires.
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session valid for `duration` from now.
    #[must_use]
    pub fn new(
        principal: Principal,
        access_token: String,
        refresh_token: Option<String>,
        duration: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            principal,
            access_token,
            refresh_token,
            created_at: now,
            expires_at: now + duration,
        }
    }

    /// Returns the signed-in principal.
    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Returns the signed-in principal's identifier.
    #[must_use]
    pub fn principal_id(&self) -> &PrincipalId {
        self.principal.id()
    }

    /// Returns the access token.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the refresh token, if present.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Returns when the session was issued.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the access token expires.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true if the access token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Returns true if the access token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns true if the session is still valid (not expired).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired()
    }

    /// Replaces the tokens and extends the expiration.
    pub fn refresh(
        &mut self,
        access_token: String,
        refresh_token: Option<String>,
        duration: Duration,
    ) {
        self.access_token = access_token;
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        self.expires_at = Utc::now() + duration;
    }

    /// Replaces the principal, keeping the tokens.
    pub fn set_principal(&mut self, principal: Principal) {
        self.principal = principal;
    }
}

/// Kind of session change announced by the auth provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEventKind {
    /// A principal signed in.
    SignedIn,
    /// The session ended.
    SignedOut,
    /// The access token was renewed.
    TokenRefreshed,
    /// The principal's provider-side attributes changed.
    UserUpdated,
}

impl SessionEventKind {
    /// Returns true if the event can change who is signed in.
    ///
    /// Token refreshes and user updates keep the same principal and roles.
    #[must_use]
    pub fn changes_identity(&self) -> bool {
        matches!(self, Self::SignedIn | Self::SignedOut)
    }

    /// Returns the provider's name for the event.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignedIn => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
            Self::UserUpdated => "USER_UPDATED",
        }
    }
}

impl fmt::Display for SessionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A session change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    /// What happened.
    pub kind: SessionEventKind,
    /// The session after the change; `None` once signed out.
    pub session: Option<Session>,
}

impl SessionEvent {
    /// A principal signed in with `session`.
    #[must_use]
    pub fn signed_in(session: Session) -> Self {
        Self {
            kind: SessionEventKind::SignedIn,
            session: Some(session),
        }
    }

    /// The session ended.
    #[must_use]
    pub fn signed_out() -> Self {
        Self {
            kind: SessionEventKind::SignedOut,
            session: None,
        }
    }

    /// The tokens of `session` were renewed.
    #[must_use]
    pub fn token_refreshed(session: Session) -> Self {
        Self {
            kind: SessionEventKind::TokenRefreshed,
            session: Some(session),
        }
    }

    /// The principal of `session` was updated.
    #[must_use]
    pub fn user_updated(session: Session) -> Self {
        Self {
            kind: SessionEventKind::UserUpdated,
            session: Some(session),
        }
    }

    /// Returns the principal the event refers to, if any.
    #[must_use]
    pub fn principal_id(&self) -> Option<&PrincipalId> {
        self.session.as_ref().map(Session::principal_id)
    }
}
