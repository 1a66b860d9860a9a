//! The application-wide authorization state.
//!
//! ```text
//! UNINITIALIZED -> LOADING -> AUTHENTICATED
//!                          -> ANONYMOUS
//! AUTHENTICATED -> LOADING            (session-changing event)
//! AUTHENTICATED | LOADING -> ANONYMOUS (sign-out or session loss)
//! ```

use crate::profile::Profile;
use crate::role::RoleSet;
use crate::session::{Principal, Session};
use pawtag_core::PrincipalId;
use serde::Serialize;
use std::fmt;

/// Lifecycle phase of the authorization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    /// Nothing is known yet.
    Uninitialized,
    /// A session is known and its profile and roles are being resolved.
    Loading,
    /// Profile and roles have been resolved for the current principal.
    Authenticated,
    /// Nobody is signed in.
    Anonymous,
}

impl fmt::Display for AuthPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Authenticated => "authenticated",
            Self::Anonymous => "anonymous",
        };
        f.write_str(name)
    }
}

/// Profile and roles resolved for one principal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserData {
    pub profile: Option<Profile>,
    pub roles: RoleSet,
    /// False if some part was cut short by the load deadline.
    pub complete: bool,
}

/// What happened to a finished load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The data was stored.
    Applied {
        /// Whether the stored role set differs from the previous one.
        roles_changed: bool,
    },
    /// The load was for a principal that is no longer current.
    Discarded,
}

/// Session, profile and roles of the current user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorizationState {
    phase: AuthPhase,
    #[serde(skip)]
    session: Option<Session>,
    #[serde(skip)]
    profile: Option<Profile>,
    roles: RoleSet,
}

impl Default for AuthorizationState {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthorizationState {
    /// Creates the initial, uninitialized state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: AuthPhase::Uninitialized,
            session: None,
            profile: None,
            roles: RoleSet::none(),
        }
    }

    /// Marks the start of session discovery.
    pub fn begin_initialization(&mut self) {
        if self.phase == AuthPhase::Uninitialized {
            self.phase = AuthPhase::Loading;
        }
    }

    /// Installs `session` and enters the loading phase.
    ///
    /// Profile and roles of a different previous principal are dropped.
    /// Returns true if the principal changed.
    pub fn begin_loading(&mut self, session: Session) -> bool {
        let changed = self.principal_id() != Some(session.principal_id());
        if changed {
            self.profile = None;
            self.roles = RoleSet::none();
        }
        self.session = Some(session);
        self.phase = AuthPhase::Loading;
        changed
    }

    /// Stores the result of a load started for `principal_id`.
    ///
    /// The result is discarded if that principal is no longer current.
    pub fn complete_load(&mut self, principal_id: &PrincipalId, data: UserData) -> LoadOutcome {
        let current = matches!(self.phase, AuthPhase::Loading | AuthPhase::Authenticated)
            && self.principal_id() == Some(principal_id);
        if !current {
            return LoadOutcome::Discarded;
        }

        let roles_changed = !self.roles.same_assignments(&data.roles);
        self.profile = data.profile;
        self.roles = data.roles;
        self.phase = AuthPhase::Authenticated;
        LoadOutcome::Applied { roles_changed }
    }

    /// Replaces the session tokens without touching profile or roles.
    ///
    /// Ignored if `session` belongs to a different principal.
    pub fn refresh_tokens(&mut self, session: Session) -> bool {
        if self.principal_id() != Some(session.principal_id()) {
            return false;
        }
        self.session = Some(session);
        true
    }

    /// Replaces the stored profile.
    pub fn set_profile(&mut self, profile: Profile) {
        self.profile = Some(profile);
    }

    /// Resets to the anonymous, empty state.
    ///
    /// Returns true if a role set was dropped.
    pub fn sign_out(&mut self) -> bool {
        let had_roles = !self.roles.is_empty();
        self.session = None;
        self.profile = None;
        self.roles = RoleSet::none();
        self.phase = AuthPhase::Anonymous;
        had_roles
    }

    #[must_use]
    pub fn phase(&self) -> AuthPhase {
        self.phase
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.session.as_ref().map(Session::principal)
    }

    #[must_use]
    pub fn principal_id(&self) -> Option<&PrincipalId> {
        self.session.as_ref().map(Session::principal_id)
    }

    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    #[must_use]
    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    /// The "currently loading" signal.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, AuthPhase::Uninitialized | AuthPhase::Loading)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.phase == AuthPhase::Authenticated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::RoleAssignment;
    use chrono::Duration;

    fn session(id: &str) -> Session {
        Session::new(
            Principal::new(PrincipalId::new(id), None),
            format!("token-{id}"),
            None,
            Duration::hours(1),
        )
    }

    fn admin() -> UserData {
        UserData {
            profile: None,
            roles: RoleSet::new(vec![RoleAssignment::new("super_admin", 100)]),
            complete: true,
        }
    }

    #[test]
    fn starts_uninitialized_and_loading() {
        let state = AuthorizationState::new();
        assert_eq!(state.phase(), AuthPhase::Uninitialized);
        assert!(state.is_loading());
        assert!(state.roles().is_empty());
    }

    #[test]
    fn load_for_current_principal_authenticates() {
        let mut state = AuthorizationState::new();
        state.begin_initialization();
        assert!(state.begin_loading(session("p1")));

        let outcome = state.complete_load(&PrincipalId::new("p1"), admin());

        assert_eq!(outcome, LoadOutcome::Applied { roles_changed: true });
        assert_eq!(state.phase(), AuthPhase::Authenticated);
        assert!(state.roles().is_super_admin());
        assert!(!state.is_loading());
    }

    #[test]
    fn stale_load_is_discarded() {
        let mut state = AuthorizationState::new();
        state.begin_loading(session("p1"));
        state.begin_loading(session("p2"));

        let outcome = state.complete_load(&PrincipalId::new("p1"), admin());

        assert_eq!(outcome, LoadOutcome::Discarded);
        assert!(state.roles().is_empty());
        assert_eq!(state.phase(), AuthPhase::Loading);
    }

    #[test]
    fn load_after_sign_out_is_discarded() {
        let mut state = AuthorizationState::new();
        state.begin_loading(session("p1"));
        state.sign_out();

        let outcome = state.complete_load(&PrincipalId::new("p1"), admin());

        assert_eq!(outcome, LoadOutcome::Discarded);
        assert_eq!(state.phase(), AuthPhase::Anonymous);
        assert!(state.roles().is_empty());
    }

    #[test]
    fn reloading_same_roles_reports_no_change() {
        let mut state = AuthorizationState::new();
        state.begin_loading(session("p1"));
        state.complete_load(&PrincipalId::new("p1"), admin());

        assert!(!state.begin_loading(session("p1")));
        assert!(state.roles().is_super_admin());
        let outcome = state.complete_load(&PrincipalId::new("p1"), admin());
        assert_eq!(outcome, LoadOutcome::Applied { roles_changed: false });
    }

    #[test]
    fn switching_principal_drops_previous_roles() {
        let mut state = AuthorizationState::new();
        state.begin_loading(session("p1"));
        state.complete_load(&PrincipalId::new("p1"), admin());

        state.begin_loading(session("p2"));
        assert!(state.roles().is_empty());
        assert_eq!(state.principal_id(), Some(&PrincipalId::new("p2")));
    }

    #[test]
    fn refresh_tokens_only_for_same_principal() {
        let mut state = AuthorizationState::new();
        state.begin_loading(session("p1"));

        let mut renewed = session("p1");
        renewed.refresh("fresh".to_string(), None, Duration::hours(1));
        assert!(state.refresh_tokens(renewed));
        assert_eq!(state.session().map(Session::access_token), Some("fresh"));

        assert!(!state.refresh_tokens(session("p9")));
        assert_eq!(state.principal_id(), Some(&PrincipalId::new("p1")));
    }

    #[test]
    fn sign_out_resets_everything() {
        let mut state = AuthorizationState::new();
        state.begin_loading(session("p1"));
        state.complete_load(&PrincipalId::new("p1"), admin());

        assert!(state.sign_out());
        assert_eq!(state.phase(), AuthPhase::Anonymous);
        assert!(state.session().is_none());
        assert!(state.profile().is_none());
        assert!(!state.is_authenticated());
    }
}
