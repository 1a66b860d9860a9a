//! The authorization manager.
//!
//! Owns the authorization state and keeps it in step with the auth
//! provider's session notifications. State transitions are applied in the
//! order events arrive; the profile and role load each transition
//! triggers runs separately and is dropped if the principal has changed by
//! the time it finishes.

use crate::caches::AuthCaches;
use crate::dedup::{EventDecision, EventDeduplicator, IgnoreReason};
use crate::loader::UserDataLoader;
use crate::permission::PermissionChecker;
use pawtag_core::{Clock, PrincipalId};
use pawtag_platform_access::{
    AuthConfig, AuthProvider, AuthenticationError, AuthorizationError, AuthorizationState,
    Directory, LoadOutcome, Profile, ProfileSeed, ProfileUpdate, RoleSet, Session,
    SessionEvent, SessionEventKind, SignUpOutcome,
};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Session-driven authorization state with cached profile, roles and
/// permissions.
pub struct AuthManager {
    provider: Arc<dyn AuthProvider>,
    directory: Arc<dyn Directory>,
    caches: Arc<AuthCaches>,
    loader: UserDataLoader,
    permissions: PermissionChecker,
    state: RwLock<AuthorizationState>,
    dedup: Mutex<EventDeduplicator>,
    snapshots: watch::Sender<AuthorizationState>,
}

impl AuthManager {
    /// Creates a manager in the uninitialized phase.
    #[must_use]
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        directory: Arc<dyn Directory>,
        config: &AuthConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let caches = Arc::new(AuthCaches::new(clock.clone()));
        let loader = UserDataLoader::new(
            directory.clone(),
            caches.clone(),
            clock.clone(),
            config.user_data_ttl(),
            config.load_timeout(),
        );
        let permissions =
            PermissionChecker::new(directory.clone(), caches.clone(), config.permission_ttl());
        let (snapshots, _) = watch::channel(AuthorizationState::new());

        Self {
            provider,
            directory,
            caches,
            loader,
            permissions,
            state: RwLock::new(AuthorizationState::new()),
            dedup: Mutex::new(EventDeduplicator::new(config.dedup_window(), clock)),
            snapshots,
        }
    }

    /// Discovers the existing session and resolves its profile and roles.
    ///
    /// Without a usable session the state becomes anonymous.
    #[instrument(skip(self))]
    pub async fn initialize(&self) {
        self.update_state(AuthorizationState::begin_initialization);

        let session = match self.provider.current_session().await {
            Ok(session) => session,
            Err(error) => {
                warn!(%error, "could not restore session");
                None
            }
        };

        match session {
            Some(session) => {
                let principal_id = session.principal_id().clone();
                info!(principal_id = %principal_id, "restored session");
                self.update_state(|state| {
                    state.begin_loading(session);
                });
                self.load_user_data(&principal_id).await;
            }
            None => {
                debug!("no session to restore");
                self.update_state(|state| {
                    state.sign_out();
                });
            }
        }
    }

    /// Applies the state transition for `event`.
    ///
    /// Returns the principal whose data must now be loaded, if any.
    pub fn apply_event(&self, event: &SessionEvent) -> Option<PrincipalId> {
        let mut dedup = self.dedup.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.read_state().principal_id().cloned();

        match dedup.evaluate(event, current.as_ref()) {
            EventDecision::Ignore(IgnoreReason::NoStateChange) => {
                if let Some(session) = &event.session {
                    let session = session.clone();
                    self.update_state(|state| {
                        state.refresh_tokens(session);
                    });
                }
                debug!(kind = %event.kind, "session tokens updated");
                None
            }
            EventDecision::Ignore(reason) => {
                debug!(kind = %event.kind, ?reason, "ignoring session event");
                None
            }
            EventDecision::Process => match (event.kind, &event.session) {
                (SessionEventKind::SignedIn, Some(session)) => {
                    let principal_id = session.principal_id().clone();
                    info!(principal_id = %principal_id, "signed in");
                    let session = session.clone();
                    self.update_state(|state| {
                        state.begin_loading(session);
                    });
                    Some(principal_id)
                }
                _ => {
                    info!(kind = %event.kind, "session ended");
                    self.clear_session();
                    None
                }
            },
        }
    }

    /// Applies `event` and waits for the load it triggers.
    pub async fn handle_event(&self, event: &SessionEvent) {
        if let Some(principal_id) = self.apply_event(event) {
            self.load_user_data(&principal_id).await;
        }
    }

    /// Loads profile and roles for `principal_id` and stores them if that
    /// principal is still current.
    pub async fn load_user_data(&self, principal_id: &PrincipalId) -> LoadOutcome {
        let data = self.loader.load(principal_id).await;
        if !data.complete {
            warn!(principal_id = %principal_id, "user data load incomplete");
        }

        let outcome = self.update_state(|state| state.complete_load(principal_id, data));
        match outcome {
            LoadOutcome::Applied { roles_changed } => {
                if roles_changed {
                    self.permissions.invalidate();
                }
            }
            LoadOutcome::Discarded => {
                debug!(principal_id = %principal_id, "discarding load for stale principal");
            }
        }
        outcome
    }

    /// Processes provider notifications until the provider goes away.
    ///
    /// Transitions are applied in arrival order; loads run as separate
    /// tasks.
    pub fn run(self: Arc<Self>) -> JoinHandle<()> {
        let mut events = self.provider.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if let Some(principal_id) = self.apply_event(&event) {
                            let manager = Arc::clone(&self);
                            tokio::spawn(async move {
                                manager.load_user_data(&principal_id).await;
                            });
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "missed session events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("session event stream closed");
        })
    }

    /// Signs in and resolves the new principal's data.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthenticationError> {
        let session = self.provider.sign_in(email, password).await?;
        self.establish(session.clone()).await;
        Ok(session)
    }

    /// Creates an account; signs in if the provider established a session.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        seed: &ProfileSeed,
    ) -> Result<SignUpOutcome, AuthenticationError> {
        let outcome = self.provider.sign_up(email, password, seed).await?;
        if let SignUpOutcome::SignedIn(session) = &outcome {
            self.establish(session.as_ref().clone()).await;
        }
        Ok(outcome)
    }

    /// Clears local state, then ends the provider session.
    pub async fn sign_out(&self) -> Result<(), AuthenticationError> {
        self.apply_event(&SessionEvent::signed_out());
        self.provider.sign_out().await
    }

    /// Re-reads profile and roles of the current principal, bypassing the
    /// cache.
    pub async fn reload_user_data(&self) -> Option<LoadOutcome> {
        let principal_id = self.principal_id()?;
        self.loader.forget(&principal_id);
        Some(self.load_user_data(&principal_id).await)
    }

    /// Updates the current principal's profile.
    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
    ) -> Result<Profile, AuthorizationError> {
        let principal_id = self
            .principal_id()
            .ok_or(AuthorizationError::NotAuthenticated)?;

        let profile = self
            .directory
            .update_profile(&principal_id, update)
            .await
            .map_err(|source| AuthorizationError::ProfileUpdateFailed { source })?;

        self.caches
            .store_profile(&principal_id, Some(profile.clone()));
        let stored = profile.clone();
        self.update_state(|state| {
            if state.principal_id() == Some(&principal_id) {
                state.set_profile(stored);
            }
        });
        Ok(profile)
    }

    /// Returns true if the current principal holds the role named `name`.
    #[must_use]
    pub fn has_role(&self, name: &str) -> bool {
        self.read_state().roles().has_role(name)
    }

    /// Returns true if the current principal holds a role of at least
    /// `level`.
    #[must_use]
    pub fn has_minimum_role(&self, level: i32) -> bool {
        self.read_state().roles().has_minimum_role(level)
    }

    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.read_state().roles().is_super_admin()
    }

    #[must_use]
    pub fn is_company_admin(&self) -> bool {
        self.read_state().roles().is_company_admin()
    }

    #[must_use]
    pub fn is_branch_admin(&self) -> bool {
        self.read_state().roles().is_branch_admin()
    }

    #[must_use]
    pub fn is_customer(&self) -> bool {
        self.read_state().roles().is_customer()
    }

    /// Checks a resource/action permission for the current principal.
    ///
    /// Always false when nobody is signed in.
    pub async fn has_permission(&self, resource: &str, action: &str) -> bool {
        match self.principal_id() {
            Some(principal_id) => self.permissions.check(&principal_id, resource, action).await,
            None => false,
        }
    }

    pub fn require_role(&self, name: &str) -> Result<(), AuthorizationError> {
        self.require_authenticated()?;
        if self.has_role(name) {
            Ok(())
        } else {
            Err(AuthorizationError::RoleRequired {
                role: name.to_string(),
            })
        }
    }

    pub fn require_minimum_role(&self, level: i32) -> Result<(), AuthorizationError> {
        self.require_authenticated()?;
        if self.has_minimum_role(level) {
            Ok(())
        } else {
            Err(AuthorizationError::LevelRequired { level })
        }
    }

    pub async fn require_permission(
        &self,
        resource: &str,
        action: &str,
    ) -> Result<(), AuthorizationError> {
        let principal_id = self
            .principal_id()
            .ok_or(AuthorizationError::NotAuthenticated)?;
        if self.permissions.check(&principal_id, resource, action).await {
            Ok(())
        } else {
            Err(AuthorizationError::PermissionDenied {
                principal_id,
                action: action.to_string(),
                resource: resource.to_string(),
            })
        }
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> AuthorizationState {
        self.read_state().clone()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<AuthorizationState> {
        self.snapshots.subscribe()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.read_state().is_loading()
    }

    /// Returns true while profile and roles of `principal_id` are being
    /// fetched.
    #[must_use]
    pub fn is_fetching(&self, principal_id: &PrincipalId) -> bool {
        self.loader.is_loading(principal_id)
    }

    #[must_use]
    pub fn principal_id(&self) -> Option<PrincipalId> {
        self.read_state().principal_id().cloned()
    }

    #[must_use]
    pub fn roles(&self) -> RoleSet {
        self.read_state().roles().clone()
    }

    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        self.read_state().profile().cloned()
    }

    /// Applies a new session and returns once its principal's data is
    /// loaded, joining a load the notification loop may already have
    /// started.
    async fn establish(&self, session: Session) {
        let principal_id = session.principal_id().clone();
        self.handle_event(&SessionEvent::signed_in(session)).await;

        let pending = {
            let state = self.read_state();
            state.is_loading() && state.principal_id() == Some(&principal_id)
        };
        if pending {
            self.load_user_data(&principal_id).await;
        }
    }

    fn require_authenticated(&self) -> Result<(), AuthorizationError> {
        if self.read_state().principal_id().is_some() {
            Ok(())
        } else {
            Err(AuthorizationError::NotAuthenticated)
        }
    }

    fn clear_session(&self) {
        self.update_state(|state| {
            state.sign_out();
        });
        self.caches.clear();
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, AuthorizationState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutates the state and publishes the result to subscribers.
    fn update_state<R>(&self, change: impl FnOnce(&mut AuthorizationState) -> R) -> R {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let result = change(&mut state);
        self.snapshots.send_replace(state.clone());
        result
    }
}
