//! In-memory fakes of the backend contracts.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use pawtag_core::{PrincipalId, ProfileId};
use pawtag_platform_access::{
    AuthProvider, AuthenticationError, Directory, DirectoryError, Principal, Profile,
    ProfileSeed, ProfileUpdate, RoleAssignment, RoleAssignmentRecord, Session, SessionEvent,
    SignUpOutcome,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Semaphore, broadcast};

pub(crate) fn profile(principal_id: &PrincipalId, first_name: &str) -> Profile {
    let now = Utc::now();
    Profile {
        id: ProfileId::new(format!("profile-{principal_id}")),
        principal_id: principal_id.clone(),
        first_name: Some(first_name.to_string()),
        last_name: None,
        phone: None,
        avatar_url: None,
        company_id: None,
        branch_id: None,
        metadata: serde_json::Value::Null,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn session(id: &str) -> Session {
    Session::new(
        Principal::new(PrincipalId::new(id), Some(format!("{id}@example.com"))),
        format!("access-{id}"),
        Some(format!("refresh-{id}")),
        Duration::hours(1),
    )
}

fn unavailable(operation: &str) -> DirectoryError {
    DirectoryError::Status {
        operation: operation.to_string(),
        status: 503,
        body: "unavailable".to_string(),
    }
}

/// Directory backed by maps, with call counters and failure switches.
#[derive(Default)]
pub(crate) struct FakeDirectory {
    profiles: Mutex<HashMap<PrincipalId, Profile>>,
    roles: Mutex<HashMap<PrincipalId, Vec<RoleAssignment>>>,
    records: Mutex<HashMap<PrincipalId, Vec<RoleAssignmentRecord>>>,
    permissions: Mutex<HashMap<(PrincipalId, String, String), bool>>,
    gates: Mutex<HashMap<PrincipalId, Arc<Semaphore>>>,
    permission_gate: Mutex<Option<Arc<Semaphore>>>,
    role_delay: Mutex<Option<std::time::Duration>>,
    fail_profile: AtomicBool,
    fail_role_procedure: AtomicBool,
    fail_fallback: AtomicBool,
    fail_permissions: AtomicBool,
    profile_calls: AtomicUsize,
    role_calls: AtomicUsize,
    fallback_calls: AtomicUsize,
    permission_calls: AtomicUsize,
    update_calls: AtomicUsize,
}

impl FakeDirectory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_profile(&self, principal_id: &PrincipalId, first_name: &str) {
        self.profiles
            .lock()
            .unwrap()
            .insert(principal_id.clone(), profile(principal_id, first_name));
    }

    pub(crate) fn set_roles(&self, principal_id: &PrincipalId, roles: Vec<RoleAssignment>) {
        self.roles
            .lock()
            .unwrap()
            .insert(principal_id.clone(), roles);
    }

    pub(crate) fn set_role_records(
        &self,
        principal_id: &PrincipalId,
        records: Vec<RoleAssignmentRecord>,
    ) {
        self.records
            .lock()
            .unwrap()
            .insert(principal_id.clone(), records);
    }

    pub(crate) fn set_permission(
        &self,
        principal_id: &PrincipalId,
        resource: &str,
        action: &str,
        allowed: bool,
    ) {
        self.permissions.lock().unwrap().insert(
            (
                principal_id.clone(),
                resource.to_string(),
                action.to_string(),
            ),
            allowed,
        );
    }

    /// Holds profile and role fetches for `principal_id` until permits are
    /// added to the returned semaphore.
    pub(crate) fn gate(&self, principal_id: &PrincipalId) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates
            .lock()
            .unwrap()
            .insert(principal_id.clone(), gate.clone());
        gate
    }

    /// Holds permission answers until permits are added to the returned
    /// semaphore. The answer is read before waiting.
    pub(crate) fn gate_permissions(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.permission_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub(crate) fn delay_roles(&self, delay: std::time::Duration) {
        *self.role_delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn fail_profile(&self) {
        self.fail_profile.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_role_procedure(&self) {
        self.fail_role_procedure.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_fallback(&self) {
        self.fail_fallback.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_permissions(&self, fail: bool) {
        self.fail_permissions.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn role_calls(&self) -> usize {
        self.role_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn fallback_calls(&self) -> usize {
        self.fallback_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn permission_calls(&self) -> usize {
        self.permission_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    async fn wait_for_gate(&self, principal_id: &PrincipalId) {
        let gate = self.gates.lock().unwrap().get(principal_id).cloned();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }
    }
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn fetch_profile(
        &self,
        principal_id: &PrincipalId,
    ) -> Result<Option<Profile>, DirectoryError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate(principal_id).await;
        if self.fail_profile.load(Ordering::SeqCst) {
            return Err(unavailable("fetch_profile"));
        }
        Ok(self.profiles.lock().unwrap().get(principal_id).cloned())
    }

    async fn update_profile(
        &self,
        principal_id: &PrincipalId,
        update: &ProfileUpdate,
    ) -> Result<Profile, DirectoryError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut profiles = self.profiles.lock().unwrap();
        let current = profiles
            .get(principal_id)
            .ok_or_else(|| DirectoryError::NotFound {
                what: "profile".to_string(),
            })?;
        let updated = current.with_update(update);
        profiles.insert(principal_id.clone(), updated.clone());
        Ok(updated)
    }

    async fn user_roles(
        &self,
        principal_id: &PrincipalId,
    ) -> Result<Vec<RoleAssignment>, DirectoryError> {
        self.role_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate(principal_id).await;
        let delay = *self.role_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_role_procedure.load(Ordering::SeqCst) {
            return Err(unavailable("get_user_roles"));
        }
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(principal_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn role_assignment_records(
        &self,
        principal_id: &PrincipalId,
    ) -> Result<Vec<RoleAssignmentRecord>, DirectoryError> {
        self.fallback_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fallback.load(Ordering::SeqCst) {
            return Err(unavailable("user_roles"));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(principal_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn user_has_permission(
        &self,
        principal_id: &PrincipalId,
        resource: &str,
        action: &str,
    ) -> Result<bool, DirectoryError> {
        self.permission_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_permissions.load(Ordering::SeqCst) {
            return Err(unavailable("user_has_permission"));
        }
        let allowed = self
            .permissions
            .lock()
            .unwrap()
            .get(&(
                principal_id.clone(),
                resource.to_string(),
                action.to_string(),
            ))
            .copied()
            .unwrap_or(false);
        let gate = self.permission_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }
        Ok(allowed)
    }
}

/// Auth provider that accepts one password for every address.
pub(crate) struct FakeAuthProvider {
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
    sign_out_calls: AtomicUsize,
}

impl FakeAuthProvider {
    pub(crate) const PASSWORD: &'static str = "correct horse";

    pub(crate) fn new() -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            session: Mutex::new(None),
            events,
            sign_out_calls: AtomicUsize::new(0),
        }
    }

    /// Starts with `session` already established, as if restored.
    pub(crate) fn with_session(session: Session) -> Self {
        let provider = Self::new();
        *provider.session.lock().unwrap() = Some(session);
        provider
    }

    /// Announces `event` without changing the stored session.
    pub(crate) fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    fn principal_for(email: &str) -> PrincipalId {
        PrincipalId::new(email.split('@').next().unwrap_or(email))
    }
}

#[async_trait]
impl AuthProvider for FakeAuthProvider {
    async fn current_session(&self) -> Result<Option<Session>, AuthenticationError> {
        Ok(self.session.lock().unwrap().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthenticationError> {
        if password != Self::PASSWORD {
            return Err(AuthenticationError::InvalidCredentials);
        }
        let session = session(Self::principal_for(email).as_str());
        *self.session.lock().unwrap() = Some(session.clone());
        self.emit(SessionEvent::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        _seed: &ProfileSeed,
    ) -> Result<SignUpOutcome, AuthenticationError> {
        Ok(SignUpOutcome::ConfirmationRequired {
            principal: Principal::new(Self::principal_for(email), Some(email.to_string())),
        })
    }

    async fn sign_out(&self) -> Result<(), AuthenticationError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        *self.session.lock().unwrap() = None;
        self.emit(SessionEvent::signed_out());
        Ok(())
    }
}
