//! Profile and role loading.
//!
//! A load reads each part from the cache when fresh and otherwise fetches
//! it from the directory. Both fetches run concurrently under one
//! deadline. Concurrent loads for the same principal share a single
//! in-flight computation.

use crate::caches::AuthCaches;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use pawtag_core::{Clock, PrincipalId};
use pawtag_platform_access::{Directory, Profile, RoleSet, UserData};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, instrument, warn};

type InFlight = Shared<BoxFuture<'static, UserData>>;

/// Everything one load needs, owned so the load can outlive the caller.
#[derive(Clone)]
struct LoadContext {
    directory: Arc<dyn Directory>,
    caches: Arc<AuthCaches>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    timeout: std::time::Duration,
}

/// Resolves principals into profile and roles.
pub struct UserDataLoader {
    context: LoadContext,
    in_flight: Mutex<HashMap<PrincipalId, InFlight>>,
}

impl UserDataLoader {
    /// Creates a loader.
    ///
    /// `ttl` is the freshness of cached profiles and roles; `timeout`
    /// bounds each load.
    #[must_use]
    pub fn new(
        directory: Arc<dyn Directory>,
        caches: Arc<AuthCaches>,
        clock: Arc<dyn Clock>,
        ttl: chrono::Duration,
        timeout: std::time::Duration,
    ) -> Self {
        Self {
            context: LoadContext {
                directory,
                caches,
                clock,
                ttl,
                timeout,
            },
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Loads profile and roles for `principal_id`.
    ///
    /// Never fails: unavailable parts resolve to their empty value, and
    /// `complete` is false if the deadline cut a fetch short.
    pub async fn load(&self, principal_id: &PrincipalId) -> UserData {
        let load = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match in_flight.get(principal_id) {
                Some(existing) => {
                    debug!(principal_id = %principal_id, "joining in-flight load");
                    existing.clone()
                }
                None => {
                    let load = self
                        .context
                        .clone()
                        .fetch(principal_id.clone())
                        .boxed()
                        .shared();
                    in_flight.insert(principal_id.clone(), load.clone());
                    load
                }
            }
        };

        let data = load.clone().await;

        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if in_flight
            .get(principal_id)
            .is_some_and(|current| current.ptr_eq(&load))
        {
            in_flight.remove(principal_id);
        }
        data
    }

    /// Returns true while a load for `principal_id` is running.
    #[must_use]
    pub fn is_loading(&self, principal_id: &PrincipalId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(principal_id)
    }

    /// Drops cached profile and roles of `principal_id`.
    pub fn forget(&self, principal_id: &PrincipalId) {
        self.context.caches.forget_user_data(principal_id);
    }
}

impl LoadContext {
    #[instrument(skip_all, fields(principal_id = %principal_id))]
    async fn fetch(self, principal_id: PrincipalId) -> UserData {
        let deadline = Instant::now() + self.timeout;
        let generation = self.caches.generation();
        let still_current = || self.caches.generation() == generation;

        let profile = async {
            if let Some(hit) = self.caches.profile(&principal_id, self.ttl) {
                debug!("profile served from cache");
                return (hit, true);
            }
            match timeout_at(deadline, self.fetch_profile(&principal_id)).await {
                Ok(Some(profile)) => {
                    if still_current() {
                        self.caches.store_profile(&principal_id, profile.clone());
                    }
                    (profile, true)
                }
                Ok(None) => (None, true),
                Err(_) => {
                    warn!("profile fetch timed out");
                    (None, false)
                }
            }
        };

        let roles = async {
            if let Some(hit) = self.caches.roles(&principal_id, self.ttl) {
                debug!("roles served from cache");
                return (hit, true);
            }
            match timeout_at(deadline, self.fetch_roles(&principal_id)).await {
                Ok(Some(roles)) => {
                    if still_current() {
                        self.caches.store_roles(&principal_id, roles.clone());
                    }
                    (roles, true)
                }
                Ok(None) => (RoleSet::none(), true),
                Err(_) => {
                    warn!("role fetch timed out");
                    (RoleSet::none(), false)
                }
            }
        };

        let ((profile, profile_complete), (roles, roles_complete)) = tokio::join!(profile, roles);
        UserData {
            profile,
            roles,
            complete: profile_complete && roles_complete,
        }
    }

    /// `None` means the lookup failed and must not be cached.
    async fn fetch_profile(&self, principal_id: &PrincipalId) -> Option<Option<Profile>> {
        match self.directory.fetch_profile(principal_id).await {
            Ok(profile) => Some(profile),
            Err(error) => {
                warn!(%error, "failed to fetch profile");
                None
            }
        }
    }

    /// `None` means both role paths failed and nothing must be cached.
    async fn fetch_roles(&self, principal_id: &PrincipalId) -> Option<RoleSet> {
        match self.directory.user_roles(principal_id).await {
            Ok(roles) => return Some(RoleSet::new(roles)),
            Err(error) => warn!(%error, "role procedure failed, querying assignments directly"),
        }

        match self.directory.role_assignment_records(principal_id).await {
            Ok(records) => Some(RoleSet::from_records(records, self.clock.now())),
            Err(error) => {
                warn!(%error, "failed to fetch role assignments");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDirectory;
    use chrono::Duration;
    use pawtag_core::ManualClock;
    use pawtag_platform_access::{RoleAssignment, RoleAssignmentRecord};

    struct Harness {
        directory: Arc<FakeDirectory>,
        clock: ManualClock,
        loader: Arc<UserDataLoader>,
    }

    fn harness(directory: FakeDirectory) -> Harness {
        let directory = Arc::new(directory);
        let clock = ManualClock::starting_now();
        let caches = Arc::new(AuthCaches::new(Arc::new(clock.clone())));
        let loader = Arc::new(UserDataLoader::new(
            directory.clone(),
            caches,
            Arc::new(clock.clone()),
            Duration::milliseconds(120_000),
            std::time::Duration::from_millis(4_000),
        ));
        Harness {
            directory,
            clock,
            loader,
        }
    }

    fn p1() -> PrincipalId {
        PrincipalId::new("p1")
    }

    #[tokio::test]
    async fn fetches_profile_and_roles() {
        let directory = FakeDirectory::new();
        directory.set_profile(&p1(), "Ada");
        directory.set_roles(&p1(), vec![RoleAssignment::new("super_admin", 100)]);
        let h = harness(directory);

        let data = h.loader.load(&p1()).await;

        assert!(data.complete);
        assert!(data.roles.is_super_admin());
        assert_eq!(
            data.profile.and_then(|p| p.first_name),
            Some("Ada".to_string())
        );
        assert_eq!(h.directory.profile_calls(), 1);
        assert_eq!(h.directory.role_calls(), 1);
    }

    #[tokio::test]
    async fn missing_profile_is_not_an_error() {
        let h = harness(FakeDirectory::new());

        let data = h.loader.load(&p1()).await;

        assert!(data.profile.is_none());
        assert!(data.roles.is_empty());
        assert!(data.complete);
    }

    #[tokio::test]
    async fn second_load_within_ttl_uses_cache() {
        let directory = FakeDirectory::new();
        directory.set_roles(&p1(), vec![RoleAssignment::new("customer", 10)]);
        let h = harness(directory);

        h.loader.load(&p1()).await;
        h.clock.advance(Duration::milliseconds(119_999));
        let data = h.loader.load(&p1()).await;

        assert!(data.roles.is_customer());
        assert_eq!(h.directory.profile_calls(), 1);
        assert_eq!(h.directory.role_calls(), 1);
    }

    #[tokio::test]
    async fn load_at_ttl_refetches() {
        let h = harness(FakeDirectory::new());

        h.loader.load(&p1()).await;
        h.clock.advance(Duration::milliseconds(120_000));
        h.loader.load(&p1()).await;

        assert_eq!(h.directory.profile_calls(), 2);
        assert_eq!(h.directory.role_calls(), 2);
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_fetch() {
        let directory = FakeDirectory::new();
        directory.set_roles(&p1(), vec![RoleAssignment::new("customer", 10)]);
        let gate = directory.gate(&p1());
        let h = harness(directory);

        let first = tokio::spawn({
            let loader = h.loader.clone();
            async move { loader.load(&p1()).await }
        });
        let second = tokio::spawn({
            let loader = h.loader.clone();
            async move { loader.load(&p1()).await }
        });
        while h.directory.profile_calls() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(h.loader.is_loading(&p1()));
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        gate.add_permits(16);

        let first = first.await.unwrap();
        let second = second.await.unwrap();

        assert_eq!(first, second);
        assert!(first.roles.is_customer());
        assert_eq!(h.directory.profile_calls(), 1);
        assert_eq!(h.directory.role_calls(), 1);
        assert!(!h.loader.is_loading(&p1()));
    }

    #[tokio::test]
    async fn failed_role_procedure_falls_back_once() {
        let directory = FakeDirectory::new();
        directory.fail_role_procedure();
        let soon = chrono::Utc::now() + Duration::days(1);
        let past = chrono::Utc::now() - Duration::days(1);
        directory.set_role_records(
            &p1(),
            vec![
                RoleAssignmentRecord {
                    role_name: "customer".to_string(),
                    role_level: 10,
                    is_active: true,
                    expires_at: None,
                },
                RoleAssignmentRecord {
                    role_name: "company_admin".to_string(),
                    role_level: 80,
                    is_active: true,
                    expires_at: Some(soon),
                },
                RoleAssignmentRecord {
                    role_name: "branch_admin".to_string(),
                    role_level: 60,
                    is_active: false,
                    expires_at: None,
                },
                RoleAssignmentRecord {
                    role_name: "super_admin".to_string(),
                    role_level: 100,
                    is_active: true,
                    expires_at: Some(past),
                },
            ],
        );
        let h = harness(directory);

        let data = h.loader.load(&p1()).await;

        assert_eq!(
            data.roles.roles(),
            &[
                RoleAssignment::new("company_admin", 80),
                RoleAssignment::new("customer", 10),
            ]
        );
        assert_eq!(h.directory.role_calls(), 1);
        assert_eq!(h.directory.fallback_calls(), 1);
    }

    #[tokio::test]
    async fn failed_fetches_are_not_cached() {
        let directory = FakeDirectory::new();
        directory.fail_role_procedure();
        directory.fail_fallback();
        directory.fail_profile();
        let h = harness(directory);

        let data = h.loader.load(&p1()).await;
        assert!(data.roles.is_empty());
        assert!(data.profile.is_none());

        h.loader.load(&p1()).await;
        assert_eq!(h.directory.profile_calls(), 2);
        assert_eq!(h.directory.role_calls(), 2);
        assert_eq!(h.directory.fallback_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_keeps_finished_parts() {
        let directory = FakeDirectory::new();
        directory.set_profile(&p1(), "Ada");
        directory.set_roles(&p1(), vec![RoleAssignment::new("customer", 10)]);
        directory.delay_roles(std::time::Duration::from_secs(10));
        let h = harness(directory);

        let started = Instant::now();
        let data = h.loader.load(&p1()).await;

        assert!(started.elapsed() <= std::time::Duration::from_millis(4_001));
        assert!(!data.complete);
        assert!(data.profile.is_some());
        assert!(data.roles.is_empty());

        // The timed-out part was not cached; the profile was.
        h.loader.load(&p1()).await;
        assert_eq!(h.directory.profile_calls(), 1);
        assert_eq!(h.directory.role_calls(), 2);
    }

    #[tokio::test]
    async fn forget_forces_refetch() {
        let h = harness(FakeDirectory::new());

        h.loader.load(&p1()).await;
        h.loader.forget(&p1());
        h.loader.load(&p1()).await;

        assert_eq!(h.directory.role_calls(), 2);
    }
}
