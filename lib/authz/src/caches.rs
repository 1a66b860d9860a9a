//! The caches owned by the authorization manager.
//!
//! Profiles and role sets are keyed by principal; permission results by
//! principal, resource and action.

use pawtag_core::{Clock, PrincipalId, TtlCache};
use pawtag_platform_access::{Profile, RoleSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicU64, Ordering};

fn profile_key(principal_id: &PrincipalId) -> String {
    format!("profile:{principal_id}")
}

fn roles_key(principal_id: &PrincipalId) -> String {
    format!("roles:{principal_id}")
}

fn permission_key(principal_id: &PrincipalId, resource: &str, action: &str) -> String {
    format!("perm:{principal_id}:{resource}:{action}")
}

/// Profile, role and permission caches sharing one clock.
#[derive(Debug)]
pub struct AuthCaches {
    /// `None` records a principal without a profile row.
    profiles: TtlCache<Option<Profile>>,
    roles: TtlCache<RoleSet>,
    permissions: TtlCache<bool>,
    /// Bumped by [`AuthCaches::clear`].
    generation: AtomicU64,
    /// Bumped whenever permission results are dropped. Held while a result
    /// is stored so a drop cannot interleave.
    permission_generation: Mutex<u64>,
}

impl AuthCaches {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            profiles: TtlCache::new(clock.clone()),
            roles: TtlCache::new(clock.clone()),
            permissions: TtlCache::new(clock),
            generation: AtomicU64::new(0),
            permission_generation: Mutex::new(0),
        }
    }

    /// Returns the cached profile lookup, if fresh.
    ///
    /// The outer `Option` is the cache hit; the inner one is the row.
    #[must_use]
    pub fn profile(
        &self,
        principal_id: &PrincipalId,
        ttl: chrono::Duration,
    ) -> Option<Option<Profile>> {
        self.profiles.get(&profile_key(principal_id), ttl)
    }

    pub fn store_profile(&self, principal_id: &PrincipalId, profile: Option<Profile>) {
        self.profiles.set(profile_key(principal_id), profile);
    }

    #[must_use]
    pub fn roles(&self, principal_id: &PrincipalId, ttl: chrono::Duration) -> Option<RoleSet> {
        self.roles.get(&roles_key(principal_id), ttl)
    }

    pub fn store_roles(&self, principal_id: &PrincipalId, roles: RoleSet) {
        self.roles.set(roles_key(principal_id), roles);
    }

    #[must_use]
    pub fn permission(
        &self,
        principal_id: &PrincipalId,
        resource: &str,
        action: &str,
        ttl: chrono::Duration,
    ) -> Option<bool> {
        self.permissions
            .get(&permission_key(principal_id, resource, action), ttl)
    }

    /// Returns the generation a permission check must present to
    /// [`AuthCaches::store_permission`].
    #[must_use]
    pub fn permission_generation(&self) -> u64 {
        *self
            .permission_generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a permission result obtained in `generation`.
    ///
    /// Returns false, storing nothing, if permissions were dropped since.
    pub fn store_permission(
        &self,
        principal_id: &PrincipalId,
        resource: &str,
        action: &str,
        allowed: bool,
        generation: u64,
    ) -> bool {
        let current = self
            .permission_generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *current != generation {
            return false;
        }
        self.permissions
            .set(permission_key(principal_id, resource, action), allowed);
        true
    }

    /// Drops the profile and roles of one principal.
    pub fn forget_user_data(&self, principal_id: &PrincipalId) {
        self.profiles.remove(&profile_key(principal_id));
        self.roles.remove(&roles_key(principal_id));
    }

    /// Drops every permission result.
    pub fn invalidate_permissions(&self) {
        let mut generation = self
            .permission_generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *generation += 1;
        self.permissions.invalidate_all();
    }

    /// Returns the current generation.
    ///
    /// A load records the generation it started in and only stores its
    /// results if no [`AuthCaches::clear`] happened in between.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Drops everything.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.profiles.invalidate_all();
        self.roles.invalidate_all();
        self.invalidate_permissions();
    }

    #[must_use]
    pub fn permission_entries(&self) -> usize {
        self.permissions.len()
    }
}
