//! Resource/action permission checks.

use crate::caches::AuthCaches;
use pawtag_core::PrincipalId;
use pawtag_platform_access::Directory;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Asks the backend whether a principal may act on a resource, caching
/// the answers.
pub struct PermissionChecker {
    directory: Arc<dyn Directory>,
    caches: Arc<AuthCaches>,
    ttl: chrono::Duration,
}

impl PermissionChecker {
    #[must_use]
    pub fn new(
        directory: Arc<dyn Directory>,
        caches: Arc<AuthCaches>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            directory,
            caches,
            ttl,
        }
    }

    /// Checks if `principal_id` may perform `action` on `resource`.
    ///
    /// Fails closed: a backend error yields `false` and is not cached.
    #[instrument(skip(self), fields(principal_id = %principal_id))]
    pub async fn check(&self, principal_id: &PrincipalId, resource: &str, action: &str) -> bool {
        if let Some(allowed) = self.caches.permission(principal_id, resource, action, self.ttl) {
            debug!(allowed, "permission served from cache");
            return allowed;
        }

        let generation = self.caches.permission_generation();
        match self
            .directory
            .user_has_permission(principal_id, resource, action)
            .await
        {
            Ok(allowed) => {
                debug!(allowed, "permission checked");
                if !self
                    .caches
                    .store_permission(principal_id, resource, action, allowed, generation)
                {
                    debug!("permissions invalidated during check, result not cached");
                }
                allowed
            }
            Err(error) => {
                warn!(%error, "permission check failed, denying");
                false
            }
        }
    }

    /// Drops every cached answer.
    pub fn invalidate(&self) {
        self.caches.invalidate_permissions();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDirectory;
    use chrono::Duration;
    use pawtag_core::ManualClock;

    fn checker(directory: Arc<FakeDirectory>, clock: &ManualClock) -> PermissionChecker {
        PermissionChecker::new(
            directory,
            Arc::new(AuthCaches::new(Arc::new(clock.clone()))),
            Duration::milliseconds(120_000),
        )
    }

    #[tokio::test]
    async fn answer_arriving_after_invalidation_is_not_cached() {
        let directory = Arc::new(FakeDirectory::new());
        let p1 = PrincipalId::new("p1");
        let gate = directory.gate_permissions();
        let clock = ManualClock::starting_now();
        let checker = Arc::new(checker(directory.clone(), &clock));

        let pending = tokio::spawn({
            let checker = checker.clone();
            let p1 = p1.clone();
            async move { checker.check(&p1, "companies", "manage").await }
        });
        while directory.permission_calls() == 0 {
            tokio::task::yield_now().await;
        }

        directory.set_permission(&p1, "companies", "manage", true);
        checker.invalidate();
        checker.caches.clear();
        gate.add_permits(16);

        assert!(!pending.await.unwrap());
        assert!(checker.check(&p1, "companies", "manage").await);
        assert_eq!(directory.permission_calls(), 2);
    }

    #[tokio::test]
    async fn granted_permission_is_cached() {
        let directory = Arc::new(FakeDirectory::new());
        let p1 = PrincipalId::new("p1");
        directory.set_permission(&p1, "qr_tags", "create", true);
        let clock = ManualClock::starting_now();
        let checker = checker(directory.clone(), &clock);

        assert!(checker.check(&p1, "qr_tags", "create").await);
        assert!(checker.check(&p1, "qr_tags", "create").await);
        assert_eq!(directory.permission_calls(), 1);

        clock.advance(Duration::milliseconds(120_000));
        assert!(checker.check(&p1, "qr_tags", "create").await);
        assert_eq!(directory.permission_calls(), 2);
    }

    #[tokio::test]
    async fn denial_is_cached_too() {
        let directory = Arc::new(FakeDirectory::new());
        let p1 = PrincipalId::new("p1");
        let clock = ManualClock::starting_now();
        let checker = checker(directory.clone(), &clock);

        assert!(!checker.check(&p1, "companies", "delete").await);
        assert!(!checker.check(&p1, "companies", "delete").await);
        assert_eq!(directory.permission_calls(), 1);
    }

    #[tokio::test]
    async fn errors_fail_closed_and_are_not_cached() {
        let directory = Arc::new(FakeDirectory::new());
        let p1 = PrincipalId::new("p1");
        directory.set_permission(&p1, "orders", "read", true);
        directory.fail_permissions(true);
        let clock = ManualClock::starting_now();
        let checker = checker(directory.clone(), &clock);

        assert!(!checker.check(&p1, "orders", "read").await);

        directory.fail_permissions(false);
        assert!(checker.check(&p1, "orders", "read").await);
        assert_eq!(directory.permission_calls(), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_recheck() {
        let directory = Arc::new(FakeDirectory::new());
        let p1 = PrincipalId::new("p1");
        let clock = ManualClock::starting_now();
        let checker = checker(directory.clone(), &clock);

        checker.check(&p1, "orders", "read").await;
        checker.invalidate();
        directory.set_permission(&p1, "orders", "read", true);

        assert!(checker.check(&p1, "orders", "read").await);
        assert_eq!(directory.permission_calls(), 2);
    }
}
