//! Keyed in-memory cache with per-read time-to-live.
//!
//! Each entry remembers when it was stored. A read supplies the TTL it is
//! willing to accept; an entry whose age is greater than or equal to that
//! TTL is treated as absent.

use crate::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

/// Thread-safe keyed cache whose freshness is judged at read time.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    /// Creates an empty cache reading time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Returns the value stored under `key` if it is younger than `ttl`.
    #[must_use]
    pub fn get(&self, key: &str, ttl: Duration) -> Option<V> {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key)?;
        if now - entry.stored_at >= ttl {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Stores `value` under `key`, stamped with the current time.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), entry);
    }

    /// Removes the entry stored under `key`, returning its value.
    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .map(|entry| entry.value)
    }

    /// Drops every entry.
    pub fn invalidate_all(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of stored entries, fresh or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self
            .entries
            .read()
            .map(|entries| entries.len())
            .unwrap_or_default();
        f.debug_struct("TtlCache")
            .field("entries", &len)
            .field("clock", &self.clock)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache() -> (TtlCache<String>, ManualClock) {
        let clock = ManualClock::starting_now();
        (TtlCache::new(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn fresh_entry_is_returned() {
        let (cache, clock) = cache();
        cache.set("profile:p1", "alice".to_string());

        clock.advance(Duration::milliseconds(119_999));
        assert_eq!(
            cache.get("profile:p1", Duration::milliseconds(120_000)),
            Some("alice".to_string())
        );
    }

    #[test]
    fn entry_at_exactly_ttl_is_absent() {
        let (cache, clock) = cache();
        cache.set("roles:p1", "admin".to_string());

        clock.advance(Duration::milliseconds(120_000));
        assert!(cache.get("roles:p1", Duration::milliseconds(120_000)).is_none());
    }

    #[test]
    fn entry_past_ttl_is_absent_but_still_stored() {
        let (cache, clock) = cache();
        cache.set("roles:p1", "admin".to_string());

        clock.advance(Duration::minutes(5));
        assert!(cache.get("roles:p1", Duration::minutes(2)).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn set_restamps_existing_entry() {
        let (cache, clock) = cache();
        cache.set("k", "old".to_string());
        clock.advance(Duration::seconds(90));
        cache.set("k", "new".to_string());
        clock.advance(Duration::seconds(90));

        assert_eq!(
            cache.get("k", Duration::seconds(120)),
            Some("new".to_string())
        );
    }

    #[test]
    fn invalidate_all_clears_everything() {
        let (cache, _clock) = cache();
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());

        cache.invalidate_all();
        assert!(cache.is_empty());
        assert!(cache.get("a", Duration::hours(1)).is_none());
    }

    #[test]
    fn remove_returns_value() {
        let (cache, _clock) = cache();
        cache.set("k", "v".to_string());
        assert_eq!(cache.remove("k"), Some("v".to_string()));
        assert_eq!(cache.remove("k"), None);
    }
}
