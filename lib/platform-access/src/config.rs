//! Tuning for the authorization cache and event handling.

use chrono::Duration;
use serde::Deserialize;

/// Authorization cache configuration.
///
/// All durations are in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthConfig {
    /// How long cached profiles and role sets stay fresh.
    #[serde(default = "default_user_data_ttl_ms")]
    pub user_data_ttl_ms: u64,

    /// How long cached permission results stay fresh.
    #[serde(default = "default_permission_ttl_ms")]
    pub permission_ttl_ms: u64,

    /// Upper bound on one profile and role load.
    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,

    /// Window within which a repeated session event is treated as a replay.
    #[serde(default = "default_dedup_window_ms")]
    pub dedup_window_ms: u64,
}

fn default_user_data_ttl_ms() -> u64 {
    120_000
}

fn default_permission_ttl_ms() -> u64 {
    120_000
}

fn default_load_timeout_ms() -> u64 {
    4_000
}

fn default_dedup_window_ms() -> u64 {
    2_000
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            user_data_ttl_ms: default_user_data_ttl_ms(),
            permission_ttl_ms: default_permission_ttl_ms(),
            load_timeout_ms: default_load_timeout_ms(),
            dedup_window_ms: default_dedup_window_ms(),
        }
    }
}

impl AuthConfig {
    /// Profile and role freshness.
    #[must_use]
    pub fn user_data_ttl(&self) -> Duration {
        millis(self.user_data_ttl_ms)
    }

    /// Permission result freshness.
    #[must_use]
    pub fn permission_ttl(&self) -> Duration {
        millis(self.permission_ttl_ms)
    }

    /// Load deadline, as a tokio duration.
    #[must_use]
    pub fn load_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.load_timeout_ms)
    }

    /// Event replay window.
    #[must_use]
    pub fn dedup_window(&self) -> Duration {
        millis(self.dedup_window_ms)
    }
}

fn millis(ms: u64) -> Duration {
    Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}
