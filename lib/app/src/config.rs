//! Application configuration.
//!
//! Loaded via the `config` crate from environment variables, with `__`
//! separating nesting levels (`BACKEND__URL`, `AUTH__LOAD_TIMEOUT_MS`,
//! `COMMERCE__CONSUMER_KEY`, `STORAGE__PATH`).

use pawtag_backend::BackendConfig;
use pawtag_commerce::CommerceConfig;
use pawtag_platform_access::AuthConfig;
use pawtag_storage::StorageConfig;
use serde::Deserialize;

/// Application configuration composed from library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Hosted auth and database service.
    pub backend: BackendConfig,

    /// Authorization cache tuning.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Storefront API. Without it the catalog and checkout are disabled.
    #[serde(default)]
    pub commerce: Option<CommerceConfig>,

    /// Location of persisted client state.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(config::Environment::default())
    }

    /// Loads configuration from `source`, which is read with `__` as the
    /// nesting separator.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_source(source: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}
