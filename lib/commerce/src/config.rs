//! Storefront API configuration.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

/// Connection settings for the storefront REST API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommerceConfig {
    /// Base URL of the REST API, e.g. `https://shop.example.com/wp-json/wc/v3`.
    pub base_url: String,

    pub consumer_key: String,

    pub consumer_secret: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How long catalog reads are reused, in seconds.
    #[serde(default = "default_catalog_ttl_secs")]
    pub catalog_ttl_secs: i64,
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_catalog_ttl_secs() -> i64 {
    300
}

impl CommerceConfig {
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            timeout_secs: default_timeout_secs(),
            catalog_ttl_secs: default_catalog_ttl_secs(),
        }
    }

    /// Value of the `Authorization` header.
    #[must_use]
    pub fn authorization(&self) -> String {
        let credentials = format!("{}:{}", self.consumer_key, self.consumer_secret);
        format!("Basic {}", STANDARD.encode(credentials))
    }

    #[must_use]
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn catalog_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.catalog_ttl_secs)
    }

    /// True when URL and both credentials are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.base_url.is_empty()
            && !self.consumer_key.is_empty()
            && !self.consumer_secret.is_empty()
    }
}
