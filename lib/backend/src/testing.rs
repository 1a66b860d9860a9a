//! Shared test fixtures.

use crate::client::BackendClient;
use crate::config::{BackendConfig, Environment};
use chrono::Duration;
use pawtag_core::PrincipalId;
use pawtag_platform_access::{Principal, Session};
use pawtag_storage::ClientStorage;
use std::sync::Arc;
use wiremock::MockServer;

/// A client for a hosted project that is never contacted.
pub(crate) fn client(storage: Arc<dyn ClientStorage>) -> BackendClient {
    let config = BackendConfig::new("https://project.example.co", "anon");
    BackendClient::new(&config, Environment::Remote, storage).expect("client")
}

/// A mock deployment and a client pointed at it.
pub(crate) async fn served_client(storage: Arc<dyn ClientStorage>) -> (MockServer, BackendClient) {
    let server = MockServer::start().await;
    let config = BackendConfig::new(server.uri(), "anon");
    let client = BackendClient::new(&config, Environment::Remote, storage).expect("client");
    (server, client)
}

/// A session for `u-1` valid for `valid_for` (negative means already expired).
pub(crate) fn session(valid_for: Duration, refresh: Option<&str>) -> Session {
    Session::new(
        Principal::new(PrincipalId::new("u-1"), Some("owner@example.com".to_string())),
        "access-1".to_string(),
        refresh.map(str::to_string),
        valid_for,
    )
}
