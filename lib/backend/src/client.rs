//! HTTP client for the hosted auth and database service.

use crate::config::{BackendConfig, Endpoint, Environment};
use crate::error::BackendError;
use pawtag_platform_access::{DirectoryError, Session, SessionEvent};
use pawtag_storage::{ClientStorage, StorageError, get_json, keys, set_json};
use reqwest::{Method, RequestBuilder, Response};
use rootcause::prelude::Report;
use serde::de::DeserializeOwned;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 32;

/// Talks to one backend deployment on behalf of one user.
///
/// Holds the current session, mirrors it to client storage under
/// [`keys::SESSION_TOKEN`], and announces changes to subscribers.
pub struct BackendClient {
    http: reqwest::Client,
    endpoint: Endpoint,
    storage: Arc<dyn ClientStorage>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
}

impl BackendClient {
    /// Creates a client for `environment`.
    pub fn new(
        config: &BackendConfig,
        environment: Environment,
        storage: Arc<dyn ClientStorage>,
    ) -> Result<Self, Report<BackendError>> {
        let endpoint = config.endpoint(environment);
        if endpoint.url.is_empty() {
            return Err(BackendError::InvalidConfig {
                details: format!("no URL configured for the {environment} environment"),
            }
            .into());
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| BackendError::ClientBuild {
                details: e.to_string(),
            })?;

        info!(environment = %environment, url = %endpoint.url, "backend client ready");
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            http,
            endpoint,
            storage,
            session: RwLock::new(None),
            events,
        })
    }

    /// Creates a client for the environment remembered in `storage`.
    pub fn from_storage(
        config: &BackendConfig,
        storage: Arc<dyn ClientStorage>,
    ) -> Result<Self, Report<BackendError>> {
        let environment = Environment::load(storage.as_ref());
        Self::new(config, environment, storage)
    }

    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.endpoint.environment
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.endpoint.url)
    }

    pub(crate) fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{path}", self.endpoint.url)
    }

    /// The user's access token while signed in, the public key otherwise.
    pub(crate) fn bearer(&self) -> String {
        self.read_session()
            .as_ref()
            .map(|session| session.access_token().to_string())
            .unwrap_or_else(|| self.endpoint.anon_key.clone())
    }

    /// Starts a request carrying the API key and bearer token.
    pub(crate) fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.endpoint.anon_key)
            .bearer_auth(self.bearer())
    }

    /// Starts an auth request authorized by the public key only.
    pub(crate) fn anonymous_request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.endpoint.anon_key)
            .bearer_auth(&self.endpoint.anon_key)
    }

    /// Sends a database request and decodes the JSON answer.
    pub(crate) async fn send_json<R: DeserializeOwned>(
        operation: &str,
        request: RequestBuilder,
    ) -> Result<R, DirectoryError> {
        let response = request
            .send()
            .await
            .map_err(|e| DirectoryError::Request {
                operation: operation.to_string(),
                details: e.to_string(),
            })?;
        let response = Self::check_status(operation, response).await?;
        response
            .json::<R>()
            .await
            .map_err(|e| DirectoryError::Decode {
                operation: operation.to_string(),
                details: e.to_string(),
            })
    }

    async fn check_status(operation: &str, response: Response) -> Result<Response, DirectoryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(DirectoryError::Status {
            operation: operation.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    pub(crate) fn read_session(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_session(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes `session` current, persists it and announces `event`.
    pub(crate) fn install(&self, session: Session, event: fn(Session) -> SessionEvent) {
        if let Err(error) = set_json(self.storage.as_ref(), keys::SESSION_TOKEN, &session) {
            warn!(%error, "could not persist session");
        }
        *self.write_session() = Some(session.clone());
        self.emit(event(session));
    }

    /// Drops the session from memory and storage.
    ///
    /// Returns true if a session was held in memory.
    pub(crate) fn forget_session(&self) -> bool {
        let had_session = self.write_session().take().is_some();
        if let Err(error) = self.storage.remove(keys::SESSION_TOKEN) {
            warn!(%error, "could not remove stored session");
        }
        had_session
    }

    /// Returns the in-memory session, else the stored one.
    ///
    /// An undecodable stored session is removed.
    pub(crate) fn known_session(&self) -> Option<Session> {
        if let Some(session) = self.read_session().clone() {
            return Some(session);
        }
        match get_json::<Session>(self.storage.as_ref(), keys::SESSION_TOKEN) {
            Ok(session) => session,
            Err(StorageError::Decode { details, .. }) => {
                warn!(%details, "discarding unreadable stored session");
                self.forget_session();
                None
            }
            Err(error) => {
                warn!(%error, "could not read stored session");
                None
            }
        }
    }

    /// Makes a still-valid stored session current without announcing it.
    pub(crate) fn adopt(&self, session: Session) {
        debug!(principal_id = %session.principal_id(), "restored stored session");
        *self.write_session() = Some(session);
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        debug!(kind = %event.kind, "session event");
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    pub(crate) fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client, session};
    use chrono::Duration;
    use pawtag_core::PrincipalId;
    use pawtag_storage::MemoryStorage;

    #[test]
    fn urls_are_built_from_endpoint() {
        let client = client(Arc::new(MemoryStorage::new()));
        assert_eq!(
            client.auth_url("token?grant_type=password"),
            "https://project.example.co/auth/v1/token?grant_type=password"
        );
        assert_eq!(
            client.rest_url("rpc/get_user_roles"),
            "https://project.example.co/rest/v1/rpc/get_user_roles"
        );
    }

    #[test]
    fn bearer_falls_back_to_public_key() {
        let client = client(Arc::new(MemoryStorage::new()));
        assert_eq!(client.bearer(), "anon");

        client.adopt(session(Duration::hours(1), None));
        assert_eq!(client.bearer(), "access-1");
    }

    #[test]
    fn missing_url_is_rejected() {
        let config = BackendConfig::new("", "anon");
        assert!(BackendClient::new(&config, Environment::Remote, Arc::new(MemoryStorage::new())).is_err());
    }

    #[test]
    fn environment_comes_from_storage() {
        let storage = Arc::new(MemoryStorage::new());
        Environment::Local.save(storage.as_ref()).expect("save");
        let config = BackendConfig::new("https://project.example.co", "anon");

        let client = BackendClient::from_storage(&config, storage).expect("client");

        assert_eq!(client.environment(), Environment::Local);
        assert_eq!(client.endpoint().url, "http://localhost:54321");
    }

    #[test]
    fn install_persists_and_announces() {
        let storage = Arc::new(MemoryStorage::new());
        let client = client(storage.clone());
        let mut events = client.subscribe_events();

        client.install(session(Duration::hours(1), None), SessionEvent::signed_in);

        let stored: Option<Session> =
            get_json(storage.as_ref(), keys::SESSION_TOKEN).expect("read");
        assert_eq!(stored.as_ref().map(Session::access_token), Some("access-1"));
        let event = events.try_recv().expect("event");
        assert_eq!(event.principal_id(), Some(&PrincipalId::new("u-1")));
    }

    #[test]
    fn unreadable_stored_session_is_removed() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(keys::SESSION_TOKEN, "{not json").expect("set");
        let client = client(storage.clone());

        assert!(client.known_session().is_none());
        assert_eq!(storage.get(keys::SESSION_TOKEN).expect("get"), None);
    }
}
