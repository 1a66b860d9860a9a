//! Session lifecycle against the hosted auth service.

use crate::client::BackendClient;
use crate::wire::{
    AuthErrorBody, PasswordGrant, RefreshGrant, SignUpRequest, SignUpResponse, TokenResponse,
    UserRecord,
};
use async_trait::async_trait;
use pawtag_platform_access::{
    AuthProvider, AuthenticationError, ProfileSeed, Session, SessionEvent, SignUpOutcome,
};
use reqwest::{Method, Response};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

fn network(error: reqwest::Error) -> AuthenticationError {
    AuthenticationError::Network {
        details: error.to_string(),
    }
}

/// Maps a rejected auth request to the error the caller can act on.
fn classify_failure(status: u16, body: &AuthErrorBody, email: Option<&str>) -> AuthenticationError {
    if body.is_invalid_credentials() {
        AuthenticationError::InvalidCredentials
    } else if body.is_email_not_confirmed() {
        AuthenticationError::EmailNotConfirmed
    } else if body.is_already_registered() {
        AuthenticationError::AlreadyRegistered {
            email: email.unwrap_or_default().to_string(),
        }
    } else {
        AuthenticationError::ProviderError {
            status,
            reason: body.reason(),
        }
    }
}

impl BackendClient {
    async fn auth_failure(response: Response, email: Option<&str>) -> AuthenticationError {
        let status = response.status().as_u16();
        let body: AuthErrorBody = response.json().await.unwrap_or_default();
        classify_failure(status, &body, email)
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: &impl Serialize,
        email: Option<&str>,
    ) -> Result<TokenResponse, AuthenticationError> {
        let response = self
            .anonymous_request(Method::POST, &self.auth_url("token"))
            .query(&[("grant_type", grant_type)])
            .json(body)
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::auth_failure(response, email).await);
        }
        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthenticationError::ProviderError {
                status: status.as_u16(),
                reason: format!("unexpected token response: {e}"),
            })
    }

    /// Exchanges the current refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthenticationError::NotSignedIn`] without a session and
    /// [`AuthenticationError::SessionExpired`] when the session carries no
    /// refresh token.
    pub async fn refresh_session(&self) -> Result<Session, AuthenticationError> {
        let session = self
            .known_session()
            .ok_or(AuthenticationError::NotSignedIn)?;
        let refresh_token = session
            .refresh_token()
            .map(str::to_string)
            .ok_or(AuthenticationError::SessionExpired)?;
        self.refresh_with(session, &refresh_token).await
    }

    #[instrument(skip_all, fields(principal_id = %session.principal_id()))]
    async fn refresh_with(
        &self,
        mut session: Session,
        refresh_token: &str,
    ) -> Result<Session, AuthenticationError> {
        let granted = self
            .token_grant("refresh_token", &RefreshGrant { refresh_token }, None)
            .await?;
        let lifetime = chrono::Duration::seconds(granted.expires_in);
        session.refresh(granted.access_token, granted.refresh_token, lifetime);
        session.set_principal(granted.user.into_principal());

        info!("session refreshed");
        self.install(session.clone(), SessionEvent::token_refreshed);
        Ok(session)
    }

    /// Re-reads the signed-in user from the auth service and announces
    /// the change.
    ///
    /// # Errors
    ///
    /// Returns [`AuthenticationError::NotSignedIn`] without a session, or
    /// the provider's rejection.
    pub async fn refresh_user(&self) -> Result<Session, AuthenticationError> {
        let mut session = self
            .read_session()
            .clone()
            .ok_or(AuthenticationError::NotSignedIn)?;

        let response = self
            .request(Method::GET, &self.auth_url("user"))
            .send()
            .await
            .map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::auth_failure(response, None).await);
        }
        let user: UserRecord =
            response
                .json()
                .await
                .map_err(|e| AuthenticationError::ProviderError {
                    status: status.as_u16(),
                    reason: format!("unexpected user response: {e}"),
                })?;

        session.set_principal(user.into_principal());
        self.install(session.clone(), SessionEvent::user_updated);
        Ok(session)
    }

    fn drop_session(&self) {
        if self.forget_session() {
            self.emit(SessionEvent::signed_out());
        }
    }
}

#[async_trait]
impl AuthProvider for BackendClient {
    async fn current_session(&self) -> Result<Option<Session>, AuthenticationError> {
        let Some(session) = self.known_session() else {
            return Ok(None);
        };

        if session.is_valid() {
            if self.read_session().is_none() {
                self.adopt(session.clone());
            }
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token().map(str::to_string) else {
            info!("stored session expired and cannot be refreshed");
            self.drop_session();
            return Ok(None);
        };

        match self.refresh_with(session, &refresh_token).await {
            Ok(session) => Ok(Some(session)),
            // Keep the session; the refresh can be retried once reachable.
            Err(error @ AuthenticationError::Network { .. }) => Err(error),
            Err(error) => {
                warn!(%error, "stored session could not be refreshed");
                self.drop_session();
                Ok(None)
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.subscribe_events()
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthenticationError> {
        let granted = self
            .token_grant("password", &PasswordGrant { email, password }, Some(email))
            .await?;
        let session = granted.into_session();

        info!(principal_id = %session.principal_id(), "signed in");
        self.install(session.clone(), SessionEvent::signed_in);
        Ok(session)
    }

    #[instrument(skip(self, password, seed))]
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        seed: &ProfileSeed,
    ) -> Result<SignUpOutcome, AuthenticationError> {
        let body = SignUpRequest {
            email,
            password,
            data: seed,
        };
        let response = self
            .anonymous_request(Method::POST, &self.auth_url("signup"))
            .json(&body)
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::auth_failure(response, Some(email)).await);
        }
        let answer: SignUpResponse =
            response
                .json()
                .await
                .map_err(|e| AuthenticationError::ProviderError {
                    status: status.as_u16(),
                    reason: format!("unexpected sign-up response: {e}"),
                })?;

        match answer {
            SignUpResponse::Session(granted) => {
                let session = granted.into_session();
                info!(principal_id = %session.principal_id(), "signed up and signed in");
                self.install(session.clone(), SessionEvent::signed_in);
                Ok(SignUpOutcome::SignedIn(Box::new(session)))
            }
            SignUpResponse::Pending(user) => {
                info!(principal_id = %user.id, "signed up, confirmation pending");
                Ok(SignUpOutcome::ConfirmationRequired {
                    principal: user.into_principal(),
                })
            }
        }
    }

    async fn sign_out(&self) -> Result<(), AuthenticationError> {
        let held = self.read_session().is_some();
        if held {
            let outcome = self
                .request(Method::POST, &self.auth_url("logout"))
                .send()
                .await;
            match outcome {
                Ok(response) if !response.status().is_success() => {
                    warn!(status = %response.status(), "logout rejected, clearing local session anyway");
                }
                Err(error) => {
                    warn!(%error, "logout failed, clearing local session anyway");
                }
                Ok(_) => {}
            }
        }

        self.forget_session();
        info!("signed out");
        self.emit(SessionEvent::signed_out());
        Ok(())
    }
}
