//! Contract of the hosted authentication service.

use crate::error::AuthenticationError;
use crate::profile::ProfileSeed;
use crate::session::{Principal, Session, SessionEvent};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Result of a sign-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The account was created and a session established.
    SignedIn(Box<Session>),
    /// The account was created but the email must be confirmed first.
    ConfirmationRequired { principal: Principal },
}

/// Session lifecycle operations offered by the auth provider.
///
/// Implementations persist the session to client storage and announce
/// every change on the channel returned by [`AuthProvider::subscribe`].
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Returns the current session, restoring it from storage if needed.
    ///
    /// An expired stored session is refreshed when possible and dropped
    /// otherwise.
    async fn current_session(&self) -> Result<Option<Session>, AuthenticationError>;

    /// Subscribes to session change notifications.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;

    /// Signs in with email and password.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthenticationError>;

    /// Creates an account, sending `seed` as user metadata.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        seed: &ProfileSeed,
    ) -> Result<SignUpOutcome, AuthenticationError>;

    /// Ends the current session.
    async fn sign_out(&self) -> Result<(), AuthenticationError>;
}
