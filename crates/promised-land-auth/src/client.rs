//! Session-owning client over an [`AuthProvider`]

use crate::error::AuthError;
use crate::provider::{AuthEvent, AuthProvider, Session, SignUp};
use chrono::Utc;
use parking_lot::RwLock;
use promised_land_core::{Error, Result, types::AuthUser};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

const EVENT_CAPACITY: usize = 16;

/// Holds the current session and announces every change to it
#[derive(Debug)]
pub struct AuthClient {
    provider: Arc<dyn AuthProvider>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthClient {
    /// Create a client with no session
    #[must_use]
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self::with_session(provider, None)
    }

    /// Create a client resuming a stored session
    #[must_use]
    pub fn with_session(provider: Arc<dyn AuthProvider>, session: Option<Session>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            provider,
            session: RwLock::new(session),
            events,
        }
    }

    /// Subscribe to session changes
    #[must_use]
    pub fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// The session as last seen, without refreshing it
    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    fn replace(&self, session: Option<Session>, event: AuthEvent) {
        *self.session.write() = session;
        // Nobody listening is fine
        let _ = self.events.send(event);
    }

    /// The current session, refreshed first when it is about to expire
    ///
    /// A session the provider refuses to refresh is dropped and reported as
    /// signed out.
    ///
    /// # Errors
    ///
    /// Returns an error only when the provider cannot be reached.
    pub async fn get_session(&self) -> Result<Option<Session>> {
        let Some(session) = self.current_session() else {
            return Ok(None);
        };
        if !session.needs_refresh(Utc::now()) {
            return Ok(Some(session));
        }

        match self.provider.refresh(&session.refresh_token).await {
            Ok(refreshed) => {
                self.replace(Some(refreshed.clone()), AuthEvent::TokenRefreshed);
                Ok(Some(refreshed))
            }
            Err(AuthError::Transport(msg)) => Err(Error::Http(msg)),
            Err(e) => {
                warn!(error = %e, "Session refresh refused");
                self.replace(None, AuthEvent::SignedOut);
                Ok(None)
            }
        }
    }

    /// The current session, accepted by the provider
    ///
    /// A stored session is only a claim; its access token is checked with the
    /// provider and must belong to the stored user. A refused session is
    /// dropped and reported as signed out.
    ///
    /// # Errors
    ///
    /// Returns an error only when the provider cannot be reached.
    pub async fn verified_session(&self) -> Result<Option<Session>> {
        let Some(session) = self.get_session().await? else {
            return Ok(None);
        };

        match self.provider.get_user(&session.access_token).await {
            Ok(user) if user.id == session.user.id => Ok(Some(Session { user, ..session })),
            Ok(user) => {
                warn!(claimed = %session.user.id, actual = %user.id, "Session user does not own its token");
                self.replace(None, AuthEvent::SignedOut);
                Ok(None)
            }
            Err(AuthError::Transport(msg)) => Err(Error::Http(msg)),
            Err(e) => {
                warn!(error = %e, "Stored session refused");
                self.replace(None, AuthEvent::SignedOut);
                Ok(None)
            }
        }
    }

    /// Sign in with an e-mail and password
    ///
    /// # Errors
    ///
    /// Returns the provider's rejection, e.g. invalid credentials.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.provider.sign_in_with_password(email, password).await?;
        info!(user_id = %session.user.id, "Signed in");
        self.replace(Some(session.clone()), AuthEvent::SignedIn);
        Ok(session)
    }

    /// Register a new account
    ///
    /// # Errors
    ///
    /// Returns the provider's rejection, e.g. an already registered e-mail.
    pub async fn sign_up(&self, email: &str, password: &str, redirect_to: &str) -> Result<SignUp> {
        let outcome = self.provider.sign_up(email, password, redirect_to).await?;
        info!(user_id = %outcome.user.id, "Account registered");
        if let Some(session) = &outcome.session {
            self.replace(Some(session.clone()), AuthEvent::SignedIn);
        }
        Ok(outcome)
    }

    /// Ask the provider to mail a reset link
    ///
    /// # Errors
    ///
    /// Returns the provider's rejection. Unknown e-mails are not an error.
    pub async fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> Result<()> {
        self.provider
            .reset_password_for_email(email, redirect_to)
            .await
            .map_err(Error::from)
    }

    /// Start a recovery session from the token in a reset link
    ///
    /// # Errors
    ///
    /// Returns the provider's rejection of an invalid or used token.
    pub async fn exchange_recovery(&self, token_hash: &str) -> Result<Session> {
        let session = self.provider.verify_recovery(token_hash).await?;
        self.replace(Some(session.clone()), AuthEvent::PasswordRecovery);
        Ok(session)
    }

    /// Set a new password for the signed-in user
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthenticated`] without a session, or the provider's
    /// rejection.
    pub async fn update_password(&self, password: &str) -> Result<AuthUser> {
        let session = self.get_session().await?.ok_or(Error::Unauthenticated)?;
        let user = self
            .provider
            .update_user(&session.access_token, password)
            .await?;
        let _ = self.events.send(AuthEvent::UserUpdated);
        Ok(user)
    }

    /// End the session locally and at the provider
    ///
    /// The local session is always cleared; a provider failure is only logged.
    pub async fn sign_out(&self) {
        let previous = self.session.write().take();
        if let Some(session) = previous {
            if let Err(e) = self.provider.sign_out(&session.access_token).await {
                warn!(error = %e, "Provider sign-out failed");
            }
            info!(user_id = %session.user.id, "Signed out");
        }
        let _ = self.events.send(AuthEvent::SignedOut);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::memory::MemoryAuthProvider;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    const EMAIL: &str = "admin@promisedlandss.org";

    fn setup() -> (MemoryAuthProvider, AuthClient) {
        let provider = MemoryAuthProvider::new();
        provider.add_user(EMAIL, "secret1");
        let client = AuthClient::new(Arc::new(provider.clone()));
        (provider, client)
    }

    #[tokio::test]
    async fn sign_in_emits_event_and_stores_session() {
        let (_, client) = setup();
        let mut events = client.on_auth_state_change();

        let session = client.sign_in_with_password(EMAIL, "secret1").await.unwrap();

        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedIn);
        assert_eq!(client.get_session().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn failed_sign_in_leaves_no_session() {
        let (_, client) = setup();
        let err = client.sign_in_with_password(EMAIL, "bad").await.unwrap_err();

        assert_eq!(err.user_message(), "Invalid login credentials");
        assert_eq!(client.get_session().await.unwrap(), None);
    }

    #[tokio::test]
    async fn expiring_session_is_refreshed() {
        let (provider, client) = setup();
        provider.set_session_ttl(Duration::seconds(10));
        let first = client.sign_in_with_password(EMAIL, "secret1").await.unwrap();
        provider.set_session_ttl(Duration::hours(1));
        let mut events = client.on_auth_state_change();

        let current = client.get_session().await.unwrap().unwrap();

        assert_ne!(current.access_token, first.access_token);
        assert_eq!(events.recv().await.unwrap(), AuthEvent::TokenRefreshed);
    }

    #[tokio::test]
    async fn refused_refresh_signs_out() {
        let (provider, client) = setup();
        provider.set_session_ttl(Duration::seconds(0));
        let session = client.sign_in_with_password(EMAIL, "secret1").await.unwrap();
        provider.refresh(&session.refresh_token).await.unwrap();
        let mut events = client.on_auth_state_change();

        assert_eq!(client.get_session().await.unwrap(), None);
        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedOut);
    }

    fn claimed(access_token: &str, user: AuthUser) -> Session {
        Session {
            access_token: access_token.to_string(),
            refresh_token: access_token.to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            user,
        }
    }

    #[tokio::test]
    async fn verified_session_accepts_issued_token() {
        let (_, client) = setup();
        let session = client.sign_in_with_password(EMAIL, "secret1").await.unwrap();

        assert_eq!(client.verified_session().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn forged_token_is_dropped() {
        let (provider, _) = setup();
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(EMAIL.to_string()),
        };
        let client = AuthClient::with_session(Arc::new(provider), Some(claimed("forged", user)));
        let mut events = client.on_auth_state_change();

        assert_eq!(client.verified_session().await.unwrap(), None);
        assert!(client.current_session().is_none());
        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedOut);
    }

    #[tokio::test]
    async fn token_of_another_user_is_dropped() {
        let (provider, client) = setup();
        let other = provider.add_user("volunteer@example.org", "secret2");
        let session = client.sign_in_with_password(EMAIL, "secret1").await.unwrap();
        let client = AuthClient::with_session(
            Arc::new(provider),
            Some(claimed(&session.access_token, other)),
        );

        assert_eq!(client.verified_session().await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_password_requires_session() {
        let (provider, client) = setup();
        let err = client.update_password("another1").await.unwrap_err();

        assert_eq!(err, Error::Unauthenticated);
        assert!(!provider.calls().contains(&"update_user"));
    }

    #[tokio::test]
    async fn sign_out_clears_session() {
        let (provider, client) = setup();
        let session = client.sign_in_with_password(EMAIL, "secret1").await.unwrap();

        client.sign_out().await;

        assert!(client.current_session().is_none());
        assert!(provider.get_user(&session.access_token).await.is_err());
    }
}
