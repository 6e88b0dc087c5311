//! Auth provider interface and session types

use crate::error::AuthError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use promised_land_core::types::AuthUser;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sessions this close to expiry are refreshed before use
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// An authenticated session issued by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token for store and auth calls
    pub access_token: String,
    /// Token exchanged for a new session on expiry
    pub refresh_token: String,
    /// When `access_token` stops being accepted
    pub expires_at: DateTime<Utc>,
    /// Signed-in user
    pub user: AuthUser,
}

/// Flat form of a session kept in the browser cookie
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    refresh_token: String,
    expires_at: i64,
    user_id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl Session {
    /// Whether the session is expired, or will be within [`EXPIRY_MARGIN_SECS`]
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) <= now
    }

    /// Encode the session for storage in a cookie
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be encoded.
    pub fn to_cookie_value(&self) -> Result<String, AuthError> {
        let stored = StoredSession {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_at: self.expires_at.timestamp(),
            user_id: self.user.id,
            email: self.user.email.clone(),
        };
        serde_urlencoded::to_string(&stored).map_err(|e| AuthError::InvalidSession(e.to_string()))
    }

    /// Decode a session stored with [`Session::to_cookie_value`]
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidSession`] if the value is malformed.
    pub fn from_cookie_value(value: &str) -> Result<Self, AuthError> {
        let stored: StoredSession = serde_urlencoded::from_str(value)
            .map_err(|e| AuthError::InvalidSession(e.to_string()))?;
        let expires_at = DateTime::from_timestamp(stored.expires_at, 0)
            .ok_or_else(|| AuthError::InvalidSession("invalid expiry".to_string()))?;

        Ok(Self {
            access_token: stored.access_token,
            refresh_token: stored.refresh_token,
            expires_at,
            user: AuthUser {
                id: stored.user_id,
                email: stored.email,
            },
        })
    }
}

/// Session change notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// A session was established by sign-in
    SignedIn,
    /// The session was ended
    SignedOut,
    /// The session was replaced by a refreshed one
    TokenRefreshed,
    /// The user's credentials changed
    UserUpdated,
    /// A session was established from a password recovery link
    PasswordRecovery,
}

/// Result of a sign-up request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUp {
    /// The created user
    pub user: AuthUser,
    /// Present when the provider signs the user in immediately
    pub session: Option<Session>,
}

/// Operations offered by the hosted authentication provider
#[async_trait]
pub trait AuthProvider: Send + Sync + std::fmt::Debug {
    /// Exchange an e-mail and password for a session
    async fn sign_in_with_password(&self, email: &str, password: &str)
    -> Result<Session, AuthError>;

    /// Register a user; confirmation mail links back to `redirect_to`
    async fn sign_up(&self, email: &str, password: &str, redirect_to: &str)
    -> Result<SignUp, AuthError>;

    /// Send a password reset link pointing at `redirect_to`
    ///
    /// Succeeds whether or not an account exists for `email`.
    async fn reset_password_for_email(&self, email: &str, redirect_to: &str)
    -> Result<(), AuthError>;

    /// Exchange the token from a recovery link for a session
    async fn verify_recovery(&self, token_hash: &str) -> Result<Session, AuthError>;

    /// Look up the user owning `access_token`
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError>;

    /// Exchange a refresh token for a new session
    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError>;

    /// Set a new password for the user owning `access_token`
    async fn update_user(&self, access_token: &str, password: &str) -> Result<AuthUser, AuthError>;

    /// Revoke the session owning `access_token`
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}
