//! Errors raised by the auth provider and by session cookies

use thiserror::Error;

/// Failures of the hosted auth provider and of session handling
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The provider rejected the request; `message` is shown to the admin
    #[error("{message}")]
    Provider {
        /// HTTP status returned by the provider
        status: u16,
        /// Provider supplied message
        message: String,
    },

    /// No session is present
    #[error("not authenticated")]
    NotAuthenticated,

    /// The session expired and could not be refreshed
    #[error("session expired")]
    SessionExpired,

    /// The provider could not be reached
    #[error("auth provider request failed: {0}")]
    Transport(String),

    /// The provider answered with a body we could not read
    #[error("invalid response from auth provider: {0}")]
    Decode(String),

    /// A stored session could not be parsed
    #[error("invalid stored session: {0}")]
    InvalidSession(String),
}

impl AuthError {
    /// Build a provider rejection
    pub fn provider(status: u16, message: impl Into<String>) -> Self {
        Self::Provider {
            status,
            message: message.into(),
        }
    }
}

impl From<AuthError> for promised_land_core::Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Provider { message, .. } => Self::Authentication(message),
            AuthError::NotAuthenticated
            | AuthError::SessionExpired
            | AuthError::InvalidSession(_) => Self::Unauthenticated,
            AuthError::Transport(msg) => Self::Http(msg),
            AuthError::Decode(msg) => Self::Serialization(msg),
        }
    }
}
