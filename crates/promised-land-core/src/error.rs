//! Error types for the Promised Land site

use std::{error::Error as StdError, fmt};

/// Main error type shared by every crate in the workspace
///
/// Every variant owns plain data so the error can be cloned. The query cache
/// relies on this to hand one fetch failure to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Configuration error
    Configuration {
        /// Error message
        message: String,
    },

    /// Local validation error, raised before any remote call
    Validation {
        /// Field that failed validation
        field: String,
        /// Validation error message
        message: String,
    },

    /// Error reported by the remote data store
    Remote {
        /// HTTP status or database error code, when the provider supplied one
        code: Option<String>,
        /// Provider supplied message
        message: String,
    },

    /// Database driver error
    Database(String),

    /// Transport error talking to a hosted backend
    Http(String),

    /// Authentication error
    Authentication(String),

    /// Caller has no session or an expired one
    Unauthenticated,

    /// Not found error
    NotFound {
        /// Resource that was not found
        resource: String,
    },

    /// Serialization error
    Serialization(String),

    /// Other error
    Other(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a validation error for `field`
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Build a remote error without a provider code
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            code: None,
            message: message.into(),
        }
    }

    /// Message suitable for showing to the admin
    ///
    /// Remote and validation failures show the provider or rule message as-is,
    /// without the category prefix used by `Display`.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message, .. } | Self::Remote { message, .. } => message.clone(),
            Self::Authentication(msg) | Self::Other(msg) => msg.clone(),
            Self::Unauthenticated => "You must be signed in.".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether this error was raised locally, before any network call
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { message } => write!(f, "Configuration error: {message}"),
            Self::Validation { field, message } => {
                write!(f, "Validation error: {field} - {message}")
            }
            Self::Remote {
                code: Some(code),
                message,
            } => write!(f, "Remote error ({code}): {message}"),
            Self::Remote { code: None, message } => write!(f, "Remote error: {message}"),
            Self::Database(msg) => write!(f, "Database error: {msg}"),
            Self::Http(msg) => write!(f, "HTTP error: {msg}"),
            Self::Authentication(msg) => write!(f, "Authentication failed: {msg}"),
            Self::Unauthenticated => write!(f, "Not authenticated"),
            Self::NotFound { resource } => write!(f, "Resource not found: {resource}"),
            Self::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl StdError for Error {}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration {
            message: err.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let (field, message) = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map_or_else(|| format!("{field} is invalid"), ToString::to_string);
                (field.to_string(), message)
            })
            .unwrap_or_else(|| ("input".to_string(), "Invalid input".to_string()));

        Self::Validation { field, message }
    }
}
