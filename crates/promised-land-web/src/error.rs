//! Errors returned by handlers

use crate::views::render_error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use promised_land_core::Error;
use tracing::{error, warn};

/// Handler error rendered as an HTML error page
#[derive(Debug)]
pub enum WebError {
    /// A failed operation
    Core(Error),
    /// A page template failed to render
    Render(askama::Error),
    /// The server is shutting down and dropped the result
    ShuttingDown,
}

impl From<Error> for WebError {
    fn from(e: Error) -> Self {
        Self::Core(e)
    }
}

impl From<askama::Error> for WebError {
    fn from(e: askama::Error) -> Self {
        Self::Render(e)
    }
}

/// Status code reported for `e`
#[must_use]
pub const fn status_for(e: &Error) -> StatusCode {
    match e {
        Error::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Authentication(_) | Error::Unauthenticated => StatusCode::UNAUTHORIZED,
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::Remote { .. } | Error::Http(_) | Error::Database(_) => StatusCode::BAD_GATEWAY,
        Error::Configuration { .. } | Error::Serialization(_) | Error::Other(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Render a bare error page
pub fn error_page(status: StatusCode, message: &str) -> Response {
    match render_error(status.as_u16(), message) {
        Ok(html) => (status, html).into_response(),
        Err(_) => (status, message.to_string()).into_response(),
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            Self::Core(e) => {
                let status = status_for(&e);
                if status.is_server_error() {
                    error!(error = %e, "Request failed");
                } else {
                    warn!(error = %e, "Request rejected");
                }
                error_page(status, &e.user_message())
            }
            Self::Render(e) => {
                error!(error = %e, "Page rendering failed");
                error_page(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong.")
            }
            Self::ShuttingDown => {
                error_page(StatusCode::SERVICE_UNAVAILABLE, "The server is shutting down.")
            }
        }
    }
}
