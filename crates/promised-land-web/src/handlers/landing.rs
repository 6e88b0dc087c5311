//! Public pages

use crate::{error::{WebError, error_page}, state::AppState, views::landing};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Response},
};
use std::sync::Arc;

/// Landing page
pub async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, WebError> {
    Ok(landing::render(&state.hero)?)
}

/// Fallback for unknown routes
pub async fn not_found() -> Response {
    error_page(StatusCode::NOT_FOUND, "The page you are looking for does not exist.")
}
