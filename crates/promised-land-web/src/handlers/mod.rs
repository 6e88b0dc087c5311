//! Request handlers

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod landing;

use crate::session::{NOTICE_COOKIE, append_cookie, notice_cookie, read_cookie};
use axum::{
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use promised_land_admin::Notice;
use promised_land_core::config::AdminConfig;
use tracing::warn;

/// Redirect to `path` with `query`, flashing `notice` to the page it lands on
#[must_use]
pub fn redirect_with(
    config: &AdminConfig,
    path: &str,
    query: Option<&str>,
    notice: Option<&Notice>,
) -> Response {
    let to = match query.filter(|q| !q.is_empty()) {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let mut response = Redirect::to(&to).into_response();

    if let Some(notice) = notice {
        match serde_urlencoded::to_string(notice) {
            Ok(value) => append_cookie(&mut response, &notice_cookie(config, Some(&value))),
            Err(e) => warn!(error = %e, "Notice could not be encoded"),
        }
    }
    response
}

/// Notice flashed by the previous response, if any
#[must_use]
pub fn flashed_notice(headers: &HeaderMap) -> Option<Notice> {
    let notice: Notice = serde_urlencoded::from_str(read_cookie(headers, NOTICE_COOKIE)?).ok()?;
    (!notice.title.is_empty()).then_some(notice)
}

/// Clear the flash cookie once the page showing it is sent
#[must_use]
pub fn consume_flash(
    config: &AdminConfig,
    headers: &HeaderMap,
    mut response: Response,
) -> Response {
    if read_cookie(headers, NOTICE_COOKIE).is_some() {
        append_cookie(&mut response, &notice_cookie(config, None));
    }
    response
}
