//! Sign-in, sign-out and password reset handlers

use super::{consume_flash, flashed_notice, redirect_with};
use crate::{
    error::WebError,
    session::AdminContext,
    state::AppState,
    views::auth::{render_login, render_reset},
};
use axum::{
    Extension, Form,
    extract::{RawQuery, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use promised_land_admin::{
    AuthForm, AuthMode, AuthOutcome, GuardDecision, LOGIN_PATH, Notice, ResetOutcome,
    open_reset_link, submit_new_password,
};
use promised_land_core::validation::PasswordReset;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

/// Path of the set-a-new-password form
pub const RESET_PATH: &str = "/admin/reset-password";

#[derive(Debug, Default, Deserialize)]
struct LoginQuery {
    mode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResetQuery {
    token_hash: Option<String>,
}

/// Submitted auth form
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Mode the form was in
    #[serde(default)]
    pub mode: AuthMode,
    /// E-mail address
    #[serde(default)]
    pub email: String,
    /// Password; absent in forgot mode
    #[serde(default)]
    pub password: String,
}

fn parse_query<T: for<'de> Deserialize<'de> + Default>(query: Option<&str>) -> T {
    query
        .and_then(|q| serde_urlencoded::from_str(q).ok())
        .unwrap_or_default()
}

/// Sign-in page; a signed-in admin goes straight to the dashboard
pub async fn login_page(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AdminContext>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Response, WebError> {
    if let GuardDecision::Redirect(to) = context.guard().mount().await?.login_view() {
        return Ok(Redirect::to(to).into_response());
    }

    let mode = parse_query::<LoginQuery>(query.as_deref())
        .mode
        .and_then(|m| m.parse().ok())
        .unwrap_or_default();
    let notice = flashed_notice(&headers);
    let page = render_login(&AuthForm::new(mode), notice.as_ref())?;
    Ok(consume_flash(&state.config.admin, &headers, page.into_response()))
}

/// Submit the sign-in, sign-up or forgot-password form
pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AdminContext>,
    Form(submitted): Form<LoginForm>,
) -> Result<Response, WebError> {
    let mut form = AuthForm {
        mode: submitted.mode,
        email: submitted.email,
        loading: false,
    };

    match state.auth_flow(context.auth).submit(&mut form, &submitted.password).await {
        AuthOutcome::SignedIn { redirect } => Ok(Redirect::to(redirect).into_response()),
        AuthOutcome::Notice(notice) if !notice.is_error() => {
            let query = format!("mode={}", form.mode);
            Ok(redirect_with(&state.config.admin, LOGIN_PATH, Some(&query), Some(&notice)))
        }
        AuthOutcome::Notice(notice) => Ok(render_login(&form, Some(&notice))?.into_response()),
        AuthOutcome::Busy => Ok(render_login(&form, None)?.into_response()),
    }
}

/// Sign out and return to the sign-in page
pub async fn logout(Extension(context): Extension<AdminContext>) -> Redirect {
    context.auth.sign_out().await;
    Redirect::to(LOGIN_PATH)
}

/// Password reset page
///
/// A reset link arrives with a `token_hash`; it is exchanged for a recovery
/// session and the browser is sent back to the bare form, so the token never
/// stays in the address bar.
pub async fn reset_page(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AdminContext>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Response, WebError> {
    let admin = &state.config.admin;
    if let Some(token_hash) = parse_query::<ResetQuery>(query.as_deref()).token_hash {
        return Ok(match open_reset_link(&context.auth, &token_hash).await {
            Ok(()) => Redirect::to(RESET_PATH).into_response(),
            Err(e) => {
                warn!(error = %e, "Reset link rejected");
                let notice = Notice::error(&e);
                let mode = format!("mode={}", AuthMode::Forgot);
                redirect_with(admin, LOGIN_PATH, Some(&mode), Some(&notice))
            }
        });
    }

    let notice = flashed_notice(&headers);
    let page = render_reset(notice.as_ref())?;
    Ok(consume_flash(admin, &headers, page.into_response()))
}

/// Submit a new password
pub async fn reset_submit(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AdminContext>,
    Form(form): Form<PasswordReset>,
) -> Result<Response, WebError> {
    match submit_new_password(&context.auth, &form).await {
        ResetOutcome::Updated { notice, redirect } => {
            Ok(redirect_with(&state.config.admin, redirect, None, Some(&notice)))
        }
        ResetOutcome::Failed(notice) => Ok(render_reset(Some(&notice))?.into_response()),
    }
}
