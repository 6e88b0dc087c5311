//! Session cookie and admin guard middleware
//!
//! The session lives only in an HTTP-only cookie. Each admin request gets its
//! own [`AuthClient`] seeded from that cookie, and the cookie is rewritten
//! whenever the request changed the session: sign-in, refresh or sign-out.
//! A second, short-lived cookie carries a notice across a redirect.

use crate::{error::WebError, state::AppState};
use axum::{
    Extension,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use promised_land_admin::{DataAccess, GuardDecision, LOGIN_PATH, SessionGuard, ViewScope};
use promised_land_auth::{AuthClient, Session};
use promised_land_core::config::AdminConfig;
use std::sync::Arc;
use tracing::{debug, warn};

/// Path the admin cookies are scoped to
pub const COOKIE_PATH: &str = "/admin";
/// Cookie carrying a notice to the page after a redirect
pub const NOTICE_COOKIE: &str = "pl_notice";
/// Seconds an unread notice survives
const NOTICE_MAX_AGE: u32 = 60;

/// Per-request auth state, present on every admin route
#[derive(Debug, Clone)]
pub struct AdminContext {
    /// Auth client holding this request's session
    pub auth: Arc<AuthClient>,
    /// Scope of the view being rendered
    pub scope: ViewScope,
    /// Store access used for the admin role check
    pub access: DataAccess,
}

impl AdminContext {
    /// Guard admitting only verified sessions of admin users
    #[must_use]
    pub fn guard(&self) -> SessionGuard {
        SessionGuard::new(Arc::clone(&self.auth), self.scope.clone())
            .require_admin_role(self.access.clone())
    }
}

/// The signed-in session, present on guarded routes
#[derive(Debug, Clone)]
pub struct AdminSession(pub Session);

/// Value of cookie `name` in the request headers
#[must_use]
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

fn admin_cookie(
    config: &AdminConfig,
    name: &str,
    value: Option<&str>,
    max_age: Option<u32>,
) -> String {
    let secure = if config.secure_cookies { "; Secure" } else { "" };
    match value {
        Some(value) => {
            let max_age = max_age.map(|secs| format!("; Max-Age={secs}")).unwrap_or_default();
            format!("{name}={value}; Path={COOKIE_PATH}; HttpOnly; SameSite=Lax{max_age}{secure}")
        }
        None => format!("{name}=; Path={COOKIE_PATH}; HttpOnly; SameSite=Lax; Max-Age=0{secure}"),
    }
}

/// `Set-Cookie` value storing `value`, or clearing the cookie when `None`
#[must_use]
pub fn session_cookie(config: &AdminConfig, value: Option<&str>) -> String {
    admin_cookie(config, &config.session_cookie, value, None)
}

/// `Set-Cookie` value flashing an encoded notice, or clearing it when `None`
#[must_use]
pub fn notice_cookie(config: &AdminConfig, value: Option<&str>) -> String {
    admin_cookie(config, NOTICE_COOKIE, value, Some(NOTICE_MAX_AGE))
}

/// Add a `Set-Cookie` header to `response`
pub fn append_cookie(response: &mut Response, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => warn!(error = %e, "Cookie is not a valid header value"),
    }
}

/// Attach an [`AdminContext`] and write session changes back to the cookie
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let admin = &state.config.admin;
    let stored = read_cookie(request.headers(), &admin.session_cookie).map(str::to_string);
    let session = stored.as_deref().and_then(|value| {
        Session::from_cookie_value(value)
            .inspect_err(|e| debug!(error = %e, "Ignoring unreadable session cookie"))
            .ok()
    });

    let auth = Arc::new(AuthClient::with_session(Arc::clone(&state.auth), session));
    let scope = ViewScope::child_of(&state.shutdown);
    request.extensions_mut().insert(AdminContext {
        auth: Arc::clone(&auth),
        scope: scope.clone(),
        access: state.access.clone(),
    });

    let mut response = next.run(request).await;
    scope.unmount();

    let current = match auth.current_session().map(|s| s.to_cookie_value()).transpose() {
        Ok(current) => current,
        Err(e) => {
            warn!(error = %e, "Session could not be stored, clearing cookie");
            None
        }
    };
    if current != stored {
        debug!(signed_in = current.is_some(), "Session changed, updating cookie");
        append_cookie(&mut response, &session_cookie(admin, current.as_deref()));
    }
    response
}

/// Redirect to sign-in unless the request carries an admin's session
///
/// The cookie's session must be accepted by the auth provider and its user
/// must hold the admin role. On success the session is made available to
/// handlers as [`AdminSession`].
pub async fn require_admin(
    Extension(context): Extension<AdminContext>,
    mut request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let state = context.guard().mount().await?;

    match (state.protected_view(), state.session()) {
        (GuardDecision::Render, Some(session)) => {
            request
                .extensions_mut()
                .insert(AdminSession(session.clone()));
            Ok(next.run(request).await)
        }
        (GuardDecision::Redirect(to), _) => Ok(Redirect::to(to).into_response()),
        _ => Ok(Redirect::to(LOGIN_PATH).into_response()),
    }
}
