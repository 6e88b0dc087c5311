//! Route definitions and middleware stack

use crate::{
    handlers,
    session::{require_admin, session_middleware},
    state::AppState,
};
use axum::{
    Router, middleware,
    response::Redirect,
    routing::{get, post},
};
use promised_land_admin::{DASHBOARD_PATH, LOGIN_PATH};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

/// Public pages
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::landing::index))
        .route("/health", get(handlers::health::health_check))
}

/// Sign-in, sign-out and password reset
pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            LOGIN_PATH,
            get(handlers::auth::login_page).post(handlers::auth::login_submit),
        )
        .route("/admin/logout", post(handlers::auth::logout))
        .route(
            handlers::auth::RESET_PATH,
            get(handlers::auth::reset_page).post(handlers::auth::reset_submit),
        )
}

/// Dashboard page and actions, only reachable with a session
pub fn dashboard_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin", get(|| async { Redirect::to(DASHBOARD_PATH) }))
        .route(DASHBOARD_PATH, get(handlers::dashboard::dashboard_page))
        .route(
            "/admin/applications/:id/status",
            post(handlers::dashboard::set_status),
        )
        .route(
            "/admin/applications/:id/delete",
            post(handlers::dashboard::delete_application),
        )
        .route("/admin/messages/:id/reply", post(handlers::dashboard::reply))
        .route(
            "/admin/messages/:id/delete",
            post(handlers::dashboard::delete_message),
        )
        .route(
            "/admin/announcements",
            post(handlers::dashboard::post_announcement),
        )
        .route(
            "/admin/announcements/:id/delete",
            post(handlers::dashboard::delete_announcement),
        )
        .route_layer(middleware::from_fn(require_admin))
}

/// Build the complete router
///
/// Every `/admin` route runs inside the session middleware, which hands each
/// request its own auth client and writes session changes back to the cookie.
pub fn build_router(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .merge(auth_routes())
        .merge(dashboard_routes())
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            session_middleware,
        ));

    Router::new()
        .merge(public_routes())
        .merge(admin)
        .fallback(handlers::landing::not_found)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
