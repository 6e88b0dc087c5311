//! Router-level tests over the in-memory store and auth provider

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use pretty_assertions::assert_eq;
use promised_land_auth::MemoryAuthProvider;
use promised_land_core::{Config, config::StoreKind};
use promised_land_database::{MemoryStore, Table};
use promised_land_web::{AppState, build_router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const ADMIN: &str = "admin@promisedlandss.org";
const PASSWORD: &str = "correct horse";
const VOLUNTEER: &str = "volunteer@promisedlandss.org";

struct Site {
    router: Router,
    store: MemoryStore,
}

fn site() -> Site {
    let mut config = Config::default();
    config.backend.store = StoreKind::Memory;

    let store = MemoryStore::new();
    let provider = MemoryAuthProvider::new();
    let admin = provider.add_user(ADMIN, PASSWORD);
    provider.add_user(VOLUNTEER, PASSWORD);
    store
        .seed(Table::UserRoles, [json!({"user_id": admin.id, "role": "admin"})])
        .unwrap();

    let state = AppState::new(config, Arc::new(store.clone()), Arc::new(provider));
    Site {
        router: build_router(Arc::new(state)),
        store,
    }
}

async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, form: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(form.to_string())).unwrap()
}

fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

fn set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .map(|value| value.to_str().unwrap().to_string())
}

async fn text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Sign in and return the `name=value` pair to send back as a cookie
async fn sign_in(router: &Router) -> String {
    sign_in_as(router, ADMIN).await
}

async fn sign_in_as(router: &Router, email: &str) -> String {
    let form = format!("mode=login&email={email}&password=correct+horse");
    let response = send(router, post("/admin/login", &form, None)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/dashboard");
    let cookie = set_cookie(&response).unwrap();
    cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn test_landing_page() {
    let site = site();

    let response = send(&site.router, get("/", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = text(response).await;
    assert!(html.contains("Promised Land"));
    assert!(html.contains("Apply Now"));
}

#[tokio::test]
async fn test_health() {
    let site = site();

    let response = send(&site.router, get("/health", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&text(response).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "memory");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let site = site();

    let response = send(&site.router, get("/nowhere", None)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dashboard_without_session_redirects_to_login() {
    let site = site();

    let response = send(&site.router, get("/admin/dashboard", None)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");
}

fn forged_cookie() -> String {
    format!(
        "pl_session=access_token=forged&refresh_token=forged&expires_at=4000000000&user_id={}",
        Uuid::new_v4()
    )
}

#[tokio::test]
async fn test_forged_session_cookie_is_rejected() {
    let site = site();
    let cookie = forged_cookie();

    let response = send(&site.router, get("/admin/dashboard", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");
    assert!(set_cookie(&response).unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn test_forged_session_cannot_delete() {
    let site = site();
    let id = Uuid::from_u128(7);
    site.store
        .seed(
            Table::Announcements,
            [json!({"id": id, "title": "Open House", "content": "Saturday"})],
        )
        .unwrap();

    let response = send(
        &site.router,
        post(&format!("/admin/announcements/{id}/delete"), "view=", Some(&forged_cookie())),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");
    assert_eq!(site.store.rows(Table::Announcements).len(), 1);
}

#[tokio::test]
async fn test_signed_in_user_without_admin_role_is_turned_away() {
    let site = site();
    let cookie = sign_in_as(&site.router, VOLUNTEER).await;

    let response = send(&site.router, get("/admin/dashboard", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");

    let response = send(&site.router, get("/admin/login", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(text(response).await.contains("Admin Portal"));
}

#[tokio::test]
async fn test_sign_in_then_dashboard() {
    let site = site();
    let cookie = sign_in(&site.router).await;

    let response = send(&site.router, get("/admin/dashboard", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(text(response).await.contains("Admin Dashboard"));

    let response = send(&site.router, get("/admin/login", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/dashboard");
}

#[tokio::test]
async fn test_wrong_password_stays_on_form() {
    let site = site();
    let form = format!("mode=login&email={ADMIN}&password=wrong+horse");

    let response = send(&site.router, post("/admin/login", &form, None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response).is_none());
    assert!(text(response).await.contains("Admin Portal"));
}

#[tokio::test]
async fn test_signup_outside_allow_list() {
    let site = site();
    let form = "mode=signup&email=intruder%40example.com&password=secret123";

    let response = send(&site.router, post("/admin/login", form, None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(text(response).await.contains("Only the designated admin email can sign up."));
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let site = site();
    let cookie = sign_in(&site.router).await;

    let response = send(&site.router, post("/admin/logout", "", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");
    assert!(set_cookie(&response).unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn test_approve_application_redirects_with_notice() {
    let site = site();
    let id = Uuid::from_u128(42);
    site.store
        .seed(
            Table::Applications,
            [json!({
                "id": id,
                "full_name": "Daniel Okello",
                "email": "daniel@example.com",
                "phone": "0700000042",
                "created_at": "2025-10-12T08:00:00Z",
            })],
        )
        .unwrap();
    let cookie = sign_in(&site.router).await;

    let response = send(
        &site.router,
        post(
            &format!("/admin/applications/{id}/status"),
            "status=approved&view=tab%3Dapplications",
            Some(&cookie),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/dashboard?tab=applications");
    let flash = set_cookie(&response).unwrap();
    assert!(flash.starts_with("pl_notice="));
    assert!(flash.contains("Max-Age=60"));

    let flash = flash.split(';').next().unwrap();
    let both = format!("{cookie}; {flash}");
    let response = send(&site.router, get("/admin/dashboard?tab=applications", Some(&both))).await;
    assert!(set_cookie(&response).unwrap().starts_with("pl_notice=;"));
    let page = text(response).await;
    assert!(page.contains("<strong>Status updated</strong>"));
    assert!(page.contains("<span class=\"badge approved\">approved</span>"));

    let response = send(&site.router, get("/admin/dashboard", Some(&cookie))).await;
    assert!(!text(response).await.contains("Status updated"));
}

#[tokio::test]
async fn test_notice_cannot_be_injected_through_the_url() {
    let site = site();

    let response = send(
        &site.router,
        get("/admin/login?title=Hacked&description=Call+us&variant=destructive", None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let page = text(response).await;
    assert!(page.contains("Admin Portal"));
    assert!(!page.contains("Hacked"));
    assert!(!page.contains("role=\"status\""));
}

#[tokio::test]
async fn test_empty_announcement_keeps_draft() {
    let site = site();
    let cookie = sign_in(&site.router).await;

    let response = send(
        &site.router,
        post(
            "/admin/announcements",
            "title=Open+House&content=+&view=tab%3Dannouncements",
            Some(&cookie),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = text(response).await;
    assert!(html.contains("Failed to post announcement"));
    assert!(html.contains("value=\"Open House\""));
}
