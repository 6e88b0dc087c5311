//! Admin dashboard page and its actions
//!
//! Every action is a form POST carrying the view state it was submitted
//! from, and answers with a redirect back to that view. The resulting notice
//! rides along in the flash cookie.

use super::{consume_flash, flashed_notice, redirect_with};
use crate::{
    error::WebError,
    session::{AdminContext, AdminSession},
    state::AppState,
    views::dashboard::{DashboardView, render},
};
use axum::{
    Extension, Form,
    extract::{Path, RawQuery, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use promised_land_admin::{
    AnnouncementDraft, DASHBOARD_PATH, Dashboard, DashboardState, Notice, dashboard::can_send_reply,
};
use promised_land_core::ApplicationStatus;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Form carrying only the view state
#[derive(Debug, Deserialize)]
pub struct ViewForm {
    /// Query string of the view the form was submitted from
    #[serde(default)]
    pub view: String,
}

/// Approve/reject form
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    /// New status
    pub status: ApplicationStatus,
    /// View state
    #[serde(default)]
    pub view: String,
}

/// Reply composer form
#[derive(Debug, Deserialize)]
pub struct ReplyForm {
    /// Reply text
    #[serde(default)]
    pub reply: String,
    /// View state
    #[serde(default)]
    pub view: String,
}

/// New announcement form
#[derive(Debug, Deserialize)]
pub struct AnnouncementForm {
    /// Title
    #[serde(default)]
    pub title: String,
    /// Body
    #[serde(default)]
    pub content: String,
    /// View state
    #[serde(default)]
    pub view: String,
}

fn dashboard_for(state: &AppState, session: &AdminSession) -> Dashboard {
    Dashboard::new(
        state.access.for_session(&session.0.access_token),
        Arc::clone(&state.pending),
    )
}

fn back(state: &AppState, view: &DashboardState, notice: Option<&Notice>) -> Response {
    redirect_with(&state.config.admin, DASHBOARD_PATH, Some(&view.to_query()), notice)
}

async fn render_page(
    dashboard: &Dashboard,
    context: &AdminContext,
    view: &DashboardState,
    draft: &AnnouncementDraft,
    notice: Option<&Notice>,
) -> Result<Response, WebError> {
    let data = context
        .scope
        .settle(dashboard.load())
        .await
        .ok_or(WebError::ShuttingDown)?;
    let page = DashboardView {
        state: view,
        data: &data,
        pending: dashboard.pending(),
        draft,
    };
    Ok(render(&page, notice)?.into_response())
}

/// The dashboard, on the tab and with the panels named in the query
pub async fn dashboard_page(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AdminContext>,
    Extension(session): Extension<AdminSession>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Response, WebError> {
    let view = DashboardState::from_query(&query.unwrap_or_default());
    let notice = flashed_notice(&headers);
    let dashboard = dashboard_for(&state, &session);
    let draft = AnnouncementDraft::default();
    let page = render_page(&dashboard, &context, &view, &draft, notice.as_ref()).await?;
    Ok(consume_flash(&state.config.admin, &headers, page))
}

/// Approve or reject an application
pub async fn set_status(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AdminSession>,
    Path(id): Path<Uuid>,
    Form(form): Form<StatusForm>,
) -> Response {
    let view = DashboardState::from_query(&form.view);
    let notice = dashboard_for(&state, &session).set_status(id, form.status).await;
    back(&state, &view, notice.as_ref())
}

/// Delete an application
pub async fn delete_application(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AdminSession>,
    Path(id): Path<Uuid>,
    Form(form): Form<ViewForm>,
) -> Response {
    let view = DashboardState::from_query(&form.view);
    let notice = dashboard_for(&state, &session).delete_application(id).await;
    back(&state, &view, notice.as_ref())
}

/// Reply to a contact message
pub async fn reply(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AdminSession>,
    Path(id): Path<Uuid>,
    Form(form): Form<ReplyForm>,
) -> Response {
    let mut view = DashboardState::from_query(&form.view);
    if !can_send_reply(&form.reply) {
        return back(&state, &view, None);
    }
    let notice = dashboard_for(&state, &session)
        .reply(&mut view, id, &form.reply)
        .await;
    back(&state, &view, notice.as_ref())
}

/// Delete a contact message
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AdminSession>,
    Path(id): Path<Uuid>,
    Form(form): Form<ViewForm>,
) -> Response {
    let mut view = DashboardState::from_query(&form.view);
    let notice = dashboard_for(&state, &session)
        .delete_message(&mut view, id)
        .await;
    back(&state, &view, notice.as_ref())
}

/// Post an announcement
///
/// A failed post renders the form again with what was typed.
pub async fn post_announcement(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AdminContext>,
    Extension(session): Extension<AdminSession>,
    Form(form): Form<AnnouncementForm>,
) -> Result<Response, WebError> {
    let view = DashboardState::from_query(&form.view);
    let mut draft = AnnouncementDraft {
        title: form.title,
        content: form.content,
    };
    let dashboard = dashboard_for(&state, &session);

    match dashboard.post_announcement(&mut draft).await {
        Some(notice) if notice.is_error() => {
            render_page(&dashboard, &context, &view, &draft, Some(&notice)).await
        }
        notice => Ok(back(&state, &view, notice.as_ref())),
    }
}

/// Delete an announcement
pub async fn delete_announcement(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AdminSession>,
    Path(id): Path<Uuid>,
    Form(form): Form<ViewForm>,
) -> Response {
    let view = DashboardState::from_query(&form.view);
    let notice = dashboard_for(&state, &session).delete_announcement(id).await;
    back(&state, &view, notice.as_ref())
}
