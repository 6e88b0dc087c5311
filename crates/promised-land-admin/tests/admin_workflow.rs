//! End-to-end admin workflows against the in-memory backends

use pretty_assertions::assert_eq;
use promised_land_admin::{
    AnnouncementDraft, AuthFlow, AuthForm, AuthMode, AuthOutcome, Dashboard, DashboardState,
    DataAccess, GuardDecision, Notice, PendingActions, QueryCache, ReplyPanel, ResetOutcome,
    SessionGuard, Tab, ViewScope, open_reset_link, submit_new_password,
};
use promised_land_auth::{AuthClient, MemoryAuthProvider};
use promised_land_core::{
    ApplicationStatus, Result,
    validation::PasswordReset,
};
use promised_land_database::{MemoryStore, Table};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

const ADMIN: &str = "admin@promisedlandss.org";
const SITE: &str = "http://localhost:8080";

struct Backend {
    provider: MemoryAuthProvider,
    store: MemoryStore,
    access: DataAccess,
    pending: Arc<PendingActions>,
}

impl Backend {
    fn new() -> Self {
        let store = MemoryStore::new();
        let access = DataAccess::new(Arc::new(store.clone()), Arc::new(QueryCache::new()));
        Self {
            provider: MemoryAuthProvider::new(),
            store,
            access,
            pending: Arc::new(PendingActions::new()),
        }
    }

    fn auth(&self) -> Arc<AuthClient> {
        Arc::new(AuthClient::new(Arc::new(self.provider.clone())))
    }

    fn flow(&self, auth: &Arc<AuthClient>) -> AuthFlow {
        AuthFlow::new(
            Arc::clone(auth),
            self.access.clone(),
            ADMIN,
            format!("{SITE}/admin/reset-password"),
            SITE,
        )
    }

    fn dashboard(&self) -> Dashboard {
        Dashboard::new(self.access.clone(), Arc::clone(&self.pending))
    }

    fn seed(&self) -> Result<()> {
        let program = Uuid::new_v4();
        self.store
            .seed(Table::Programs, [json!({"id": program, "name": "Catering"})])?;
        self.store.seed(
            Table::Applications,
            (40_u128..43).map(|n| {
                json!({
                    "id": Uuid::from_u128(n),
                    "full_name": format!("Applicant {n}"),
                    "email": format!("applicant{n}@example.com"),
                    "phone": "0700000000",
                    "program_id": program,
                    "created_at": format!("2025-10-{:02}T08:00:00Z", n - 30),
                })
            }),
        )?;
        self.store.seed(
            Table::ContactMessages,
            [json!({
                "id": Uuid::from_u128(7),
                "name": "Ruth",
                "email": "ruth@example.com",
                "subject": "Fees",
                "message": "How much is the tailoring course?",
                "created_at": "2025-10-05T12:00:00Z",
            })],
        )?;
        Ok(())
    }
}

#[tokio::test]
async fn signup_then_login_reaches_dashboard() -> Result<()> {
    let backend = Backend::new();
    let auth = backend.auth();
    let flow = backend.flow(&auth);

    let mut form = AuthForm::new(AuthMode::Signup);
    form.email = ADMIN.to_string();
    let outcome = flow.submit(&mut form, "secret1").await;
    assert_eq!(
        outcome,
        AuthOutcome::Notice(Notice::success_with("Account Created!", "You can now log in."))
    );
    assert_eq!(form.mode, AuthMode::Login);
    assert_eq!(backend.store.rows(Table::UserRoles).len(), 1);

    let auth = backend.auth();
    let guard = SessionGuard::new(Arc::clone(&auth), ViewScope::new());
    assert_eq!(guard.mount().await?.protected_view(), GuardDecision::Redirect("/admin/login"));

    let outcome = backend.flow(&auth).submit(&mut form, "secret1").await;
    assert!(matches!(outcome, AuthOutcome::SignedIn { .. }));

    let guard =
        SessionGuard::new(auth, ViewScope::new()).require_admin_role(backend.access.clone());
    assert_eq!(guard.mount().await?.protected_view(), GuardDecision::Render);
    Ok(())
}

#[tokio::test]
async fn approve_application_42() -> Result<()> {
    let backend = Backend::new();
    backend.seed()?;
    let dashboard = backend.dashboard();
    let before = dashboard.load().await.applications?;

    let notice = dashboard
        .set_status(Uuid::from_u128(42), ApplicationStatus::Approved)
        .await;
    assert_eq!(notice, Some(Notice::success("Status updated")));

    let after = dashboard.load().await.applications?;
    for (old, new) in before.iter().zip(after.iter()) {
        assert_eq!(old.id, new.id);
        let expected = if new.id == Uuid::from_u128(42) {
            ApplicationStatus::Approved
        } else {
            old.status
        };
        assert_eq!(new.status, expected);
    }
    Ok(())
}

#[tokio::test]
async fn reply_closes_composer_and_never_reopens() -> Result<()> {
    let backend = Backend::new();
    backend.seed()?;
    let dashboard = backend.dashboard();
    let id = Uuid::from_u128(7);

    let mut state = DashboardState::on_tab(Tab::Messages);
    state.start_reply(id);
    let notice = dashboard.reply(&mut state, id, "  It is listed on the programs page.  ").await;
    assert_eq!(notice, Some(Notice::success("Reply sent")));
    assert_eq!(state.replying_to, None);

    let messages = dashboard.load().await.messages?;
    let message = messages.iter().find(|m| m.id == id).cloned();
    let Some(message) = message else {
        panic!("message missing");
    };
    state.start_reply(id);
    assert!(matches!(
        state.reply_panel(&message),
        ReplyPanel::Sent { ref text, .. } if text == "It is listed on the programs page."
    ));

    let again = dashboard.reply(&mut state, id, "second").await;
    assert!(again.is_some_and(|n| n.is_error()));
    Ok(())
}

#[tokio::test]
async fn open_house_announcement_lifecycle() -> Result<()> {
    let backend = Backend::new();
    let dashboard = backend.dashboard();

    let mut draft = AnnouncementDraft {
        title: "Open House".to_string(),
        content: "Visit us Friday".to_string(),
    };
    let notice = dashboard.post_announcement(&mut draft).await;
    assert_eq!(notice, Some(Notice::success("Announcement posted successfully!")));
    assert_eq!(draft, AnnouncementDraft::default());

    let list = dashboard.load().await.announcements?;
    let Some(first) = list.first() else {
        panic!("announcement missing");
    };
    assert_eq!(first.title, "Open House");
    let id = first.id;

    assert_eq!(dashboard.delete_announcement(id).await, None);
    let list = dashboard.load().await.announcements?;
    assert!(list.iter().all(|a| a.id != id));

    let mut blank = AnnouncementDraft {
        title: "  ".to_string(),
        content: "Visit us Friday".to_string(),
    };
    let notice = dashboard.post_announcement(&mut blank).await;
    assert!(notice.is_some_and(|n| n.is_error() && n.title == "Failed to post announcement"));
    Ok(())
}

#[tokio::test]
async fn forgot_then_reset_password() -> Result<()> {
    let backend = Backend::new();
    backend.provider.add_user(ADMIN, "old-secret");
    let auth = backend.auth();

    let mut form = AuthForm::new(AuthMode::Forgot);
    form.email = ADMIN.to_string();
    backend.flow(&auth).submit(&mut form, "").await;

    let sent = backend.provider.sent_recoveries();
    let Some(link) = sent.first() else {
        panic!("no reset link sent");
    };
    assert_eq!(link.redirect_to, format!("{SITE}/admin/reset-password"));

    open_reset_link(&auth, &link.token_hash).await?;
    let outcome = submit_new_password(
        &auth,
        &PasswordReset {
            password: "new-secret".to_string(),
            confirm_password: "new-secret".to_string(),
        },
    )
    .await;
    assert!(matches!(outcome, ResetOutcome::Updated { redirect: "/admin/login", .. }));
    assert!(auth.current_session().is_none());

    let mut login = AuthForm::new(AuthMode::Login);
    login.email = ADMIN.to_string();
    let outcome = backend.flow(&auth).submit(&mut login, "new-secret").await;
    assert!(matches!(outcome, AuthOutcome::SignedIn { .. }));
    Ok(())
}

#[tokio::test]
async fn failed_list_does_not_hide_the_others() -> Result<()> {
    let backend = Backend::new();
    backend.seed()?;
    let dashboard = backend.dashboard();
    dashboard.load().await.messages?;

    backend.store.set_failure(Some(promised_land_core::Error::remote("offline")));
    let data = dashboard.load().await;

    assert_eq!(data.count(Tab::Messages), Some(1));
    assert_eq!(data.count(Tab::Applications), None);
    assert!(data.applications.is_err());
    Ok(())
}
