//! Admin dashboard page
//!
//! The lists are turned into rows holding display strings and the view-state
//! queries each link or form carries, then handed to `dashboard.html`.

use super::{Rendered, html};
use askama::Template;
use promised_land_admin::{
    Action, AnnouncementDraft, DashboardData, DashboardState, Notice, PendingActions, ReplyPanel,
    Tab,
};
use promised_land_core::{Announcement, Application, ContactMessage, Result, types::display_date};
use std::sync::Arc;
use uuid::Uuid;

/// Everything the dashboard page is rendered from
#[derive(Debug, Clone, Copy)]
pub struct DashboardView<'a> {
    /// View state from the URL
    pub state: &'a DashboardState,
    /// The three lists
    pub data: &'a DashboardData,
    /// Running mutations
    pub pending: &'a PendingActions,
    /// Announcement form contents
    pub draft: &'a AnnouncementDraft,
}

#[derive(Debug)]
struct TabLink {
    label: &'static str,
    query: String,
    active: bool,
    count: Option<usize>,
}

#[derive(Debug)]
struct ApplicationRow {
    id: Uuid,
    full_name: String,
    email: String,
    phone: String,
    program: String,
    applied: String,
    status: &'static str,
    status_busy: bool,
    delete_busy: bool,
}

#[derive(Debug)]
enum ReplyArea {
    Hidden,
    /// Date and text of the reply
    Sent(String, String),
    /// Query of the view with the composer closed
    Composer(String),
    /// Query of the view with the composer open
    Opener(String),
}

#[derive(Debug)]
struct MessageRow {
    id: Uuid,
    subject: String,
    name: String,
    email: String,
    received: String,
    message: String,
    replied: bool,
    toggle_label: &'static str,
    toggle_query: String,
    delete_busy: bool,
    reply_busy: bool,
    reply: ReplyArea,
}

#[derive(Debug)]
struct AnnouncementRow {
    id: Uuid,
    title: String,
    content: String,
    posted: String,
    delete_busy: bool,
}

/// Rows of the open tab, or the message of its failed load
type Loaded<T> = std::result::Result<Vec<T>, String>;

#[derive(Debug)]
enum Section {
    Applications(Loaded<ApplicationRow>),
    Messages(Loaded<MessageRow>),
    Announcements(Loaded<AnnouncementRow>),
}

#[derive(Debug, Template)]
#[template(path = "dashboard.html")]
struct DashboardPage<'a> {
    notice: Option<&'a Notice>,
    view_query: String,
    tabs: Vec<TabLink>,
    section: Section,
    draft_title: &'a str,
    draft_content: &'a str,
    post_busy: bool,
}

fn rows<T, R>(list: &Result<Arc<Vec<T>>>, row: impl Fn(&T) -> R) -> Loaded<R> {
    match list {
        Ok(items) => Ok(items.iter().map(row).collect()),
        Err(e) => Err(e.user_message()),
    }
}

impl DashboardView<'_> {
    fn busy(&self, action: Action) -> bool {
        self.pending.is_pending(action)
    }

    fn tabs(&self) -> Vec<TabLink> {
        Tab::ALL
            .into_iter()
            .map(|tab| TabLink {
                label: tab.label(),
                query: self.state.with_tab(tab).to_query(),
                active: tab == self.state.tab,
                count: self.data.count(tab),
            })
            .collect()
    }

    fn application(&self, app: &Application) -> ApplicationRow {
        ApplicationRow {
            id: app.id,
            full_name: app.full_name.clone(),
            email: app.email.clone(),
            phone: app.phone.clone(),
            program: app.program_name().unwrap_or_default().to_string(),
            applied: display_date(&app.created_at),
            status: app.status.as_str(),
            status_busy: self.busy(Action::SetStatus(app.id)),
            delete_busy: self.busy(Action::DeleteApplication(app.id)),
        }
    }

    fn reply_area(&self, msg: &ContactMessage) -> ReplyArea {
        match self.state.reply_panel(msg) {
            ReplyPanel::Hidden => ReplyArea::Hidden,
            ReplyPanel::Sent { text, date } => ReplyArea::Sent(date, text),
            ReplyPanel::Composer => {
                let mut cancelled = self.state.clone();
                cancelled.cancel_reply();
                ReplyArea::Composer(cancelled.to_query())
            }
            ReplyPanel::ReplyButton => {
                let mut replying = self.state.clone();
                replying.start_reply(msg.id);
                ReplyArea::Opener(replying.to_query())
            }
        }
    }

    fn message(&self, msg: &ContactMessage) -> MessageRow {
        let mut toggled = self.state.clone();
        toggled.toggle_expanded(msg.id);
        MessageRow {
            id: msg.id,
            subject: msg.subject.clone(),
            name: msg.name.clone(),
            email: msg.email.clone(),
            received: display_date(&msg.created_at),
            message: msg.message.clone(),
            replied: msg.has_reply(),
            toggle_label: if self.state.is_expanded(msg.id) { "Collapse" } else { "Expand" },
            toggle_query: toggled.to_query(),
            delete_busy: self.busy(Action::DeleteMessage(msg.id)),
            reply_busy: self.busy(Action::Reply(msg.id)),
            reply: self.reply_area(msg),
        }
    }

    fn announcement(&self, ann: &Announcement) -> AnnouncementRow {
        AnnouncementRow {
            id: ann.id,
            title: ann.title.clone(),
            content: ann.content.clone(),
            posted: display_date(&ann.created_at),
            delete_busy: self.busy(Action::DeleteAnnouncement(ann.id)),
        }
    }

    fn section(&self) -> Section {
        match self.state.tab {
            Tab::Applications => {
                Section::Applications(rows(&self.data.applications, |a| self.application(a)))
            }
            Tab::Messages => Section::Messages(rows(&self.data.messages, |m| self.message(m))),
            Tab::Announcements => {
                Section::Announcements(rows(&self.data.announcements, |a| self.announcement(a)))
            }
        }
    }
}

/// Render the dashboard page
///
/// # Errors
///
/// Returns the template engine's error.
pub fn render(view: &DashboardView<'_>, notice: Option<&Notice>) -> Rendered {
    html(&DashboardPage {
        notice,
        view_query: view.state.to_query(),
        tabs: view.tabs(),
        section: view.section(),
        draft_title: &view.draft.title,
        draft_content: &view.draft.content,
        post_busy: view.busy(Action::PostAnnouncement),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::response::Html;
    use chrono::Utc;
    use promised_land_core::{ApplicationStatus, Error};

    fn data() -> DashboardData {
        DashboardData {
            applications: Ok(Arc::new(vec![Application {
                id: Uuid::from_u128(42),
                full_name: "Daniel <Okello>".to_string(),
                email: "daniel@example.com".to_string(),
                phone: "0700000042".to_string(),
                program_id: Some(Uuid::from_u128(1)),
                status: ApplicationStatus::Approved,
                created_at: Utc::now(),
                program: None,
            }])),
            messages: Ok(Arc::new(Vec::new())),
            announcements: Err(Error::remote("offline")),
        }
    }

    fn render_with(state: &DashboardState, pending: &PendingActions) -> String {
        let data = data();
        let draft = AnnouncementDraft::default();
        let view = DashboardView {
            state,
            data: &data,
            pending,
            draft: &draft,
        };
        let Html(page) = render(&view, None).unwrap();
        page
    }

    #[test]
    fn test_applications_tab() {
        let page = render_with(&DashboardState::default(), &PendingActions::new());

        assert!(page.contains("Daniel &lt;Okello&gt;"));
        assert!(!page.contains("<Okello>"));
        assert!(page.contains("<span class=\"badge approved\">approved</span>"));
        assert!(page.contains("/admin/applications/00000000-0000-0000-0000-00000000002a/status"));
        assert!(!page.contains("No messages yet."));
    }

    #[test]
    fn test_counts_only_for_loaded_lists() {
        let page = render_with(&DashboardState::default(), &PendingActions::new());

        assert!(page.contains("Applications <span class=\"badge\">1</span>"));
        assert!(page.contains("Messages <span class=\"badge\">0</span>"));
        assert!(!page.contains("Announcements <span"));
    }

    #[test]
    fn test_empty_and_failed_lists() {
        let messages = render_with(&DashboardState::on_tab(Tab::Messages), &PendingActions::new());
        assert!(messages.contains("No messages yet."));

        let announcements =
            render_with(&DashboardState::on_tab(Tab::Announcements), &PendingActions::new());
        assert!(announcements.contains("Post New Announcement"));
        assert!(announcements.contains("Could not load announcements: offline"));
    }

    #[test]
    fn test_pending_action_disables_its_button() {
        let pending = Arc::new(PendingActions::new());
        let _running = pending.begin(Action::DeleteApplication(Uuid::from_u128(42)));

        let page = render_with(&DashboardState::default(), &pending);

        assert!(page.contains("<button type=\"submit\" disabled>Delete</button>"));
        assert!(page.contains("<button type=\"submit\">Approve</button>"));
    }

    #[test]
    fn test_expanded_message_offers_reply() {
        let id = Uuid::from_u128(7);
        let mut data = data();
        data.messages = Ok(Arc::new(vec![ContactMessage {
            id,
            name: "Ruth".to_string(),
            email: "ruth@example.com".to_string(),
            subject: "Fees & <dates>".to_string(),
            message: "How much is the tailoring course?".to_string(),
            admin_reply: None,
            replied_at: None,
            created_at: Utc::now(),
        }]));
        let mut state = DashboardState::on_tab(Tab::Messages);
        state.toggle_expanded(id);
        let draft = AnnouncementDraft::default();
        let pending = PendingActions::new();
        let view = DashboardView {
            state: &state,
            data: &data,
            pending: &pending,
            draft: &draft,
        };

        let Html(page) = render(&view, None).unwrap();

        assert!(page.contains("Fees &amp; &lt;dates&gt;"));
        assert!(page.contains(">Collapse</a>"));
        assert!(page.contains(">Reply to this message</a>"));
    }
}
