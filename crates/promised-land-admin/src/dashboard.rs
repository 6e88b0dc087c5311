//! Dashboard view state and actions
//!
//! [`DashboardState`] is the explicit state of the page: the active tab, which
//! messages are expanded and which one has its reply composer open. It
//! round-trips through the page URL query so a server-rendered page can carry
//! it between requests. [`Dashboard`] runs the mutations and turns their
//! outcome into notices.

use crate::access::DataAccess;
use crate::notice::Notice;
use parking_lot::Mutex;
use promised_land_core::{
    Error, Result,
    types::{Announcement, Application, ApplicationStatus, ContactMessage, NewAnnouncement, display_date},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashSet},
    fmt,
    future::Future,
    str::FromStr,
    sync::Arc,
};
use tracing::debug;
use uuid::Uuid;

/// Dashboard tab
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    /// Student applications
    #[default]
    Applications,
    /// Contact form messages
    Messages,
    /// Site announcements
    Announcements,
}

impl Tab {
    /// Tabs in display order
    pub const ALL: [Self; 3] = [Self::Applications, Self::Messages, Self::Announcements];

    /// Query value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applications => "applications",
            Self::Messages => "messages",
            Self::Announcements => "announcements",
        }
    }

    /// Header label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Applications => "Applications",
            Self::Messages => "Messages",
            Self::Announcements => "Announcements",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|tab| tab.as_str() == s)
            .ok_or_else(|| Error::validation("tab", format!("unknown tab '{s}'")))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tab: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expanded: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reply: Option<String>,
}

/// What the expanded area of a message shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyPanel {
    /// Message is collapsed
    Hidden,
    /// The reply already sent, with its date
    Sent {
        /// Reply text
        text: String,
        /// Display date of the reply
        date: String,
    },
    /// Reply composer
    Composer,
    /// Button opening the composer
    ReplyButton,
}

/// Explicit state of the dashboard page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardState {
    /// Active tab; exactly one renders
    pub tab: Tab,
    /// Expanded messages
    pub expanded: BTreeSet<Uuid>,
    /// Message whose reply composer is open
    pub replying_to: Option<Uuid>,
}

impl DashboardState {
    /// State with `tab` active and nothing expanded
    #[must_use]
    pub fn on_tab(tab: Tab) -> Self {
        Self {
            tab,
            ..Self::default()
        }
    }

    /// Parse state from a URL query, ignoring values that do not parse
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let parsed: StateQuery = serde_urlencoded::from_str(query).unwrap_or_default();

        let tab = parsed
            .tab
            .and_then(|t| t.parse().ok())
            .unwrap_or_default();
        let expanded = parsed
            .expanded
            .map(|ids| {
                ids.split(',')
                    .filter_map(|id| id.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default();
        let replying_to = parsed.reply.and_then(|id| id.parse().ok());

        Self {
            tab,
            expanded,
            replying_to,
        }
    }

    /// Encode as a URL query, without the leading `?`
    #[must_use]
    pub fn to_query(&self) -> String {
        let expanded = (!self.expanded.is_empty()).then(|| {
            self.expanded
                .iter()
                .map(Uuid::to_string)
                .collect::<Vec<_>>()
                .join(",")
        });
        let query = StateQuery {
            tab: Some(self.tab.as_str().to_string()),
            expanded,
            reply: self.replying_to.map(|id| id.to_string()),
        };
        serde_urlencoded::to_string(&query).unwrap_or_default()
    }

    /// Same state with `tab` active
    #[must_use]
    pub fn with_tab(&self, tab: Tab) -> Self {
        Self {
            tab,
            ..self.clone()
        }
    }

    /// Whether `id` is expanded
    #[must_use]
    pub fn is_expanded(&self, id: Uuid) -> bool {
        self.expanded.contains(&id)
    }

    /// Expand `id` if collapsed, collapse it otherwise
    pub fn toggle_expanded(&mut self, id: Uuid) {
        if !self.expanded.remove(&id) {
            self.expanded.insert(id);
        }
    }

    /// Open the reply composer for `id`
    pub fn start_reply(&mut self, id: Uuid) {
        self.expanded.insert(id);
        self.replying_to = Some(id);
    }

    /// Close the reply composer
    pub fn cancel_reply(&mut self) {
        self.replying_to = None;
    }

    /// What to render under `message`
    ///
    /// A message that has been replied to shows its reply and never the
    /// composer again.
    #[must_use]
    pub fn reply_panel(&self, message: &ContactMessage) -> ReplyPanel {
        if !self.is_expanded(message.id) {
            return ReplyPanel::Hidden;
        }
        if let Some(text) = &message.admin_reply {
            return ReplyPanel::Sent {
                text: text.clone(),
                date: message.replied_at.as_ref().map(display_date).unwrap_or_default(),
            };
        }
        if self.replying_to == Some(message.id) {
            ReplyPanel::Composer
        } else {
            ReplyPanel::ReplyButton
        }
    }
}

/// Whether a reply can be sent: the trimmed text is non-empty
#[must_use]
pub fn can_send_reply(text: &str) -> bool {
    !text.trim().is_empty()
}

/// Announcement form contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AnnouncementDraft {
    /// Title as typed
    #[serde(default)]
    pub title: String,
    /// Content as typed
    #[serde(default)]
    pub content: String,
}

impl AnnouncementDraft {
    /// Whether the post button is enabled
    #[must_use]
    pub fn can_post(&self) -> bool {
        !self.title.trim().is_empty() && !self.content.trim().is_empty()
    }
}

/// A mutation the dashboard can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Approve or reject an application
    SetStatus(Uuid),
    /// Delete an application
    DeleteApplication(Uuid),
    /// Reply to a message
    Reply(Uuid),
    /// Delete a message
    DeleteMessage(Uuid),
    /// Post the announcement form
    PostAnnouncement,
    /// Delete an announcement
    DeleteAnnouncement(Uuid),
}

/// Mutations currently running
///
/// Only the control that triggered an action is disabled while it runs.
#[derive(Debug, Default)]
pub struct PendingActions {
    running: Mutex<HashSet<Action>>,
}

/// Marks an action as running until dropped
#[derive(Debug)]
pub struct PendingGuard {
    actions: Arc<PendingActions>,
    action: Action,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.actions.running.lock().remove(&self.action);
    }
}

impl PendingActions {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `action` is running
    #[must_use]
    pub fn is_pending(&self, action: Action) -> bool {
        self.running.lock().contains(&action)
    }

    /// Mark `action` running, or `None` if it already is
    #[must_use]
    pub fn begin(self: &Arc<Self>, action: Action) -> Option<PendingGuard> {
        self.running.lock().insert(action).then(|| PendingGuard {
            actions: Arc::clone(self),
            action,
        })
    }
}

/// The three lists, each fetched independently
#[derive(Debug, Clone)]
pub struct DashboardData {
    /// Applications, newest first
    pub applications: Result<Arc<Vec<Application>>>,
    /// Messages, newest first
    pub messages: Result<Arc<Vec<ContactMessage>>>,
    /// Announcements, newest first
    pub announcements: Result<Arc<Vec<Announcement>>>,
}

impl DashboardData {
    /// Count shown in the header of `tab`, if its list loaded
    #[must_use]
    pub fn count(&self, tab: Tab) -> Option<usize> {
        match tab {
            Tab::Applications => self.applications.as_ref().ok().map(|l| l.len()),
            Tab::Messages => self.messages.as_ref().ok().map(|l| l.len()),
            Tab::Announcements => self.announcements.as_ref().ok().map(|l| l.len()),
        }
    }
}

/// Runs dashboard queries and mutations for one session
#[derive(Debug, Clone)]
pub struct Dashboard {
    access: DataAccess,
    pending: Arc<PendingActions>,
}

impl Dashboard {
    /// Create a dashboard over `access`
    #[must_use]
    pub const fn new(access: DataAccess, pending: Arc<PendingActions>) -> Self {
        Self { access, pending }
    }

    /// Running mutations
    #[must_use]
    pub const fn pending(&self) -> &Arc<PendingActions> {
        &self.pending
    }

    /// Load all three lists concurrently
    pub async fn load(&self) -> DashboardData {
        let (applications, messages, announcements) = tokio::join!(
            self.access.applications(),
            self.access.messages(),
            self.access.announcements(),
        );
        DashboardData {
            applications,
            messages,
            announcements,
        }
    }

    async fn run<T, F>(&self, action: Action, work: F) -> Option<Result<T>>
    where
        F: Future<Output = Result<T>>,
    {
        let Some(_guard) = self.pending.begin(action) else {
            debug!(?action, "Action already running, ignoring");
            return None;
        };
        Some(work.await)
    }

    /// Approve or reject an application
    pub async fn set_status(&self, id: Uuid, status: ApplicationStatus) -> Option<Notice> {
        let result = self
            .run(
                Action::SetStatus(id),
                self.access.update_application_status(id, status),
            )
            .await?;
        Some(match result {
            Ok(_) => Notice::success("Status updated"),
            Err(e) => Notice::error(&e),
        })
    }

    /// Delete an application; only failures produce a notice
    pub async fn delete_application(&self, id: Uuid) -> Option<Notice> {
        let result = self
            .run(Action::DeleteApplication(id), self.access.delete_application(id))
            .await?;
        result.err().map(|e| Notice::error(&e))
    }

    /// Send a reply and close the composer on success
    pub async fn reply(&self, state: &mut DashboardState, id: Uuid, text: &str) -> Option<Notice> {
        let result = self
            .run(Action::Reply(id), self.access.reply_to_message(id, text))
            .await?;
        Some(match result {
            Ok(_) => {
                state.cancel_reply();
                Notice::success("Reply sent")
            }
            Err(e) => Notice::error(&e),
        })
    }

    /// Delete a message; only failures produce a notice
    pub async fn delete_message(&self, state: &mut DashboardState, id: Uuid) -> Option<Notice> {
        let result = self
            .run(Action::DeleteMessage(id), self.access.delete_message(id))
            .await?;
        match result {
            Ok(()) => {
                state.expanded.remove(&id);
                if state.replying_to == Some(id) {
                    state.cancel_reply();
                }
                None
            }
            Err(e) => Some(Notice::error(&e)),
        }
    }

    /// Post the announcement form and clear it on success
    pub async fn post_announcement(&self, draft: &mut AnnouncementDraft) -> Option<Notice> {
        let new = match NewAnnouncement::new(&draft.title, &draft.content) {
            Ok(new) => new,
            Err(e) => return Some(Notice::failure("Failed to post announcement", &e)),
        };
        let result = self
            .run(Action::PostAnnouncement, self.access.create_announcement(new))
            .await?;
        Some(match result {
            Ok(_) => {
                *draft = AnnouncementDraft::default();
                Notice::success("Announcement posted successfully!")
            }
            Err(e) => Notice::failure("Failed to post announcement", &e),
        })
    }

    /// Delete an announcement; only failures produce a notice
    pub async fn delete_announcement(&self, id: Uuid) -> Option<Notice> {
        let result = self
            .run(
                Action::DeleteAnnouncement(id),
                self.access.delete_announcement(id),
            )
            .await?;
        result.err().map(|e| Notice::error(&e))
    }
}
