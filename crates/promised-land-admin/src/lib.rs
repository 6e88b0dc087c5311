//! Admin back office for the Promised Land site
//!
//! Everything the admin pages do short of HTTP: typed access to the remote
//! tables behind a coalescing query cache, the session guard in front of the
//! protected views, the sign-in and password reset forms, and the dashboard's
//! view state and actions.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod access;
pub mod auth_flow;
pub mod cache;
pub mod dashboard;
pub mod notice;
pub mod reset;
pub mod scope;
pub mod session;

pub use access::{ANNOUNCEMENTS_KEY, APPLICATIONS_KEY, DataAccess, MESSAGES_KEY};
pub use auth_flow::{AuthFlow, AuthForm, AuthMode, AuthOutcome};
pub use cache::{Cached, QueryCache};
pub use dashboard::{
    Action, AnnouncementDraft, Dashboard, DashboardData, DashboardState, PendingActions,
    ReplyPanel, Tab,
};
pub use notice::{Notice, NoticeVariant};
pub use reset::{ResetOutcome, open_reset_link, submit_new_password};
pub use scope::ViewScope;
pub use session::{DASHBOARD_PATH, GuardDecision, GuardState, LOGIN_PATH, SessionGuard};
