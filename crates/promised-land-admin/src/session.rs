//! Gate in front of the protected admin views

use crate::{access::DataAccess, scope::ViewScope};
use parking_lot::RwLock;
use promised_land_auth::{AuthClient, AuthEvent, Session};
use promised_land_core::Result;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

/// Where unauthenticated visitors are sent
pub const LOGIN_PATH: &str = "/admin/login";
/// Where signed-in admins land
pub const DASHBOARD_PATH: &str = "/admin/dashboard";

/// What the guard currently knows about the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    /// The session has not been checked yet
    Unknown,
    /// A session exists
    Authenticated(Session),
    /// No session exists
    Unauthenticated,
}

/// What the view should do for a guard state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render nothing yet
    Wait,
    /// Render the protected view
    Render,
    /// Navigate away
    Redirect(&'static str),
}

impl GuardState {
    fn from_session(session: Option<Session>) -> Self {
        session.map_or(Self::Unauthenticated, Self::Authenticated)
    }

    /// Decision for a protected view
    #[must_use]
    pub const fn protected_view(&self) -> GuardDecision {
        match self {
            Self::Unknown => GuardDecision::Wait,
            Self::Authenticated(_) => GuardDecision::Render,
            Self::Unauthenticated => GuardDecision::Redirect(LOGIN_PATH),
        }
    }

    /// Decision for the sign-in view, which a signed-in admin skips
    #[must_use]
    pub const fn login_view(&self) -> GuardDecision {
        match self {
            Self::Unknown => GuardDecision::Wait,
            Self::Authenticated(_) => GuardDecision::Redirect(DASHBOARD_PATH),
            Self::Unauthenticated => GuardDecision::Render,
        }
    }

    /// The session, when authenticated
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            _ => None,
        }
    }
}

/// Session guard bound to one mounted view
///
/// Starts [`GuardState::Unknown`] on every mount and settles once the current
/// session has been confirmed by the auth provider. Later session changes
/// re-evaluate the state until the view's scope ends.
///
/// With [`SessionGuard::require_admin_role`], a confirmed user without the
/// admin role counts as unauthenticated.
#[derive(Debug)]
pub struct SessionGuard {
    auth: Arc<AuthClient>,
    scope: ViewScope,
    roles: Option<DataAccess>,
    state: RwLock<GuardState>,
}

impl SessionGuard {
    /// Create a guard in the unknown state
    #[must_use]
    pub fn new(auth: Arc<AuthClient>, scope: ViewScope) -> Self {
        Self {
            auth,
            scope,
            roles: None,
            state: RwLock::new(GuardState::Unknown),
        }
    }

    /// Only admit users holding the admin role in `access`
    #[must_use]
    pub fn require_admin_role(mut self, access: DataAccess) -> Self {
        self.roles = Some(access);
        self
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> GuardState {
        self.state.read().clone()
    }

    fn apply(&self, state: GuardState) {
        if self.scope.is_mounted() {
            *self.state.write() = state;
        }
    }

    /// Verify the current session and settle the state
    ///
    /// # Errors
    ///
    /// Returns an error if the auth provider or the role lookup cannot be
    /// reached; the state then stays unknown.
    pub async fn mount(&self) -> Result<GuardState> {
        let mut session = self.auth.verified_session().await?;

        if let (Some(current), Some(access)) = (&session, &self.roles) {
            let user_id = current.user.id;
            if !access.for_session(&current.access_token).is_admin(user_id).await? {
                warn!(%user_id, "Signed-in user is not an admin");
                session = None;
            }
        }

        self.apply(GuardState::from_session(session));
        Ok(self.state())
    }

    /// Re-evaluate after a session change
    pub fn handle_event(&self, event: AuthEvent) {
        let next = match event {
            AuthEvent::SignedOut => GuardState::Unauthenticated,
            AuthEvent::SignedIn
            | AuthEvent::TokenRefreshed
            | AuthEvent::UserUpdated
            | AuthEvent::PasswordRecovery => {
                GuardState::from_session(self.auth.current_session())
            }
        };
        debug!(?event, authenticated = matches!(next, GuardState::Authenticated(_)), "Session changed");
        self.apply(next);
    }

    /// Follow session changes until the scope ends
    pub fn watch(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let guard = Arc::clone(self);
        let mut events = self.auth.on_auth_state_change();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = guard.scope.cancelled() => break,
                    event = events.recv() => match event {
                        Ok(event) => guard.handle_event(event),
                        Err(RecvError::Lagged(_)) => {
                            guard.apply(GuardState::from_session(guard.auth.current_session()));
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        })
    }
}
