//! Sign-in, sign-up and forgot-password form
//!
//! The form is in exactly one mode at a time and only changes mode on an
//! explicit selection or after a successful sign-up or reset request, both of
//! which return it to sign-in.

use crate::access::DataAccess;
use crate::notice::Notice;
use crate::session::DASHBOARD_PATH;
use promised_land_auth::AuthClient;
use promised_land_core::{
    Error,
    validation::{Credentials, is_allowed_admin_email, looks_like_email},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};
use tracing::{info, warn};
use validator::Validate;

/// Which form is showing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Sign in with e-mail and password
    #[default]
    Login,
    /// Create the admin account
    Signup,
    /// Request a password reset link
    Forgot,
}

impl AuthMode {
    /// Query value for this mode
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Signup => "signup",
            Self::Forgot => "forgot",
        }
    }

    /// Line under the form heading
    #[must_use]
    pub const fn subtitle(self) -> &'static str {
        match self {
            Self::Login => "Sign in to your account",
            Self::Signup => "Create admin account",
            Self::Forgot => "Reset your password",
        }
    }

    /// Label of the submit button
    #[must_use]
    pub const fn submit_label(self) -> &'static str {
        match self {
            Self::Login => "Sign In",
            Self::Signup => "Sign Up",
            Self::Forgot => "Send Reset Link",
        }
    }

    /// Whether the form asks for a password
    #[must_use]
    pub const fn needs_password(self) -> bool {
        !matches!(self, Self::Forgot)
    }

    /// Prompt and target of the link switching between sign-in and sign-up
    #[must_use]
    pub const fn switch_link(self) -> (&'static str, &'static str, Self) {
        match self {
            Self::Login => ("Need an admin account?", "Sign Up", Self::Signup),
            Self::Signup | Self::Forgot => ("Already have an account?", "Sign In", Self::Login),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "login" => Ok(Self::Login),
            "signup" => Ok(Self::Signup),
            "forgot" => Ok(Self::Forgot),
            other => Err(Error::validation("mode", format!("unknown mode '{other}'"))),
        }
    }
}

/// State of the auth form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthForm {
    /// Current mode
    pub mode: AuthMode,
    /// E-mail as typed
    pub email: String,
    /// A submission is in flight; the submit control is disabled
    pub loading: bool,
}

impl AuthForm {
    /// A form in `mode`
    #[must_use]
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Switch to `mode`
    pub fn select_mode(&mut self, mode: AuthMode) {
        self.mode = mode;
    }
}

/// Result of submitting the auth form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// A session was established; go to the dashboard
    SignedIn {
        /// Where to navigate
        redirect: &'static str,
    },
    /// Stay on the form and show a notice
    Notice(Notice),
    /// A submission is already running; nothing was done
    Busy,
}

/// Runs auth form submissions against the provider
#[derive(Debug, Clone)]
pub struct AuthFlow {
    auth: Arc<AuthClient>,
    access: DataAccess,
    allowed_email: String,
    reset_redirect: String,
    signup_redirect: String,
}

impl AuthFlow {
    /// Create a flow
    ///
    /// Only `allowed_email` may sign up. Reset links point at
    /// `reset_redirect`, confirmation links at `signup_redirect`.
    #[must_use]
    pub fn new(
        auth: Arc<AuthClient>,
        access: DataAccess,
        allowed_email: impl Into<String>,
        reset_redirect: impl Into<String>,
        signup_redirect: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            access,
            allowed_email: allowed_email.into(),
            reset_redirect: reset_redirect.into(),
            signup_redirect: signup_redirect.into(),
        }
    }

    /// Submit the form in its current mode
    ///
    /// Local checks run before any provider call. The form is marked loading
    /// for the duration and its mode only changes on success.
    pub async fn submit(&self, form: &mut AuthForm, password: &str) -> AuthOutcome {
        if form.loading {
            return AuthOutcome::Busy;
        }
        form.loading = true;

        let email = form.email.trim().to_string();
        let outcome = match form.mode {
            AuthMode::Login => self.login(&email, password).await,
            AuthMode::Signup => self.signup(&email, password).await,
            AuthMode::Forgot => self.forgot(&email).await,
        };

        form.loading = false;
        match outcome {
            Ok(Some(mode)) => {
                let notice = match form.mode {
                    AuthMode::Signup => Notice::success_with("Account Created!", "You can now log in."),
                    _ => Notice::success_with(
                        "Email Sent!",
                        "Check your inbox for a password reset link.",
                    ),
                };
                form.select_mode(mode);
                AuthOutcome::Notice(notice)
            }
            Ok(None) => AuthOutcome::SignedIn {
                redirect: DASHBOARD_PATH,
            },
            Err(e) => AuthOutcome::Notice(Notice::error(&e)),
        }
    }

    async fn login(&self, email: &str, password: &str) -> Result<Option<AuthMode>, Error> {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
        .validate()?;

        self.auth.sign_in_with_password(email, password).await?;
        Ok(None)
    }

    async fn signup(&self, email: &str, password: &str) -> Result<Option<AuthMode>, Error> {
        if !is_allowed_admin_email(email, &self.allowed_email) {
            warn!(email, "Sign-up refused for address outside the allow-list");
            return Err(Error::validation(
                "email",
                "Only the designated admin email can sign up.",
            ));
        }
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
        .validate()?;

        let outcome = self
            .auth
            .sign_up(email, password, &self.signup_redirect)
            .await?;

        let access = outcome
            .session
            .as_ref()
            .map_or_else(|| self.access.clone(), |s| self.access.for_session(&s.access_token));
        if let Err(e) = access.grant_admin_role(outcome.user.id).await {
            warn!(user_id = %outcome.user.id, error = %e, "Admin role not recorded");
        }

        info!(user_id = %outcome.user.id, "Admin account created");
        Ok(Some(AuthMode::Login))
    }

    async fn forgot(&self, email: &str) -> Result<Option<AuthMode>, Error> {
        if !looks_like_email(email) {
            return Err(Error::validation("email", "Enter a valid e-mail address."));
        }

        self.auth
            .reset_password_for_email(email, &self.reset_redirect)
            .await?;
        Ok(Some(AuthMode::Login))
    }
}
