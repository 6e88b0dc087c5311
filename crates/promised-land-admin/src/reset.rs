//! Set-a-new-password form reached from a reset link

use crate::notice::Notice;
use crate::session::LOGIN_PATH;
use promised_land_auth::AuthClient;
use promised_land_core::{Result, validation::PasswordReset};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of submitting the reset form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    /// Password changed and the recovery session ended
    Updated {
        /// Confirmation to show on arrival
        notice: Notice,
        /// Where to navigate
        redirect: &'static str,
    },
    /// Stay on the form
    Failed(Notice),
}

/// Exchange a reset link for a recovery session
///
/// # Errors
///
/// Returns an error if the link is invalid, expired or already used.
pub async fn open_reset_link(auth: &AuthClient, token_hash: &str) -> Result<()> {
    auth.exchange_recovery(token_hash).await?;
    Ok(())
}

/// Update the password of the recovery session
///
/// The confirmation is checked locally first; a mismatch or a short
/// password never reaches the provider. On success the recovery session is
/// signed out so the admin signs in again with the new password.
pub async fn submit_new_password(auth: &Arc<AuthClient>, form: &PasswordReset) -> ResetOutcome {
    if let Err(e) = form.validate() {
        return ResetOutcome::Failed(Notice::error(&e));
    }

    match auth.update_password(&form.password).await {
        Ok(user) => {
            info!(user_id = %user.id, "Password updated");
            auth.sign_out().await;
            ResetOutcome::Updated {
                notice: Notice::success_with(
                    "Password Updated!",
                    "You can now sign in with your new password.",
                ),
                redirect: LOGIN_PATH,
            }
        }
        Err(e) => {
            warn!(error = %e, "Password update failed");
            ResetOutcome::Failed(Notice::error(&e))
        }
    }
}
