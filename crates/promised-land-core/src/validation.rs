//! Input rules checked locally, before any call to the hosted backend

use serde::Deserialize;
use validator::Validate;

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Loose e-mail shape check: one `@` with text on both sides and a dot in the domain
#[must_use]
pub fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

/// Whether `email` is the single address allowed to self-register as admin
///
/// Comparison ignores case and surrounding whitespace.
#[must_use]
pub fn is_allowed_admin_email(email: &str, allowed: &str) -> bool {
    email.trim().to_lowercase() == allowed.trim().to_lowercase()
}

/// E-mail and password pair submitted by the login and sign-up forms
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Credentials {
    /// Account e-mail
    #[validate(email(message = "Enter a valid e-mail address."))]
    pub email: String,

    /// Account password
    #[validate(length(min = 6, message = "Password must be at least 6 characters."))]
    pub password: String,
}

/// New password entered twice on the reset form
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordReset {
    /// New password
    pub password: String,
    /// Confirmation
    pub confirm_password: String,
}

impl PasswordReset {
    /// Check the confirmation matches and the password is long enough
    ///
    /// The mismatch check runs first so the admin sees the more specific message.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the failed rule.
    pub fn validate(&self) -> crate::Result<()> {
        if self.password != self.confirm_password {
            return Err(crate::Error::validation(
                "confirm_password",
                "Passwords do not match.",
            ));
        }

        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(crate::Error::validation(
                "password",
                "Password must be at least 6 characters.",
            ));
        }

        Ok(())
    }
}
