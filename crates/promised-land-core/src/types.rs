//! Core data types for the Promised Land site

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Display format for dates shown in the back office ("Jan 5, 2026")
pub const DISPLAY_DATE_FORMAT: &str = "%b %-d, %Y";

/// Format a timestamp the way the back office displays it
#[must_use]
pub fn display_date(at: &DateTime<Utc>) -> String {
    at.format(DISPLAY_DATE_FORMAT).to_string()
}

/// Review status of a student application
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    /// Awaiting review
    #[default]
    Pending,
    /// Accepted by the admin
    Approved,
    /// Declined by the admin
    Rejected,
}

impl ApplicationStatus {
    /// Every status, in display order
    pub const ALL: [Self; 3] = [Self::Pending, Self::Approved, Self::Rejected];

    /// Wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(crate::Error::validation(
                "status",
                format!("unknown application status '{other}'"),
            )),
        }
    }
}

/// A training program offered by the school
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Program {
    /// Unique identifier
    pub id: Uuid,
    /// Program name
    pub name: String,
}

/// Program columns embedded in an application listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgramRef {
    /// Program name
    pub name: String,
}

/// A student application, as listed in the back office
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Application {
    /// Unique identifier
    pub id: Uuid,
    /// Applicant name
    pub full_name: String,
    /// Applicant e-mail
    pub email: String,
    /// Applicant phone number
    pub phone: String,
    /// Program applied for
    pub program_id: Option<Uuid>,
    /// Review status
    #[serde(default)]
    pub status: ApplicationStatus,
    /// Submission time
    pub created_at: DateTime<Utc>,
    /// Joined program columns
    #[serde(default, rename = "programs")]
    pub program: Option<ProgramRef>,
}

impl Application {
    /// Name of the program applied for, when the join resolved
    #[must_use]
    pub fn program_name(&self) -> Option<&str> {
        self.program.as_ref().map(|p| p.name.as_str())
    }
}

/// A message submitted through the public contact form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactMessage {
    /// Unique identifier
    pub id: Uuid,
    /// Sender name
    pub name: String,
    /// Sender e-mail
    pub email: String,
    /// Subject line
    pub subject: String,
    /// Message body
    pub message: String,
    /// The admin's reply, once sent
    #[serde(default)]
    pub admin_reply: Option<String>,
    /// When the reply was sent
    #[serde(default)]
    pub replied_at: Option<DateTime<Utc>>,
    /// Submission time
    pub created_at: DateTime<Utc>,
}

/// A reply that has been sent for a contact message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply<'a> {
    /// Reply text
    pub text: &'a str,
    /// When it was sent
    pub sent_at: &'a DateTime<Utc>,
}

impl ContactMessage {
    /// Whether an admin reply exists for this message
    ///
    /// A non-null `admin_reply` is what closes the message to further replies.
    #[must_use]
    pub const fn has_reply(&self) -> bool {
        self.admin_reply.is_some()
    }

    /// The reply, when both reply columns are set
    #[must_use]
    pub fn reply(&self) -> Option<Reply<'_>> {
        match (&self.admin_reply, &self.replied_at) {
            (Some(text), Some(sent_at)) => Some(Reply { text, sent_at }),
            _ => None,
        }
    }
}

/// A public announcement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Announcement {
    /// Unique identifier
    pub id: Uuid,
    /// Headline
    pub title: String,
    /// Body text
    pub content: String,
    /// Publication time
    pub created_at: DateTime<Utc>,
}

/// Payload for creating an announcement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NewAnnouncement {
    /// Headline
    pub title: String,
    /// Body text
    pub content: String,
}

impl NewAnnouncement {
    /// Build a payload, trimming surrounding whitespace
    ///
    /// # Errors
    ///
    /// Returns a validation error when either field is blank.
    pub fn new(title: &str, content: &str) -> crate::Result<Self> {
        let title = title.trim();
        let content = content.trim();

        if title.is_empty() {
            return Err(crate::Error::validation("title", "Title is required."));
        }
        if content.is_empty() {
            return Err(crate::Error::validation("content", "Content is required."));
        }

        Ok(Self {
            title: title.to_string(),
            content: content.to_string(),
        })
    }
}

/// Role granted to a user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Back office administrator
    Admin,
}

/// Row in the `user_roles` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRole {
    /// Auth user id
    pub user_id: Uuid,
    /// Granted role
    pub role: Role,
}

/// Identity of a signed-in user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    /// Auth user id
    pub id: Uuid,
    /// Account e-mail
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(ApplicationStatus::Pending, "pending")]
    #[case(ApplicationStatus::Approved, "approved")]
    #[case(ApplicationStatus::Rejected, "rejected")]
    fn test_status_wire_names(#[case] status: ApplicationStatus, #[case] wire: &str) {
        assert_eq!(status.to_string(), wire);
        assert_eq!(wire.parse::<ApplicationStatus>().unwrap(), status);
        assert_eq!(
            serde_json::to_value(status).unwrap(),
            serde_json::Value::String(wire.to_string())
        );
    }

    #[test]
    fn test_status_rejects_unknown_values() {
        let err = "archived".parse::<ApplicationStatus>().unwrap_err();
        assert!(err.is_validation());
        assert!(serde_json::from_str::<ApplicationStatus>("\"archived\"").is_err());
    }

    #[test]
    fn test_status_defaults_to_pending() {
        assert_eq!(ApplicationStatus::default(), ApplicationStatus::Pending);
    }

    #[test]
    fn test_application_deserializes_joined_program() {
        let json = serde_json::json!({
            "id": "6f1c1d0e-0000-4000-8000-000000000042",
            "full_name": "Ama Mensah",
            "email": "ama@example.com",
            "phone": "+233 20 000 0000",
            "program_id": "6f1c1d0e-0000-4000-8000-0000000000aa",
            "status": "pending",
            "created_at": "2026-01-05T10:00:00Z",
            "programs": {"name": "Fashion Design"}
        });

        let app: Application = serde_json::from_value(json).unwrap();
        assert_eq!(app.program_name(), Some("Fashion Design"));
        assert_eq!(app.status, ApplicationStatus::Pending);
    }

    #[test]
    fn test_application_without_status_defaults_to_pending() {
        let json = serde_json::json!({
            "id": "6f1c1d0e-0000-4000-8000-000000000042",
            "full_name": "Kofi",
            "email": "kofi@example.com",
            "phone": "",
            "program_id": null,
            "created_at": "2026-01-05T10:00:00Z"
        });

        let app: Application = serde_json::from_value(json).unwrap();
        assert_eq!(app.status, ApplicationStatus::Pending);
        assert_eq!(app.program_name(), None);
    }

    fn message(reply: Option<&str>, replied: bool) -> ContactMessage {
        ContactMessage {
            id: Uuid::new_v4(),
            name: "Esi".to_string(),
            email: "esi@example.com".to_string(),
            subject: "Fees".to_string(),
            message: "How much is tuition?".to_string(),
            admin_reply: reply.map(ToString::to_string),
            replied_at: replied.then(|| Utc.with_ymd_and_hms(2026, 1, 6, 9, 0, 0).unwrap()),
            created_at: Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_reply_requires_both_columns() {
        assert!(message(None, false).reply().is_none());
        assert!(message(Some("See fees page"), false).reply().is_none());

        let replied = message(Some("See fees page"), true);
        let reply = replied.reply().unwrap();
        assert_eq!(reply.text, "See fees page");
        assert!(replied.has_reply());
    }

    #[test]
    fn test_new_announcement_trims_and_requires_fields() {
        let ann = NewAnnouncement::new("  Open House ", " Visit us Friday\n").unwrap();
        assert_eq!(ann.title, "Open House");
        assert_eq!(ann.content, "Visit us Friday");

        assert!(NewAnnouncement::new("   ", "body").is_err());
        assert!(NewAnnouncement::new("title", "\t").is_err());
    }

    #[test]
    fn test_display_date_format() {
        let at = Utc.with_ymd_and_hms(2026, 1, 5, 23, 59, 0).unwrap();
        assert_eq!(display_date(&at), "Jan 5, 2026");
    }

    #[test]
    fn test_user_role_serializes_lowercase() {
        let row = UserRole {
            user_id: Uuid::nil(),
            role: Role::Admin,
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["role"], "admin");
    }
}
