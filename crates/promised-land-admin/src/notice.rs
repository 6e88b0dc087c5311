//! Transient notifications shown after an action

use promised_land_core::Error;
use serde::{Deserialize, Serialize};

/// Visual weight of a notice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeVariant {
    /// Confirmation of a successful action
    #[default]
    Default,
    /// A failed action
    Destructive,
}

/// A toast-style message: a title, an optional description and a variant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Headline
    pub title: String,
    /// Detail line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Visual weight
    #[serde(default)]
    pub variant: NoticeVariant,
}

impl Notice {
    /// A success notice with only a title
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            variant: NoticeVariant::Default,
        }
    }

    /// A success notice with a detail line
    pub fn success_with(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::success(title)
        }
    }

    /// A failure notice titled "Error" carrying the error's message
    #[must_use]
    pub fn error(err: &Error) -> Self {
        Self::failure("Error", err)
    }

    /// A failure notice with a custom title carrying the error's message
    pub fn failure(title: impl Into<String>, err: &Error) -> Self {
        Self {
            title: title.into(),
            description: Some(err.user_message()),
            variant: NoticeVariant::Destructive,
        }
    }

    /// Whether this notice reports a failure
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.variant == NoticeVariant::Destructive
    }
}
