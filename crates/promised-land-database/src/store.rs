//! The remote data store interface
//!
//! Rows travel as JSON objects, the shape the hosted REST interface speaks.
//! Typed access lives one layer up, in the admin crate's data access layer.

use async_trait::async_trait;
use promised_land_core::{Error, Result};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Tables the site reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Student applications
    Applications,
    /// Training programs
    Programs,
    /// Contact form submissions
    ContactMessages,
    /// Public announcements
    Announcements,
    /// Role grants for auth users
    UserRoles,
}

impl Table {
    /// Every table
    pub const ALL: [Self; 5] = [
        Self::Applications,
        Self::Programs,
        Self::ContactMessages,
        Self::Announcements,
        Self::UserRoles,
    ];

    /// Table name in the database
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Applications => "applications",
            Self::Programs => "programs",
            Self::ContactMessages => "contact_messages",
            Self::Announcements => "announcements",
            Self::UserRoles => "user_roles",
        }
    }

    /// Columns a client may write
    ///
    /// `id` and `created_at` are writable so fixtures can pin them; the
    /// database fills both when they are omitted.
    #[must_use]
    pub const fn writable_columns(self) -> &'static [&'static str] {
        match self {
            Self::Applications => &[
                "id",
                "full_name",
                "email",
                "phone",
                "program_id",
                "status",
                "created_at",
            ],
            Self::Programs => &["id", "name", "created_at"],
            Self::ContactMessages => &[
                "id",
                "name",
                "email",
                "subject",
                "message",
                "admin_reply",
                "replied_at",
                "created_at",
            ],
            Self::Announcements => &["id", "title", "content", "created_at"],
            Self::UserRoles => &["id", "user_id", "role", "created_at"],
        }
    }

    /// Column defaults applied when a row is inserted without them
    #[must_use]
    pub fn defaults(self) -> Vec<(&'static str, Value)> {
        match self {
            Self::Applications => vec![("status", Value::from("pending"))],
            Self::ContactMessages => vec![("admin_reply", Value::Null), ("replied_at", Value::Null)],
            Self::Programs | Self::Announcements | Self::UserRoles => Vec::new(),
        }
    }

    /// Check every key of `record` is a writable column
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first unknown column, or when the
    /// record is not a JSON object.
    pub fn check_columns(self, record: &Value) -> Result<()> {
        let Some(object) = record.as_object() else {
            return Err(Error::validation(self.name(), "record must be a JSON object"));
        };

        let allowed = self.writable_columns();
        match object.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(unknown) => Err(Error::validation(
                unknown.clone(),
                format!("unknown column for table {}", self.name()),
            )),
            None => Ok(()),
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Sort order for a select
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    /// Column to sort by
    pub column: &'static str,
    /// Ascending when true
    pub ascending: bool,
}

impl Order {
    /// Newest rows first
    pub const NEWEST_FIRST: Self = Self {
        column: "created_at",
        ascending: false,
    };
}

/// A to-one relation embedded in each selected row under the related table's name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Embed {
    /// Related table
    pub table: Table,
    /// Column of the selected table referencing the related table's `id`
    pub foreign_key: &'static str,
    /// Related columns to include
    pub columns: &'static [&'static str],
}

/// A select request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Select {
    /// Related rows to embed
    pub embed: Option<Embed>,
    /// Equality filters, column and value
    pub filters: Vec<(&'static str, String)>,
    /// Sort order
    pub order: Option<Order>,
}

impl Select {
    /// Every row, newest first
    #[must_use]
    pub fn newest_first() -> Self {
        Self {
            order: Some(Order::NEWEST_FIRST),
            ..Self::default()
        }
    }

    /// Add an embedded relation
    #[must_use]
    pub const fn embed(mut self, embed: Embed) -> Self {
        self.embed = Some(embed);
        self
    }

    /// Add an equality filter
    #[must_use]
    pub fn eq(mut self, column: &'static str, value: impl Into<String>) -> Self {
        self.filters.push((column, value.into()));
        self
    }
}

/// Operations offered by the hosted relational store
///
/// Each call either returns data or an error carrying the provider's message;
/// nothing is partially applied. `update` and `delete` report
/// [`Error::NotFound`] when no row has the given id.
#[async_trait]
pub trait DataStore: Send + Sync + std::fmt::Debug {
    /// Select rows from `table`
    async fn select(&self, table: Table, query: &Select) -> Result<Vec<Value>>;

    /// Insert one row and return it as stored
    async fn insert(&self, table: Table, record: Value) -> Result<Value>;

    /// Apply `patch` to the row with `id` and return the updated row
    async fn update(&self, table: Table, id: Uuid, patch: Value) -> Result<Value>;

    /// Delete the row with `id`
    async fn delete(&self, table: Table, id: Uuid) -> Result<()>;

    /// A handle that issues requests on behalf of the user owning `access_token`
    ///
    /// Row-level security is enforced by the provider against this token.
    fn scoped(&self, access_token: &str) -> Arc<dyn DataStore>;

    /// Short implementation name, for logs
    fn name(&self) -> &'static str;
}

pub(crate) fn not_found(table: Table, id: Uuid) -> Error {
    Error::NotFound {
        resource: format!("{table} row {id}"),
    }
}
