//! Typed reads and writes of the admin resources
//!
//! Lists go through the [`QueryCache`]; every successful write invalidates
//! exactly the list it changed and nothing else.

use crate::cache::QueryCache;
use chrono::Utc;
use promised_land_core::{
    Announcement, Application, ApplicationStatus, ContactMessage, Error, NewAnnouncement, Result,
    types::{Role, UserRole},
};
use promised_land_database::{DataStore, Embed, Select, Table};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Cache key of the applications list
pub const APPLICATIONS_KEY: &str = "admin-applications";
/// Cache key of the contact messages list
pub const MESSAGES_KEY: &str = "admin-messages";
/// Cache key of the announcements list
pub const ANNOUNCEMENTS_KEY: &str = "admin-announcements";

const PROGRAM_NAME: Embed = Embed {
    table: Table::Programs,
    foreign_key: "program_id",
    columns: &["name"],
};

/// Data access layer over a [`DataStore`] and a shared [`QueryCache`]
#[derive(Debug, Clone)]
pub struct DataAccess {
    store: Arc<dyn DataStore>,
    cache: Arc<QueryCache>,
}

async fn list<T: DeserializeOwned>(
    store: Arc<dyn DataStore>,
    table: Table,
    query: Select,
) -> Result<Vec<T>> {
    let rows = store.select(table, &query).await.inspect_err(|e| {
        error!(table = %table, error = %e, "Query failed");
    })?;

    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(Error::from))
        .collect()
}

fn parse<T: DeserializeOwned>(row: Value) -> Result<T> {
    serde_json::from_value(row).map_err(Error::from)
}

impl DataAccess {
    /// Create a data access layer
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>, cache: Arc<QueryCache>) -> Self {
        Self { store, cache }
    }

    /// The same layer issuing requests as the user owning `access_token`
    #[must_use]
    pub fn for_session(&self, access_token: &str) -> Self {
        Self {
            store: self.store.scoped(access_token),
            cache: Arc::clone(&self.cache),
        }
    }

    /// The shared cache
    #[must_use]
    pub const fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Report a failed write and pass the error on
    fn write_failed(action: &'static str, id: Option<Uuid>, e: &Error) {
        error!(action, id = ?id, error = %e, "Mutation failed");
    }

    /// All applications, newest first, with their program name
    pub async fn applications(&self) -> Result<Arc<Vec<Application>>> {
        let store = Arc::clone(&self.store);
        self.cache
            .fetch(APPLICATIONS_KEY, move || {
                list(
                    store,
                    Table::Applications,
                    Select::newest_first().embed(PROGRAM_NAME),
                )
            })
            .await
    }

    /// Set the status of one application
    pub async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Application> {
        let row = self
            .store
            .update(Table::Applications, id, json!({ "status": status.as_str() }))
            .await
            .inspect_err(|e| Self::write_failed("update_application_status", Some(id), e))?;

        self.cache.invalidate(APPLICATIONS_KEY);
        info!(%id, %status, "Application status updated");
        parse(row)
    }

    /// Delete one application
    pub async fn delete_application(&self, id: Uuid) -> Result<()> {
        self.store
            .delete(Table::Applications, id)
            .await
            .inspect_err(|e| Self::write_failed("delete_application", Some(id), e))?;

        self.cache.invalidate(APPLICATIONS_KEY);
        info!(%id, "Application deleted");
        Ok(())
    }

    /// All contact messages, newest first
    pub async fn messages(&self) -> Result<Arc<Vec<ContactMessage>>> {
        let store = Arc::clone(&self.store);
        self.cache
            .fetch(MESSAGES_KEY, move || {
                list(store, Table::ContactMessages, Select::newest_first())
            })
            .await
    }

    /// Store the admin's reply to a message
    ///
    /// The reply text and its timestamp are written in one update. A message
    /// takes one reply only.
    pub async fn reply_to_message(&self, id: Uuid, reply: &str) -> Result<ContactMessage> {
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(Error::validation("reply", "Reply cannot be empty."));
        }

        let already_replied = self
            .messages()
            .await?
            .iter()
            .any(|m| m.id == id && m.has_reply());
        if already_replied {
            return Err(Error::validation(
                "reply",
                "This message has already been replied to.",
            ));
        }

        let patch = json!({ "admin_reply": reply, "replied_at": Utc::now() });
        let row = self
            .store
            .update(Table::ContactMessages, id, patch)
            .await
            .inspect_err(|e| Self::write_failed("reply_to_message", Some(id), e))?;

        self.cache.invalidate(MESSAGES_KEY);
        info!(%id, "Reply sent");
        parse(row)
    }

    /// Delete one contact message
    pub async fn delete_message(&self, id: Uuid) -> Result<()> {
        self.store
            .delete(Table::ContactMessages, id)
            .await
            .inspect_err(|e| Self::write_failed("delete_message", Some(id), e))?;

        self.cache.invalidate(MESSAGES_KEY);
        info!(%id, "Message deleted");
        Ok(())
    }

    /// All announcements, newest first
    pub async fn announcements(&self) -> Result<Arc<Vec<Announcement>>> {
        let store = Arc::clone(&self.store);
        self.cache
            .fetch(ANNOUNCEMENTS_KEY, move || {
                list(store, Table::Announcements, Select::newest_first())
            })
            .await
    }

    /// Publish an announcement
    pub async fn create_announcement(&self, announcement: NewAnnouncement) -> Result<Announcement> {
        let record = serde_json::to_value(&announcement)?;
        let row = self
            .store
            .insert(Table::Announcements, record)
            .await
            .inspect_err(|e| Self::write_failed("create_announcement", None, e))?;

        self.cache.invalidate(ANNOUNCEMENTS_KEY);
        info!(title = %announcement.title, "Announcement posted");
        parse(row)
    }

    /// Delete one announcement
    pub async fn delete_announcement(&self, id: Uuid) -> Result<()> {
        self.store
            .delete(Table::Announcements, id)
            .await
            .inspect_err(|e| Self::write_failed("delete_announcement", Some(id), e))?;

        self.cache.invalidate(ANNOUNCEMENTS_KEY);
        info!(%id, "Announcement deleted");
        Ok(())
    }

    /// Record that `user_id` is an administrator
    pub async fn grant_admin_role(&self, user_id: Uuid) -> Result<UserRole> {
        let record = serde_json::to_value(UserRole {
            user_id,
            role: Role::Admin,
        })?;
        let row = self
            .store
            .insert(Table::UserRoles, record)
            .await
            .inspect_err(|e| Self::write_failed("grant_admin_role", Some(user_id), e))?;

        info!(%user_id, "Admin role granted");
        parse(row)
    }

    /// Whether `user_id` holds the admin role; never cached
    pub async fn is_admin(&self, user_id: Uuid) -> Result<bool> {
        let query = Select::default()
            .eq("user_id", user_id.to_string())
            .eq("role", "admin");
        let roles: Vec<UserRole> = list(Arc::clone(&self.store), Table::UserRoles, query).await?;
        Ok(!roles.is_empty())
    }
}
