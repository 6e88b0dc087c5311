//! Remote data store clients for the Promised Land site

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod memory;
pub mod postgres;
pub mod rest;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use rest::RestStore;
pub use store::{DataStore, Embed, Order, Select, Table};

use promised_land_core::{Config, Error, Result, config::StoreKind};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;

// Re-export PgPool for convenience
pub use sqlx::PgPool;
use std::time::Duration;

/// Database connection pool
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection cannot be established.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .acquire_timeout(Duration::from_secs(config.database.connect_timeout))
            .idle_timeout(Duration::from_secs(config.database.idle_timeout))
            .connect(&config.database.url)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail to run.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Migration failed: {e}")))?;

        Ok(())
    }

    /// Health check
    ///
    /// # Errors
    ///
    /// Returns an error if the health check fails.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Health check failed: {e}")))?;

        Ok(())
    }
}

/// Open the data store selected by `backend.store`
///
/// The Postgres store connects, runs migrations and checks the connection
/// before returning.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built, or the database is
/// unreachable or fails to migrate.
pub async fn connect(config: &Config) -> Result<Arc<dyn DataStore>> {
    let store: Arc<dyn DataStore> = match config.backend.store {
        StoreKind::Rest => Arc::new(RestStore::new(&config.backend)?),
        StoreKind::Postgres => {
            let database = Database::new(config).await?;
            database.migrate().await?;
            database.health_check().await?;
            Arc::new(PgStore::new(&database))
        }
        StoreKind::Memory => Arc::new(MemoryStore::new()),
    };

    info!(store = store.name(), "Data store ready");
    Ok(store)
}
