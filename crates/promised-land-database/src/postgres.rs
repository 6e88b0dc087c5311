//! Data store talking to Postgres directly through `sqlx`
//!
//! Rows are converted to JSON inside the database (`to_jsonb`) and records are
//! expanded with `jsonb_populate_record`, so one set of statements serves
//! every table. Table and column names only ever come from [`Table`].

use crate::store::{DataStore, Select, Table, not_found};
use crate::Database;
use async_trait::async_trait;
use promised_land_core::{Error, Result};
use serde_json::Value;
use sqlx::PgPool;
use std::{fmt::Write as _, sync::Arc};
use tracing::debug;
use uuid::Uuid;

/// Data store over a direct Postgres connection pool
///
/// The pool connects with the database owner's role, so row-level security is
/// not applied and [`DataStore::scoped`] returns an equivalent handle.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap the pool of an open [`Database`]
    #[must_use]
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    fn select_sql(table: Table, query: &Select) -> Result<String> {
        let mut sql = String::from("SELECT to_jsonb(t.*)");

        if let Some(embed) = query.embed {
            let fields = embed
                .columns
                .iter()
                .map(|c| format!("'{c}', r.{c}"))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = write!(
                sql,
                " || jsonb_build_object('{related}', (SELECT jsonb_build_object({fields}) FROM {related} r WHERE r.id = t.{fk}))",
                related = embed.table.name(),
                fk = embed.foreign_key,
            );
        }
        let _ = write!(sql, " FROM {} t", table.name());

        for (i, (column, _)) in query.filters.iter().enumerate() {
            ensure_column(table, column)?;
            let keyword = if i == 0 { "WHERE" } else { "AND" };
            let _ = write!(sql, " {keyword} t.{column}::text = ${}", i + 1);
        }

        if let Some(order) = query.order {
            ensure_column(table, order.column)?;
            let direction = if order.ascending { "ASC" } else { "DESC" };
            let _ = write!(sql, " ORDER BY t.{} {direction}", order.column);
        }

        Ok(sql)
    }

    fn record_columns(table: Table, record: &Value) -> Result<Vec<String>> {
        table.check_columns(record)?;
        let mut columns: Vec<String> = record
            .as_object()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default();
        columns.sort();
        Ok(columns)
    }
}

fn ensure_column(table: Table, column: &str) -> Result<()> {
    if table.writable_columns().contains(&column) {
        Ok(())
    } else {
        Err(Error::validation(
            column,
            format!("unknown column for table {}", table.name()),
        ))
    }
}

/// Map a driver error, keeping the SQLSTATE and message of database errors
fn map_sqlx(err: sqlx::Error) -> Error {
    match err {
        sqlx::Error::Database(db) => Error::Remote {
            code: db.code().map(|c| c.to_string()),
            message: db.message().to_string(),
        },
        other => Error::Database(other.to_string()),
    }
}

#[async_trait]
impl DataStore for PgStore {
    async fn select(&self, table: Table, query: &Select) -> Result<Vec<Value>> {
        let sql = Self::select_sql(table, query)?;
        debug!(table = %table, sql = %sql, "select");

        let mut statement = sqlx::query_scalar::<_, Value>(&sql);
        for (_, value) in &query.filters {
            statement = statement.bind(value);
        }
        statement.fetch_all(&self.pool).await.map_err(map_sqlx)
    }

    async fn insert(&self, table: Table, record: Value) -> Result<Value> {
        let columns = Self::record_columns(table, &record)?;

        let sql = if columns.is_empty() {
            format!(
                "INSERT INTO {t} DEFAULT VALUES RETURNING to_jsonb({t}.*)",
                t = table.name()
            )
        } else {
            let list = columns.join(", ");
            format!(
                "INSERT INTO {t} ({list}) SELECT {list} FROM jsonb_populate_record(NULL::{t}, $1) RETURNING to_jsonb({t}.*)",
                t = table.name()
            )
        };

        let mut statement = sqlx::query_scalar::<_, Value>(&sql);
        if !columns.is_empty() {
            statement = statement.bind(&record);
        }
        statement.fetch_one(&self.pool).await.map_err(map_sqlx)
    }

    async fn update(&self, table: Table, id: Uuid, patch: Value) -> Result<Value> {
        let columns = Self::record_columns(table, &patch)?;

        let row = if columns.is_empty() {
            let sql = format!("SELECT to_jsonb(t.*) FROM {} t WHERE t.id = $1", table.name());
            sqlx::query_scalar::<_, Value>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
        } else {
            let assignments = columns
                .iter()
                .map(|c| format!("{c} = r.{c}"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "UPDATE {t} AS t SET {assignments} FROM jsonb_populate_record(NULL::{t}, $1) AS r WHERE t.id = $2 RETURNING to_jsonb(t.*)",
                t = table.name()
            );
            sqlx::query_scalar::<_, Value>(&sql)
                .bind(&patch)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
        };

        row.map_err(map_sqlx)?.ok_or_else(|| not_found(table, id))
    }

    async fn delete(&self, table: Table, id: Uuid) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", table.name());
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(not_found(table, id));
        }
        Ok(())
    }

    fn scoped(&self, _access_token: &str) -> Arc<dyn DataStore> {
        Arc::new(self.clone())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
