//! In-process data store for local development and tests
//!
//! Mirrors the hosted store's observable behavior: column defaults, the
//! application status check constraint, embedded program names and
//! newest-first ordering.

use crate::store::{DataStore, Select, Table, not_found};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::{Mutex, RwLock};
use promised_land_core::{ApplicationStatus, Error, Result};
use serde_json::{Map, Value};
use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering as AtomicOrdering},
    },
};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Inner {
    tables: RwLock<HashMap<Table, Vec<Value>>>,
    failure: Mutex<Option<Error>>,
    requests: AtomicUsize,
}

/// Data store holding every table in memory
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert rows directly, applying the same defaults as [`DataStore::insert`]
    ///
    /// # Errors
    ///
    /// Returns an error if a row names an unknown column or breaks a constraint.
    pub fn seed(&self, table: Table, rows: impl IntoIterator<Item = Value>) -> Result<Vec<Value>> {
        rows.into_iter()
            .map(|row| self.insert_row(table, row))
            .collect()
    }

    /// Make every following call fail with `error` until cleared with `None`
    pub fn set_failure(&self, error: Option<Error>) {
        *self.inner.failure.lock() = error;
    }

    /// Number of calls served since creation, failed ones included
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.inner.requests.load(AtomicOrdering::SeqCst)
    }

    /// Rows currently stored in `table`, in insertion order
    #[must_use]
    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.inner
            .tables
            .read()
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    fn begin(&self) -> Result<()> {
        self.inner.requests.fetch_add(1, AtomicOrdering::SeqCst);
        self.inner.failure.lock().clone().map_or(Ok(()), Err)
    }

    fn insert_row(&self, table: Table, record: Value) -> Result<Value> {
        table.check_columns(&record)?;
        let Value::Object(mut row) = record else {
            return Err(Error::validation(table.name(), "record must be a JSON object"));
        };

        for (column, default) in table.defaults() {
            row.entry(column).or_insert(default);
        }
        row.entry("id")
            .or_insert_with(|| Value::from(Uuid::new_v4().to_string()));
        row.entry("created_at").or_insert_with(|| {
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
        });
        check_constraints(table, &row)?;

        let row = Value::Object(row);
        self.inner
            .tables
            .write()
            .entry(table)
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    fn embed_related(&self, rows: &mut [Value], query: &Select) {
        let Some(embed) = query.embed else {
            return;
        };

        let tables = self.inner.tables.read();
        let related = tables.get(&embed.table);
        for row in rows {
            let target = row.get(embed.foreign_key).and_then(Value::as_str);
            let found = target.and_then(|id| {
                related?
                    .iter()
                    .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
            });
            let projected = found.map_or(Value::Null, |r| {
                let fields: Map<String, Value> = embed
                    .columns
                    .iter()
                    .map(|c| ((*c).to_string(), r.get(*c).cloned().unwrap_or(Value::Null)))
                    .collect();
                Value::Object(fields)
            });
            if let Value::Object(map) = row {
                map.insert(embed.table.name().to_string(), projected);
            }
        }
    }
}

fn id_of(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare_column(a: &Value, b: &Value, column: &str) -> Ordering {
    let (a, b) = (a.get(column), b.get(column));
    let as_time = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    };
    match (as_time(a), as_time(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => text_of(a.unwrap_or(&Value::Null)).cmp(&text_of(b.unwrap_or(&Value::Null))),
    }
}

fn check_constraints(table: Table, row: &Map<String, Value>) -> Result<()> {
    if table != Table::Applications {
        return Ok(());
    }

    let status = row.get("status").and_then(Value::as_str).unwrap_or_default();
    if status.parse::<ApplicationStatus>().is_err() {
        return Err(Error::Remote {
            code: Some("23514".to_string()),
            message: "new row for relation \"applications\" violates check constraint \"applications_status_check\"".to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn select(&self, table: Table, query: &Select) -> Result<Vec<Value>> {
        self.begin()?;

        let mut rows: Vec<(usize, Value)> = self
            .rows(table)
            .into_iter()
            .enumerate()
            .filter(|(_, row)| {
                query.filters.iter().all(|(column, expected)| {
                    row.get(*column).is_some_and(|v| text_of(v) == *expected)
                })
            })
            .collect();

        if let Some(order) = query.order {
            rows.sort_by(|(ia, a), (ib, b)| {
                compare_column(a, b, order.column).then_with(|| ia.cmp(ib))
            });
            if !order.ascending {
                rows.reverse();
            }
        }

        let mut rows: Vec<Value> = rows.into_iter().map(|(_, row)| row).collect();
        self.embed_related(&mut rows, query);
        Ok(rows)
    }

    async fn insert(&self, table: Table, record: Value) -> Result<Value> {
        self.begin()?;
        self.insert_row(table, record)
    }

    async fn update(&self, table: Table, id: Uuid, patch: Value) -> Result<Value> {
        self.begin()?;
        table.check_columns(&patch)?;
        let Value::Object(patch) = patch else {
            return Err(Error::validation(table.name(), "record must be a JSON object"));
        };

        let key = id.to_string();
        let mut tables = self.inner.tables.write();
        let rows = tables.entry(table).or_default();
        let Some(row) = rows.iter_mut().find(|row| id_of(row) == Some(key.as_str())) else {
            return Err(not_found(table, id));
        };

        let mut updated = row.as_object().cloned().unwrap_or_default();
        updated.extend(patch);
        check_constraints(table, &updated)?;

        *row = Value::Object(updated);
        Ok(row.clone())
    }

    async fn delete(&self, table: Table, id: Uuid) -> Result<()> {
        self.begin()?;

        let key = id.to_string();
        let mut tables = self.inner.tables.write();
        let rows = tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|row| id_of(row) != Some(key.as_str()));

        if rows.len() == before {
            return Err(not_found(table, id));
        }
        Ok(())
    }

    fn scoped(&self, _access_token: &str) -> Arc<dyn DataStore> {
        Arc::new(self.clone())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
