//! Client for the hosted PostgREST interface (`{url}/rest/v1/{table}`)

use crate::store::{DataStore, Select, Table, not_found};
use async_trait::async_trait;
use promised_land_core::{Error, Result, config::BackendConfig};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tracing::debug;
use uuid::Uuid;

/// Error body returned by PostgREST
#[derive(Debug, Deserialize)]
struct RestErrorBody {
    message: Option<String>,
    code: Option<String>,
    details: Option<String>,
}

/// Data store backed by the hosted REST interface
#[derive(Debug, Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
}

impl RestStore {
    /// Build a store for the backend in `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .connect_timeout(Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client, &config.url, &config.anon_key))
    }

    /// Build a store around an existing HTTP client
    #[must_use]
    pub fn with_client(client: reqwest::Client, url: &str, anon_key: &str) -> Self {
        Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            access_token: None,
        }
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    fn request(&self, method: Method, table: Table) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn send(&self, table: Table, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(format!("Request to {table} failed: {e}")))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let body: Option<RestErrorBody> = serde_json::from_str(&text).ok();

        let (code, message) = match body {
            Some(body) => {
                let message = body
                    .message
                    .or(body.details)
                    .unwrap_or_else(|| status.to_string());
                (body.code.unwrap_or_else(|| status.as_u16().to_string()), message)
            }
            None if text.is_empty() => (status.as_u16().to_string(), status.to_string()),
            None => (status.as_u16().to_string(), text),
        };

        debug!(table = %table, status = %status, code = %code, "REST request rejected");
        Err(Error::Remote {
            code: Some(code),
            message,
        })
    }

    async fn rows(response: Response) -> Result<Vec<Value>> {
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| Error::Serialization(format!("Invalid response body: {e}")))
    }

    fn select_param(query: &Select) -> String {
        query.embed.map_or_else(
            || "*".to_string(),
            |embed| format!("*,{}({})", embed.table.name(), embed.columns.join(",")),
        )
    }
}

#[async_trait]
impl DataStore for RestStore {
    async fn select(&self, table: Table, query: &Select) -> Result<Vec<Value>> {
        let mut params = vec![("select".to_string(), Self::select_param(query))];
        params.extend(
            query
                .filters
                .iter()
                .map(|(column, value)| ((*column).to_string(), format!("eq.{value}"))),
        );
        if let Some(order) = query.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{direction}", order.column)));
        }

        let request = self.request(Method::GET, table).query(&params);
        let response = self.send(table, request).await?;
        Self::rows(response).await
    }

    async fn insert(&self, table: Table, record: Value) -> Result<Value> {
        table.check_columns(&record)?;

        let request = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(&record);
        let response = self.send(table, request).await?;

        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::remote(format!("Insert into {table} returned no row")))
    }

    async fn update(&self, table: Table, id: Uuid, patch: Value) -> Result<Value> {
        table.check_columns(&patch)?;

        let request = self
            .request(Method::PATCH, table)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = self.send(table, request).await?;

        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| not_found(table, id))
    }

    async fn delete(&self, table: Table, id: Uuid) -> Result<()> {
        let request = self
            .request(Method::DELETE, table)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation");
        let response = self.send(table, request).await?;

        if Self::rows(response).await?.is_empty() {
            return Err(not_found(table, id));
        }
        Ok(())
    }

    fn scoped(&self, access_token: &str) -> Arc<dyn DataStore> {
        Arc::new(Self {
            access_token: Some(access_token.to_string()),
            ..self.clone()
        })
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}
