//! Client for the hosted GoTrue auth interface (`{url}/auth/v1`)

use crate::error::AuthError;
use crate::provider::{AuthProvider, Session, SignUp};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use promised_land_core::{config::BackendConfig, types::AuthUser};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Token response of the `/token` and `/verify` endpoints
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(|| now + Duration::seconds(self.expires_in.unwrap_or(3600)));

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Provider backed by the hosted auth interface
#[derive(Debug, Clone)]
pub struct GoTrueProvider {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl GoTrueProvider {
    /// Build a provider for the backend in `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .map_err(|e| AuthError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client, &config.url, &config.anon_key))
    }

    /// Build a provider around an existing HTTP client
    #[must_use]
    pub fn with_client(client: reqwest::Client, url: &str, anon_key: &str) -> Self {
        Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    fn request(&self, method: Method, endpoint: &str, bearer: Option<&str>) -> RequestBuilder {
        self.client
            .request(method, format!("{}/auth/v1/{endpoint}", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
    }

    async fn send(request: RequestBuilder) -> Result<Response, AuthError> {
        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = ["msg", "message", "error_description", "error"]
            .iter()
            .find_map(|key| body.get(key).and_then(Value::as_str))
            .map_or_else(|| status.to_string(), ToString::to_string);

        debug!(status = %status, message = %message, "Auth provider rejected request");
        Err(AuthError::provider(status.as_u16(), message))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, AuthError> {
        response
            .json::<T>()
            .await
            .map_err(|e| AuthError::Decode(e.to_string()))
    }

    async fn token(&self, grant_type: &str, body: Value) -> Result<Session, AuthError> {
        let request = self
            .request(Method::POST, "token", None)
            .query(&[("grant_type", grant_type)])
            .json(&body);
        let tokens: TokenResponse = Self::decode(Self::send(request).await?).await?;
        Ok(tokens.into_session(Utc::now()))
    }
}

#[async_trait]
impl AuthProvider for GoTrueProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        self.token("password", json!({"email": email, "password": password}))
            .await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &str,
    ) -> Result<SignUp, AuthError> {
        let request = self
            .request(Method::POST, "signup", None)
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({"email": email, "password": password}));
        let body: Value = Self::decode(Self::send(request).await?).await?;

        // Auto-confirming projects answer with a session, others with the bare user
        if body.get("access_token").is_some() {
            let tokens: TokenResponse =
                serde_json::from_value(body).map_err(|e| AuthError::Decode(e.to_string()))?;
            let session = tokens.into_session(Utc::now());
            return Ok(SignUp {
                user: session.user.clone(),
                session: Some(session),
            });
        }

        let user: AuthUser = serde_json::from_value(body.get("user").cloned().unwrap_or(body))
            .map_err(|e| AuthError::Decode(e.to_string()))?;
        Ok(SignUp {
            user,
            session: None,
        })
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), AuthError> {
        let request = self
            .request(Method::POST, "recover", None)
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({"email": email}));
        Self::send(request).await?;
        Ok(())
    }

    async fn verify_recovery(&self, token_hash: &str) -> Result<Session, AuthError> {
        let request = self
            .request(Method::POST, "verify", None)
            .json(&json!({"type": "recovery", "token_hash": token_hash}));
        let tokens: TokenResponse = Self::decode(Self::send(request).await?).await?;
        Ok(tokens.into_session(Utc::now()))
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let request = self.request(Method::GET, "user", Some(access_token));
        Self::decode(Self::send(request).await?).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.token("refresh_token", json!({"refresh_token": refresh_token}))
            .await
    }

    async fn update_user(&self, access_token: &str, password: &str) -> Result<AuthUser, AuthError> {
        let request = self
            .request(Method::PUT, "user", Some(access_token))
            .json(&json!({"password": password}));
        Self::decode(Self::send(request).await?).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let request = self.request(Method::POST, "logout", Some(access_token));
        match Self::send(request).await {
            Ok(_) => Ok(()),
            // An already revoked token still ends the local session
            Err(AuthError::Provider { status: 401 | 403 | 404, message }) => {
                warn!(message = %message, "Session already revoked at provider");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
