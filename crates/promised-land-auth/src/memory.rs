//! In-process auth provider for local development and tests

use crate::error::AuthError;
use crate::provider::{AuthProvider, Session, SignUp};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::RwLock;
use promised_land_core::{types::AuthUser, validation::MIN_PASSWORD_LENGTH};
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Account {
    id: Uuid,
    email: String,
    password: String,
}

/// A password reset link the provider "sent"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRecovery {
    /// Recipient
    pub email: String,
    /// Redirect the link points at
    pub redirect_to: String,
    /// Token carried by the link
    pub token_hash: String,
}

#[derive(Debug)]
struct State {
    accounts: HashMap<String, Account>,
    access_tokens: HashMap<String, Uuid>,
    refresh_tokens: HashMap<String, Uuid>,
    recovery_tokens: HashMap<String, Uuid>,
    sent_recoveries: Vec<SentRecovery>,
    calls: Vec<&'static str>,
    session_ttl: Duration,
}

impl Default for State {
    fn default() -> Self {
        Self {
            accounts: HashMap::new(),
            access_tokens: HashMap::new(),
            refresh_tokens: HashMap::new(),
            recovery_tokens: HashMap::new(),
            sent_recoveries: Vec::new(),
            calls: Vec::new(),
            session_ttl: Duration::hours(1),
        }
    }
}

impl State {
    fn issue_session(&mut self, account: &Account) -> Session {
        let access_token = format!("access-{}", Uuid::new_v4().simple());
        let refresh_token = format!("refresh-{}", Uuid::new_v4().simple());
        self.access_tokens.insert(access_token.clone(), account.id);
        self.refresh_tokens.insert(refresh_token.clone(), account.id);

        Session {
            access_token,
            refresh_token,
            expires_at: Utc::now() + self.session_ttl,
            user: account.user(),
        }
    }

    fn account_by_id(&self, id: Uuid) -> Option<&Account> {
        self.accounts.values().find(|a| a.id == id)
    }

    fn account_for_token(&self, access_token: &str) -> Result<Account, AuthError> {
        self.access_tokens
            .get(access_token)
            .and_then(|id| self.account_by_id(*id))
            .cloned()
            .ok_or_else(|| AuthError::provider(401, "Invalid token"))
    }
}

impl Account {
    fn user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            email: Some(self.email.clone()),
        }
    }
}

/// Auth provider keeping accounts and tokens in memory
///
/// Clones share the same state. Every call is recorded so tests can assert
/// which operations reached the provider.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuthProvider {
    state: Arc<RwLock<State>>,
}

impl MemoryAuthProvider {
    /// Create a provider with no accounts
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account directly, bypassing sign-up
    pub fn add_user(&self, email: &str, password: &str) -> AuthUser {
        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_lowercase(),
            password: password.to_string(),
        };
        let user = account.user();
        self.state
            .write()
            .accounts
            .insert(account.email.clone(), account);
        user
    }

    /// Set the lifetime of sessions issued from now on
    pub fn set_session_ttl(&self, ttl: Duration) {
        self.state.write().session_ttl = ttl;
    }

    /// Names of the operations called so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.read().calls.clone()
    }

    /// Reset links sent so far
    #[must_use]
    pub fn sent_recoveries(&self) -> Vec<SentRecovery> {
        self.state.read().sent_recoveries.clone()
    }

    /// Whether `email` can sign in with `password`
    #[must_use]
    pub fn password_matches(&self, email: &str, password: &str) -> bool {
        self.state
            .read()
            .accounts
            .get(&email.to_lowercase())
            .is_some_and(|a| a.password == password)
    }

    fn record(&self, call: &'static str) {
        self.state.write().calls.push(call);
    }
}

fn check_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::provider(
            422,
            "Password should be at least 6 characters.",
        ));
    }
    Ok(())
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        self.record("sign_in_with_password");
        let mut state = self.state.write();

        let account = state
            .accounts
            .get(&email.to_lowercase())
            .filter(|a| a.password == password)
            .cloned()
            .ok_or_else(|| AuthError::provider(400, "Invalid login credentials"))?;
        Ok(state.issue_session(&account))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _redirect_to: &str,
    ) -> Result<SignUp, AuthError> {
        self.record("sign_up");
        check_password(password)?;

        let key = email.to_lowercase();
        let mut state = self.state.write();
        if state.accounts.contains_key(&key) {
            return Err(AuthError::provider(422, "User already registered"));
        }

        let account = Account {
            id: Uuid::new_v4(),
            email: key.clone(),
            password: password.to_string(),
        };
        state.accounts.insert(key, account.clone());
        let session = state.issue_session(&account);

        Ok(SignUp {
            user: account.user(),
            session: Some(session),
        })
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), AuthError> {
        self.record("reset_password_for_email");
        let mut state = self.state.write();

        let Some(id) = state.accounts.get(&email.to_lowercase()).map(|a| a.id) else {
            return Ok(());
        };

        let token_hash = Uuid::new_v4().simple().to_string();
        state.recovery_tokens.insert(token_hash.clone(), id);
        state.sent_recoveries.push(SentRecovery {
            email: email.to_lowercase(),
            redirect_to: redirect_to.to_string(),
            token_hash,
        });
        Ok(())
    }

    async fn verify_recovery(&self, token_hash: &str) -> Result<Session, AuthError> {
        self.record("verify_recovery");
        let mut state = self.state.write();

        let owner = state.recovery_tokens.remove(token_hash);
        let account = owner
            .and_then(|id| state.account_by_id(id).cloned())
            .ok_or_else(|| AuthError::provider(403, "Email link is invalid or has expired"))?;
        Ok(state.issue_session(&account))
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        self.record("get_user");
        Ok(self.state.read().account_for_token(access_token)?.user())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.record("refresh");
        let mut state = self.state.write();

        let owner = state.refresh_tokens.remove(refresh_token);
        let account = owner
            .and_then(|id| state.account_by_id(id).cloned())
            .ok_or_else(|| AuthError::provider(400, "Invalid Refresh Token"))?;
        Ok(state.issue_session(&account))
    }

    async fn update_user(&self, access_token: &str, password: &str) -> Result<AuthUser, AuthError> {
        self.record("update_user");
        check_password(password)?;

        let mut state = self.state.write();
        let account = state.account_for_token(access_token)?;
        if let Some(stored) = state.accounts.get_mut(&account.email) {
            stored.password = password.to_string();
        }
        Ok(account.user())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.record("sign_out");
        let mut state = self.state.write();

        if let Some(id) = state.access_tokens.remove(access_token) {
            state.refresh_tokens.retain(|_, owner| *owner != id);
        }
        Ok(())
    }
}
