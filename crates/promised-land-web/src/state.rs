//! Application state management

use crate::views::landing::HeroContent;
use promised_land_admin::{AuthFlow, DataAccess, PendingActions, QueryCache};
use promised_land_auth::{AuthClient, AuthProvider};
use promised_land_core::{Config, Result};
use promised_land_database::DataStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Config,
    /// Data access over the shared query cache, not yet bound to a session
    pub access: DataAccess,
    /// Auth provider
    pub auth: Arc<dyn AuthProvider>,
    /// Dashboard mutations currently running
    pub pending: Arc<PendingActions>,
    /// Cancelled when the server shuts down; every view scope derives from it
    pub shutdown: CancellationToken,
    /// Landing page content
    pub hero: HeroContent,
}

impl AppState {
    /// Create state over an existing store and auth provider
    #[must_use]
    pub fn new(config: Config, store: Arc<dyn DataStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            config,
            access: DataAccess::new(store, Arc::new(QueryCache::new())),
            auth,
            pending: Arc::new(PendingActions::new()),
            shutdown: CancellationToken::new(),
            hero: HeroContent::default(),
        }
    }

    /// Connect the configured store and auth provider
    ///
    /// # Errors
    ///
    /// Returns an error if either backend cannot be set up.
    pub async fn connect(config: Config) -> Result<Self> {
        let store = promised_land_database::connect(&config).await?;
        let auth = promised_land_auth::connect(&config)?;
        Ok(Self::new(config, store, auth))
    }

    /// Auth form flow for one request's client
    #[must_use]
    pub fn auth_flow(&self, client: Arc<AuthClient>) -> AuthFlow {
        let admin = &self.config.admin;
        AuthFlow::new(
            client,
            self.access.clone(),
            admin.allowed_email.clone(),
            admin.reset_password_url(),
            admin.signup_redirect_url(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use promised_land_auth::MemoryAuthProvider;
    use promised_land_core::config::StoreKind;

    #[tokio::test]
    async fn test_connect_memory_backends() {
        let mut config = Config::default();
        config.backend.store = StoreKind::Memory;

        let state = AppState::connect(config).await;

        assert!(state.is_ok());
    }

    #[test]
    fn test_new_state_is_live() {
        let state = AppState::new(
            Config::default(),
            Arc::new(promised_land_database::MemoryStore::new()),
            Arc::new(MemoryAuthProvider::new()),
        );

        assert!(!state.shutdown.is_cancelled());
        assert_eq!(state.hero, HeroContent::default());
    }
}
