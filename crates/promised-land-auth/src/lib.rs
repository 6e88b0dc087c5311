//! Hosted auth provider client and session handling for the Promised Land site
//!
//! [`AuthProvider`] is the seam to the provider; [`GoTrueProvider`] speaks the
//! hosted HTTP interface and [`MemoryAuthProvider`] keeps everything in
//! process. [`AuthClient`] owns one session and broadcasts its changes.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod client;
pub mod error;
pub mod gotrue;
pub mod memory;
pub mod provider;

pub use client::AuthClient;
pub use error::AuthError;
pub use gotrue::GoTrueProvider;
pub use memory::MemoryAuthProvider;
pub use provider::{AuthEvent, AuthProvider, Session, SignUp};

use promised_land_core::{Config, config::StoreKind};
use std::sync::Arc;

/// Build the auth provider matching the configured backend
///
/// The in-memory data store pairs with the in-memory provider; both hosted
/// store kinds use the hosted auth interface.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn connect(config: &Config) -> promised_land_core::Result<Arc<dyn AuthProvider>> {
    Ok(match config.backend.store {
        StoreKind::Memory => Arc::new(MemoryAuthProvider::new()),
        StoreKind::Rest | StoreKind::Postgres => Arc::new(GoTrueProvider::new(&config.backend)?),
    })
}
