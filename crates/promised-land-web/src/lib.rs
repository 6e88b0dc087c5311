//! Web server for the Promised Land site
//!
//! Serves the public landing page and the admin back office. Admin pages are
//! rendered on the server; the session is kept in an HTTP-only cookie and
//! every dashboard action is a form post answered with a redirect.

#![forbid(unsafe_code)]
// Axum handlers are async and take extractors by value
#![allow(clippy::unused_async, clippy::needless_pass_by_value)]

pub mod error;
pub mod handlers;
pub mod routes;
pub mod session;
pub mod state;
pub mod views;

pub use error::WebError;
pub use routes::build_router;
pub use state::AppState;
