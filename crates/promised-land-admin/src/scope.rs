//! Lifetime of a mounted view
//!
//! Remote calls are never aborted once issued. A view that goes away cancels
//! its scope instead, and results arriving afterwards are dropped rather than
//! applied.

use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Cancellation scope of one mounted view
#[derive(Debug, Clone, Default)]
pub struct ViewScope {
    token: CancellationToken,
}

impl ViewScope {
    /// A new, live scope
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope that ends when `parent` ends, or when cancelled itself
    #[must_use]
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
        }
    }

    /// End the scope
    pub fn unmount(&self) {
        self.token.cancel();
    }

    /// Whether the view is still mounted
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Completes once the view is unmounted
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// `value` if the view is still mounted
    pub fn keep<T>(&self, value: T) -> Option<T> {
        self.is_mounted().then_some(value)
    }

    /// Await `work` to completion and keep its output only if still mounted
    pub async fn settle<F: Future>(&self, work: F) -> Option<F::Output> {
        let output = work.await;
        self.keep(output)
    }
}
