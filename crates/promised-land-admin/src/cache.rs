//! Query result cache with per-key request coalescing
//!
//! A key is fetched when it has no value or was invalidated since its last
//! fetch. Callers reading a key while a fetch started after the latest
//! invalidation is running wait on that same fetch. A fetch started before
//! the latest invalidation is never joined: the next reader starts a new one,
//! and only the newest fetch is recorded. There is no time-based expiry;
//! entries only go stale through [`QueryCache::invalidate`].

use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use promised_land_core::{Error, Result};
use std::{any::Any, future::Future, sync::Arc};
use tracing::{debug, trace};

type CachedValue = Arc<dyn Any + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, Result<CachedValue>>>;

#[derive(Default)]
struct Entry {
    value: Option<CachedValue>,
    stale: bool,
    /// Bumped by every invalidation
    generation: u64,
    /// Running fetch and the generation it started under
    in_flight: Option<(u64, SharedFetch)>,
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("has_value", &self.value.is_some())
            .field("stale", &self.stale)
            .field("generation", &self.generation)
            .field("in_flight", &self.in_flight.is_some())
            .finish()
    }
}

/// What [`QueryCache::peek`] found for a key
#[derive(Debug)]
pub struct Cached<T> {
    /// Last fetched value
    pub value: Arc<T>,
    /// Whether the key was invalidated after this value was fetched
    pub stale: bool,
}

/// Keyed store of query results
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: DashMap<String, Entry>,
}

fn downcast<T: Send + Sync + 'static>(key: &str, value: CachedValue) -> Result<Arc<T>> {
    value
        .downcast::<T>()
        .map_err(|_| Error::Other(format!("cached value for {key} has an unexpected type")))
}

impl QueryCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, running `fetcher` only when needed
    ///
    /// `fetcher` is not called when a fresh value exists or another caller's
    /// fetch for `key` started after its last invalidation. A failed fetch is
    /// handed to every waiting caller and nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns the fetch error, or an error if `key` holds a different type.
    pub async fn fetch<T, F, Fut>(&self, key: &str, fetcher: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let fetch = {
            let mut entry = self.entries.entry(key.to_string()).or_default();

            let fresh = entry.value.clone().filter(|_| !entry.stale);
            if let Some(value) = fresh {
                trace!(key, "Cache hit");
                return downcast(key, value);
            }

            let generation = entry.generation;
            let running = entry
                .in_flight
                .as_ref()
                .filter(|(started, _)| *started == generation)
                .map(|(_, fetch)| fetch.clone());
            if let Some(running) = running {
                trace!(key, "Joining in-flight fetch");
                running
            } else {
                debug!(
                    key,
                    stale = entry.stale,
                    superseded = entry.in_flight.is_some(),
                    "Fetching"
                );
                let fetch = fetcher()
                    .map(|result| result.map(|value| Arc::new(value) as CachedValue))
                    .boxed()
                    .shared();
                entry.in_flight = Some((entry.generation, fetch.clone()));
                fetch
            }
        };

        let result = fetch.clone().await;
        self.settle(key, &fetch, &result);
        downcast(key, result?)
    }

    /// Record the outcome of `fetch` if it is still the key's running fetch
    fn settle(&self, key: &str, fetch: &SharedFetch, result: &Result<CachedValue>) {
        let Some(mut entry) = self.entries.get_mut(key) else {
            return;
        };

        let started = match &entry.in_flight {
            Some((started, running)) if running.ptr_eq(fetch) => *started,
            // Another waiter already settled this fetch
            _ => return,
        };
        entry.in_flight = None;

        match result {
            Ok(value) => {
                entry.value = Some(Arc::clone(value));
                entry.stale = entry.generation != started;
            }
            Err(e) => debug!(key, error = %e, "Fetch failed, nothing cached"),
        }
    }

    /// Mark `key` stale so the next read refetches it
    ///
    /// Repeated invalidations before the next read still cause a single fetch.
    pub fn invalidate(&self, key: &str) {
        let mut entry = self.entries.entry(key.to_string()).or_default();
        entry.generation += 1;
        entry.stale = true;
        debug!(key, generation = entry.generation, "Invalidated");
    }

    /// Last fetched value for `key` and whether it is stale, without fetching
    ///
    /// # Errors
    ///
    /// Returns an error if `key` holds a different type.
    pub fn peek<T: Send + Sync + 'static>(&self, key: &str) -> Result<Option<Cached<T>>> {
        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };
        let Some(value) = entry.value.clone() else {
            return Ok(None);
        };
        let stale = entry.stale;
        drop(entry);

        Ok(Some(Cached {
            value: downcast(key, value)?,
            stale,
        }))
    }

    /// Whether a fetch for `key` is running
    #[must_use]
    pub fn is_fetching(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.in_flight.is_some())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
        value: u32,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<u32>> {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(value) }.boxed()
        }
    }

    #[tokio::test]
    async fn test_fresh_value_is_served_from_cache() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache.fetch("k", counting_fetch(&calls, 1)).await.unwrap();
        let second = cache.fetch("k", counting_fetch(&calls, 2)).await.unwrap();

        assert_eq!((*first, *second), (1, 1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_cold_reads_issue_one_fetch() {
        let cache = Arc::new(QueryCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let mut readers = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            let gate = Arc::clone(&gate);
            readers.push(tokio::spawn(async move {
                cache
                    .fetch("admin-applications", move || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async move {
                            gate.notified().await;
                            Ok(42_u32)
                        }
                    })
                    .await
            }));
        }

        while !cache.is_fetching("admin-applications") {
            tokio::task::yield_now().await;
        }
        // Let every reader reach the shared fetch before it completes
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        gate.notify_one();

        for reader in readers {
            assert_eq!(*reader.await.unwrap().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_many_invalidations_cause_one_refetch() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        cache.fetch("k", counting_fetch(&calls, 1)).await.unwrap();

        for _ in 0..5 {
            cache.invalidate("k");
        }
        assert!(cache.peek::<u32>("k").unwrap().unwrap().stale);

        let refreshed = cache.fetch("k", counting_fetch(&calls, 2)).await.unwrap();
        cache.fetch("k", counting_fetch(&calls, 3)).await.unwrap();

        assert_eq!(*refreshed, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidating_one_key_leaves_others_fresh() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        cache.fetch("a", counting_fetch(&calls, 1)).await.unwrap();
        cache.fetch("b", counting_fetch(&calls, 1)).await.unwrap();

        cache.invalidate("a");
        cache.fetch("b", counting_fetch(&calls, 9)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!cache.peek::<u32>("b").unwrap().unwrap().stale);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = QueryCache::new();

        let err = cache
            .fetch::<u32, _, _>("k", || async { Err(Error::remote("boom")) })
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "boom");
        assert!(cache.peek::<u32>("k").unwrap().is_none());

        let value = cache.fetch("k", || async { Ok(5_u32) }).await.unwrap();
        assert_eq!(*value, 5);
    }

    #[tokio::test]
    async fn test_fetch_finishing_after_invalidation_stays_stale() {
        let cache = Arc::new(QueryCache::new());
        let gate = Arc::new(Notify::new());

        let reader = {
            let cache = Arc::clone(&cache);
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                cache
                    .fetch("k", move || async move {
                        gate.notified().await;
                        Ok(1_u32)
                    })
                    .await
            })
        };
        while !cache.is_fetching("k") {
            tokio::task::yield_now().await;
        }

        cache.invalidate("k");
        gate.notify_one();
        assert_eq!(*reader.await.unwrap().unwrap(), 1);

        let cached = cache.peek::<u32>("k").unwrap().unwrap();
        assert_eq!(*cached.value, 1);
        assert!(cached.stale);
    }

    #[tokio::test]
    async fn test_read_after_invalidation_skips_outdated_fetch() {
        let cache = Arc::new(QueryCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());
        cache.fetch("k", counting_fetch(&calls, 0)).await.unwrap();
        cache.invalidate("k");

        let outdated = {
            let cache = Arc::clone(&cache);
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                cache
                    .fetch("k", move || async move {
                        gate.notified().await;
                        Ok(1_u32)
                    })
                    .await
            })
        };
        while !cache.is_fetching("k") {
            tokio::task::yield_now().await;
        }

        // A write lands while the refetch is still running
        cache.invalidate("k");
        let current = cache.fetch("k", counting_fetch(&calls, 2)).await.unwrap();
        assert_eq!(*current, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        gate.notify_one();
        assert_eq!(*outdated.await.unwrap().unwrap(), 1);
        let cached = cache.peek::<u32>("k").unwrap().unwrap();
        assert_eq!(*cached.value, 2);
        assert!(!cached.stale);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_an_error() {
        let cache = QueryCache::new();
        cache.fetch("k", || async { Ok(1_u32) }).await.unwrap();

        assert!(cache.peek::<String>("k").is_err());
    }
}
