//! Read-through TTL cache for catalog reads.
//!
//! Not authoritative. An entry is fresh for one TTL after it was fetched;
//! after that the loader runs again. If the reload fails the stale value is
//! served rather than the error, so a flaky backend degrades to slightly old
//! catalog data instead of an empty page.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use moka::future::Cache;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::remote::RequestOptions;

/// Idle entries are evicted after this long regardless of TTL, to bound
/// memory held by stale fallbacks nobody asks for.
const IDLE_EVICTION: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    fetched_at: Instant,
}

/// Stable cache key for an `(endpoint, options)` pair.
///
/// Options serialize with sorted maps, so equal requests produce equal keys.
#[must_use]
pub fn cache_key(endpoint: &str, options: &RequestOptions) -> String {
    let options = serde_json::to_string(options).unwrap_or_default();
    format!("{endpoint}?{options}")
}

/// TTL cache in front of an async loader.
#[derive(Clone)]
pub struct ReadThroughCache<V> {
    entries: Cache<String, Entry<V>>,
    ttl: Duration,
}

impl<V> std::fmt::Debug for ReadThroughCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadThroughCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

impl<V: Clone + Send + Sync + 'static> ReadThroughCache<V> {
    #[must_use]
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(capacity)
            .time_to_idle(IDLE_EVICTION.max(ttl))
            .build();
        Self { entries, ttl }
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached value for `key`, calling `loader` on miss or expiry.
    ///
    /// # Errors
    ///
    /// Returns the loader's error only when there is no entry at all to fall
    /// back on.
    pub async fn get<F, Fut, E>(&self, key: &str, loader: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Display,
    {
        let cached = self.entries.get(key).await;
        if let Some(entry) = &cached
            && entry.fetched_at.elapsed() < self.ttl
        {
            debug!(key, "Cache hit");
            return Ok(entry.value.clone());
        }

        match loader().await {
            Ok(value) => {
                let entry = Entry {
                    value: value.clone(),
                    fetched_at: Instant::now(),
                };
                self.entries.insert(key.to_string(), entry).await;
                Ok(value)
            }
            Err(e) => match cached {
                Some(stale) => {
                    warn!(key, error = %e, "Reload failed, serving stale entry");
                    Ok(stale.value)
                }
                None => Err(e),
            },
        }
    }

    /// Typed convenience over [`ReadThroughCache::get`] keyed by request.
    ///
    /// # Errors
    ///
    /// See [`ReadThroughCache::get`].
    pub async fn get_request<F, Fut, E>(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        loader: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Display,
    {
        self.get(&cache_key(endpoint, options), loader).await
    }

    pub async fn invalidate(&self, key: &str) {
        self.entries.invalidate(key).await;
    }

    /// Drop every entry whose key starts with `prefix` (typically an endpoint).
    pub async fn invalidate_prefix(&self, prefix: &str) {
        let keys: Vec<_> = self
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key)
            .collect();
        for key in keys {
            self.entries.invalidate(key.as_str()).await;
        }
    }

    pub async fn invalidate_all(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
    }

    /// Approximate number of entries (moka counts lazily).
    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn cache() -> ReadThroughCache<u32> {
        ReadThroughCache::new(Duration::from_secs(30), 100)
    }

    async fn load(calls: &AtomicUsize, value: u32) -> Result<u32, String> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    #[test]
    fn test_cache_key_is_stable_across_query_order() {
        let a = RequestOptions::get().with_query("b", "2").with_query("a", "1");
        let b = RequestOptions::get().with_query("a", "1").with_query("b", "2");
        assert_eq!(cache_key("products/", &a), cache_key("products/", &b));
        assert_eq!(
            cache_key("categories/", &RequestOptions::get()),
            r#"categories/?{"method":"GET"}"#
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_loader_runs_once_within_ttl() {
        let cache = cache();
        let calls = AtomicUsize::new(0);

        assert_eq!(cache.get("k", || load(&calls, 1)).await.unwrap(), 1);
        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(cache.get("k", || load(&calls, 2)).await.unwrap(), 1);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_reloads() {
        let cache = cache();
        let calls = AtomicUsize::new(0);

        cache.get("k", || load(&calls, 1)).await.unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cache.get("k", || load(&calls, 2)).await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_served_on_failure() {
        let cache = cache();
        cache
            .get("k", || async { Ok::<_, String>(7) })
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;

        let value = cache
            .get("k", || async { Err::<u32, _>("backend down".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_failure_without_entry_propagates() {
        let cache = cache();
        let err = cache
            .get("k", || async { Err::<u32, _>("backend down".to_string()) })
            .await
            .unwrap_err();
        assert_eq!(err, "backend down");
    }

    #[tokio::test]
    async fn test_invalidate_prefix_only_drops_matching() {
        let cache = cache();
        let calls = Arc::new(AtomicUsize::new(0));
        cache.get("categories/?a", || load(&calls, 1)).await.unwrap();
        cache.get("products/1/?a", || load(&calls, 2)).await.unwrap();

        cache.invalidate_prefix("categories/").await;

        assert_eq!(cache.get("categories/?a", || load(&calls, 3)).await.unwrap(), 3);
        assert_eq!(cache.get("products/1/?a", || load(&calls, 4)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let cache = cache();
        let calls = AtomicUsize::new(0);
        cache.get("a", || load(&calls, 1)).await.unwrap();
        cache.invalidate_all().await;
        assert_eq!(cache.entry_count().await, 0);
    }
}
