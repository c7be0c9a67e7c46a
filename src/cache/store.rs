//! TTL page store backed by an LRU map.

use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tracing::debug;

use super::clock::{Clock, SystemClock};
use super::config::PageCacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub const METRIC_HIT: &str = "blogroll_page_cache_hit_total";
pub const METRIC_MISS: &str = "blogroll_page_cache_miss_total";
pub const METRIC_EXPIRED: &str = "blogroll_page_cache_expired_total";
pub const METRIC_INVALIDATED: &str = "blogroll_page_cache_invalidated_total";

#[derive(Clone)]
struct CacheEntry {
    body: Bytes,
    expires_at: Instant,
}

/// Process-wide store of rendered pages.
///
/// Cloning is cheap and every clone shares the same entries.
#[derive(Clone)]
pub struct PageCache {
    entries: Arc<RwLock<LruCache<String, CacheEntry>>>,
    clock: Arc<dyn Clock>,
    config: Arc<PageCacheConfig>,
}

impl PageCache {
    pub fn new(config: PageCacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: PageCacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(LruCache::new(config.max_entries_non_zero()))),
            clock,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &PageCacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Return the cached body when present and unexpired. Expired entries are dropped.
    pub fn lookup(&self, key: &str) -> Option<Bytes> {
        let now = self.clock.now();
        let mut entries = rw_write(&self.entries, SOURCE, "lookup");

        match entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                counter!(METRIC_HIT).increment(1);
                debug!(target = "blogroll::cache", key, outcome = "hit", "page cache lookup");
                Some(entry.body.clone())
            }
            Some(_) => {
                entries.pop(key);
                counter!(METRIC_EXPIRED).increment(1);
                counter!(METRIC_MISS).increment(1);
                debug!(target = "blogroll::cache", key, outcome = "expired", "page cache lookup");
                None
            }
            None => {
                counter!(METRIC_MISS).increment(1);
                debug!(target = "blogroll::cache", key, outcome = "miss", "page cache lookup");
                None
            }
        }
    }

    pub fn insert(&self, key: impl Into<String>, body: Bytes, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        rw_write(&self.entries, SOURCE, "insert").put(key.into(), CacheEntry { body, expires_at });
    }

    /// Serve `key` from cache or run `compute`, storing a successful result for `ttl`.
    ///
    /// Failures are returned to the caller and never cached. When the cache is
    /// disabled `compute` always runs.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<Bytes, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
    {
        if !self.is_enabled() {
            return compute().await;
        }

        if let Some(body) = self.lookup(key) {
            return Ok(body);
        }

        let body = compute().await?;
        self.insert(key, body.clone(), ttl);
        Ok(body)
    }

    /// Drop one entry ahead of its expiry. Returns whether an entry was present.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = rw_write(&self.entries, SOURCE, "invalidate")
            .pop(key)
            .is_some();
        if removed {
            counter!(METRIC_INVALIDATED).increment(1);
        }
        removed
    }

    /// Drop every entry. Returns how many were removed.
    pub fn invalidate_all(&self) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "invalidate_all");
        let removed = entries.len();
        entries.clear();
        counter!(METRIC_INVALIDATED).increment(removed as u64);
        removed
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::cache::ManualClock;

    fn cache_with_clock() -> (PageCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = PageCache::with_clock(PageCacheConfig::default(), clock.clone());
        (cache, clock)
    }

    async fn compute_counted(
        cache: &PageCache,
        calls: &AtomicUsize,
        body: &'static str,
    ) -> Bytes {
        cache
            .get_or_compute("index_page", Duration::from_secs(20), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(Bytes::from_static(body.as_bytes()))
            })
            .await
            .expect("infallible")
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let (cache, _clock) = cache_with_clock();
        let calls = AtomicUsize::new(0);

        let first = compute_counted(&cache, &calls, "first").await;
        let second = compute_counted(&cache, &calls, "second").await;

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let (cache, clock) = cache_with_clock();
        let calls = AtomicUsize::new(0);

        compute_counted(&cache, &calls, "first").await;
        clock.advance(Duration::from_secs(19));
        assert_eq!(compute_counted(&cache, &calls, "second").await, "first");

        clock.advance(Duration::from_secs(1));
        assert_eq!(compute_counted(&cache, &calls, "second").await, "second");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_recompute() {
        let (cache, _clock) = cache_with_clock();
        let calls = AtomicUsize::new(0);

        compute_counted(&cache, &calls, "first").await;
        assert!(cache.invalidate("index_page"));
        assert!(!cache.invalidate("index_page"));
        assert_eq!(compute_counted(&cache, &calls, "second").await, "second");
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let (cache, _clock) = cache_with_clock();

        let failed = cache
            .get_or_compute("k", Duration::from_secs(20), || async { Err::<Bytes, _>("boom") })
            .await;
        assert_eq!(failed, Err("boom"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn disabled_cache_always_computes() {
        let config = PageCacheConfig {
            enabled: false,
            ..Default::default()
        };
        let cache = PageCache::new(config);
        let calls = AtomicUsize::new(0);

        compute_counted(&cache, &calls, "a").await;
        compute_counted(&cache, &calls, "b").await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let config = PageCacheConfig {
            max_entries: 2,
            ..Default::default()
        };
        let cache = PageCache::new(config);
        let ttl = Duration::from_secs(60);

        cache.insert("a", Bytes::from_static(b"a"), ttl);
        cache.insert("b", Bytes::from_static(b"b"), ttl);
        assert!(cache.lookup("a").is_some());
        cache.insert("c", Bytes::from_static(b"c"), ttl);

        assert!(cache.lookup("b").is_none());
        assert!(cache.lookup("a").is_some());
        assert_eq!(cache.invalidate_all(), 2);
    }
}
