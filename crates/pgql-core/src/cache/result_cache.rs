//! Best-effort result cache.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::task::JoinHandle;

use super::entry::CacheEntry;
use super::key::{cache_key, tenant_pattern, QueryFingerprint};
use super::store::CacheStore;
use crate::config::CacheConfig;
use crate::error::Result;

/// Source of the current time; injectable for expiry tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Cache statistics.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    errors: AtomicU64,
}

impl CacheStats {
    /// Lookups served from the cache.
    pub fn hits(&self) -> u64 {
        self.hits.load(AtomicOrdering::Relaxed)
    }

    /// Lookups that found nothing (including degraded lookups).
    pub fn misses(&self) -> u64 {
        self.misses.load(AtomicOrdering::Relaxed)
    }

    /// Successful writes.
    pub fn sets(&self) -> u64 {
        self.sets.load(AtomicOrdering::Relaxed)
    }

    /// Backend failures swallowed by the cache.
    pub fn errors(&self) -> u64 {
        self.errors.load(AtomicOrdering::Relaxed)
    }

    /// Hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Memoizes query results under deterministic keys with TTL expiry.
///
/// Backend failures never reach the caller: a failed `get` is a miss and a
/// failed `set` is a no-op. Staleness is bounded by TTL only.
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
    stats: CacheStats,
    clock: Clock,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("store", &self.store.name())
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish()
    }
}

impl ResultCache {
    /// Create a cache over `store`.
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            stats: CacheStats::default(),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Key for a fingerprinted query, scoped by tenant and table.
    pub fn key_for(&self, tenant: Option<&str>, table: &str, fingerprint: &QueryFingerprint) -> String {
        cache_key(&self.config.key_prefix, tenant, table, fingerprint)
    }

    /// Look up a key.
    pub async fn get(&self, key: &str) -> Option<Value> {
        match self.store.get(key, (self.clock)()).await {
            Ok(Some(entry)) => {
                self.stats.hits.fetch_add(1, AtomicOrdering::Relaxed);
                tracing::trace!(key, "cache hit");
                Some(entry.value)
            }
            Ok(None) => {
                self.stats.misses.fetch_add(1, AtomicOrdering::Relaxed);
                None
            }
            Err(e) => {
                self.stats.misses.fetch_add(1, AtomicOrdering::Relaxed);
                self.stats.errors.fetch_add(1, AtomicOrdering::Relaxed);
                tracing::warn!(backend = self.store.name(), error = %e, "cache get failed");
                None
            }
        }
    }

    /// Store a value for `ttl`, or the configured default.
    pub async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            tracing::warn!(key, "cache ttl out of range, entry not stored");
            return;
        };
        let entry = CacheEntry::new(key, value, (self.clock)() + ttl);

        match self.store.set(entry).await {
            Ok(()) => {
                self.stats.sets.fetch_add(1, AtomicOrdering::Relaxed);
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, AtomicOrdering::Relaxed);
                tracing::warn!(backend = self.store.name(), error = %e, "cache set failed");
            }
        }
    }

    /// Remove one key.
    pub async fn delete(&self, key: &str) -> bool {
        self.store.delete(key).await.unwrap_or_else(|e| {
            self.stats.errors.fetch_add(1, AtomicOrdering::Relaxed);
            tracing::warn!(backend = self.store.name(), error = %e, "cache delete failed");
            false
        })
    }

    /// Remove every key matching a `*` pattern.
    pub async fn delete_pattern(&self, pattern: &str) -> u64 {
        self.store.delete_matching(pattern).await.unwrap_or_else(|e| {
            self.stats.errors.fetch_add(1, AtomicOrdering::Relaxed);
            tracing::warn!(backend = self.store.name(), error = %e, "cache pattern delete failed");
            0
        })
    }

    /// Remove every entry of one tenant.
    pub async fn invalidate_tenant(&self, tenant: &str) -> u64 {
        self.delete_pattern(&tenant_pattern(&self.config.key_prefix, tenant))
            .await
    }

    /// Sweep expired entries.
    pub async fn cleanup_expired(&self) -> u64 {
        match self.store.cleanup_expired((self.clock)()).await {
            Ok(removed) => removed,
            Err(e) => {
                self.stats.errors.fetch_add(1, AtomicOrdering::Relaxed);
                tracing::warn!(backend = self.store.name(), error = %e, "cache cleanup failed");
                0
            }
        }
    }

    /// Return the cached value or compute, store and return it.
    ///
    /// A failed computation is returned as is and never cached.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, ttl: Option<Duration>, compute: F) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }
        let value = compute().await?;
        self.set(key, value.clone(), ttl).await;
        Ok(value)
    }

    /// Start the periodic sweeper if the configuration enables one.
    pub fn start_cleanup(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        self.config
            .cleanup_interval
            .map(|interval| spawn_cleanup_task(Arc::clone(self), interval))
    }
}

/// Run `cleanup_expired` every `interval` until the handle is aborted.
pub fn spawn_cleanup_task(cache: Arc<ResultCache>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = cache.cleanup_expired().await;
            if removed > 0 {
                tracing::debug!(removed, "expired cache entries removed");
            }
        }
    })
}
