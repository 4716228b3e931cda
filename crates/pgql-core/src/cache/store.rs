//! Cache storage backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::entry::CacheEntry;
use super::key::glob_match;
use crate::error::Result;

/// Key/value storage for cache entries.
///
/// Each call is one atomic round trip; no cross-call locking is assumed and
/// concurrent writers race last-write-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch an entry that has not expired at `now`.
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<CacheEntry>>;

    /// Insert or replace an entry.
    async fn set(&self, entry: CacheEntry) -> Result<()>;

    /// Remove one key. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Remove every key matching a `*` pattern. Returns the number removed.
    async fn delete_matching(&self, pattern: &str) -> Result<u64>;

    /// Remove entries expired at `now`. Returns the number removed.
    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<CacheEntry>> {
        Ok(self
            .entries
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.value().clone()))
    }

    async fn set(&self, entry: CacheEntry) -> Result<()> {
        self.entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn delete_matching(&self, pattern: &str) -> Result<u64> {
        let before = self.entries.len();
        self.entries.retain(|key, _| !glob_match(pattern, key));
        Ok(before.saturating_sub(self.entries.len()) as u64)
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before.saturating_sub(self.entries.len()) as u64)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
