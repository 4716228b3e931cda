//! Embedded persistent store backed by sled.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::entry::CacheEntry;
use super::key::{glob_match, pattern_prefix};
use super::store::CacheStore;
use crate::error::{Error, Result};

const TREE_NAME: &str = "pgql_cache";

/// Persistent cache store in a sled tree.
#[derive(Debug, Clone)]
pub struct SledStore {
    tree: sled::Tree,
}

impl SledStore {
    /// Open (or create) a store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path).map_err(storage)?;
        Self::from_db(&db)
    }

    /// Use the cache tree of an existing database.
    pub fn from_db(db: &sled::Db) -> Result<Self> {
        let tree = db.open_tree(TREE_NAME).map_err(storage)?;
        Ok(Self { tree })
    }

    /// Flush pending writes to disk.
    pub async fn flush(&self) -> Result<()> {
        self.tree.flush_async().await.map_err(storage)?;
        Ok(())
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

fn storage(e: sled::Error) -> Error {
    Error::Cache(e.to_string())
}

#[async_trait]
impl CacheStore for SledStore {
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<CacheEntry>> {
        let Some(bytes) = self.tree.get(key.as_bytes()).map_err(storage)? else {
            return Ok(None);
        };
        let entry = CacheEntry::from_bytes(&bytes)?;
        Ok((!entry.is_expired(now)).then_some(entry))
    }

    async fn set(&self, entry: CacheEntry) -> Result<()> {
        let bytes = entry.to_bytes()?;
        self.tree
            .insert(entry.key.as_bytes(), bytes)
            .map_err(storage)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.tree.remove(key.as_bytes()).map_err(storage)?.is_some())
    }

    async fn delete_matching(&self, pattern: &str) -> Result<u64> {
        let mut removed = 0;
        for item in self.tree.scan_prefix(pattern_prefix(pattern).as_bytes()) {
            let (key, _) = item.map_err(storage)?;
            let matches = std::str::from_utf8(&key)
                .map(|k| glob_match(pattern, k))
                .unwrap_or(false);
            if matches && self.tree.remove(&key).map_err(storage)?.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut removed = 0;
        for item in self.tree.iter() {
            let (key, bytes) = item.map_err(storage)?;
            // Undecodable entries are dropped along with expired ones.
            let expired = CacheEntry::from_bytes(&bytes)
                .map(|e| e.is_expired(now))
                .unwrap_or(true);
            if expired && self.tree.remove(&key).map_err(storage)?.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn name(&self) -> &'static str {
        "sled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SledStore) {
        let dir = TempDir::new().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let (_dir, store) = setup();
        let now = Utc::now();
        let entry = CacheEntry::new("pgql:_:users:ab", json!([{"id": 1}]), now + Duration::seconds(5));
        store.set(entry.clone()).await.unwrap();

        assert_eq!(store.get("pgql:_:users:ab", now).await.unwrap(), Some(entry));
        assert!(store
            .get("pgql:_:users:ab", now + Duration::seconds(6))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let later = Utc::now() + Duration::seconds(60);
        {
            let store = SledStore::open(dir.path()).unwrap();
            store.set(CacheEntry::new("k", json!(1), later)).await.unwrap();
            store.flush().await.unwrap();
        }
        let store = SledStore::open(dir.path()).unwrap();
        assert!(store.get("k", Utc::now()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_pattern_delete_and_cleanup() {
        let (_dir, store) = setup();
        let now = Utc::now();
        store
            .set(CacheEntry::new("pgql:t-1:users:a", json!(1), now + Duration::seconds(60)))
            .await
            .unwrap();
        store
            .set(CacheEntry::new("pgql:t-1:posts:b", json!(2), now - Duration::seconds(1)))
            .await
            .unwrap();
        store
            .set(CacheEntry::new("pgql:t-2:users:c", json!(3), now + Duration::seconds(60)))
            .await
            .unwrap();

        assert_eq!(store.cleanup_expired(now).await.unwrap(), 1);
        assert_eq!(store.delete_matching("pgql:t-1:*").await.unwrap(), 1);
        assert_eq!(store.len(), 1);
    }
}
