//! Result cache.
//!
//! Query results are memoized under `{prefix}:{tenant}:{table}:{fingerprint}`
//! keys in a pluggable [`CacheStore`]. Caching is strictly best-effort.

mod entry;
mod key;
#[cfg(feature = "postgres")]
mod postgres_store;
mod result_cache;
mod sled_store;
mod store;

pub use entry::CacheEntry;
pub use key::{cache_key, glob_match, tenant_pattern, QueryFingerprint};
#[cfg(feature = "postgres")]
pub use postgres_store::PostgresStore;
pub use result_cache::{spawn_cleanup_task, CacheStats, Clock, ResultCache};
pub use sled_store::SledStore;
pub use store::{CacheStore, MemoryStore};
