//! Engine configuration.
//!
//! Every struct has a `Default` built from the `DEFAULT_*` constants below
//! and can be deserialized from JSON. Durations are written in milliseconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default field count at or below which column-list projection is used.
pub const DEFAULT_PROJECTION_THRESHOLD: usize = 20;

/// Default maximum number of values in an `in`/`notin` list.
pub const DEFAULT_MAX_IN_LIST: usize = 10_000;

/// Default cache entry lifetime in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Default cache key prefix.
pub const DEFAULT_CACHE_KEY_PREFIX: &str = "pgql";

/// Default interval between expired-entry sweeps in seconds.
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;

/// Default PostgreSQL table for the cache store.
pub const DEFAULT_CACHE_TABLE: &str = "pgql_cache";

/// Default batch window in milliseconds.
pub const DEFAULT_BATCH_WINDOW_MS: u64 = 1;

/// Default capacity of the loader's per-execution result cache.
pub const DEFAULT_LOADER_CACHE_CAPACITY: usize = 1_000;

/// Default maximum number of keys in one grouped statement.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 500;

/// How to resolve an explicit filter that constrains the same field as the
/// authorization filter with a different predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategy {
    /// Reject the query with a conflict error.
    #[default]
    Error,
    /// Emit a warning and AND both predicates.
    Log,
    /// Drop the explicit filter and keep only the authorization filter.
    Override,
}

/// Compiler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Column-list projection is used at or below this many fields,
    /// full-document projection above it.
    pub projection_threshold: usize,

    /// Conflict handling when merging authorization filters.
    pub conflict_strategy: ConflictStrategy,

    /// Render validated datetime literals inline instead of as parameters.
    ///
    /// Off by default, `{"createdAt": {"gte": "2024-01-01T00:00:00Z"}}`
    /// compiles to `(data->>'created_at')::timestamptz >= $1::timestamptz`
    /// with the string bound as `$1`. On, the same filter compiles to
    /// `(data->>'created_at')::timestamptz >= '2024-01-01T00:00:00Z'::timestamptz`.
    /// Both forms cast each side to `timestamptz` and compare the same way.
    pub inline_datetime_literals: bool,

    /// Maximum number of values in a list operand.
    pub max_in_list: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            projection_threshold: DEFAULT_PROJECTION_THRESHOLD,
            conflict_strategy: ConflictStrategy::default(),
            inline_datetime_literals: false,
            max_in_list: DEFAULT_MAX_IN_LIST,
        }
    }
}

impl CompilerConfig {
    /// Set the projection threshold.
    pub fn with_projection_threshold(mut self, threshold: usize) -> Self {
        self.projection_threshold = threshold;
        self
    }

    /// Set the conflict strategy.
    pub fn with_conflict_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.conflict_strategy = strategy;
        self
    }

    /// Render datetime literals inline.
    pub fn with_inline_datetime_literals(mut self, inline: bool) -> Self {
        self.inline_datetime_literals = inline;
        self
    }

    /// Set the list operand limit.
    pub fn with_max_in_list(mut self, max: usize) -> Self {
        self.max_in_list = max;
        self
    }
}

/// Result cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of entries stored without an explicit TTL.
    #[serde(with = "duration_ms")]
    pub default_ttl: Duration,

    /// Prefix of every cache key.
    pub key_prefix: String,

    /// Interval between expired-entry sweeps. None disables the sweeper.
    #[serde(with = "option_duration_ms")]
    pub cleanup_interval: Option<Duration>,

    /// Table used by the PostgreSQL store.
    pub table_name: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            key_prefix: DEFAULT_CACHE_KEY_PREFIX.to_string(),
            cleanup_interval: Some(Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS)),
            table_name: DEFAULT_CACHE_TABLE.to_string(),
        }
    }
}

impl CacheConfig {
    /// Set the default TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the cleanup interval.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    /// Disable the periodic sweeper.
    pub fn without_cleanup(mut self) -> Self {
        self.cleanup_interval = None;
        self
    }

    /// Set the PostgreSQL table name.
    pub fn with_table_name(mut self, table: impl Into<String>) -> Self {
        self.table_name = table.into();
        self
    }
}

/// Batch entity loader configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Time between the first request in an empty queue and the flush.
    #[serde(with = "duration_ms")]
    pub batch_window: Duration,

    /// Maximum number of resolved entities kept per loader (FIFO).
    pub cache_capacity: usize,

    /// Maximum number of keys per grouped statement.
    pub max_batch_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_window: Duration::from_millis(DEFAULT_BATCH_WINDOW_MS),
            cache_capacity: DEFAULT_LOADER_CACHE_CAPACITY,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

impl LoaderConfig {
    /// Set the batch window.
    pub fn with_batch_window(mut self, window: Duration) -> Self {
        self.batch_window = window;
        self
    }

    /// Set the result cache capacity.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set the maximum keys per grouped statement.
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Compiler settings.
    pub compiler: CompilerConfig,
    /// Result cache settings.
    pub cache: CacheConfig,
    /// Loader settings.
    pub loader: LoaderConfig,
}

impl EngineConfig {
    /// Parse a JSON configuration document. Missing keys take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make the engine unusable.
    pub fn validate(&self) -> Result<()> {
        if self.compiler.max_in_list == 0 {
            return Err(Error::Config("compiler.max_in_list must be positive".into()));
        }
        if self.loader.max_batch_size == 0 {
            return Err(Error::Config("loader.max_batch_size must be positive".into()));
        }
        if self.cache.key_prefix.is_empty() || self.cache.key_prefix.contains(':') {
            return Err(Error::Config(
                "cache.key_prefix must be non-empty and must not contain ':'".into(),
            ));
        }
        if self.cache.cleanup_interval == Some(Duration::ZERO) {
            return Err(Error::Config("cache.cleanup_interval must be positive".into()));
        }
        Ok(())
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

mod option_duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
