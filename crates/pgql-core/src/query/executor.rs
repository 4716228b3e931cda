//! End-to-end query execution.

use std::sync::Arc;
use std::time::Duration;

use pgql_proto::{FilterNode, SelectQuery};
use serde_json::Value;

use super::builder::QueryBuilder;
use crate::cache::{QueryFingerprint, ResultCache};
use crate::connection::Connection;
use crate::error::Result;

/// Runs selections: merge the authorization filter, compile, consult the
/// result cache, fetch and shape the rows.
///
/// Compile errors are returned before the cache or the database is
/// touched. A failed fetch never writes a cache entry.
#[derive(Clone)]
pub struct QueryExecutor {
    builder: Arc<QueryBuilder>,
    connection: Arc<dyn Connection>,
    cache: Option<Arc<ResultCache>>,
    ttl: Option<Duration>,
}

impl QueryExecutor {
    /// Create an executor without a result cache.
    pub fn new(builder: Arc<QueryBuilder>, connection: Arc<dyn Connection>) -> Self {
        Self {
            builder,
            connection,
            cache: None,
            ttl: None,
        }
    }

    /// Memoize results in `cache`.
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Override the cache's default TTL for this executor's entries.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// The statement builder.
    pub fn builder(&self) -> &Arc<QueryBuilder> {
        &self.builder
    }

    /// Execute a selection for `tenant` under an optional authorization
    /// filter, returning one JSON object per row.
    pub async fn execute(
        &self,
        query: &SelectQuery,
        auth: Option<&FilterNode>,
        tenant: Option<&str>,
    ) -> Result<Vec<Value>> {
        let mut merged = query.clone();
        merged.filter = self.builder.merge_filter(query.filter.as_ref(), auth)?;
        let compiled = self.builder.build(&merged)?;

        let Some(cache) = &self.cache else {
            return self.fetch(&compiled).await;
        };

        let fingerprint = QueryFingerprint::new(&merged, compiled.params());
        let key = cache.key_for(tenant, compiled.table(), &fingerprint);
        if let Some(Value::Array(rows)) = cache.get(&key).await {
            return Ok(rows);
        }

        let rows = self.fetch(&compiled).await?;
        cache.set(&key, Value::Array(rows.clone()), self.ttl).await;
        Ok(rows)
    }

    /// Execute without consulting or filling the cache.
    pub async fn execute_uncached(
        &self,
        query: &SelectQuery,
        auth: Option<&FilterNode>,
    ) -> Result<Vec<Value>> {
        let compiled = self.builder.build_with_auth(query, auth)?;
        self.fetch(&compiled).await
    }

    async fn fetch(&self, compiled: &super::CompiledQuery) -> Result<Vec<Value>> {
        tracing::debug!(
            table = %compiled.table(),
            projection = ?compiled.projection(),
            params = compiled.params().len(),
            "executing query"
        );
        let rows = self
            .connection
            .fetch(compiled.sql(), compiled.params())
            .await?;
        rows.iter().map(|row| compiled.shape_row(row)).collect()
    }
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("builder", &self.builder)
            .field("cache", &self.cache)
            .field("ttl", &self.ttl)
            .finish()
    }
}
