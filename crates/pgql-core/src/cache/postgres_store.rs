//! PostgreSQL-backed store: one table `(key, value, expires_at)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgPool;
use sqlx::types::Json;

use super::entry::CacheEntry;
use super::store::CacheStore;
use crate::catalog::is_valid_identifier;
use crate::error::{Error, Result};

/// Cache store in a PostgreSQL table, shared by every process using it.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    table: String,
}

impl PostgresStore {
    /// Use `table` in the pool's database. The name must be a plain
    /// identifier.
    pub fn new(pool: PgPool, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if !is_valid_identifier(&table) {
            return Err(Error::Config(format!("invalid cache table name '{table}'")));
        }
        Ok(Self { pool, table })
    }

    /// Create the table and its expiry index if missing.
    pub async fn ensure_schema(&self) -> Result<()> {
        let create = format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             key TEXT PRIMARY KEY, \
             value JSONB NOT NULL, \
             expires_at TIMESTAMPTZ NOT NULL)",
            self.table
        );
        let index = format!(
            "CREATE INDEX IF NOT EXISTS {0}_expires_at_idx ON {0} (expires_at)",
            self.table
        );
        sqlx::query(&create).execute(&self.pool).await.map_err(db)?;
        sqlx::query(&index).execute(&self.pool).await.map_err(db)?;
        Ok(())
    }
}

fn db(e: sqlx::Error) -> Error {
    Error::Cache(e.to_string())
}

/// Translate a `*` pattern into a `LIKE` pattern.
fn like_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '*' => out.push('%'),
            '%' | '_' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

#[async_trait]
impl CacheStore for PostgresStore {
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<CacheEntry>> {
        let sql = format!(
            "SELECT value, expires_at FROM {} WHERE key = $1 AND expires_at > $2",
            self.table
        );
        let row: Option<(Json<Value>, DateTime<Utc>)> = sqlx::query_as(&sql)
            .bind(key)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        Ok(row.map(|(Json(value), expires_at)| CacheEntry::new(key, value, expires_at)))
    }

    async fn set(&self, entry: CacheEntry) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (key, value, expires_at) VALUES ($1, $2, $3) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at",
            self.table
        );
        sqlx::query(&sql)
            .bind(&entry.key)
            .bind(Json(&entry.value))
            .bind(entry.expires_at)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE key = $1", self.table);
        let result = sqlx::query(&sql)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_matching(&self, pattern: &str) -> Result<u64> {
        if !pattern.contains('*') {
            return Ok(self.delete(pattern).await? as u64);
        }
        let sql = format!("DELETE FROM {} WHERE key LIKE $1", self.table);
        let result = sqlx::query(&sql)
            .bind(like_pattern(pattern))
            .execute(&self.pool)
            .await
            .map_err(db)?;
        Ok(result.rows_affected())
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let sql = format!("DELETE FROM {} WHERE expires_at <= $1", self.table);
        let result = sqlx::query(&sql)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        Ok(result.rows_affected())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
