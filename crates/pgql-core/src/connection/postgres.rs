//! PostgreSQL connection backed by an sqlx pool.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row as _;

use super::{Connection, Row};
use crate::error::{Error, Result};
use crate::query::SqlParam;

/// [`Connection`] over a [`PgPool`].
///
/// Every statement is wrapped in `row_to_json` so rows arrive as JSON
/// objects with their column order intact. Parameters are bound as text;
/// compiled SQL carries the casts.
#[derive(Debug, Clone)]
pub struct PgConnection {
    pool: PgPool,
}

impl PgConnection {
    /// Connect a new pool.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Use an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Connection for PgConnection {
    async fn fetch(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>> {
        let wrapped = format!("SELECT row_to_json(q)::text FROM ({sql}) AS q");
        let mut query = sqlx::query(&wrapped);
        for param in params {
            query = query.bind(param.to_text());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let text: String = row
                    .try_get(0)
                    .map_err(|e| Error::Database(e.to_string()))?;
                let map: Map<String, Value> = serde_json::from_str(&text)
                    .map_err(|e| Error::Database(format!("malformed row: {e}")))?;
                Ok(Row::from(map))
            })
            .collect()
    }
}
