//! Database connection abstraction.
//!
//! The compiler's output is executed through [`Connection`]. Pool
//! lifecycle belongs to the caller; an implementation only runs one
//! statement and returns its rows.

#[cfg(feature = "postgres")]
mod postgres;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::query::SqlParam;

#[cfg(feature = "postgres")]
pub use postgres::PgConnection;

/// One fetched row: ordered, named JSON columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(name, value)` pairs.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            columns: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Append a column.
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.columns.push((name.into(), value));
    }

    /// Value of the first column with this name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Columns in statement order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            columns: map.into_iter().collect(),
        }
    }
}

/// Executes compiled statements.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Run a statement and return all rows.
    async fn fetch(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>>;
}
