//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pgql_core::catalog::{EntityMetadata, FieldDef, SchemaContext, SqlType, TableDef};
use pgql_core::{Connection, Error, Result, Row, SqlParam};
use serde_json::{json, Value};
use tokio::sync::Semaphore;

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `users` and `posts` tables with a JSONB `data` column.
pub fn schema() -> Arc<SchemaContext> {
    SchemaContext::builder()
        .table(
            TableDef::new("users")
                .with_field(FieldDef::jsonb("id", SqlType::Text))
                .with_field(FieldDef::jsonb("name", SqlType::Text))
                .with_field(FieldDef::jsonb("status", SqlType::Text))
                .with_field(FieldDef::jsonb("age", SqlType::Integer))
                .with_field(FieldDef::jsonb("tenant_id", SqlType::Text))
                .with_field(FieldDef::jsonb("created_at", SqlType::Timestamptz)),
        )
        .table(
            TableDef::new("posts")
                .with_field(FieldDef::jsonb("id", SqlType::Text))
                .with_field(FieldDef::jsonb("title", SqlType::Text))
                .with_field(FieldDef::jsonb("author_id", SqlType::Text)),
        )
        .entity(EntityMetadata::builder("User", "users").key("id").build().unwrap())
        .entity(EntityMetadata::builder("Post", "posts").key("id").build().unwrap())
        .build()
        .unwrap()
}

/// In-memory `Connection` that records every statement.
///
/// Batch lookups (statements selecting `__key`) return the stored documents
/// whose `id` is among the bound parameters; any other statement returns
/// every stored document of its table as a `data` column.
#[derive(Default)]
pub struct RecordingConnection {
    documents: Mutex<HashMap<String, Vec<Value>>>,
    statements: Mutex<Vec<(String, Vec<SqlParam>)>>,
    failing: Mutex<HashSet<String>>,
    gate: Option<Semaphore>,
}

impl RecordingConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every fetch until [`release`](Self::release) grants a permit.
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn release(&self, fetches: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(fetches);
        }
    }

    pub fn insert(&self, table: &str, document: Value) {
        self.documents
            .lock()
            .entry(table.to_string())
            .or_default()
            .push(document);
    }

    pub fn with_users(self, ids: &[&str]) -> Self {
        for id in ids {
            self.insert("users", json!({"id": id, "name": format!("name of {id}")}));
        }
        self
    }

    pub fn with_posts(self, ids: &[&str]) -> Self {
        for id in ids {
            self.insert("posts", json!({"id": id, "title": format!("title of {id}")}));
        }
        self
    }

    pub fn fail_table(&self, table: &str) {
        self.failing.lock().insert(table.to_string());
    }

    pub fn heal_table(&self, table: &str) {
        self.failing.lock().remove(table);
    }

    pub fn statements(&self) -> Vec<(String, Vec<SqlParam>)> {
        self.statements.lock().clone()
    }

    pub fn statement_count(&self) -> usize {
        self.statements.lock().len()
    }

    fn table_of(&self, sql: &str) -> Option<String> {
        let documents = self.documents.lock();
        let failing = self.failing.lock();
        documents
            .keys()
            .chain(failing.iter())
            .find(|table| {
                let from = format!(" FROM {table}");
                sql.contains(&format!("{from} ")) || sql.ends_with(&from)
            })
            .cloned()
    }
}

#[async_trait]
impl Connection for RecordingConnection {
    async fn fetch(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>> {
        self.statements.lock().push((sql.to_string(), params.to_vec()));
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| Error::Database(e.to_string()))?
                .forget();
        }

        let Some(table) = self.table_of(sql) else {
            return Ok(Vec::new());
        };
        if self.failing.lock().contains(&table) {
            return Err(Error::Database(format!("relation {table} is unavailable")));
        }

        let documents = self.documents.lock().get(&table).cloned().unwrap_or_default();
        if !sql.contains("\"__key\"") {
            return Ok(documents
                .into_iter()
                .map(|doc| Row::from_pairs([("data", doc)]))
                .collect());
        }

        let wanted: HashSet<String> = params.iter().filter_map(SqlParam::to_text).collect();
        Ok(documents
            .into_iter()
            .filter_map(|doc| {
                let id = doc.get("id")?.as_str()?.to_string();
                wanted
                    .contains(&id)
                    .then(|| Row::from_pairs([("data", doc.clone()), ("__key", json!(id))]))
            })
            .collect())
    }
}
