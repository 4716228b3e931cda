//! pgql core - typed GraphQL filter compilation for PostgreSQL.
//!
//! This crate turns parsed GraphQL selections and filter trees into
//! parameterized PostgreSQL statements over JSONB documents, memoizes
//! their results, and batches per-entity lookups.
//!
//! # Components
//!
//! - [`catalog`] - Immutable schema context and entity metadata
//! - [`query`] - Filter compiler, statement builder and executor
//! - [`security`] - Merging authorization filters into queries
//! - [`cache`] - Best-effort result cache with TTL expiry
//! - [`loader`] - Batch entity loader with request deduplication
//! - [`connection`] - The database seam

pub mod cache;
pub mod catalog;
pub mod config;
pub mod connection;
pub mod error;
pub mod loader;
pub mod query;
pub mod security;

pub use cache::{CacheStore, MemoryStore, QueryFingerprint, ResultCache, SledStore};
pub use catalog::{
    EntityMetadata, FieldDef, RelationDef, SchemaContext, SqlType, TableDef, TypeFamily,
};
pub use config::{CacheConfig, CompilerConfig, ConflictStrategy, EngineConfig, LoaderConfig};
pub use connection::{Connection, Row};
pub use error::{Error, Result};
pub use loader::{BatchLoader, LoadRequest, LoaderStatsSnapshot};
pub use query::{compile_filter, CompiledQuery, QueryBuilder, QueryExecutor, SqlParam};
pub use security::merge_auth_filter;

/// Re-export of the query IR.
pub use pgql_proto as proto;
