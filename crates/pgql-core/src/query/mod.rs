//! Typed filter and query compiler.
//!
//! Turns [`FilterNode`](pgql_proto::FilterNode) trees and
//! [`SelectQuery`](pgql_proto::SelectQuery) selections into one
//! parameterized PostgreSQL statement, checking every field and operator
//! against the [`SchemaContext`](crate::catalog::SchemaContext) first.
//!
//! # Components
//!
//! - [`FilterCompiler`] - Lowers filter trees into predicates
//! - [`QueryBuilder`] - Chooses a projection and assembles the statement
//! - [`CompiledQuery`] - SQL, parameters and the result shape
//! - [`QueryExecutor`] - Merge, build, cache and fetch in one call

mod builder;
mod executor;
mod ltree;
mod operators;
mod params;
mod shape;
pub(crate) mod sql;
mod vector;
mod where_clause;

pub use builder::{CompiledQuery, Projection, QueryBuilder, BATCH_KEY_COLUMN};
pub use executor::QueryExecutor;
pub use operators::is_supported;
pub use params::{ParamList, SqlParam};
pub use shape::{OutputField, ResultShape, ShapeSource};
pub use vector::{format_vector, DistanceOperand};
pub use where_clause::{compile_filter, FilterCompiler};
