//! pgql query IR.
//!
//! This crate defines the already-parsed input consumed by the pgql SQL
//! compiler: field paths, typed filter trees and selection queries.
//!
//! # Modules
//!
//! - [`path`] - Field paths into JSONB documents or direct columns
//! - [`operator`] - Filter operators and vector metrics
//! - [`filter`] - Filter expression trees
//! - [`input`] - Conversion from GraphQL `where` input objects
//! - [`query`] - Selection queries (fields, ordering, grouping)
//! - [`error`] - Input conversion errors

pub mod error;
pub mod filter;
pub mod input;
pub mod operator;
pub mod path;
pub mod query;

pub use error::Error;
pub use filter::FilterNode;
pub use input::parse_where;
pub use operator::{Operator, VectorMetric};
pub use path::{to_snake_case, FieldPath};
pub use query::{
    AggregateFunction, Aggregation, FieldSelection, NullsOrder, OrderDirection, OrderSpec,
    SelectQuery,
};
