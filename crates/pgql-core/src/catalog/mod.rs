//! Schema catalog.
//!
//! Tables, their fields and embedded relationships, and per-type entity
//! metadata. The catalog is built once and shared immutably.

mod entity;
mod field;
mod schema;
mod table;
mod types;

pub use entity::{EntityMetadata, EntityMetadataBuilder};
pub use field::{FieldDef, FieldSource};
pub use schema::{is_valid_identifier, ResolvedField, SchemaContext, SchemaContextBuilder};
pub use table::{RelationDef, TableDef};
pub use types::{SqlType, TypeFamily, VectorKind};
