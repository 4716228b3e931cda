//! Field definitions.

use pgql_proto::FieldPath;

use super::types::SqlType;

/// Where a field's value lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    /// Key path inside the table's JSONB document column.
    Jsonb(FieldPath),
    /// A direct column.
    Column(String),
}

/// A field exposed by a table or view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name as it appears in filters and selections (snake_case).
    pub name: String,
    /// Declared SQL type.
    pub sql_type: SqlType,
    /// Storage location.
    pub source: FieldSource,
}

impl FieldDef {
    /// A field stored in the JSONB document under its own name.
    pub fn jsonb(name: impl Into<String>, sql_type: SqlType) -> Self {
        let name = name.into();
        Self {
            source: FieldSource::Jsonb(FieldPath::new([name.clone()])),
            name,
            sql_type,
        }
    }

    /// A field stored in a direct column of the same name.
    pub fn column(name: impl Into<String>, sql_type: SqlType) -> Self {
        let name = name.into();
        Self {
            source: FieldSource::Column(name.clone()),
            name,
            sql_type,
        }
    }

    /// Store the field under a different JSONB key path.
    pub fn with_jsonb_path(mut self, path: impl Into<FieldPath>) -> Self {
        self.source = FieldSource::Jsonb(path.into());
        self
    }

    /// Store the field in a differently named column.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.source = FieldSource::Column(column.into());
        self
    }

    /// Whether the field is read from the JSONB document.
    pub fn is_jsonb(&self) -> bool {
        matches!(self.source, FieldSource::Jsonb(_))
    }
}
