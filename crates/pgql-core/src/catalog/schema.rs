//! Immutable schema context.

use std::collections::HashMap;
use std::sync::Arc;

use pgql_proto::FieldPath;

use super::entity::EntityMetadata;
use super::field::FieldSource;
use super::table::TableDef;
use super::types::SqlType;
use crate::error::{Error, Result};

/// Whether `name` is a plain SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`).
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A field path resolved to its storage location.
///
/// `keys` is empty for a direct column and holds the JSON key path
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    /// Base column.
    pub column: String,
    /// JSON keys below the base column.
    pub keys: Vec<String>,
    /// Declared type of the value.
    pub sql_type: SqlType,
}

impl ResolvedField {
    /// Whether the value is a direct column.
    pub fn is_column(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Tables and entity metadata, fixed for the lifetime of a compiler.
#[derive(Debug, Clone, Default)]
pub struct SchemaContext {
    tables: HashMap<String, TableDef>,
    entities: HashMap<String, EntityMetadata>,
}

impl SchemaContext {
    /// Start building a schema context.
    pub fn builder() -> SchemaContextBuilder {
        SchemaContextBuilder::default()
    }

    /// Look up a table by catalog name.
    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(name)
    }

    /// Look up a table, failing with a schema mismatch.
    pub fn require_table(&self, name: &str) -> Result<&TableDef> {
        self.table(name).ok_or_else(|| Error::SchemaMismatch {
            table: name.to_string(),
            path: String::new(),
        })
    }

    /// Look up entity metadata by type name.
    pub fn entity(&self, type_name: &str) -> Option<&EntityMetadata> {
        self.entities.get(type_name)
    }

    /// Number of tables.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Resolve a field path against a table.
    ///
    /// A path either names a field directly, walks through embedded
    /// relationships, or descends into a `jsonb` field. Values reached
    /// inside an untyped `jsonb` field are treated as text.
    pub fn resolve(&self, table: &TableDef, path: &FieldPath) -> Result<ResolvedField> {
        let mismatch = || Error::SchemaMismatch {
            table: table.name.clone(),
            path: path.dotted(),
        };
        if path.is_empty() {
            return Err(mismatch());
        }
        self.resolve_in(table, path.segments(), Vec::new(), None)
            .ok_or_else(mismatch)
    }

    fn resolve_in(
        &self,
        table: &TableDef,
        segments: &[String],
        mut keys: Vec<String>,
        document: Option<&str>,
    ) -> Option<ResolvedField> {
        let (head, rest) = segments.split_first()?;

        if let Some(field) = table.field(head) {
            let resolved = match &field.source {
                FieldSource::Jsonb(field_path) => {
                    let column = match document {
                        Some(column) => column.to_string(),
                        None => table.data_column.clone()?,
                    };
                    keys.extend(field_path.segments().iter().cloned());
                    ResolvedField {
                        column,
                        keys,
                        sql_type: field.sql_type,
                    }
                }
                // Columns of an embedded target are not reachable through
                // the parent document.
                FieldSource::Column(column) if document.is_none() => ResolvedField {
                    column: column.clone(),
                    keys,
                    sql_type: field.sql_type,
                },
                FieldSource::Column(_) => return None,
            };

            if rest.is_empty() {
                return Some(resolved);
            }
            if resolved.sql_type != SqlType::Jsonb {
                return None;
            }
            let mut nested = resolved;
            nested.keys.extend(rest.iter().cloned());
            nested.sql_type = SqlType::Text;
            return Some(nested);
        }

        if rest.is_empty() {
            return None;
        }
        let relation = table.relationship(head)?;
        let target = self.tables.get(&relation.target_table)?;
        let column = match document {
            Some(column) => column.to_string(),
            None => table.data_column.clone()?,
        };
        keys.push(relation.json_key.clone());
        self.resolve_in(target, rest, keys, Some(&column))
    }
}

/// Builder for [`SchemaContext`]. Identifiers are validated in [`build`].
///
/// [`build`]: SchemaContextBuilder::build
#[derive(Debug, Default)]
pub struct SchemaContextBuilder {
    tables: Vec<TableDef>,
    entities: Vec<EntityMetadata>,
}

impl SchemaContextBuilder {
    /// Register a table.
    pub fn table(mut self, table: TableDef) -> Self {
        self.tables.push(table);
        self
    }

    /// Register entity metadata.
    pub fn entity(mut self, entity: EntityMetadata) -> Self {
        self.entities.push(entity);
        self
    }

    /// Validate and freeze the context.
    pub fn build(self) -> Result<Arc<SchemaContext>> {
        let mut tables = HashMap::with_capacity(self.tables.len());
        for table in self.tables {
            validate_table(&table)?;
            if tables.contains_key(&table.name) {
                return Err(Error::Config(format!("duplicate table '{}'", table.name)));
            }
            tables.insert(table.name.clone(), table);
        }

        for table in tables.values() {
            for relation in &table.relations {
                if !tables.contains_key(&relation.target_table) {
                    return Err(Error::Config(format!(
                        "relationship '{}' on '{}' targets unknown table '{}'",
                        relation.name, table.name, relation.target_table
                    )));
                }
            }
        }

        let mut context = SchemaContext {
            tables,
            entities: HashMap::new(),
        };

        for entity in self.entities {
            let table = context.table(&entity.table).ok_or_else(|| {
                Error::Config(format!(
                    "entity '{}' references unknown table '{}'",
                    entity.type_name, entity.table
                ))
            })?;
            for key in &entity.key_fields {
                context
                    .resolve(table, &FieldPath::parse(key))
                    .map_err(|e| Error::Config(format!("entity '{}': {}", entity.type_name, e)))?;
            }
            if context.entities.contains_key(&entity.type_name) {
                return Err(Error::Config(format!(
                    "duplicate entity '{}'",
                    entity.type_name
                )));
            }
            context.entities.insert(entity.type_name.clone(), entity);
        }

        tracing::debug!(
            tables = context.tables.len(),
            entities = context.entities.len(),
            "schema context built"
        );
        Ok(Arc::new(context))
    }
}

fn validate_table(table: &TableDef) -> Result<()> {
    let invalid = |what: &str, name: &str| {
        Error::Config(format!(
            "invalid {} identifier '{}' in table '{}'",
            what, name, table.name
        ))
    };

    if table.name.is_empty() {
        return Err(Error::Config("table name must not be empty".into()));
    }
    let parts: Vec<&str> = table.relation.split('.').collect();
    if parts.len() > 2 || parts.iter().any(|p| !is_valid_identifier(p)) {
        return Err(invalid("relation", &table.relation));
    }
    if let Some(column) = &table.data_column {
        if !is_valid_identifier(column) {
            return Err(invalid("column", column));
        }
    }

    for field in &table.fields {
        if field.name.is_empty() {
            return Err(Error::Config(format!("empty field name in '{}'", table.name)));
        }
        match &field.source {
            FieldSource::Column(column) if !is_valid_identifier(column) => {
                return Err(invalid("column", column));
            }
            FieldSource::Jsonb(path) if path.is_empty() => {
                return Err(Error::Config(format!(
                    "field '{}' in '{}' has an empty JSON path",
                    field.name, table.name
                )));
            }
            FieldSource::Jsonb(_) if table.data_column.is_none() => {
                return Err(Error::Config(format!(
                    "field '{}' is stored in the document but '{}' has no document column",
                    field.name, table.name
                )));
            }
            _ => {}
        }
    }
    Ok(())
}
