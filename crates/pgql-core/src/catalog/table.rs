//! Table and view definitions.

use pgql_proto::to_snake_case;

use super::field::FieldDef;

/// A relationship embedded in the parent's JSONB document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    /// Relation name used as the first path segment.
    pub name: String,
    /// Key of the embedded object in the parent document.
    pub json_key: String,
    /// Catalog name of the target table.
    pub target_table: String,
}

impl RelationDef {
    /// Create a relation whose JSON key equals its name.
    pub fn new(name: impl Into<String>, target_table: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            json_key: name.clone(),
            name,
            target_table: target_table.into(),
        }
    }

    /// Use a different JSON key for the embedded object.
    pub fn with_json_key(mut self, key: impl Into<String>) -> Self {
        self.json_key = key.into();
        self
    }
}

/// A table or view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    /// Catalog name, referenced by queries.
    pub name: String,
    /// SQL relation, optionally schema-qualified (`public.v_user`).
    pub relation: String,
    /// JSONB document column, if the table has one.
    pub data_column: Option<String>,
    /// Field definitions.
    pub fields: Vec<FieldDef>,
    /// Embedded relationships.
    pub relations: Vec<RelationDef>,
}

impl TableDef {
    /// Create a table whose relation name equals its catalog name, with a
    /// `data` JSONB column.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            relation: name.clone(),
            name,
            data_column: Some("data".to_string()),
            fields: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Set the SQL relation.
    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = relation.into();
        self
    }

    /// Set the JSONB document column.
    pub fn with_data_column(mut self, column: impl Into<String>) -> Self {
        self.data_column = Some(column.into());
        self
    }

    /// The table has no JSONB document column.
    pub fn without_data_column(mut self) -> Self {
        self.data_column = None;
        self
    }

    /// Add a field.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Add an embedded relationship.
    pub fn with_relationship(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Look up a field by name; camelCase names are matched against their
    /// snake_case form.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| {
                let snake = to_snake_case(name);
                self.fields.iter().find(|f| f.name == snake)
            })
    }

    /// Look up an embedded relationship by name.
    pub fn relationship(&self, name: &str) -> Option<&RelationDef> {
        self.relations
            .iter()
            .find(|r| r.name == name)
            .or_else(|| {
                let snake = to_snake_case(name);
                self.relations.iter().find(|r| r.name == snake)
            })
    }
}
