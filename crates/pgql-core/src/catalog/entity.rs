//! Federated entity metadata.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};

/// Resolution metadata for one entity type.
///
/// Built once per type by [`EntityMetadataBuilder`] and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMetadata {
    /// GraphQL type name (`User`).
    pub type_name: String,
    /// Catalog name of the backing table.
    pub table: String,
    /// Fields that identify an instance.
    pub key_fields: Vec<String>,
    /// Fields owned by another service.
    pub external: BTreeSet<String>,
    /// Field name to the selection it requires from its owner.
    pub requires: BTreeMap<String, String>,
    /// Field name to the selection it provides on the related entity.
    pub provides: BTreeMap<String, String>,
}

impl EntityMetadata {
    /// Start building metadata for a type.
    pub fn builder(type_name: impl Into<String>, table: impl Into<String>) -> EntityMetadataBuilder {
        EntityMetadataBuilder {
            type_name: type_name.into(),
            table: table.into(),
            key_fields: Vec::new(),
            external: BTreeSet::new(),
            requires: BTreeMap::new(),
            provides: BTreeMap::new(),
        }
    }

    /// Whether `field` is one of the key fields.
    pub fn is_key(&self, field: &str) -> bool {
        self.key_fields.iter().any(|k| k == field)
    }

    /// Whether `field` is resolved by another service.
    pub fn is_external(&self, field: &str) -> bool {
        self.external.contains(field)
    }
}

/// Builder for [`EntityMetadata`].
#[derive(Debug, Clone)]
pub struct EntityMetadataBuilder {
    type_name: String,
    table: String,
    key_fields: Vec<String>,
    external: BTreeSet<String>,
    requires: BTreeMap<String, String>,
    provides: BTreeMap<String, String>,
}

impl EntityMetadataBuilder {
    /// Add a key field.
    pub fn key(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.key_fields.contains(&field) {
            self.key_fields.push(field);
        }
        self
    }

    /// Mark a field as external.
    pub fn external(mut self, field: impl Into<String>) -> Self {
        self.external.insert(field.into());
        self
    }

    /// Declare the selection a field requires.
    pub fn requires(mut self, field: impl Into<String>, selection: impl Into<String>) -> Self {
        self.requires.insert(field.into(), selection.into());
        self
    }

    /// Declare the selection a field provides.
    pub fn provides(mut self, field: impl Into<String>, selection: impl Into<String>) -> Self {
        self.provides.insert(field.into(), selection.into());
        self
    }

    /// Finish the record.
    pub fn build(self) -> Result<EntityMetadata> {
        if self.type_name.is_empty() {
            return Err(Error::Config("entity type name must not be empty".into()));
        }
        if self.key_fields.is_empty() {
            return Err(Error::Config(format!(
                "entity '{}' declares no key fields",
                self.type_name
            )));
        }
        if let Some(field) = self.key_fields.iter().find(|k| self.external.contains(*k)) {
            return Err(Error::Config(format!(
                "key field '{}' of '{}' cannot be external",
                field, self.type_name
            )));
        }
        Ok(EntityMetadata {
            type_name: self.type_name,
            table: self.table,
            key_fields: self.key_fields,
            external: self.external,
            requires: self.requires,
            provides: self.provides,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let meta = EntityMetadata::builder("User", "users")
            .key("id")
            .key("id")
            .external("email")
            .requires("reviews", "email")
            .build()
            .unwrap();

        assert_eq!(meta.key_fields, vec!["id".to_string()]);
        assert!(meta.is_key("id"));
        assert!(meta.is_external("email"));
        assert_eq!(meta.requires.get("reviews").map(String::as_str), Some("email"));
    }

    #[test]
    fn test_requires_key() {
        let err = EntityMetadata::builder("User", "users").build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = EntityMetadata::builder("User", "users")
            .key("id")
            .external("id")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
