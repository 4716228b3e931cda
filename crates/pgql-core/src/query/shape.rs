//! Mapping fetched rows back to the requested output shape.

use serde_json::{Map, Value};

use crate::connection::Row;
use crate::error::{Error, Result};

/// Where an output value is read from in a fetched row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeSource {
    /// A column of the row, used as is.
    Column(String),
    /// A key path inside a document column of the row.
    Document {
        /// Row column holding the document.
        column: String,
        /// Keys to follow inside it.
        keys: Vec<String>,
    },
}

/// One output entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputField {
    /// Key path in the output object (one segment for aliases).
    pub key: Vec<String>,
    /// Where the value comes from.
    pub source: ShapeSource,
}

/// How rows of a compiled query map onto output objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultShape {
    /// Row column whose document forms the base of every output object.
    pub base_document: Option<String>,
    /// Individually selected outputs, applied on top of the base.
    pub fields: Vec<OutputField>,
    /// Literal `__typename` to inject.
    pub typename: Option<String>,
}

impl ResultShape {
    /// Build the output object for one row.
    ///
    /// Missing columns and keys produce `null`; the result never depends on
    /// the column order of the row.
    pub fn apply(&self, row: &Row) -> Result<Value> {
        let mut out = match &self.base_document {
            Some(column) => match row.get(column) {
                Some(Value::Object(doc)) => doc.clone(),
                Some(Value::Null) | None => Map::new(),
                Some(other) => {
                    return Err(Error::Database(format!(
                        "column '{column}' holds {other} instead of a document"
                    )))
                }
            },
            None => Map::new(),
        };

        for field in &self.fields {
            let value = match &field.source {
                ShapeSource::Column(column) => row.get(column).cloned().unwrap_or(Value::Null),
                ShapeSource::Document { column, keys } => row
                    .get(column)
                    .and_then(|doc| lookup(doc, keys))
                    .cloned()
                    .unwrap_or(Value::Null),
            };
            insert_nested(&mut out, &field.key, value);
        }

        if let Some(typename) = &self.typename {
            out.insert("__typename".to_string(), Value::String(typename.clone()));
        }
        Ok(Value::Object(out))
    }
}

fn lookup<'v>(doc: &'v Value, keys: &[String]) -> Option<&'v Value> {
    keys.iter().try_fold(doc, |current, key| current.get(key))
}

fn insert_nested(out: &mut Map<String, Value>, key: &[String], value: Value) {
    let Some((last, parents)) = key.split_last() else {
        return;
    };
    let mut target = out;
    for parent in parents {
        let entry = target
            .entry(parent.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        target = next;
    }
    target.insert(last.clone(), value);
}
