use serde_json::Value;

/// Deduplication key of one entity request.
///
/// `key_value` is the canonical text form produced by
/// [`QueryBuilder::batch_key`](crate::query::QueryBuilder::batch_key), so
/// `42` and `"42"` for an integer key are the same request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub type_name: String,
    pub key_field: String,
    pub key_value: String,
}

impl EntityKey {
    pub fn new(
        type_name: impl Into<String>,
        key_field: impl Into<String>,
        key_value: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            key_field: key_field.into(),
            key_value: key_value.into(),
        }
    }

    /// The `(type, key_field)` group this key is fetched with.
    pub fn group(&self) -> GroupKey {
        GroupKey {
            type_name: self.type_name.clone(),
            key_field: self.key_field.clone(),
        }
    }
}

/// Requests sharing a group are fetched by one statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub type_name: String,
    pub key_field: String,
}

/// One entry of a [`load_many`](super::BatchLoader::load_many) call.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub type_name: String,
    pub key_field: String,
    pub key_value: Value,
}

impl LoadRequest {
    pub fn new(type_name: impl Into<String>, key_field: impl Into<String>, key_value: impl Into<Value>) -> Self {
        Self {
            type_name: type_name.into(),
            key_field: key_field.into(),
            key_value: key_value.into(),
        }
    }
}

impl<T: Into<String>, F: Into<String>, V: Into<Value>> From<(T, F, V)> for LoadRequest {
    fn from((type_name, key_field, key_value): (T, F, V)) -> Self {
        Self::new(type_name, key_field, key_value)
    }
}
