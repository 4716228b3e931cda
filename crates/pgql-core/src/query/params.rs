//! Bound statement parameters.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A value bound to a `$n` placeholder.
///
/// Compiled SQL carries an explicit cast on every non-text placeholder, so
/// adapters may bind each parameter as its text form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SqlParam {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit integer.
    Int(i64),
    /// Double precision float.
    Float(f64),
    /// Text, also used for literals of cast types (timestamps, vectors).
    Text(String),
    /// A JSON document.
    Json(Value),
}

impl SqlParam {
    /// Text form for binding, `None` for SQL NULL.
    pub fn to_text(&self) -> Option<String> {
        match self {
            SqlParam::Null => None,
            SqlParam::Bool(b) => Some(b.to_string()),
            SqlParam::Int(i) => Some(i.to_string()),
            SqlParam::Float(f) => Some(f.to_string()),
            SqlParam::Text(s) => Some(s.clone()),
            SqlParam::Json(v) => Some(v.to_string()),
        }
    }

    /// JSON form, used for fingerprinting and logging.
    pub fn to_json(&self) -> Value {
        match self {
            SqlParam::Null => Value::Null,
            SqlParam::Bool(b) => Value::Bool(*b),
            SqlParam::Int(i) => Value::from(*i),
            SqlParam::Float(f) => Value::from(*f),
            SqlParam::Text(s) => Value::String(s.clone()),
            SqlParam::Json(v) => v.clone(),
        }
    }
}

impl From<&str> for SqlParam {
    fn from(s: &str) -> Self {
        SqlParam::Text(s.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(s: String) -> Self {
        SqlParam::Text(s)
    }
}

impl From<i64> for SqlParam {
    fn from(i: i64) -> Self {
        SqlParam::Int(i)
    }
}

impl From<bool> for SqlParam {
    fn from(b: bool) -> Self {
        SqlParam::Bool(b)
    }
}

/// Parameters collected while compiling one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamList {
    params: Vec<SqlParam>,
}

impl ParamList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter and return its placeholder (`$n`).
    pub fn push(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// True when nothing has been bound.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// The collected parameters.
    pub fn into_vec(self) -> Vec<SqlParam> {
        self.params
    }
}
