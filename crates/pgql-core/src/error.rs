//! Core error types.

use thiserror::Error;

/// Result type for pgql-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the compiler, cache, loader and executor.
///
/// `Clone` so that a single grouped fetch failure can be handed to every
/// caller waiting on that group.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A field, order or group path does not exist on the table.
    #[error("unknown field '{path}' on '{table}'")]
    SchemaMismatch {
        /// Table or type the path was resolved against.
        table: String,
        /// The offending path.
        path: String,
    },

    /// The operator is not valid for the field's type family.
    #[error("operator '{operator}' is not supported for field '{path}' of type {family}")]
    UnsupportedOperator {
        /// The field the operator was applied to.
        path: String,
        /// The operator name.
        operator: String,
        /// The field's type family.
        family: String,
    },

    /// A literal could not be converted to the field's SQL type.
    #[error("invalid value for field '{path}': {message}")]
    TypeCast {
        /// The field the literal was supplied for.
        path: String,
        /// What was wrong with the literal.
        message: String,
    },

    /// The filter tree itself is malformed.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Explicit and authorization filters disagree on a field.
    #[error("filter on '{field}' conflicts with authorization filter ({explicit} vs {auth})")]
    Conflict {
        /// The field both filters constrain.
        field: String,
        /// The explicit predicate.
        explicit: String,
        /// The authorization predicate.
        auth: String,
    },

    /// The database rejected or failed a statement.
    #[error("database error: {0}")]
    Database(String),

    /// A cache backend failed.
    #[error("cache error: {0}")]
    Cache(String),

    /// The request was cancelled before it completed.
    #[error("request cancelled")]
    Cancelled,

    /// Invalid configuration or schema definition.
    #[error("configuration error: {0}")]
    Config(String),

    /// Input conversion error.
    #[error("protocol error: {0}")]
    Protocol(#[from] pgql_proto::Error),
}

impl Error {
    /// Whether this error is raised synchronously by the compiler.
    ///
    /// Compile errors are deterministic in their input and never retried.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Error::SchemaMismatch { .. }
                | Error::UnsupportedOperator { .. }
                | Error::TypeCast { .. }
                | Error::InvalidFilter(_)
                | Error::Conflict { .. }
                | Error::Protocol(_)
        )
    }

    /// Message suitable for returning to an API client.
    ///
    /// Compile errors name the offending field and operator; runtime
    /// failures are reported generically.
    pub fn user_message(&self) -> String {
        match self {
            Error::Conflict { field, .. } => {
                format!("filter on '{field}' is not permitted")
            }
            Error::Database(_) | Error::Cache(_) | Error::Config(_) => {
                "internal error while executing query".to_string()
            }
            Error::Cancelled => "request cancelled".to_string(),
            other => other.to_string(),
        }
    }

    pub(crate) fn type_cast(path: impl ToString, message: impl Into<String>) -> Self {
        Error::TypeCast {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_classification() {
        let err = Error::SchemaMismatch {
            table: "users".into(),
            path: "nope".into(),
        };
        assert!(err.is_compile_error());
        assert!(err.user_message().contains("nope"));

        let err = Error::Database("connection reset by peer".into());
        assert!(!err.is_compile_error());
        assert!(!err.user_message().contains("connection reset"));
    }

    #[test]
    fn test_conflict_message_hides_auth_value() {
        let err = Error::Conflict {
            field: "tenant_id".into(),
            explicit: "eq \"t-2\"".into(),
            auth: "eq \"t-1\"".into(),
        };
        assert!(err.is_compile_error());
        assert!(!err.user_message().contains("t-1"));
    }
}
