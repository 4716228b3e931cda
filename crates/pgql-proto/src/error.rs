//! Input conversion errors.

use thiserror::Error;

/// Errors raised while turning a parsed `where` input object into IR.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The input object does not have the `field: {operator: value}` shape.
    #[error("invalid filter input: {0}")]
    InvalidInput(String),

    /// An operator key was not recognised.
    #[error("unknown operator '{operator}' on field '{field}'")]
    UnknownOperator {
        /// Field the operator was applied to.
        field: String,
        /// The operator key as written.
        operator: String,
    },
}
