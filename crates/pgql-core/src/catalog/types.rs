//! SQL type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage flavour of a pgvector column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorKind {
    /// `vector`, single precision.
    Dense,
    /// `halfvec`, half precision.
    Half,
    /// `sparsevec`.
    Sparse,
    /// `bit`.
    Binary,
}

impl VectorKind {
    /// SQL type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            VectorKind::Dense => "vector",
            VectorKind::Half => "halfvec",
            VectorKind::Sparse => "sparsevec",
            VectorKind::Binary => "bit",
        }
    }
}

/// Operator family a SQL type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    /// Character data.
    Text,
    /// Integers and decimals.
    Numeric,
    /// Booleans.
    Boolean,
    /// UUIDs.
    Uuid,
    /// Dates and timestamps.
    Temporal,
    /// Arbitrary JSON values.
    Json,
    /// pgvector embeddings.
    Vector(VectorKind),
    /// ltree label paths.
    LTree,
}

impl fmt::Display for TypeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeFamily::Text => "text",
            TypeFamily::Numeric => "numeric",
            TypeFamily::Boolean => "boolean",
            TypeFamily::Uuid => "uuid",
            TypeFamily::Temporal => "datetime",
            TypeFamily::Json => "json",
            TypeFamily::Vector(kind) => kind.type_name(),
            TypeFamily::LTree => "ltree",
        };
        f.write_str(name)
    }
}

/// Declared SQL type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SqlType {
    /// `text`.
    Text,
    /// `integer`.
    Integer,
    /// `bigint`.
    BigInt,
    /// `numeric`.
    Numeric,
    /// `boolean`.
    Boolean,
    /// `uuid`.
    Uuid,
    /// `date`.
    Date,
    /// `timestamptz`.
    Timestamptz,
    /// `jsonb`.
    Jsonb,
    /// `vector(dims)`.
    Vector {
        /// Declared dimensionality, if fixed.
        dims: Option<usize>,
    },
    /// `halfvec(dims)`.
    HalfVec {
        /// Declared dimensionality, if fixed.
        dims: Option<usize>,
    },
    /// `sparsevec(dims)`.
    SparseVec {
        /// Declared dimensionality, if fixed.
        dims: Option<usize>,
    },
    /// `bit(dims)`.
    Bit {
        /// Declared length, if fixed.
        dims: Option<usize>,
    },
    /// `ltree`.
    LTree,
}

impl SqlType {
    /// The operator family of this type.
    pub fn family(&self) -> TypeFamily {
        match self {
            SqlType::Text => TypeFamily::Text,
            SqlType::Integer | SqlType::BigInt | SqlType::Numeric => TypeFamily::Numeric,
            SqlType::Boolean => TypeFamily::Boolean,
            SqlType::Uuid => TypeFamily::Uuid,
            SqlType::Date | SqlType::Timestamptz => TypeFamily::Temporal,
            SqlType::Jsonb => TypeFamily::Json,
            SqlType::Vector { .. } => TypeFamily::Vector(VectorKind::Dense),
            SqlType::HalfVec { .. } => TypeFamily::Vector(VectorKind::Half),
            SqlType::SparseVec { .. } => TypeFamily::Vector(VectorKind::Sparse),
            SqlType::Bit { .. } => TypeFamily::Vector(VectorKind::Binary),
            SqlType::LTree => TypeFamily::LTree,
        }
    }

    /// Type name used in `::cast` expressions.
    pub fn cast_name(&self) -> &'static str {
        match self {
            SqlType::Text => "text",
            SqlType::Integer => "integer",
            SqlType::BigInt => "bigint",
            SqlType::Numeric => "numeric",
            SqlType::Boolean => "boolean",
            SqlType::Uuid => "uuid",
            SqlType::Date => "date",
            SqlType::Timestamptz => "timestamptz",
            SqlType::Jsonb => "jsonb",
            SqlType::Vector { .. } => "vector",
            SqlType::HalfVec { .. } => "halfvec",
            SqlType::SparseVec { .. } => "sparsevec",
            SqlType::Bit { .. } => "bit",
            SqlType::LTree => "ltree",
        }
    }

    /// Declared vector dimensionality.
    pub fn dims(&self) -> Option<usize> {
        match self {
            SqlType::Vector { dims }
            | SqlType::HalfVec { dims }
            | SqlType::SparseVec { dims }
            | SqlType::Bit { dims } => *dims,
            _ => None,
        }
    }

    /// Whether values must be integral.
    pub fn is_integral(&self) -> bool {
        matches!(self, SqlType::Integer | SqlType::BigInt)
    }

    /// Dense vector of the given dimensionality.
    pub fn vector(dims: usize) -> Self {
        SqlType::Vector { dims: Some(dims) }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dims() {
            Some(dims) => write!(f, "{}({})", self.cast_name(), dims),
            None => f.write_str(self.cast_name()),
        }
    }
}
