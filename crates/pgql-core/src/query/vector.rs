//! pgvector literal formatting.

use pgql_proto::FieldPath;
use serde_json::Value;

use crate::catalog::VectorKind;
use crate::error::{Error, Result};

/// Operand of a vector distance leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceOperand {
    /// Vector literal in pgvector text form.
    pub literal: String,
    /// Distances strictly below this value match.
    pub threshold: f64,
}

/// Parse a `{"vector": ..., "threshold": ...}` leaf value.
pub fn parse_distance_operand(
    path: &FieldPath,
    kind: VectorKind,
    dims: Option<usize>,
    value: &Value,
) -> Result<DistanceOperand> {
    let obj = value.as_object().ok_or_else(|| {
        Error::type_cast(path, "expected an object with 'vector' and 'threshold'")
    })?;
    let vector = obj
        .get("vector")
        .ok_or_else(|| Error::type_cast(path, "missing 'vector'"))?;
    let threshold = obj
        .get("threshold")
        .and_then(Value::as_f64)
        .filter(|t| t.is_finite())
        .ok_or_else(|| Error::type_cast(path, "'threshold' must be a finite number"))?;

    Ok(DistanceOperand {
        literal: format_vector(path, kind, dims, vector)?,
        threshold,
    })
}

/// Format a JSON value as a pgvector literal of the given kind.
pub fn format_vector(
    path: &FieldPath,
    kind: VectorKind,
    dims: Option<usize>,
    value: &Value,
) -> Result<String> {
    match kind {
        VectorKind::Dense | VectorKind::Half => format_dense(path, dims, value),
        VectorKind::Sparse => format_sparse(path, dims, value),
        VectorKind::Binary => format_binary(path, dims, value),
    }
}

fn check_dims(path: &FieldPath, declared: Option<usize>, actual: usize) -> Result<()> {
    match declared {
        Some(expected) if expected != actual => Err(Error::type_cast(
            path,
            format!("expected {expected} dimensions, got {actual}"),
        )),
        _ => Ok(()),
    }
}

fn finite(path: &FieldPath, value: &Value) -> Result<f64> {
    value
        .as_f64()
        .filter(|f| f.is_finite())
        .ok_or_else(|| Error::type_cast(path, "vector components must be finite numbers"))
}

fn format_dense(path: &FieldPath, dims: Option<usize>, value: &Value) -> Result<String> {
    let items = value
        .as_array()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| Error::type_cast(path, "expected a non-empty array of numbers"))?;
    check_dims(path, dims, items.len())?;

    let parts = items
        .iter()
        .map(|v| finite(path, v).map(|f| f.to_string()))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("[{}]", parts.join(",")))
}

/// Sparse vectors are written as `{"indices": [...], "values": [...]}` with
/// zero-based indices and an optional `"dims"`; pgvector's text form uses
/// one-based indices.
fn format_sparse(path: &FieldPath, dims: Option<usize>, value: &Value) -> Result<String> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::type_cast(path, "expected {indices, values} for a sparse vector"))?;
    let indices = obj
        .get("indices")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::type_cast(path, "missing 'indices'"))?;
    let values = obj
        .get("values")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::type_cast(path, "missing 'values'"))?;
    if indices.len() != values.len() {
        return Err(Error::type_cast(path, "'indices' and 'values' differ in length"));
    }

    let total = match (obj.get("dims"), dims) {
        (Some(v), declared) => {
            let given = v
                .as_u64()
                .ok_or_else(|| Error::type_cast(path, "'dims' must be a positive integer"))?
                as usize;
            check_dims(path, declared, given)?;
            given
        }
        (None, Some(declared)) => declared,
        (None, None) => {
            return Err(Error::type_cast(path, "sparse vector dimensionality is unknown"));
        }
    };

    let mut entries = Vec::with_capacity(indices.len());
    let mut previous: Option<u64> = None;
    for (index, value) in indices.iter().zip(values) {
        let index = index
            .as_u64()
            .ok_or_else(|| Error::type_cast(path, "sparse indices must be non-negative integers"))?;
        if index as usize >= total {
            return Err(Error::type_cast(path, format!("index {index} out of range")));
        }
        if previous.is_some_and(|p| p >= index) {
            return Err(Error::type_cast(path, "sparse indices must be strictly increasing"));
        }
        previous = Some(index);
        entries.push(format!("{}:{}", index + 1, finite(path, value)?));
    }
    Ok(format!("{{{}}}/{}", entries.join(","), total))
}

fn format_binary(path: &FieldPath, dims: Option<usize>, value: &Value) -> Result<String> {
    let bits: String = match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::Bool(true) => Ok('1'),
                Value::Bool(false) => Ok('0'),
                Value::Number(n) if n.as_u64() == Some(1) => Ok('1'),
                Value::Number(n) if n.as_u64() == Some(0) => Ok('0'),
                _ => Err(Error::type_cast(path, "bit vector items must be 0/1 or booleans")),
            })
            .collect::<Result<String>>()?,
        _ => return Err(Error::type_cast(path, "expected a bit string or array")),
    };
    if bits.is_empty() || !bits.chars().all(|c| c == '0' || c == '1') {
        return Err(Error::type_cast(path, "bit vectors contain only '0' and '1'"));
    }
    check_dims(path, dims, bits.len())?;
    Ok(bits)
}
