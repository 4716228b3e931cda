//! Conversion from GraphQL `where` input objects into [`FilterNode`] trees.
//!
//! The transport layer hands over the already-parsed input as JSON:
//!
//! ```text
//! {"status": {"eq": "active"}, "OR": [{"age": {"gte": 18}}, {"verified": {"eq": true}}]}
//! ```
//!
//! Field names are normalised to snake_case; nested objects without operator
//! keys address embedded documents (`{"author": {"name": {"eq": "x"}}}`).

use serde_json::{Map, Value};

use crate::error::Error;
use crate::filter::FilterNode;
use crate::operator::Operator;
use crate::path::{to_snake_case, FieldPath};

/// Convert a `where` input object into a filter tree.
///
/// Returns `Ok(None)` for an empty object or `null`. Empty `AND`/`OR`
/// arrays, empty `NOT` objects and empty group items are rejected with
/// [`Error::InvalidInput`].
pub fn parse_where(input: &Value) -> Result<Option<FilterNode>, Error> {
    match input {
        Value::Null => Ok(None),
        Value::Object(map) => {
            let mut nodes = Vec::new();
            collect_object(map, &FieldPath::new(Vec::<String>::new()), &mut nodes)?;
            Ok(combine(nodes))
        }
        other => Err(Error::InvalidInput(format!(
            "where input must be an object, got {}",
            type_name(other)
        ))),
    }
}

fn collect_object(
    map: &Map<String, Value>,
    prefix: &FieldPath,
    nodes: &mut Vec<FilterNode>,
) -> Result<(), Error> {
    for (key, value) in map {
        match logical_key(key) {
            Some(Logical::And) => {
                nodes.push(FilterNode::And(parse_children(key, value, prefix)?));
            }
            Some(Logical::Or) => {
                nodes.push(FilterNode::Or(parse_children(key, value, prefix)?));
            }
            Some(Logical::Not) => {
                let Value::Object(inner) = value else {
                    return Err(Error::InvalidInput(format!("{key} must contain an object")));
                };
                let mut inner_nodes = Vec::new();
                collect_object(inner, prefix, &mut inner_nodes)?;
                let child = combine(inner_nodes)
                    .ok_or_else(|| Error::InvalidInput(format!("{key} must not be empty")))?;
                nodes.push(FilterNode::negate(child));
            }
            None => {
                let path = prefix.child(to_snake_case(key));
                collect_field(&path, value, nodes)?;
            }
        }
    }
    Ok(())
}

fn collect_field(path: &FieldPath, value: &Value, nodes: &mut Vec<FilterNode>) -> Result<(), Error> {
    let Value::Object(ops) = value else {
        return Err(Error::InvalidInput(format!(
            "field '{path}' must contain operators"
        )));
    };

    for (key, operand) in ops {
        if let Some(operator) = Operator::from_name(key) {
            nodes.push(FilterNode::Leaf {
                path: path.clone(),
                operator,
                value: operand.clone(),
            });
        } else if operand.is_object() {
            collect_field(&path.child(to_snake_case(key)), operand, nodes)?;
        } else {
            return Err(Error::UnknownOperator {
                field: path.dotted(),
                operator: key.clone(),
            });
        }
    }
    Ok(())
}

fn parse_children(key: &str, value: &Value, prefix: &FieldPath) -> Result<Vec<FilterNode>, Error> {
    let Value::Array(items) = value else {
        return Err(Error::InvalidInput(format!("{key} must contain an array")));
    };
    if items.is_empty() {
        return Err(Error::InvalidInput(format!("{key} must not be empty")));
    }

    let mut children = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(map) = item else {
            return Err(Error::InvalidInput(format!(
                "{key} items must be objects, got {}",
                type_name(item)
            )));
        };
        let mut nodes = Vec::new();
        collect_object(map, prefix, &mut nodes)?;
        let node = combine(nodes)
            .ok_or_else(|| Error::InvalidInput(format!("{key} items must not be empty")))?;
        children.push(node);
    }
    Ok(children)
}

fn combine(mut nodes: Vec<FilterNode>) -> Option<FilterNode> {
    match nodes.len() {
        0 => None,
        1 => nodes.pop(),
        _ => Some(FilterNode::And(nodes)),
    }
}

enum Logical {
    And,
    Or,
    Not,
}

fn logical_key(key: &str) -> Option<Logical> {
    match key {
        "AND" | "and" | "_and" => Some(Logical::And),
        "OR" | "or" | "_or" => Some(Logical::Or),
        "NOT" | "not" | "_not" => Some(Logical::Not),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
