//! Filter expression trees.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::operator::Operator;
use crate::path::FieldPath;

/// A filter expression.
///
/// A `Leaf`'s operator must be valid for its field's type family (checked by
/// the compiler against the catalog). `And`/`Or` require at least one child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterNode {
    /// A single `field operator value` predicate.
    Leaf {
        /// Field the predicate applies to.
        path: FieldPath,
        /// Comparison operator.
        operator: Operator,
        /// Operand, still in its JSON input form.
        value: Value,
    },
    /// All children must hold.
    And(Vec<FilterNode>),
    /// At least one child must hold.
    Or(Vec<FilterNode>),
    /// The child must not hold.
    Not(Box<FilterNode>),
}

impl FilterNode {
    /// Create a leaf predicate.
    pub fn leaf(path: impl Into<FieldPath>, operator: Operator, value: impl Into<Value>) -> Self {
        FilterNode::Leaf {
            path: path.into(),
            operator,
            value: value.into(),
        }
    }

    /// Create an equality predicate.
    pub fn eq(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Self::leaf(path, Operator::Eq, value)
    }

    /// Create a list membership predicate.
    pub fn in_list(path: impl Into<FieldPath>, values: Vec<Value>) -> Self {
        Self::leaf(path, Operator::In, Value::Array(values))
    }

    /// Create an AND combination.
    pub fn and(children: Vec<FilterNode>) -> Self {
        FilterNode::And(children)
    }

    /// Create an OR combination.
    pub fn or(children: Vec<FilterNode>) -> Self {
        FilterNode::Or(children)
    }

    /// Negate a filter.
    pub fn negate(child: FilterNode) -> Self {
        FilterNode::Not(Box::new(child))
    }

    /// Whether this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, FilterNode::Leaf { .. })
    }

    /// Collapse nested `And`-of-`And` and `Or`-of-`Or` into single levels.
    ///
    /// Child order is preserved, so parameter numbering stays stable.
    pub fn flatten(self) -> Self {
        match self {
            FilterNode::And(children) => {
                let mut flat = Vec::with_capacity(children.len());
                for child in children {
                    match child.flatten() {
                        FilterNode::And(grand) => flat.extend(grand),
                        other => flat.push(other),
                    }
                }
                FilterNode::And(flat)
            }
            FilterNode::Or(children) => {
                let mut flat = Vec::with_capacity(children.len());
                for child in children {
                    match child.flatten() {
                        FilterNode::Or(grand) => flat.extend(grand),
                        other => flat.push(other),
                    }
                }
                FilterNode::Or(flat)
            }
            FilterNode::Not(child) => FilterNode::Not(Box::new(child.flatten())),
            leaf => leaf,
        }
    }

    /// Visit every leaf in depth-first, left-to-right order.
    pub fn for_each_leaf<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a FieldPath, Operator, &'a Value),
    {
        match self {
            FilterNode::Leaf {
                path,
                operator,
                value,
            } => f(path, *operator, value),
            FilterNode::And(children) | FilterNode::Or(children) => {
                for child in children {
                    child.for_each_leaf(f);
                }
            }
            FilterNode::Not(child) => child.for_each_leaf(f),
        }
    }

    /// All field paths referenced by the filter.
    pub fn fields(&self) -> BTreeSet<FieldPath> {
        let mut fields = BTreeSet::new();
        self.for_each_leaf(&mut |path, _, _| {
            fields.insert(path.clone());
        });
        fields
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        self.for_each_leaf(&mut |_, _, _| count += 1);
        count
    }
}
