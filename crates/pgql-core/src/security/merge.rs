//! Combining explicit filters with authorization filters.

use std::collections::BTreeMap;

use pgql_proto::{FieldPath, FilterNode, Operator};
use serde_json::Value;

use crate::config::ConflictStrategy;
use crate::error::{Error, Result};

/// A field constrained differently by the explicit and authorization
/// filters.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConflict {
    /// The shared field.
    pub field: FieldPath,
    /// Explicit predicate as `operator value`.
    pub explicit: String,
    /// Authorization predicate as `operator value`.
    pub auth: String,
}

impl From<FilterConflict> for Error {
    fn from(conflict: FilterConflict) -> Self {
        Error::Conflict {
            field: conflict.field.dotted(),
            explicit: conflict.explicit,
            auth: conflict.auth,
        }
    }
}

/// Find explicit leaves that constrain an authorization field with a
/// different operator or value. Identical predicates are not conflicts.
pub fn find_conflicts(explicit: &FilterNode, auth: &FilterNode) -> Vec<FilterConflict> {
    let mut auth_leaves: BTreeMap<&FieldPath, Vec<(Operator, &Value)>> = BTreeMap::new();
    auth.for_each_leaf(&mut |path, op, value| {
        auth_leaves.entry(path).or_default().push((op, value));
    });

    let mut conflicts = Vec::new();
    explicit.for_each_leaf(&mut |path, op, value| {
        let Some(predicates) = auth_leaves.get(path) else {
            return;
        };
        if predicates.iter().any(|(a_op, a_value)| *a_op == op && *a_value == value) {
            return;
        }
        let (a_op, a_value) = predicates[0];
        conflicts.push(FilterConflict {
            field: path.clone(),
            explicit: format!("{op} {value}"),
            auth: format!("{a_op} {a_value}"),
        });
    });
    conflicts
}

/// Merge an explicit filter with an authorization filter.
///
/// The result never admits a row the authorization filter rejects:
/// - neither present: `None`
/// - one present: that filter unchanged
/// - both present without conflict: the flattened `And` of both
/// - on conflict: [`ConflictStrategy::Error`] fails, [`ConflictStrategy::Log`]
///   warns and ANDs both, [`ConflictStrategy::Override`] keeps only the
///   authorization filter
pub fn merge_auth_filter(
    explicit: Option<FilterNode>,
    auth: Option<FilterNode>,
    strategy: ConflictStrategy,
) -> Result<Option<FilterNode>> {
    let (explicit, auth) = match (explicit, auth) {
        (None, None) => return Ok(None),
        (Some(f), None) => return Ok(Some(f)),
        (None, Some(a)) => return Ok(Some(a)),
        (Some(f), Some(a)) => (f, a),
    };

    let conflicts = find_conflicts(&explicit, &auth);
    if let Some(first) = conflicts.first() {
        match strategy {
            ConflictStrategy::Error => return Err(first.clone().into()),
            ConflictStrategy::Log => {
                for conflict in &conflicts {
                    tracing::warn!(
                        field = %conflict.field,
                        explicit = %conflict.explicit,
                        auth = %conflict.auth,
                        "explicit filter conflicts with authorization filter"
                    );
                }
            }
            ConflictStrategy::Override => {
                tracing::debug!(
                    conflicts = conflicts.len(),
                    "dropping explicit filter in favour of authorization filter"
                );
                return Ok(Some(auth));
            }
        }
    }

    Ok(Some(FilterNode::and(vec![explicit, auth]).flatten()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_active() -> FilterNode {
        FilterNode::eq("status", "active")
    }

    fn tenant(id: &str) -> FilterNode {
        FilterNode::eq("tenant_id", id)
    }

    #[test]
    fn test_absent_sides() {
        assert_eq!(merge_auth_filter(None, None, ConflictStrategy::Error).unwrap(), None);
        assert_eq!(
            merge_auth_filter(Some(status_active()), None, ConflictStrategy::Error).unwrap(),
            Some(status_active())
        );
        assert_eq!(
            merge_auth_filter(None, Some(tenant("t-1")), ConflictStrategy::Error).unwrap(),
            Some(tenant("t-1"))
        );
    }

    #[test]
    fn test_non_conflicting_and() {
        let merged =
            merge_auth_filter(Some(status_active()), Some(tenant("t-1")), ConflictStrategy::Error)
                .unwrap()
                .unwrap();
        assert_eq!(merged, FilterNode::and(vec![status_active(), tenant("t-1")]));
    }

    #[test]
    fn test_merge_flattens() {
        let explicit = FilterNode::and(vec![status_active(), FilterNode::eq("role", "admin")]);
        let auth = FilterNode::and(vec![tenant("t-1"), FilterNode::eq("region", "eu")]);
        let merged = merge_auth_filter(Some(explicit), Some(auth), ConflictStrategy::Error)
            .unwrap()
            .unwrap();
        match merged {
            FilterNode::And(children) => assert_eq!(children.len(), 4),
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_identical_predicate_is_not_a_conflict() {
        let merged =
            merge_auth_filter(Some(tenant("t-1")), Some(tenant("t-1")), ConflictStrategy::Error)
                .unwrap();
        assert!(merged.is_some());
    }

    #[test]
    fn test_conflict_error() {
        let err = merge_auth_filter(Some(tenant("t-2")), Some(tenant("t-1")), ConflictStrategy::Error)
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { ref field, .. } if field == "tenant_id"));
    }

    #[test]
    fn test_conflict_log_keeps_both() {
        let merged =
            merge_auth_filter(Some(tenant("t-2")), Some(tenant("t-1")), ConflictStrategy::Log)
                .unwrap()
                .unwrap();
        assert_eq!(merged, FilterNode::and(vec![tenant("t-2"), tenant("t-1")]));
    }

    #[test]
    fn test_conflict_override_keeps_auth_only() {
        let explicit = FilterNode::and(vec![status_active(), tenant("t-2")]);
        let merged = merge_auth_filter(Some(explicit), Some(tenant("t-1")), ConflictStrategy::Override)
            .unwrap()
            .unwrap();
        assert_eq!(merged, tenant("t-1"));
    }

    #[test]
    fn test_conflict_inside_or() {
        let explicit = FilterNode::or(vec![status_active(), tenant("t-9")]);
        let conflicts = find_conflicts(&explicit, &tenant("t-1"));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].field.dotted(), "tenant_id");
        assert_eq!(conflicts[0].explicit, "eq \"t-9\"");
    }
}
