//! Filter operators.
//!
//! Operators are scoped by type family; which family a field belongs to is
//! decided by the catalog, so validity is checked at compile time rather
//! than here.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Named distance metric for vector comparisons (pgvector).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VectorMetric {
    /// Cosine distance, `<=>`.
    Cosine,
    /// Euclidean distance, `<->`.
    L2,
    /// Taxicab distance, `<+>`.
    L1,
    /// Negative inner product, `<#>`.
    InnerProduct,
    /// Hamming distance over bit vectors, `<~>`.
    Hamming,
    /// Jaccard distance over bit vectors, `<%>`.
    Jaccard,
}

impl VectorMetric {
    /// The pgvector operator for this metric.
    pub fn sql_operator(&self) -> &'static str {
        match self {
            VectorMetric::Cosine => "<=>",
            VectorMetric::L2 => "<->",
            VectorMetric::L1 => "<+>",
            VectorMetric::InnerProduct => "<#>",
            VectorMetric::Hamming => "<~>",
            VectorMetric::Jaccard => "<%>",
        }
    }

    /// Whether this metric is defined over bit vectors.
    pub fn is_binary(&self) -> bool {
        matches!(self, VectorMetric::Hamming | VectorMetric::Jaccard)
    }
}

/// A filter operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum Operator {
    /// Equality.
    Eq,
    /// Inequality.
    Neq,
    /// Membership in a list.
    In,
    /// Non-membership in a list.
    NotIn,
    /// `IS NULL` when the value is `true`, `IS NOT NULL` when `false`.
    IsNull,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Substring match on text, `@>` on JSON documents.
    Contains,
    /// Case-insensitive substring match.
    Icontains,
    /// Prefix match.
    StartsWith,
    /// Suffix match.
    EndsWith,
    /// Raw `LIKE` pattern.
    Like,
    /// Raw `ILIKE` pattern.
    Ilike,
    /// Vector distance below a threshold.
    Distance(VectorMetric),
    /// Label path is an ancestor of (or equal to) the operand.
    AncestorOf,
    /// Label path is a descendant of (or equal to) the operand.
    DescendantOf,
    /// Label path matches an `lquery` pattern.
    MatchesLquery,
}

impl Operator {
    /// Resolve an operator from its input name.
    ///
    /// A few common aliases are accepted (`ne`, `nin`, `is_null`).
    pub fn from_name(name: &str) -> Option<Self> {
        let op = match name {
            "eq" => Operator::Eq,
            "neq" | "ne" => Operator::Neq,
            "in" => Operator::In,
            "notin" | "nin" | "not_in" => Operator::NotIn,
            "isnull" | "is_null" => Operator::IsNull,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "contains" => Operator::Contains,
            "icontains" => Operator::Icontains,
            "startswith" | "starts_with" => Operator::StartsWith,
            "endswith" | "ends_with" => Operator::EndsWith,
            "like" => Operator::Like,
            "ilike" => Operator::Ilike,
            "cosine_distance" => Operator::Distance(VectorMetric::Cosine),
            "l2_distance" => Operator::Distance(VectorMetric::L2),
            "l1_distance" => Operator::Distance(VectorMetric::L1),
            "inner_product" => Operator::Distance(VectorMetric::InnerProduct),
            "hamming_distance" => Operator::Distance(VectorMetric::Hamming),
            "jaccard_distance" => Operator::Distance(VectorMetric::Jaccard),
            "ancestor_of" => Operator::AncestorOf,
            "descendant_of" => Operator::DescendantOf,
            "matches_lquery" => Operator::MatchesLquery,
            _ => return None,
        };
        Some(op)
    }

    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::In => "in",
            Operator::NotIn => "notin",
            Operator::IsNull => "isnull",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Contains => "contains",
            Operator::Icontains => "icontains",
            Operator::StartsWith => "startswith",
            Operator::EndsWith => "endswith",
            Operator::Like => "like",
            Operator::Ilike => "ilike",
            Operator::Distance(VectorMetric::Cosine) => "cosine_distance",
            Operator::Distance(VectorMetric::L2) => "l2_distance",
            Operator::Distance(VectorMetric::L1) => "l1_distance",
            Operator::Distance(VectorMetric::InnerProduct) => "inner_product",
            Operator::Distance(VectorMetric::Hamming) => "hamming_distance",
            Operator::Distance(VectorMetric::Jaccard) => "jaccard_distance",
            Operator::AncestorOf => "ancestor_of",
            Operator::DescendantOf => "descendant_of",
            Operator::MatchesLquery => "matches_lquery",
        }
    }

    /// Whether the operand is a list.
    pub fn is_list(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// Whether this is one of the ordering comparisons.
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte
        )
    }

    /// Whether this is a text pattern operator.
    pub fn is_pattern(&self) -> bool {
        matches!(
            self,
            Operator::Contains
                | Operator::Icontains
                | Operator::StartsWith
                | Operator::EndsWith
                | Operator::Like
                | Operator::Ilike
        )
    }

    /// The vector metric, for distance operators.
    pub fn vector_metric(&self) -> Option<VectorMetric> {
        match self {
            Operator::Distance(metric) => Some(*metric),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Operator> for &'static str {
    fn from(op: Operator) -> Self {
        op.name()
    }
}

impl TryFrom<String> for Operator {
    type Error = String;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Operator::from_name(&name).ok_or_else(|| format!("unknown operator: {name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        let all = [
            "eq", "neq", "in", "notin", "isnull", "gt", "gte", "lt", "lte", "contains",
            "icontains", "startswith", "endswith", "like", "ilike", "cosine_distance",
            "l2_distance", "l1_distance", "inner_product", "hamming_distance",
            "jaccard_distance", "ancestor_of", "descendant_of", "matches_lquery",
        ];
        for name in all {
            let op = Operator::from_name(name).unwrap();
            assert_eq!(op.name(), name);
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!(Operator::from_name("ne"), Some(Operator::Neq));
        assert_eq!(Operator::from_name("nin"), Some(Operator::NotIn));
        assert_eq!(Operator::from_name("is_null"), Some(Operator::IsNull));
        assert_eq!(Operator::from_name("bogus"), None);
    }

    #[test]
    fn test_vector_metrics() {
        let op = Operator::from_name("jaccard_distance").unwrap();
        let metric = op.vector_metric().unwrap();
        assert_eq!(metric.sql_operator(), "<%>");
        assert!(metric.is_binary());
        assert!(!VectorMetric::Cosine.is_binary());
    }

    #[test]
    fn test_serde_uses_names() {
        let json = serde_json::to_string(&Operator::Distance(VectorMetric::L2)).unwrap();
        assert_eq!(json, "\"l2_distance\"");
        let op: Operator = serde_json::from_str("\"gte\"").unwrap();
        assert_eq!(op, Operator::Gte);
    }
}
