//! Operator validity per type family.

use pgql_proto::Operator;

use crate::catalog::{TypeFamily, VectorKind};

/// Whether `operator` may be applied to a field of `family`.
pub fn is_supported(family: TypeFamily, operator: Operator) -> bool {
    use Operator::*;

    if operator == IsNull {
        return true;
    }
    match family {
        TypeFamily::Text => {
            matches!(operator, Eq | Neq | In | NotIn)
                || operator.is_ordering()
                || operator.is_pattern()
        }
        TypeFamily::Numeric | TypeFamily::Temporal => {
            matches!(operator, Eq | Neq | In | NotIn) || operator.is_ordering()
        }
        TypeFamily::Boolean | TypeFamily::Uuid => matches!(operator, Eq | Neq | In | NotIn),
        TypeFamily::Json => matches!(operator, Eq | Neq | Contains),
        TypeFamily::Vector(kind) => match operator.vector_metric() {
            Some(metric) => metric.is_binary() == (kind == VectorKind::Binary),
            None => false,
        },
        TypeFamily::LTree => {
            matches!(
                operator,
                Eq | Neq | In | NotIn | AncestorOf | DescendantOf | MatchesLquery
            ) || operator.is_ordering()
        }
    }
}

/// SQL comparison operator for the scalar comparisons.
pub fn comparison_sql(operator: Operator) -> Option<&'static str> {
    match operator {
        Operator::Eq => Some("="),
        Operator::Neq => Some("<>"),
        Operator::Gt => Some(">"),
        Operator::Gte => Some(">="),
        Operator::Lt => Some("<"),
        Operator::Lte => Some("<="),
        _ => None,
    }
}
