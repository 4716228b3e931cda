//! Filter tree lowering.
//!
//! Every leaf is checked against its field's declared type before any SQL
//! is produced, so all compile errors surface synchronously.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use pgql_proto::{FieldPath, FilterNode, Operator};
use serde_json::Value;

use super::ltree::{validate_label_path, validate_lquery};
use super::operators::{comparison_sql, is_supported};
use super::params::{ParamList, SqlParam};
use super::sql::{cast_suffix, extract, quote_literal, typed_expr};
use super::vector::parse_distance_operand;
use crate::catalog::{ResolvedField, SchemaContext, SqlType, TableDef, TypeFamily};
use crate::config::CompilerConfig;
use crate::error::{Error, Result};

/// Lowers filter trees for one table.
#[derive(Debug, Clone, Copy)]
pub struct FilterCompiler<'a> {
    schema: &'a SchemaContext,
    table: &'a TableDef,
    config: &'a CompilerConfig,
}

impl<'a> FilterCompiler<'a> {
    /// Create a compiler for `table`.
    pub fn new(schema: &'a SchemaContext, table: &'a TableDef, config: &'a CompilerConfig) -> Self {
        Self {
            schema,
            table,
            config,
        }
    }

    /// Compile a filter into a SQL predicate, appending its parameters.
    ///
    /// Nested `And`-of-`And` and `Or`-of-`Or` are flattened first.
    pub fn compile(&self, node: &FilterNode, params: &mut ParamList) -> Result<String> {
        let flat = node.clone().flatten();
        self.compile_node(&flat, params)
    }

    fn compile_node(&self, node: &FilterNode, params: &mut ParamList) -> Result<String> {
        match node {
            FilterNode::Leaf {
                path,
                operator,
                value,
            } => self.compile_leaf(path, *operator, value, params),
            FilterNode::And(children) => self.compile_group(children, "AND", params),
            FilterNode::Or(children) => self.compile_group(children, "OR", params),
            FilterNode::Not(child) => Ok(format!("NOT ({})", self.compile_node(child, params)?)),
        }
    }

    fn compile_group(
        &self,
        children: &[FilterNode],
        joiner: &str,
        params: &mut ParamList,
    ) -> Result<String> {
        match children {
            [] => Err(Error::InvalidFilter(format!(
                "{joiner} requires at least one condition"
            ))),
            [only] => self.compile_node(only, params),
            _ => {
                let parts = children
                    .iter()
                    .map(|c| self.compile_node(c, params))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("({})", parts.join(&format!(" {joiner} "))))
            }
        }
    }

    fn compile_leaf(
        &self,
        path: &FieldPath,
        operator: Operator,
        value: &Value,
        params: &mut ParamList,
    ) -> Result<String> {
        let field = self.schema.resolve(self.table, path)?;
        let family = field.sql_type.family();

        if !is_supported(family, operator) {
            return Err(Error::UnsupportedOperator {
                path: path.dotted(),
                operator: operator.name().to_string(),
                family: family.to_string(),
            });
        }

        match operator {
            Operator::IsNull => {
                let is_null = value.as_bool().ok_or_else(|| {
                    Error::type_cast(path, "isnull expects true or false")
                })?;
                Ok(null_check(&field, is_null))
            }
            Operator::Eq | Operator::Neq if value.is_null() => {
                Ok(null_check(&field, operator == Operator::Eq))
            }
            Operator::In | Operator::NotIn => self.compile_list(path, &field, operator, value, params),
            Operator::Distance(metric) => {
                let TypeFamily::Vector(kind) = family else {
                    return Err(Error::InvalidFilter(format!(
                        "distance operator on non-vector field '{path}'"
                    )));
                };
                let operand = parse_distance_operand(path, kind, field.sql_type.dims(), value)?;
                let placeholder = params.push(SqlParam::Text(operand.literal));
                Ok(format!(
                    "({} {} {}::{}) < {}",
                    typed_expr(&field),
                    metric.sql_operator(),
                    placeholder,
                    kind.type_name(),
                    operand.threshold
                ))
            }
            Operator::Contains if family == TypeFamily::Json => {
                let rhs = self.bind(path, &field, value, params)?;
                Ok(format!("{} @> {}", typed_expr(&field), rhs))
            }
            op if op.is_pattern() => self.compile_pattern(path, &field, op, value, params),
            Operator::AncestorOf | Operator::DescendantOf => {
                let rhs = self.bind(path, &field, value, params)?;
                let sql_op = if operator == Operator::AncestorOf { "@>" } else { "<@" };
                Ok(format!("{} {} {}", typed_expr(&field), sql_op, rhs))
            }
            Operator::MatchesLquery => {
                let pattern = value
                    .as_str()
                    .ok_or_else(|| Error::type_cast(path, "expected an lquery string"))?;
                validate_lquery(path, pattern)?;
                let placeholder = params.push(SqlParam::Text(pattern.to_string()));
                Ok(format!("{} ~ {}::lquery", typed_expr(&field), placeholder))
            }
            op => {
                let sql_op = comparison_sql(op).ok_or_else(|| Error::UnsupportedOperator {
                    path: path.dotted(),
                    operator: op.name().to_string(),
                    family: family.to_string(),
                })?;
                let rhs = self.bind(path, &field, value, params)?;
                Ok(format!("{} {} {}", typed_expr(&field), sql_op, rhs))
            }
        }
    }

    fn compile_list(
        &self,
        path: &FieldPath,
        field: &ResolvedField,
        operator: Operator,
        value: &Value,
        params: &mut ParamList,
    ) -> Result<String> {
        let items = value
            .as_array()
            .ok_or_else(|| Error::type_cast(path, format!("{operator} expects a list")))?;
        if items.len() > self.config.max_in_list {
            return Err(Error::InvalidFilter(format!(
                "list for '{}' has {} values, limit is {}",
                path,
                items.len(),
                self.config.max_in_list
            )));
        }

        let negated = operator == Operator::NotIn;
        if items.is_empty() {
            return Ok(if negated { "TRUE" } else { "FALSE" }.to_string());
        }

        let placeholders = items
            .iter()
            .map(|item| {
                if item.is_null() {
                    return Err(Error::type_cast(path, "lists must not contain null"));
                }
                self.bind(path, field, item, params)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(format!(
            "{} {} ({})",
            typed_expr(field),
            if negated { "NOT IN" } else { "IN" },
            placeholders.join(", ")
        ))
    }

    fn compile_pattern(
        &self,
        path: &FieldPath,
        field: &ResolvedField,
        operator: Operator,
        value: &Value,
        params: &mut ParamList,
    ) -> Result<String> {
        let text = value
            .as_str()
            .ok_or_else(|| Error::type_cast(path, format!("{operator} expects a string")))?;

        let (pattern, sql_op) = match operator {
            Operator::Contains => (format!("%{}%", escape_like(text)), "LIKE"),
            Operator::Icontains => (format!("%{}%", escape_like(text)), "ILIKE"),
            Operator::StartsWith => (format!("{}%", escape_like(text)), "LIKE"),
            Operator::EndsWith => (format!("%{}", escape_like(text)), "LIKE"),
            Operator::Like => (text.to_string(), "LIKE"),
            _ => (text.to_string(), "ILIKE"),
        };
        let placeholder = params.push(SqlParam::Text(pattern));
        Ok(format!("{} {} {}", typed_expr(field), sql_op, placeholder))
    }

    /// Bind one scalar operand and return its placeholder (or inline literal).
    fn bind(
        &self,
        path: &FieldPath,
        field: &ResolvedField,
        value: &Value,
        params: &mut ParamList,
    ) -> Result<String> {
        let sql_type = &field.sql_type;
        if sql_type.family() == TypeFamily::Temporal {
            let text = temporal_literal(path, sql_type, value)?;
            if self.config.inline_datetime_literals {
                return Ok(format!("{}{}", quote_literal(&text), cast_suffix(sql_type)));
            }
            let placeholder = params.push(SqlParam::Text(text));
            return Ok(format!("{}{}", placeholder, cast_suffix(sql_type)));
        }

        let param = scalar_param(path, sql_type, value)?;
        let placeholder = params.push(param);
        Ok(format!("{}{}", placeholder, cast_suffix(sql_type)))
    }
}

/// Compile a filter against a table, returning the predicate and its
/// parameters numbered from `$1`.
pub fn compile_filter(
    node: &FilterNode,
    table: &str,
    schema: &SchemaContext,
    config: &CompilerConfig,
) -> Result<(String, Vec<SqlParam>)> {
    let table = schema.require_table(table)?;
    let mut params = ParamList::new();
    let sql = FilterCompiler::new(schema, table, config).compile(node, &mut params)?;
    Ok((sql, params.into_vec()))
}

fn null_check(field: &ResolvedField, is_null: bool) -> String {
    let as_text = field.sql_type.family() != TypeFamily::Json;
    format!(
        "{} {}",
        extract(field, as_text),
        if is_null { "IS NULL" } else { "IS NOT NULL" }
    )
}

/// Escape `LIKE` metacharacters using the default backslash escape.
fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Convert a JSON operand to a parameter of the field's type.
pub(crate) fn scalar_param(path: &FieldPath, sql_type: &SqlType, value: &Value) -> Result<SqlParam> {
    match sql_type.family() {
        TypeFamily::Text => match value {
            Value::String(s) => Ok(SqlParam::Text(s.clone())),
            Value::Number(n) => Ok(SqlParam::Text(n.to_string())),
            Value::Bool(b) => Ok(SqlParam::Text(b.to_string())),
            _ => Err(Error::type_cast(path, "expected a string")),
        },
        TypeFamily::Numeric => numeric_param(path, sql_type, value),
        TypeFamily::Boolean => match value {
            Value::Bool(b) => Ok(SqlParam::Bool(*b)),
            Value::String(s) if s == "true" || s == "false" => Ok(SqlParam::Bool(s == "true")),
            _ => Err(Error::type_cast(path, "expected a boolean")),
        },
        TypeFamily::Uuid => {
            let text = value
                .as_str()
                .ok_or_else(|| Error::type_cast(path, "expected a UUID string"))?;
            let parsed = uuid::Uuid::parse_str(text)
                .map_err(|e| Error::type_cast(path, format!("invalid UUID: {e}")))?;
            Ok(SqlParam::Text(parsed.hyphenated().to_string()))
        }
        TypeFamily::Temporal => Ok(SqlParam::Text(temporal_literal(path, sql_type, value)?)),
        TypeFamily::Json => Ok(SqlParam::Json(value.clone())),
        TypeFamily::LTree => {
            let text = value
                .as_str()
                .ok_or_else(|| Error::type_cast(path, "expected a label path string"))?;
            validate_label_path(path, text)?;
            Ok(SqlParam::Text(text.to_string()))
        }
        TypeFamily::Vector(_) => Err(Error::type_cast(
            path,
            "vector fields are compared with distance operators",
        )),
    }
}

fn numeric_param(path: &FieldPath, sql_type: &SqlType, value: &Value) -> Result<SqlParam> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(SqlParam::Int(i));
            }
            if sql_type.is_integral() {
                return Err(Error::type_cast(path, format!("expected an integer, got {n}")));
            }
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(SqlParam::Float)
                .ok_or_else(|| Error::type_cast(path, "number out of range"))
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if sql_type.is_integral() {
                trimmed
                    .parse::<i64>()
                    .map(SqlParam::Int)
                    .map_err(|_| Error::type_cast(path, format!("'{s}' is not an integer")))
            } else {
                // Keep the text so decimal precision survives the cast.
                match trimmed.parse::<f64>() {
                    Ok(f) if f.is_finite() => Ok(SqlParam::Text(trimmed.to_string())),
                    _ => Err(Error::type_cast(path, format!("'{s}' is not a number"))),
                }
            }
        }
        _ => Err(Error::type_cast(path, "expected a number")),
    }
}

/// Validate an ISO-8601 date or timestamp and return it unchanged.
fn temporal_literal(path: &FieldPath, sql_type: &SqlType, value: &Value) -> Result<String> {
    let text = value
        .as_str()
        .ok_or_else(|| Error::type_cast(path, "expected an ISO-8601 string"))?;

    let is_date = NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok();
    let valid = match sql_type {
        SqlType::Date => is_date || DateTime::parse_from_rfc3339(text).is_ok(),
        _ => {
            is_date
                || DateTime::parse_from_rfc3339(text).is_ok()
                || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
                || NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f").is_ok()
        }
    };
    if !valid {
        return Err(Error::type_cast(path, format!("'{text}' is not an ISO-8601 value")));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, RelationDef};
    use pgql_proto::parse_where;
    use serde_json::json;
    use std::sync::Arc;

    fn schema() -> Arc<SchemaContext> {
        SchemaContext::builder()
            .table(
                TableDef::new("users")
                    .with_field(FieldDef::jsonb("status", SqlType::Text))
                    .with_field(FieldDef::jsonb("age", SqlType::Integer))
                    .with_field(FieldDef::jsonb("score", SqlType::Numeric))
                    .with_field(FieldDef::jsonb("active", SqlType::Boolean))
                    .with_field(FieldDef::jsonb("tenant_id", SqlType::Text))
                    .with_field(FieldDef::jsonb("created_at", SqlType::Timestamptz))
                    .with_field(FieldDef::jsonb("meta", SqlType::Jsonb))
                    .with_field(FieldDef::jsonb("embedding", SqlType::vector(3)))
                    .with_field(FieldDef::jsonb("fingerprint", SqlType::Bit { dims: Some(4) }))
                    .with_field(FieldDef::jsonb("category_path", SqlType::LTree))
                    .with_field(FieldDef::column("id", SqlType::Uuid)),
            )
            .table(
                TableDef::new("posts")
                    .with_field(FieldDef::jsonb("title", SqlType::Text))
                    .with_relationship(RelationDef::new("author", "users")),
            )
            .build()
            .unwrap()
    }

    fn compile_with(
        input: serde_json::Value,
        config: &CompilerConfig,
    ) -> Result<(String, Vec<SqlParam>)> {
        let schema = schema();
        let filter = parse_where(&input)?.unwrap();
        compile_filter(&filter, "users", &schema, config)
    }

    fn compile(input: serde_json::Value) -> Result<(String, Vec<SqlParam>)> {
        compile_with(input, &CompilerConfig::default())
    }

    #[test]
    fn test_text_equality() {
        let (sql, params) = compile(json!({"status": {"eq": "active"}})).unwrap();
        assert_eq!(sql, "(data->>'status') = $1");
        assert_eq!(params, vec![SqlParam::Text("active".into())]);
    }

    #[test]
    fn test_numeric_casts_both_sides() {
        let (sql, params) = compile(json!({"age": {"gte": 21}})).unwrap();
        assert_eq!(sql, "(data->>'age')::integer >= $1::integer");
        assert_eq!(params, vec![SqlParam::Int(21)]);

        let err = compile(json!({"age": {"eq": 1.5}})).unwrap_err();
        assert!(matches!(err, Error::TypeCast { .. }));

        let (_, params) = compile(json!({"score": {"lt": "10.25"}})).unwrap();
        assert_eq!(params, vec![SqlParam::Text("10.25".into())]);
    }

    #[test]
    fn test_datetime_parameter_and_inline() {
        let (sql, params) = compile(json!({"createdAt": {"gte": "2024-01-01T00:00:00Z"}})).unwrap();
        assert_eq!(sql, "(data->>'created_at')::timestamptz >= $1::timestamptz");
        assert_eq!(params, vec![SqlParam::Text("2024-01-01T00:00:00Z".into())]);

        let config = CompilerConfig::default().with_inline_datetime_literals(true);
        let (sql, params) =
            compile_with(json!({"createdAt": {"gte": "2024-01-01T00:00:00Z"}}), &config).unwrap();
        assert_eq!(
            sql,
            "(data->>'created_at')::timestamptz >= '2024-01-01T00:00:00Z'::timestamptz"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_datetime_accepts_offsets_and_fractions() {
        assert!(compile(json!({"createdAt": {"lt": "2024-06-01T12:30:45.123+02:00"}})).is_ok());
        assert!(compile(json!({"createdAt": {"lt": "2024-06-01"}})).is_ok());
        assert!(compile(json!({"createdAt": {"lt": "2024-06-01T12:30:45"}})).is_ok());

        let err = compile(json!({"createdAt": {"lt": "yesterday"}})).unwrap_err();
        assert!(matches!(err, Error::TypeCast { .. }));
    }

    #[test]
    fn test_inline_literal_is_escaped_only_after_validation() {
        let config = CompilerConfig::default().with_inline_datetime_literals(true);
        let err = compile_with(json!({"createdAt": {"eq": "2024-01-01'; DROP TABLE x; --"}}), &config)
            .unwrap_err();
        assert!(matches!(err, Error::TypeCast { .. }));
    }

    #[test]
    fn test_lists() {
        let (sql, params) = compile(json!({"status": {"in": ["a", "b"]}})).unwrap();
        assert_eq!(sql, "(data->>'status') IN ($1, $2)");
        assert_eq!(params.len(), 2);

        let (sql, _) = compile(json!({"age": {"notin": [1, 2]}})).unwrap();
        assert_eq!(sql, "(data->>'age')::integer NOT IN ($1::integer, $2::integer)");

        let (sql, params) = compile(json!({"status": {"in": []}})).unwrap();
        assert_eq!(sql, "FALSE");
        assert!(params.is_empty());

        let (sql, _) = compile(json!({"status": {"notin": []}})).unwrap();
        assert_eq!(sql, "TRUE");
    }

    #[test]
    fn test_list_limit() {
        let config = CompilerConfig::default().with_max_in_list(2);
        let err = compile_with(json!({"status": {"in": ["a", "b", "c"]}}), &config).unwrap_err();
        assert!(matches!(err, Error::InvalidFilter(_)));
    }

    #[test]
    fn test_null_checks() {
        let (sql, params) = compile(json!({"status": {"isnull": true}})).unwrap();
        assert_eq!(sql, "(data->>'status') IS NULL");
        assert!(params.is_empty());

        let (sql, _) = compile(json!({"meta": {"isnull": false}})).unwrap();
        assert_eq!(sql, "(data->'meta') IS NOT NULL");

        let (sql, _) = compile(json!({"status": {"neq": null}})).unwrap();
        assert_eq!(sql, "(data->>'status') IS NOT NULL");
    }

    #[test]
    fn test_patterns_escape_metacharacters() {
        let (sql, params) = compile(json!({"status": {"icontains": "50%_off"}})).unwrap();
        assert_eq!(sql, "(data->>'status') ILIKE $1");
        assert_eq!(params, vec![SqlParam::Text("%50\\%\\_off%".into())]);

        let (_, params) = compile(json!({"status": {"startswith": "act"}})).unwrap();
        assert_eq!(params, vec![SqlParam::Text("act%".into())]);

        let (_, params) = compile(json!({"status": {"like": "a_%"}})).unwrap();
        assert_eq!(params, vec![SqlParam::Text("a_%".into())]);
    }

    #[test]
    fn test_json_operators() {
        let (sql, params) = compile(json!({"meta": {"contains": {"beta": true}}})).unwrap();
        assert_eq!(sql, "(data->'meta') @> $1::jsonb");
        assert_eq!(params, vec![SqlParam::Json(json!({"beta": true}))]);
    }

    #[test]
    fn test_logical_composition() {
        let (sql, params) = compile(json!({
            "OR": [
                {"status": {"eq": "active"}},
                {"NOT": {"age": {"lt": 18}}}
            ]
        }))
        .unwrap();
        assert_eq!(
            sql,
            "((data->>'status') = $1 OR NOT ((data->>'age')::integer < $2::integer))"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_nested_and_is_flattened() {
        let schema = schema();
        let filter = FilterNode::and(vec![
            FilterNode::eq("status", "a"),
            FilterNode::and(vec![FilterNode::eq("tenant_id", "t"), FilterNode::eq("status", "b")]),
        ]);
        let (sql, params) =
            compile_filter(&filter, "users", &schema, &CompilerConfig::default()).unwrap();
        assert_eq!(
            sql,
            "((data->>'status') = $1 AND (data->>'tenant_id') = $2 AND (data->>'status') = $3)"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_empty_group_is_invalid() {
        let schema = schema();
        let err = compile_filter(&FilterNode::or(vec![]), "users", &schema, &CompilerConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFilter(_)));
    }

    #[test]
    fn test_vector_distance() {
        let (sql, params) = compile(json!({
            "embedding": {"cosine_distance": {"vector": [0.1, 0.2, 0.3], "threshold": 0.5}}
        }))
        .unwrap();
        assert_eq!(sql, "((data->>'embedding')::vector <=> $1::vector) < 0.5");
        assert_eq!(params, vec![SqlParam::Text("[0.1,0.2,0.3]".into())]);

        let (sql, _) = compile(json!({
            "fingerprint": {"hamming_distance": {"vector": "1010", "threshold": 2}}
        }))
        .unwrap();
        assert_eq!(sql, "((data->>'fingerprint')::bit <~> $1::bit) < 2");
    }

    #[test]
    fn test_vector_rejects_wrong_metric_and_dims() {
        let err = compile(json!({
            "embedding": {"jaccard_distance": {"vector": [1, 0, 1], "threshold": 0.5}}
        }))
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperator { .. }));

        let err = compile(json!({
            "embedding": {"l2_distance": {"vector": [1, 0], "threshold": 0.5}}
        }))
        .unwrap_err();
        assert!(matches!(err, Error::TypeCast { .. }));
    }

    #[test]
    fn test_ltree_ordering_is_not_containment() {
        let (sql, _) = compile(json!({"categoryPath": {"lt": "top.science"}})).unwrap();
        assert_eq!(sql, "(data->>'category_path')::ltree < $1::ltree");

        let (sql, _) = compile(json!({"categoryPath": {"ancestor_of": "top.science"}})).unwrap();
        assert_eq!(sql, "(data->>'category_path')::ltree @> $1::ltree");

        let (sql, _) = compile(json!({"categoryPath": {"descendant_of": "top"}})).unwrap();
        assert_eq!(sql, "(data->>'category_path')::ltree <@ $1::ltree");

        let (sql, _) = compile(json!({"categoryPath": {"matches_lquery": "top.*"}})).unwrap();
        assert_eq!(sql, "(data->>'category_path')::ltree ~ $1::lquery");

        let err = compile(json!({"categoryPath": {"eq": "top..x"}})).unwrap_err();
        assert!(matches!(err, Error::TypeCast { .. }));
    }

    #[test]
    fn test_uuid_column() {
        let (sql, params) =
            compile(json!({"id": {"eq": "550E8400-E29B-41D4-A716-446655440000"}})).unwrap();
        assert_eq!(sql, "id = $1::uuid");
        assert_eq!(
            params,
            vec![SqlParam::Text("550e8400-e29b-41d4-a716-446655440000".into())]
        );

        let err = compile(json!({"id": {"eq": "not-a-uuid"}})).unwrap_err();
        assert!(matches!(err, Error::TypeCast { .. }));
    }

    #[test]
    fn test_schema_and_operator_errors() {
        let err = compile(json!({"missing": {"eq": 1}})).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { ref path, .. } if path == "missing"));

        let err = compile(json!({"active": {"gt": true}})).unwrap_err();
        assert!(
            matches!(err, Error::UnsupportedOperator { ref operator, ref family, .. } if operator == "gt" && family == "boolean")
        );

        let err = compile(json!({"embedding": {"eq": [1, 2, 3]}})).unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperator { .. }));
    }

    #[test]
    fn test_relationship_path() {
        let schema = schema();
        let filter = FilterNode::eq("author.status", "active");
        let (sql, _) = compile_filter(&filter, "posts", &schema, &CompilerConfig::default()).unwrap();
        assert_eq!(sql, "(data->'author'->>'status') = $1");
    }

    #[test]
    fn test_compile_is_deterministic() {
        let input = json!({
            "status": {"in": ["a", "b"]},
            "age": {"gt": 3},
            "embedding": {"l1_distance": {"vector": [1, 2, 3], "threshold": 4}}
        });
        let first = compile(input.clone()).unwrap();
        let second = compile(input).unwrap();
        assert_eq!(first, second);
    }
}
