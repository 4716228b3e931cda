//! Statement construction.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use pgql_proto::{
    AggregateFunction, Aggregation, FieldPath, FieldSelection, FilterNode, NullsOrder,
    OrderDirection, OrderSpec, SelectQuery,
};
use serde_json::Value;

use super::params::{ParamList, SqlParam};
use super::shape::{OutputField, ResultShape, ShapeSource};
use super::sql::{extract, ident, key_text_expr, quote_ident, quote_literal, relation, typed_expr};
use super::where_clause::{scalar_param, FilterCompiler};
use crate::catalog::{ResolvedField, SchemaContext, SqlType, TableDef, TypeFamily, VectorKind};
use crate::config::CompilerConfig;
use crate::connection::Row;
use crate::error::{Error, Result};
use crate::security::merge_auth_filter;

/// Row column carrying the lookup key in batch statements.
pub const BATCH_KEY_COLUMN: &str = "__key";

/// Projection strategy chosen for a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// One aliased expression per requested field.
    ColumnList,
    /// The whole JSONB document, selected once.
    FullDocument,
    /// Grouping columns and aggregates.
    Aggregate,
}

/// A compiled statement with its parameters and result shape.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    table: String,
    sql: String,
    params: Vec<SqlParam>,
    shape: ResultShape,
    projection: Projection,
}

impl CompiledQuery {
    /// Catalog name of the queried table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bound parameters in placeholder order.
    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    /// Result shape.
    pub fn shape(&self) -> &ResultShape {
        &self.shape
    }

    /// Projection strategy.
    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Convert a fetched row into the output object.
    pub fn shape_row(&self, row: &Row) -> Result<Value> {
        self.shape.apply(row)
    }
}

/// Builds statements against an immutable schema context.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    schema: Arc<SchemaContext>,
    config: CompilerConfig,
}

impl QueryBuilder {
    /// Create a builder.
    pub fn new(schema: Arc<SchemaContext>, config: CompilerConfig) -> Self {
        Self { schema, config }
    }

    /// The schema context.
    pub fn schema(&self) -> &Arc<SchemaContext> {
        &self.schema
    }

    /// The compiler configuration.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Merge the query's own filter with an authorization filter using the
    /// configured conflict strategy.
    pub fn merge_filter(
        &self,
        explicit: Option<&FilterNode>,
        auth: Option<&FilterNode>,
    ) -> Result<Option<FilterNode>> {
        merge_auth_filter(
            explicit.cloned(),
            auth.cloned(),
            self.config.conflict_strategy,
        )
    }

    /// Build a statement after merging in an authorization filter.
    pub fn build_with_auth(
        &self,
        query: &SelectQuery,
        auth: Option<&FilterNode>,
    ) -> Result<CompiledQuery> {
        let mut merged = query.clone();
        merged.filter = self.merge_filter(query.filter.as_ref(), auth)?;
        self.build(&merged)
    }

    /// Build a statement. `query.filter` is used as given.
    pub fn build(&self, query: &SelectQuery) -> Result<CompiledQuery> {
        self.build_inner(query, None)
    }

    /// Build the grouped lookup used by the batch loader:
    /// `key_field IN (...)` over the entity's table, selecting the document,
    /// the key as text and `__typename`.
    pub fn build_batch_lookup(
        &self,
        type_name: &str,
        key_field: &str,
        keys: &[String],
    ) -> Result<CompiledQuery> {
        let (table, field) = self.entity_key_field(type_name, key_field)?;
        let key_expr = key_text_expr(&field);
        let values = keys.iter().cloned().map(Value::String).collect();
        let query = SelectQuery::new(table.name.clone())
            .with_filter(FilterNode::in_list(key_field, values))
            .with_typename(type_name);
        self.build_inner(&query, Some(key_expr))
    }

    /// Validate a lookup key and return the text form rows are matched by.
    pub fn batch_key(&self, type_name: &str, key_field: &str, value: &Value) -> Result<String> {
        let (_, field) = self.entity_key_field(type_name, key_field)?;
        let path = FieldPath::parse(key_field);
        match field.sql_type.family() {
            TypeFamily::Json | TypeFamily::Vector(_) => {
                return Err(Error::type_cast(&path, "unsupported key type"));
            }
            _ if value.is_null() => return Err(Error::type_cast(&path, "key must not be null")),
            _ => {}
        }
        let text = scalar_param(&path, &field.sql_type, value)?
            .to_text()
            .ok_or_else(|| Error::type_cast(&path, "key must not be null"))?;
        canonical_key(&path, &field.sql_type, text)
    }

    fn entity_key_field(&self, type_name: &str, key_field: &str) -> Result<(&TableDef, ResolvedField)> {
        let mismatch = || Error::SchemaMismatch {
            table: type_name.to_string(),
            path: key_field.to_string(),
        };
        let entity = self.schema.entity(type_name).ok_or_else(mismatch)?;
        if !entity.is_key(key_field) {
            return Err(mismatch());
        }
        let table = self.schema.require_table(&entity.table)?;
        let field = self.schema.resolve(table, &FieldPath::parse(key_field))?;
        Ok((table, field))
    }

    fn build_inner(&self, query: &SelectQuery, batch_key: Option<String>) -> Result<CompiledQuery> {
        let table = self.schema.require_table(&query.table)?;
        let mut params = ParamList::new();

        let aggregate = !query.aggregations.is_empty() || !query.group_by.is_empty();
        let (mut select, mut shape, projection) = if aggregate {
            self.aggregate_projection(table, query)?
        } else {
            self.field_projection(table, &query.fields)?
        };

        if let Some(key_expr) = batch_key {
            select.push(format!("{} AS {}", key_expr, quote_ident(BATCH_KEY_COLUMN)));
        }
        if let Some(typename) = &query.typename {
            select.push(format!("{} AS {}", quote_literal(typename), quote_ident("__typename")));
            shape.typename = Some(typename.clone());
        }

        let mut sql = format!("SELECT {} FROM {}", select.join(", "), relation(&table.relation));

        if let Some(filter) = &query.filter {
            let predicate =
                FilterCompiler::new(&self.schema, table, &self.config).compile(filter, &mut params)?;
            sql.push_str(" WHERE ");
            sql.push_str(&predicate);
        }

        if aggregate && !query.group_by.is_empty() {
            let groups = query
                .group_by
                .iter()
                .map(|path| Ok(typed_expr(&self.schema.resolve(table, path)?)))
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(" GROUP BY ");
            sql.push_str(&groups.join(", "));
        }

        if !query.order_by.is_empty() {
            let orders = query
                .order_by
                .iter()
                .map(|order| self.order_expr(table, query, order, aggregate))
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders.join(", "));
        }

        if let Some(limit) = query.limit {
            let placeholder = params.push(SqlParam::Int(to_i64(limit, "limit")?));
            sql.push_str(&format!(" LIMIT {placeholder}::bigint"));
        }
        if let Some(offset) = query.offset {
            let placeholder = params.push(SqlParam::Int(to_i64(offset, "offset")?));
            sql.push_str(&format!(" OFFSET {placeholder}::bigint"));
        }

        tracing::debug!(
            table = %query.table,
            projection = ?projection,
            params = params.len(),
            "compiled query"
        );

        Ok(CompiledQuery {
            table: query.table.clone(),
            sql,
            params: params.into_vec(),
            shape,
            projection,
        })
    }

    fn field_projection(
        &self,
        table: &TableDef,
        fields: &[FieldSelection],
    ) -> Result<(Vec<String>, ResultShape, Projection)> {
        let mut select = Vec::new();
        let mut shape = ResultShape::default();

        let Some(document) = table.data_column.as_deref() else {
            // Without a document column every field is its own column.
            let selections: Vec<FieldSelection> = if fields.is_empty() {
                table
                    .fields
                    .iter()
                    .map(|f| FieldSelection::new(FieldPath::new([f.name.clone()])))
                    .collect()
            } else {
                fields.to_vec()
            };
            self.column_list(table, &selections, &mut select, &mut shape)?;
            return Ok((select, shape, Projection::ColumnList));
        };

        if !fields.is_empty() && fields.len() <= self.config.projection_threshold {
            self.column_list(table, fields, &mut select, &mut shape)?;
            return Ok((select, shape, Projection::ColumnList));
        }

        select.push(ident(document));
        if fields.is_empty() {
            shape.base_document = Some(document.to_string());
        }
        let mut columns = HashSet::new();
        for selection in fields {
            let field = self.schema.resolve(table, &selection.path)?;
            let source = if field.is_column() {
                let name = selection.column_name();
                if !columns.insert(name.clone()) || name == document {
                    return Err(duplicate(&name));
                }
                select.push(format!("{} AS {}", ident(&field.column), quote_ident(&name)));
                ShapeSource::Column(name)
            } else {
                ShapeSource::Document {
                    column: document.to_string(),
                    keys: field.keys,
                }
            };
            shape.fields.push(OutputField {
                key: output_key(selection),
                source,
            });
        }
        Ok((select, shape, Projection::FullDocument))
    }

    fn column_list(
        &self,
        table: &TableDef,
        fields: &[FieldSelection],
        select: &mut Vec<String>,
        shape: &mut ResultShape,
    ) -> Result<()> {
        let mut columns = HashSet::new();
        for selection in fields {
            let field = self.schema.resolve(table, &selection.path)?;
            let name = selection.column_name();
            if !columns.insert(name.clone()) {
                return Err(duplicate(&name));
            }
            select.push(format!("{} AS {}", extract(&field, false), quote_ident(&name)));
            shape.fields.push(OutputField {
                key: output_key(selection),
                source: ShapeSource::Column(name),
            });
        }
        Ok(())
    }

    fn aggregate_projection(
        &self,
        table: &TableDef,
        query: &SelectQuery,
    ) -> Result<(Vec<String>, ResultShape, Projection)> {
        for selection in &query.fields {
            if !query.group_by.contains(&selection.path) {
                return Err(Error::InvalidFilter(format!(
                    "field '{}' must appear in group_by",
                    selection.path
                )));
            }
        }

        let mut select = Vec::new();
        let mut shape = ResultShape::default();
        let mut columns = HashSet::new();

        for path in &query.group_by {
            let field = self.schema.resolve(table, path)?;
            let selection = query
                .fields
                .iter()
                .find(|s| &s.path == path)
                .cloned()
                .unwrap_or_else(|| FieldSelection::new(path.clone()));
            let name = selection.column_name();
            if !columns.insert(name.clone()) {
                return Err(duplicate(&name));
            }
            select.push(format!("{} AS {}", typed_expr(&field), quote_ident(&name)));
            shape.fields.push(OutputField {
                key: output_key(&selection),
                source: ShapeSource::Column(name),
            });
        }

        for aggregation in &query.aggregations {
            if !columns.insert(aggregation.alias.clone()) {
                return Err(duplicate(&aggregation.alias));
            }
            select.push(format!(
                "{} AS {}",
                self.aggregate_expr(table, aggregation)?,
                quote_ident(&aggregation.alias)
            ));
            shape.fields.push(OutputField {
                key: vec![aggregation.alias.clone()],
                source: ShapeSource::Column(aggregation.alias.clone()),
            });
        }

        Ok((select, shape, Projection::Aggregate))
    }

    fn aggregate_expr(&self, table: &TableDef, aggregation: &Aggregation) -> Result<String> {
        let function = aggregation.function;
        let Some(path) = &aggregation.path else {
            return match function {
                AggregateFunction::Count => Ok("COUNT(*)".to_string()),
                other => Err(Error::InvalidFilter(format!(
                    "{} requires a field",
                    other.sql_name()
                ))),
            };
        };

        let field = self.schema.resolve(table, path)?;
        let family = field.sql_type.family();
        let unsupported = || Error::UnsupportedOperator {
            path: path.dotted(),
            operator: function.sql_name().to_lowercase(),
            family: family.to_string(),
        };

        match function {
            AggregateFunction::Count => Ok(format!("COUNT({})", extract(&field, true))),
            AggregateFunction::Sum | AggregateFunction::Avg => match family {
                TypeFamily::Numeric => Ok(format!("{}({})", function.sql_name(), typed_expr(&field))),
                // Vector aggregates come back untyped; cast the result.
                TypeFamily::Vector(kind @ (VectorKind::Dense | VectorKind::Half)) => Ok(format!(
                    "{}({})::{}",
                    function.sql_name(),
                    typed_expr(&field),
                    kind.type_name()
                )),
                _ => Err(unsupported()),
            },
            AggregateFunction::Min | AggregateFunction::Max => match family {
                TypeFamily::Text | TypeFamily::Numeric | TypeFamily::Temporal | TypeFamily::LTree => {
                    Ok(format!("{}({})", function.sql_name(), typed_expr(&field)))
                }
                _ => Err(unsupported()),
            },
        }
    }

    fn order_expr(
        &self,
        table: &TableDef,
        query: &SelectQuery,
        order: &OrderSpec,
        aggregate: bool,
    ) -> Result<String> {
        let expr = if aggregate {
            let alias = match order.path.segments() {
                [single] => query.aggregations.iter().find(|a| &a.alias == single),
                _ => None,
            };
            match alias {
                Some(aggregation) => quote_ident(&aggregation.alias),
                None if query.group_by.contains(&order.path) => {
                    typed_expr(&self.schema.resolve(table, &order.path)?)
                }
                None => {
                    return Err(Error::InvalidFilter(format!(
                        "cannot order grouped results by '{}'",
                        order.path
                    )))
                }
            }
        } else {
            let field = self.schema.resolve(table, &order.path)?;
            if matches!(field.sql_type.family(), TypeFamily::Vector(_)) {
                return Err(Error::UnsupportedOperator {
                    path: order.path.dotted(),
                    operator: "order_by".to_string(),
                    family: field.sql_type.family().to_string(),
                });
            }
            typed_expr(&field)
        };

        let direction = match order.direction {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        };
        Ok(match order.nulls {
            Some(NullsOrder::First) => format!("{expr} {direction} NULLS FIRST"),
            Some(NullsOrder::Last) => format!("{expr} {direction} NULLS LAST"),
            None => format!("{expr} {direction}"),
        })
    }
}

fn output_key(selection: &FieldSelection) -> Vec<String> {
    match &selection.alias {
        Some(alias) => vec![alias.clone()],
        None => selection.path.segments().to_vec(),
    }
}

fn duplicate(name: &str) -> Error {
    Error::InvalidFilter(format!("duplicate output column '{name}'"))
}

fn to_i64(value: u64, what: &str) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::InvalidFilter(format!("{what} out of range")))
}

/// Render a validated key the way [`key_text_expr`] reads it back.
fn canonical_key(path: &FieldPath, sql_type: &SqlType, text: String) -> Result<String> {
    match sql_type {
        SqlType::Numeric => Ok(canonical_decimal(&text)),
        SqlType::Date => {
            let date = NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                .or_else(|_| DateTime::parse_from_rfc3339(&text).map(|t| t.date_naive()))
                .map_err(|e| Error::type_cast(path, format!("invalid date: {e}")))?;
            Ok(date.format("%Y-%m-%d").to_string())
        }
        SqlType::Timestamptz => {
            // Offset-less input is read as UTC.
            let utc = DateTime::parse_from_rfc3339(&text)
                .map(|t| t.with_timezone(&Utc))
                .or_else(|_| {
                    NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
                        .or_else(|_| NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f"))
                        .or_else(|_| {
                            NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                                .map(|d| d.and_time(NaiveTime::MIN))
                        })
                        .map(|t| t.and_utc())
                })
                .map_err(|e| Error::type_cast(path, format!("invalid timestamp: {e}")))?;
            Ok(utc.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string())
        }
        _ => Ok(text),
    }
}

/// Plain decimal text without a sign on zero, leading zeros or trailing
/// fractional zeros. Exponent forms are expanded through `f64`.
fn canonical_decimal(text: &str) -> String {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let plain = !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit() || c == '.');
    if !plain || digits.matches('.').count() > 1 {
        return match text.parse::<f64>() {
            Ok(f) if f.is_finite() && f.to_string() != text => canonical_decimal(&f.to_string()),
            _ => text.to_string(),
        };
    }
    let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));
    let int = int.trim_start_matches('0');
    let frac = frac.trim_end_matches('0');
    let mut out = String::new();
    if int.is_empty() && frac.is_empty() {
        return "0".to_string();
    }
    if negative {
        out.push('-');
    }
    out.push_str(if int.is_empty() { "0" } else { int });
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntityMetadata, FieldDef, RelationDef, SqlType};
    use pgql_proto::parse_where;
    use serde_json::json;

    fn schema() -> Arc<SchemaContext> {
        SchemaContext::builder()
            .table(
                TableDef::new("users")
                    .with_relation("public.v_user")
                    .with_field(FieldDef::jsonb("id", SqlType::Text))
                    .with_field(FieldDef::jsonb("name", SqlType::Text))
                    .with_field(FieldDef::jsonb("status", SqlType::Text))
                    .with_field(FieldDef::jsonb("age", SqlType::Integer))
                    .with_field(FieldDef::jsonb("tenant_id", SqlType::Text))
                    .with_field(FieldDef::column("created_at", SqlType::Timestamptz)),
            )
            .table(
                TableDef::new("posts")
                    .with_field(FieldDef::jsonb("id", SqlType::Integer))
                    .with_field(FieldDef::jsonb("title", SqlType::Text))
                    .with_field(FieldDef::jsonb("embedding", SqlType::vector(3)))
                    .with_field(FieldDef::jsonb("category", SqlType::Text))
                    .with_relationship(RelationDef::new("author", "users")),
            )
            .table(
                TableDef::new("accounts")
                    .without_data_column()
                    .with_field(FieldDef::column("id", SqlType::Uuid))
                    .with_field(FieldDef::column("email", SqlType::Text)),
            )
            .entity(EntityMetadata::builder("User", "users").key("id").build().unwrap())
            .entity(EntityMetadata::builder("Post", "posts").key("id").build().unwrap())
            .entity(EntityMetadata::builder("Account", "accounts").key("id").build().unwrap())
            .build()
            .unwrap()
    }

    fn builder() -> QueryBuilder {
        QueryBuilder::new(schema(), CompilerConfig::default())
    }

    #[test]
    fn test_column_list_projection() {
        let query = SelectQuery::new("users")
            .with_fields(["id", "name"])
            .select(FieldSelection::aliased("createdAt", "joined"))
            .with_filter(parse_where(&json!({"status": {"eq": "active"}})).unwrap().unwrap())
            .with_typename("User");
        let compiled = builder().build(&query).unwrap();

        assert_eq!(compiled.projection(), Projection::ColumnList);
        assert_eq!(
            compiled.sql(),
            "SELECT (data->'id') AS \"id\", (data->'name') AS \"name\", created_at AS \"joined\", \
             'User' AS \"__typename\" FROM public.v_user WHERE (data->>'status') = $1"
        );
        assert_eq!(compiled.params(), &[SqlParam::Text("active".into())]);

        let row = Row::from_pairs([
            ("id", json!("u-1")),
            ("name", json!("Ada")),
            ("joined", json!("2024-01-01T00:00:00+00:00")),
            ("__typename", json!("User")),
        ]);
        assert_eq!(
            compiled.shape_row(&row).unwrap(),
            json!({"id": "u-1", "name": "Ada", "joined": "2024-01-01T00:00:00+00:00", "__typename": "User"})
        );
    }

    #[test]
    fn test_full_document_projection_above_threshold() {
        let builder = QueryBuilder::new(
            schema(),
            CompilerConfig::default().with_projection_threshold(2),
        );
        let query = SelectQuery::new("posts").with_fields(["id", "title", "author.name"]);
        let compiled = builder.build(&query).unwrap();

        assert_eq!(compiled.projection(), Projection::FullDocument);
        assert_eq!(compiled.sql(), "SELECT data FROM posts");

        let row = Row::from_pairs([(
            "data",
            json!({"id": 7, "title": "Hello", "author": {"name": "Ada"}, "body": "..."}),
        )]);
        assert_eq!(
            compiled.shape_row(&row).unwrap(),
            json!({"id": 7, "title": "Hello", "author": {"name": "Ada"}})
        );
    }

    #[test]
    fn test_projections_agree_on_output() {
        let query = SelectQuery::new("posts")
            .with_fields(["title"])
            .select(FieldSelection::aliased("author.name", "authorName"));

        let narrow = builder().build(&query).unwrap();
        let wide = QueryBuilder::new(schema(), CompilerConfig::default().with_projection_threshold(0))
            .build(&query)
            .unwrap();
        assert_eq!(narrow.projection(), Projection::ColumnList);
        assert_eq!(wide.projection(), Projection::FullDocument);

        let narrow_row = Row::from_pairs([("title", json!("Hi")), ("authorName", json!("Ada"))]);
        let wide_row = Row::from_pairs([("data", json!({"title": "Hi", "author": {"name": "Ada"}}))]);
        assert_eq!(
            narrow.shape_row(&narrow_row).unwrap(),
            wide.shape_row(&wide_row).unwrap()
        );
    }

    #[test]
    fn test_order_limit_offset() {
        let query = SelectQuery::new("users")
            .with_fields(["id"])
            .order_by(OrderSpec::desc("age").with_nulls(NullsOrder::Last))
            .order_by(OrderSpec::asc("name"))
            .with_limit(10)
            .with_offset(20);
        let compiled = builder().build(&query).unwrap();

        assert_eq!(
            compiled.sql(),
            "SELECT (data->'id') AS \"id\" FROM public.v_user \
             ORDER BY (data->>'age')::integer DESC NULLS LAST, (data->>'name') ASC \
             LIMIT $1::bigint OFFSET $2::bigint"
        );
        assert_eq!(compiled.params(), &[SqlParam::Int(10), SqlParam::Int(20)]);
    }

    #[test]
    fn test_limit_params_follow_filter_params() {
        let query = SelectQuery::new("users")
            .with_fields(["id"])
            .with_filter(FilterNode::eq("status", "active"))
            .with_limit(5);
        let compiled = builder().build(&query).unwrap();
        assert!(compiled.sql().ends_with("WHERE (data->>'status') = $1 LIMIT $2::bigint"));
    }

    #[test]
    fn test_unknown_paths_fail_before_sql() {
        let err = builder()
            .build(&SelectQuery::new("users").with_fields(["nope"]))
            .unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));

        let err = builder()
            .build(&SelectQuery::new("users").with_fields(["id"]).order_by(OrderSpec::asc("nope")))
            .unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));

        let err = builder().build(&SelectQuery::new("nope")).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));
    }

    #[test]
    fn test_vector_aggregate_is_recast() {
        let query = SelectQuery::new("posts")
            .group_by("category")
            .aggregate(Aggregation::count("total"))
            .aggregate(Aggregation::over(AggregateFunction::Avg, "embedding", "centroid"))
            .order_by(OrderSpec::desc("total"));
        let compiled = builder().build(&query).unwrap();

        assert_eq!(compiled.projection(), Projection::Aggregate);
        assert_eq!(
            compiled.sql(),
            "SELECT (data->>'category') AS \"category\", COUNT(*) AS \"total\", \
             AVG((data->>'embedding')::vector)::vector AS \"centroid\" FROM posts \
             GROUP BY (data->>'category') ORDER BY \"total\" DESC"
        );
    }

    #[test]
    fn test_aggregate_validation() {
        let err = builder()
            .build(
                &SelectQuery::new("posts")
                    .aggregate(Aggregation::over(AggregateFunction::Sum, "title", "s")),
            )
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperator { .. }));

        let err = builder()
            .build(
                &SelectQuery::new("posts")
                    .with_fields(["title"])
                    .group_by("category")
                    .aggregate(Aggregation::count("n")),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFilter(_)));
    }

    #[test]
    fn test_build_with_auth() {
        let query = SelectQuery::new("users")
            .with_fields(["id"])
            .with_filter(FilterNode::eq("status", "active"));
        let auth = FilterNode::eq("tenant_id", "t-1");
        let compiled = builder().build_with_auth(&query, Some(&auth)).unwrap();

        assert!(compiled
            .sql()
            .ends_with("WHERE ((data->>'status') = $1 AND (data->>'tenant_id') = $2)"));
        assert_eq!(compiled.params().len(), 2);
    }

    #[test]
    fn test_batch_lookup() {
        let builder = builder();
        let keys: Vec<String> = ["1", "2", "3"].iter().map(|s| s.to_string()).collect();
        let compiled = builder.build_batch_lookup("Post", "id", &keys).unwrap();

        assert_eq!(
            compiled.sql(),
            "SELECT data, (data->>'id')::integer::text AS \"__key\", 'Post' AS \"__typename\" FROM posts \
             WHERE (data->>'id')::integer IN ($1::integer, $2::integer, $3::integer)"
        );
        assert_eq!(compiled.params().len(), 3);

        let row = Row::from_pairs([("data", json!({"id": 2, "title": "x"})), ("__key", json!("2"))]);
        assert_eq!(
            compiled.shape_row(&row).unwrap(),
            json!({"id": 2, "title": "x", "__typename": "Post"})
        );
    }

    #[test]
    fn test_batch_lookup_without_document_column() {
        let builder = builder();
        let key = builder
            .batch_key("Account", "id", &json!("550E8400-E29B-41D4-A716-446655440000"))
            .unwrap();
        assert_eq!(key, "550e8400-e29b-41d4-a716-446655440000");

        let compiled = builder.build_batch_lookup("Account", "id", &[key]).unwrap();
        assert_eq!(
            compiled.sql(),
            "SELECT id AS \"id\", email AS \"email\", id::text AS \"__key\", \
             'Account' AS \"__typename\" FROM accounts WHERE id IN ($1::uuid)"
        );
    }

    #[test]
    fn test_batch_key_validation() {
        let builder = builder();
        assert_eq!(builder.batch_key("Post", "id", &json!(42)).unwrap(), "42");
        assert_eq!(builder.batch_key("Post", "id", &json!("42")).unwrap(), "42");

        let err = builder.batch_key("Post", "id", &json!("abc")).unwrap_err();
        assert!(matches!(err, Error::TypeCast { .. }));

        let err = builder.batch_key("Post", "title", &json!("x")).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));

        let err = builder.batch_key("Ghost", "id", &json!("x")).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));
    }

    fn keyed_builder() -> QueryBuilder {
        let schema = SchemaContext::builder()
            .table(
                TableDef::new("skus")
                    .with_field(FieldDef::jsonb("code", SqlType::Numeric))
                    .with_field(FieldDef::jsonb("device", SqlType::Uuid))
                    .with_field(FieldDef::jsonb("seen_at", SqlType::Timestamptz))
                    .with_field(FieldDef::jsonb("day", SqlType::Date)),
            )
            .entity(
                EntityMetadata::builder("Sku", "skus")
                    .key("code")
                    .key("device")
                    .key("seen_at")
                    .key("day")
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        QueryBuilder::new(schema, CompilerConfig::default())
    }

    #[test]
    fn test_batch_key_matches_typed_key_text() {
        let builder = keyed_builder();

        assert_eq!(builder.batch_key("Sku", "code", &json!("1.50")).unwrap(), "1.5");
        assert_eq!(builder.batch_key("Sku", "code", &json!(1.5)).unwrap(), "1.5");
        assert_eq!(builder.batch_key("Sku", "code", &json!("007.000")).unwrap(), "7");
        assert_eq!(builder.batch_key("Sku", "code", &json!("-0.0")).unwrap(), "0");
        assert_eq!(builder.batch_key("Sku", "code", &json!("2.5e1")).unwrap(), "25");
        assert_eq!(
            builder
                .batch_key("Sku", "device", &json!("550E8400-E29B-41D4-A716-446655440000"))
                .unwrap(),
            "550e8400-e29b-41d4-a716-446655440000"
        );
        assert_eq!(
            builder
                .batch_key("Sku", "seen_at", &json!("2024-01-01T02:00:00+02:00"))
                .unwrap(),
            "2024-01-01T00:00:00.000000Z"
        );
        assert_eq!(
            builder.batch_key("Sku", "day", &json!("2024-03-09T23:00:00-05:00")).unwrap(),
            "2024-03-09"
        );

        let compiled = builder
            .build_batch_lookup("Sku", "code", &["1.5".to_string()])
            .unwrap();
        assert_eq!(
            compiled.sql(),
            "SELECT data, trim_scale((data->>'code')::numeric)::text AS \"__key\", \
             'Sku' AS \"__typename\" FROM skus WHERE (data->>'code')::numeric IN ($1::numeric)"
        );

        let compiled = builder
            .build_batch_lookup("Sku", "device", &["550e8400-e29b-41d4-a716-446655440000".to_string()])
            .unwrap();
        assert!(compiled
            .sql()
            .contains("(data->>'device')::uuid::text AS \"__key\""));
    }
}
