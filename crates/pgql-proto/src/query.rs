//! Selection query IR.

use serde::{Deserialize, Serialize};

use crate::filter::FilterNode;
use crate::path::FieldPath;

/// A requested field, optionally aliased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldSelection {
    /// Path of the value to select.
    pub path: FieldPath,
    /// Output alias (top-level key in the result object).
    pub alias: Option<String>,
}

impl FieldSelection {
    /// Select a field under its own name.
    pub fn new(path: impl Into<FieldPath>) -> Self {
        Self {
            path: path.into(),
            alias: None,
        }
    }

    /// Select a field under an alias.
    pub fn aliased(path: impl Into<FieldPath>, alias: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            alias: Some(alias.into()),
        }
    }

    /// Name of the SQL output column for this selection.
    pub fn column_name(&self) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => self.path.segments().join("__"),
        }
    }
}

impl From<&str> for FieldSelection {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for FieldSelection {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

/// Placement of NULLs in an ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullsOrder {
    /// NULLs sort before other values.
    First,
    /// NULLs sort after other values.
    Last,
}

/// Ordering specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Field to order by.
    pub path: FieldPath,
    /// Sort direction.
    pub direction: OrderDirection,
    /// Explicit NULL placement.
    pub nulls: Option<NullsOrder>,
}

impl OrderSpec {
    /// Ascending order on a field.
    pub fn asc(path: impl Into<FieldPath>) -> Self {
        Self {
            path: path.into(),
            direction: OrderDirection::Asc,
            nulls: None,
        }
    }

    /// Descending order on a field.
    pub fn desc(path: impl Into<FieldPath>) -> Self {
        Self {
            path: path.into(),
            direction: OrderDirection::Desc,
            nulls: None,
        }
    }

    /// Set NULL placement.
    pub fn with_nulls(mut self, nulls: NullsOrder) -> Self {
        self.nulls = Some(nulls);
        self
    }
}

/// Aggregate function types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    /// Count of rows or non-null values.
    Count,
    /// Sum of values.
    Sum,
    /// Average of values.
    Avg,
    /// Minimum value.
    Min,
    /// Maximum value.
    Max,
}

impl AggregateFunction {
    /// SQL function name.
    pub fn sql_name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        }
    }
}

/// A single aggregation in a grouped query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Aggregation {
    /// The aggregation function to apply.
    pub function: AggregateFunction,
    /// Field to aggregate (None for `COUNT(*)`).
    pub path: Option<FieldPath>,
    /// Output column name.
    pub alias: String,
}

impl Aggregation {
    /// `COUNT(*)`.
    pub fn count(alias: impl Into<String>) -> Self {
        Self {
            function: AggregateFunction::Count,
            path: None,
            alias: alias.into(),
        }
    }

    /// An aggregation over a field.
    pub fn over(
        function: AggregateFunction,
        path: impl Into<FieldPath>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            function,
            path: Some(path.into()),
            alias: alias.into(),
        }
    }
}

/// A selection against one table or view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectQuery {
    /// Catalog name of the table or view.
    pub table: String,
    /// Fields to return.
    pub fields: Vec<FieldSelection>,
    /// Explicit filter supplied by the caller.
    pub filter: Option<FilterNode>,
    /// Ordering specification.
    pub order_by: Vec<OrderSpec>,
    /// Grouping fields.
    pub group_by: Vec<FieldPath>,
    /// Aggregations (only meaningful with `group_by` or alone).
    pub aggregations: Vec<Aggregation>,
    /// Maximum number of rows.
    pub limit: Option<u64>,
    /// Number of rows to skip.
    pub offset: Option<u64>,
    /// Inject a literal `__typename` column with this type name.
    pub typename: Option<String>,
}

impl SelectQuery {
    /// Create a query against a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: vec![],
            filter: None,
            order_by: vec![],
            group_by: vec![],
            aggregations: vec![],
            limit: None,
            offset: None,
            typename: None,
        }
    }

    /// Set the fields to select.
    pub fn with_fields<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldSelection>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Add one field selection.
    pub fn select(mut self, field: impl Into<FieldSelection>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Set the filter.
    pub fn with_filter(mut self, filter: FilterNode) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Add an ordering.
    pub fn order_by(mut self, order: OrderSpec) -> Self {
        self.order_by.push(order);
        self
    }

    /// Add a grouping field.
    pub fn group_by(mut self, path: impl Into<FieldPath>) -> Self {
        self.group_by.push(path.into());
        self
    }

    /// Add an aggregation.
    pub fn aggregate(mut self, aggregation: Aggregation) -> Self {
        self.aggregations.push(aggregation);
        self
    }

    /// Set the row limit.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the row offset.
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Request a `__typename` column.
    pub fn with_typename(mut self, typename: impl Into<String>) -> Self {
        self.typename = Some(typename.into());
        self
    }

    /// Whether this is an aggregate query.
    pub fn is_aggregate(&self) -> bool {
        !self.aggregations.is_empty()
    }
}
