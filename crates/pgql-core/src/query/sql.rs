//! SQL text helpers.

use crate::catalog::{ResolvedField, SqlType, TypeFamily};

/// Render a validated identifier, quoting it when it would otherwise be
/// case-folded.
pub fn ident(name: &str) -> String {
    if name.chars().any(|c| c.is_ascii_uppercase()) {
        quote_ident(name)
    } else {
        name.to_string()
    }
}

/// Double-quote an identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quote a string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Render a schema-qualified relation.
pub fn relation(name: &str) -> String {
    name.split('.').map(ident).collect::<Vec<_>>().join(".")
}

/// Value expression for a field.
///
/// `as_text` selects `->>` for the last JSON key; otherwise `->` keeps the
/// JSON value.
pub fn extract(field: &ResolvedField, as_text: bool) -> String {
    if field.keys.is_empty() {
        return ident(&field.column);
    }
    let mut expr = String::from("(");
    expr.push_str(&ident(&field.column));
    let last = field.keys.len() - 1;
    for (i, key) in field.keys.iter().enumerate() {
        expr.push_str(if i == last && as_text { "->>" } else { "->" });
        expr.push_str(&quote_literal(key));
    }
    expr.push(')');
    expr
}

/// Typed comparison expression for a field.
///
/// Text values of document fields compare uncast; everything else is cast
/// to its declared type. Direct columns already carry their type.
pub fn typed_expr(field: &ResolvedField) -> String {
    match field.sql_type.family() {
        TypeFamily::Json => extract(field, false),
        TypeFamily::Text => extract(field, true),
        _ if field.is_column() => extract(field, true),
        _ => format!("{}::{}", extract(field, true), field.sql_type.cast_name()),
    }
}

/// Canonical text of a key field, as batch rows are matched by.
///
/// The value goes through its declared type first so that stored spellings
/// such as upper-case UUIDs or `1.50` read back the way
/// [`QueryBuilder::batch_key`](super::QueryBuilder::batch_key) renders them.
/// Decimals drop trailing zeros and timestamps render in UTC.
pub fn key_text_expr(field: &ResolvedField) -> String {
    if field.sql_type.family() == TypeFamily::Text && !field.is_column() {
        return extract(field, true);
    }
    let typed = typed_expr(field);
    match field.sql_type {
        SqlType::Numeric => format!("trim_scale({typed})::text"),
        SqlType::Timestamptz => format!(
            "to_char({typed} AT TIME ZONE 'UTC', 'YYYY-MM-DD\"T\"HH24:MI:SS.US\"Z\"')"
        ),
        _ => format!("{typed}::text"),
    }
}

/// Cast suffix for a placeholder of this type, empty for text.
pub fn cast_suffix(sql_type: &SqlType) -> String {
    match sql_type.family() {
        TypeFamily::Text => String::new(),
        _ => format!("::{}", sql_type.cast_name()),
    }
}
