//! Query fingerprints and cache keys.

use pgql_proto::{FilterNode, SelectQuery};
use serde_json::{json, Map, Value};

use crate::query::SqlParam;

/// Deterministic, order-independent hash of a query and its bound values.
///
/// Field lists are sorted and the children of every `And`/`Or` are ordered
/// by their canonical form, so structurally equal queries written in a
/// different order share a fingerprint. Ordering clauses stay positional.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct QueryFingerprint {
    hash: [u8; 32],
}

impl QueryFingerprint {
    /// Fingerprint a query (with its merged filter) and its parameters.
    pub fn new(query: &SelectQuery, params: &[SqlParam]) -> Self {
        let mut fields: Vec<Value> = query
            .fields
            .iter()
            .map(|f| json!([f.path.dotted(), f.alias]))
            .collect();
        fields.sort_by_key(|v| v.to_string());

        let mut bound: Vec<String> = params.iter().map(|p| p.to_json().to_string()).collect();
        bound.sort();

        let canonical = json!({
            "table": query.table,
            "fields": fields,
            "filter": query.filter.as_ref().map(|f| canonical_filter(&f.clone().flatten())),
            "order": query
                .order_by
                .iter()
                .map(|o| json!([o.path.dotted(), o.direction, o.nulls]))
                .collect::<Vec<_>>(),
            "group": query.group_by.iter().map(|p| p.dotted()).collect::<Vec<_>>(),
            "aggregations": query
                .aggregations
                .iter()
                .map(|a| json!([a.function, a.path.as_ref().map(|p| p.dotted()), a.alias]))
                .collect::<Vec<_>>(),
            "limit": query.limit,
            "offset": query.offset,
            "typename": query.typename,
            "params": bound,
        });

        Self {
            hash: *blake3::hash(canonical.to_string().as_bytes()).as_bytes(),
        }
    }

    /// Lowercase hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

fn canonical_filter(node: &FilterNode) -> Value {
    match node {
        FilterNode::Leaf {
            path,
            operator,
            value,
        } => json!({"f": path.dotted(), "op": operator.name(), "v": canonical_value(value)}),
        FilterNode::And(children) => json!({"and": sorted_children(children)}),
        FilterNode::Or(children) => json!({"or": sorted_children(children)}),
        FilterNode::Not(child) => json!({"not": canonical_filter(child)}),
    }
}

fn sorted_children(children: &[FilterNode]) -> Vec<Value> {
    let mut canon: Vec<(String, Value)> = children
        .iter()
        .map(|c| {
            let v = canonical_filter(c);
            (v.to_string(), v)
        })
        .collect();
    canon.sort_by(|a, b| a.0.cmp(&b.0));
    canon.into_iter().map(|(_, v)| v).collect()
}

/// Rebuild objects with sorted keys so input key order never matters.
fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::with_capacity(map.len());
            for key in keys {
                out.insert(key.clone(), canonical_value(&map[key]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical_value).collect()),
        other => other.clone(),
    }
}

/// Build a cache key: `{prefix}:{tenant|_}:{table}:{fingerprint}`.
///
/// `:`, `*` and `%` in the tenant are percent-encoded so a tenant can never
/// widen a scoped pattern.
pub fn cache_key(
    prefix: &str,
    tenant: Option<&str>,
    table: &str,
    fingerprint: &QueryFingerprint,
) -> String {
    let tenant = tenant.map(encode_segment).unwrap_or_else(|| "_".to_string());
    format!(
        "{}:{}:{}:{}",
        prefix,
        tenant,
        encode_segment(table),
        fingerprint.to_hex()
    )
}

/// Pattern matching every key of one tenant.
pub fn tenant_pattern(prefix: &str, tenant: &str) -> String {
    format!("{}:{}:*", prefix, encode_segment(tenant))
}

fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        match c {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            '*' => out.push_str("%2A"),
            c => out.push(c),
        }
    }
    out
}

/// Match a key against a pattern where `*` matches any run of characters.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let k: Vec<char> = key.chars().collect();
    let (mut pi, mut ki) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ki < k.len() {
        if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ki));
            pi += 1;
        } else if pi < p.len() && p[pi] == k[ki] {
            pi += 1;
            ki += 1;
        } else if let Some((sp, sk)) = star {
            pi = sp + 1;
            ki = sk + 1;
            star = Some((sp, sk + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == '*')
}

/// Literal prefix of a pattern, before its first `*`.
pub fn pattern_prefix(pattern: &str) -> &str {
    match pattern.find('*') {
        Some(i) => &pattern[..i],
        None => pattern,
    }
}
