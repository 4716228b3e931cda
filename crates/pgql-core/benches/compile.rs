//! Compilation and fingerprinting benchmarks.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pgql_core::cache::QueryFingerprint;
use pgql_core::catalog::{EntityMetadata, FieldDef, SchemaContext, SqlType, TableDef};
use pgql_core::proto::{parse_where, SelectQuery};
use pgql_core::{compile_filter, CompilerConfig, QueryBuilder};
use serde_json::{json, Value};

fn schema() -> Arc<SchemaContext> {
    let mut table = TableDef::new("users")
        .with_field(FieldDef::jsonb("id", SqlType::Text))
        .with_field(FieldDef::jsonb("status", SqlType::Text))
        .with_field(FieldDef::jsonb("age", SqlType::Integer))
        .with_field(FieldDef::jsonb("created_at", SqlType::Timestamptz))
        .with_field(FieldDef::jsonb("embedding", SqlType::vector(3)));
    for i in 0..40 {
        table = table.with_field(FieldDef::jsonb(format!("extra_{i}"), SqlType::Text));
    }
    SchemaContext::builder()
        .table(table)
        .entity(EntityMetadata::builder("User", "users").key("id").build().unwrap())
        .build()
        .unwrap()
}

fn nested_filter(depth: usize) -> Value {
    let mut filter = json!({"status": {"eq": "active"}});
    for i in 0..depth {
        filter = json!({
            "OR": [filter, {"age": {"gte": i}}],
            "createdAt": {"lt": "2024-06-01T00:00:00Z"}
        });
    }
    filter
}

fn bench_compile_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/filter");
    let schema = schema();
    let config = CompilerConfig::default();

    for depth in [1, 4, 16] {
        let filter = parse_where(&nested_filter(depth)).unwrap().unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(depth), &filter, |b, filter| {
            b.iter(|| black_box(compile_filter(filter, "users", &schema, &config).unwrap()));
        });
    }

    group.bench_function("vector", |b| {
        let filter = parse_where(&json!({
            "embedding": {"cosine_distance": {"vector": [0.1, 0.2, 0.3], "threshold": 0.5}}
        }))
        .unwrap()
        .unwrap();
        b.iter(|| black_box(compile_filter(&filter, "users", &schema, &config).unwrap()));
    });

    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/build");
    let builder = QueryBuilder::new(schema(), CompilerConfig::default());
    let filter = parse_where(&nested_filter(4)).unwrap().unwrap();

    for fields in [5, 40] {
        let query = SelectQuery::new("users")
            .with_fields((0..fields).map(|i| format!("extra_{}", i % 40)))
            .with_filter(filter.clone())
            .with_limit(50);
        group.bench_with_input(BenchmarkId::new("fields", fields), &query, |b, query| {
            b.iter(|| black_box(builder.build(query).unwrap()));
        });
    }

    group.bench_function("batch_lookup/100", |b| {
        let keys: Vec<String> = (0..100).map(|i| format!("user-{i}")).collect();
        b.iter(|| black_box(builder.build_batch_lookup("User", "id", &keys).unwrap()));
    });

    group.finish();
}

fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");
    let builder = QueryBuilder::new(schema(), CompilerConfig::default());

    for depth in [1, 16] {
        let query = SelectQuery::new("users")
            .with_fields(["id", "status", "age"])
            .with_filter(parse_where(&nested_filter(depth)).unwrap().unwrap());
        let compiled = builder.build(&query).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(depth), &query, |b, query| {
            b.iter(|| black_box(QueryFingerprint::new(query, compiled.params()).to_hex()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile_filter, bench_build, bench_fingerprint);
criterion_main!(benches);
