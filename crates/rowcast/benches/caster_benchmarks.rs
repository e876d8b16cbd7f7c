//! Caster performance benchmarks.
//!
//! Measures casting, parsing and writing across different record counts.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rowcast::{
    write_records, Caster, FieldType, InputFormat, OutputFormat, Parser, RuleSpec, TypeRegistry,
};
use serde_json::{json, Value};

/// Generate synthetic records with a mix of value types.
fn generate_records(rows: usize) -> Value {
    Value::Array(
        (0..rows)
            .map(|row| {
                json!({
                    "id": row.to_string(),
                    "price": format!("{:.2}", row as f64 * 1.5),
                    "active": if row % 2 == 0 { "1" } else { "0" },
                    "created_at": format!("2023-{:02}-{:02} 10:00:00", (row % 12) + 1, (row % 28) + 1),
                    "tags": format!("tag_{}", row % 10),
                    "password": "secret",
                })
            })
            .collect(),
    )
}

/// Generate the same records as CSV text.
fn generate_csv_data(rows: usize) -> String {
    let mut data = String::from("id,price,active,created_at,tags,password\n");
    for row in 0..rows {
        data.push_str(&format!(
            "{},{:.2},{},2023-{:02}-{:02} 10:00:00,tag_{},secret\n",
            row,
            row as f64 * 1.5,
            row % 2,
            (row % 12) + 1,
            (row % 28) + 1,
            row % 10
        ));
    }
    data
}

fn builder_caster() -> Caster {
    Caster::with_registry(Arc::new(TypeRegistry::with_builtins()))
        .allow(["id", "price", "active", "created_at", "tags", "password"])
        .deny(["password"])
        .with_type(FieldType::Integer, ["id"])
        .with_type(FieldType::Float, ["price"])
        .with_type(FieldType::Boolean, ["active"])
        .with_type(FieldType::Array, ["tags"])
        .with_custom("timestamp", ["created_at"])
        .unwrap()
        .rename("tags", "labels")
}

/// Benchmark casting lists of records of various sizes.
fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");
    let caster = builder_caster();

    for rows in [100, 1_000, 10_000].iter() {
        let data = generate_records(*rows);

        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &data, |b, data| {
            b.iter(|| black_box(caster.transform(data, false).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark building a caster from a rules file body.
fn bench_build_rules(c: &mut Criterion) {
    let registry = Arc::new(TypeRegistry::with_builtins());
    let rules = r#"{
        "allow": ["id", {"price": "float|nullable"}, "active", "created_at", "tags"],
        "integer": ["id"],
        "boolean": ["active"],
        "array": ["tags"],
        "rename": {"tags": "labels"},
        "timestamp": ["created_at"]
    }"#;

    c.bench_function("build_rules", |b| {
        b.iter(|| {
            let spec: RuleSpec = black_box(rules).parse().unwrap();
            black_box(spec.build(Arc::clone(&registry)).unwrap())
        })
    });
}

/// Benchmark parsing CSV input into records.
fn bench_parse_csv(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_csv");

    for rows in [100, 1_000, 10_000].iter() {
        let data = generate_csv_data(*rows);

        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &data, |b, data| {
            let parser = Parser::new();
            b.iter(|| black_box(parser.parse_bytes(data.as_bytes(), InputFormat::Delimited).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark writing cast records as CSV.
fn bench_write_csv(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_csv");
    let caster = builder_caster();

    for rows in [100, 1_000].iter() {
        let cast = caster.transform(&generate_records(*rows), false).unwrap();

        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &cast, |b, cast| {
            b.iter(|| {
                let mut out = Vec::new();
                write_records(cast, OutputFormat::Csv, &mut out).unwrap();
                black_box(out)
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_transform,
    bench_build_rules,
    bench_parse_csv,
    bench_write_csv
);
criterion_main!(benches);
