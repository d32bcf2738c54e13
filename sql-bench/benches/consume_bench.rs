//! Criterion benchmark: cost of executing the prepared statement and draining
//! its cursor, per byte-count policy, over an in-memory SQLite result set.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use sql_bench::bind::rewrite_query;
use sql_bench::consumer::{ByteCountPolicy, ResultConsumer, RowSink};
use sql_bench::driver::sqlite::SqliteDriver;
use sql_bench::driver::{CursorOptions, Driver};

const QUERY: &str = "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 500) \
                     SELECT i, printf('%020d', i), i * 0.5, NULL FROM n";

struct Discard;

impl RowSink for Discard {
    fn line(&mut self, _line: &str) {}
}

fn bench_consume(c: &mut Criterion) {
    let driver = SqliteDriver::new();
    let conn = driver
        .connect(":memory:", "", "")
        .expect("Failed to open in-memory SQLite");
    let mut stmt = conn
        .prepare(&rewrite_query(QUERY), CursorOptions::scroll_insensitive_read_only())
        .expect("Failed to prepare");

    let mut group = c.benchmark_group("consume");
    for (label, policy) in [
        ("each-column", ByteCountPolicy::EachColumn),
        ("first-column", ByteCountPolicy::FirstColumn),
    ] {
        let consumer = ResultConsumer::new(100, policy);
        group.bench_with_input(BenchmarkId::from_parameter(label), &consumer, |b, consumer| {
            b.iter(|| {
                let mut cursor = stmt.execute().expect("execute failed");
                let result = consumer
                    .consume(&mut *cursor, &mut Discard)
                    .expect("consume failed");
                cursor.close().expect("close failed");
                result
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_consume);
criterion_main!(benches);
