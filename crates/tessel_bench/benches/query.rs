//! Query execution benchmarks: bulk versus cursor paths.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tessel_bench::seeded_shop;
use tessel_core::Order;
use tokio::runtime::Runtime;

/// Benchmark full index scans in both orders (bulk path).
fn bench_bulk_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulk_scan");
    let rt = Runtime::new().expect("tokio runtime");

    for size in [100, 1_000, 10_000].iter() {
        let db = seeded_shop(&rt, *size);
        group.throughput(Throughput::Elements(*size as u64));
        for order in [Order::Ascending, Order::Descending] {
            group.bench_with_input(BenchmarkId::new(order.to_string(), size), size, |b, _| {
                let query = db.query("products").index("price").order_by(order);
                b.iter(|| {
                    let records = rt.block_on(query.find_all()).unwrap();
                    black_box(records);
                });
            });
        }
    }
    group.finish();
}

/// Benchmark paged reads (cursor path) at growing offsets.
fn bench_cursor_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("cursor_page");
    let rt = Runtime::new().expect("tokio runtime");
    let db = seeded_shop(&rt, 10_000);

    for offset in [0u32, 100, 1_000, 5_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(offset), offset, |b, &offset| {
            let query = db
                .query("products")
                .index("price")
                .gte(1_000)
                .offset(offset)
                .limit(20);
            b.iter(|| {
                let records = rt.block_on(query.find_all()).unwrap();
                black_box(records);
            });
        });
    }
    group.finish();
}

/// Benchmark counts over ranges of different widths.
fn bench_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("count");
    let rt = Runtime::new().expect("tokio runtime");
    let db = seeded_shop(&rt, 10_000);

    for upper in [100, 1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(upper), upper, |b, &upper| {
            let query = db.query("products").index("price").lt(upper);
            b.iter(|| black_box(rt.block_on(query.count()).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_bulk_scan, bench_cursor_page, bench_count);
criterion_main!(benches);
