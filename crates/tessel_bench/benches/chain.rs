//! Transaction chain benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use tessel_bench::{random_products, seeded_shop};
use tessel_core::Database;
use tessel_engine::KeyRange;
use tokio::runtime::Runtime;

/// Benchmark write chains of growing size.
fn bench_write_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_chain");
    let rt = Runtime::new().expect("tokio runtime");

    for batch_size in [1, 10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, &batch_size| {
                let db = Database::new(tessel_bench::empty_shop());
                let products = random_products(batch_size);

                b.iter(|| {
                    let mut chain = db.write(["products", "orders"]);
                    for product in &products {
                        chain.put("products", black_box(product.clone()));
                    }
                    chain.add("orders", json!({"items": batch_size}));
                    rt.block_on(chain.commit()).unwrap();
                });
            },
        );
    }
    group.finish();
}

/// Benchmark a mixed read chain against a seeded collection.
fn bench_read_chain(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let db = seeded_shop(&rt, 10_000);

    c.bench_function("read_chain_mixed", |b| {
        b.iter(|| {
            let mut chain = db.read(["products"]);
            chain
                .get("products", 42)
                .count("products", None)
                .get_all("products", Some(KeyRange::lower_bound(500, false)), Some(50))
                .get_all_by_index("products", "price", Some(KeyRange::upper_bound(100, true)));
            black_box(rt.block_on(chain.execute()).unwrap());
        });
    });
}

/// Benchmark the no-op path of empty chains.
fn bench_empty_chain(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let db = Database::new(tessel_bench::empty_shop());

    c.bench_function("empty_write_chain", |b| {
        b.iter(|| rt.block_on(db.write(["products"]).commit()).unwrap());
    });
}

criterion_group!(benches, bench_write_chain, bench_read_chain, bench_empty_chain);
criterion_main!(benches);
