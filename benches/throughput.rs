//! Throughput Benchmark for tickstore
//!
//! This benchmark measures the store and the line codec under a few
//! representative workloads.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;
use tickstore::protocol::{decode, encode, CommandResult};
use tickstore::storage::{MetricStore, WILDCARD};

/// Benchmark put operations
fn bench_put(c: &mut Criterion) {
    let store = Arc::new(MetricStore::new());

    let mut group = c.benchmark_group("put");
    group.throughput(Throughput::Elements(1));

    group.bench_function("put_new_series", |b| {
        let mut i = 0i64;
        b.iter(|| {
            store.put(&format!("series:{}", i), 1.0, i);
            i += 1;
        });
    });

    group.bench_function("put_append", |b| {
        let mut i = 0i64;
        b.iter(|| {
            store.put("append", i as f64, i);
            i += 1;
        });
    });

    group.bench_function("put_overwrite", |b| {
        let mut i = 0i64;
        b.iter(|| {
            store.put("overwrite", i as f64, i % 100);
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark get operations
fn bench_get(c: &mut Criterion) {
    let store = Arc::new(MetricStore::new());

    for key in 0..1_000 {
        for ts in 0..100 {
            store.put(&format!("key:{}", key), ts as f64, ts);
        }
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(store.get(&format!("key:{}", i % 1_000)));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(store.get(&format!("missing:{}", i)));
            i += 1;
        });
    });

    group.measurement_time(Duration::from_secs(10));
    group.bench_function("get_wildcard", |b| {
        b.iter(|| black_box(store.get(WILDCARD)));
    });

    group.finish();
}

/// Benchmark the line codec
fn bench_codec(c: &mut Criterion) {
    let batch: String = (0..100)
        .map(|i| format!("put metric.{} {}.5 {}\n", i % 10, i, 1_700_000_000 + i))
        .collect();

    let store = MetricStore::new();
    for i in 0..100 {
        store.put(&format!("metric.{}", i % 10), i as f64, i);
    }
    let results = vec![CommandResult::Series(store.get(WILDCARD))];

    let mut group = c.benchmark_group("codec");

    group.throughput(Throughput::Bytes(batch.len() as u64));
    group.bench_function("decode_batch_100", |b| {
        b.iter(|| black_box(decode(black_box(&batch))));
    });

    group.throughput(Throughput::Elements(100));
    group.bench_function("encode_100_samples", |b| {
        b.iter(|| black_box(encode(black_box(&results))));
    });

    group.finish();
}

/// Benchmark concurrent writers on separate keys
fn bench_concurrent(c: &mut Criterion) {
    let store = Arc::new(MetricStore::new());

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    for threads in [1, 2, 4, 8] {
        group.throughput(Throughput::Elements(threads as u64 * 1_000));
        group.bench_function(format!("put_{}_threads", threads), |b| {
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|t| {
                        let store = Arc::clone(&store);
                        std::thread::spawn(move || {
                            let key = format!("thread:{}", t);
                            for ts in 0..1_000 {
                                store.put(&key, ts as f64, ts);
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_put, bench_get, bench_codec, bench_concurrent);
criterion_main!(benches);
