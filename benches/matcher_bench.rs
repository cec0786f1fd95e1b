use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use soundmatch::{FingerprintConfiguration, QueryFingerprintService};

mod common;
use common::{bench_config, build_catalogue, query_from};

/// Benchmark a query against catalogues of growing size
fn bench_query_scale(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_scale");

    for tracks in [10u64, 100, 500] {
        let service = QueryFingerprintService::with_index(Arc::new(build_catalogue(tracks, 300)));
        let query = query_from(tracks / 2, 40, 64, 10);
        let config = bench_config();

        group.throughput(Throughput::Elements(query.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(tracks), &tracks, |b, _| {
            b.iter(|| {
                service
                    .query(black_box(&query), black_box(&config))
                    .expect("query should succeed")
            });
        });
    }

    group.finish();
}

/// Benchmark parallel vs sequential retrieval
fn bench_retrieval_mode(c: &mut Criterion) {
    let mut group = c.benchmark_group("retrieval_mode");
    let service = QueryFingerprintService::with_index(Arc::new(build_catalogue(200, 300)));
    let query = query_from(17, 0, 128, 5);

    for use_parallel in [false, true] {
        let config = FingerprintConfiguration {
            use_parallel,
            ..bench_config()
        };
        let label = if use_parallel { "parallel" } else { "sequential" };
        group.bench_function(label, |b| {
            b.iter(|| {
                service
                    .query(black_box(&query), black_box(&config))
                    .expect("query should succeed")
            });
        });
    }

    group.finish();
}

/// Benchmark query length on a fixed catalogue
fn bench_query_length(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_length");
    let service = QueryFingerprintService::with_index(Arc::new(build_catalogue(100, 600)));
    let config = bench_config();

    for len in [16u32, 64, 256] {
        let query = query_from(42, 10, len, 8);
        group.throughput(Throughput::Elements(u64::from(len)));
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| {
                service
                    .query(black_box(&query), black_box(&config))
                    .expect("query should succeed")
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_query_scale,
    bench_retrieval_mode,
    bench_query_length
);
criterion_main!(benches);
