//! Criterion benchmarks for the harness's own hot paths.
//!
//! Covers: latency summarization, content and embedding generation, report
//! assembly. The harness should never be the slow part of a measurement.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use mem_bench_core::catalog::{SUITE_CREATION, creation_key};
use mem_bench_core::{
    SuiteSet, SummaryMode, SummaryStatistic, assemble, random_content, random_embedding,
    seeded_rng, summarize,
};

fn synthetic_latencies(n: usize) -> Vec<f64> {
    (0..n).map(|i| ((i * 7919) % 1000) as f64 / 10.0).collect()
}

fn bench_summarize(c: &mut Criterion) {
    let small = synthetic_latencies(10);
    let large = synthetic_latencies(10_000);

    c.bench_function("summarize_10", |b| {
        b.iter(|| summarize(black_box(&small)));
    });

    c.bench_function("summarize_10k", |b| {
        b.iter(|| summarize(black_box(&large)));
    });
}

fn bench_workload(c: &mut Criterion) {
    let mut rng = seeded_rng(Some(42));

    c.bench_function("random_content_1000", |b| {
        b.iter(|| random_content(&mut rng, black_box(1000)));
    });

    c.bench_function("random_embedding_1536", |b| {
        b.iter(|| random_embedding(&mut rng, black_box(1536)));
    });
}

fn bench_assemble(c: &mut Criterion) {
    let mut reference = SuiteSet::new();
    for size in [10, 100, 1000, 10_000] {
        reference.entry(SUITE_CREATION.to_string()).or_default().insert(
            creation_key(size),
            SummaryStatistic {
                mean_ms: 2.0,
                median_ms: 2.0,
                min_ms: 1.0,
                max_ms: 3.0,
            },
        );
    }

    c.bench_function("assemble_reference_only", |b| {
        b.iter(|| assemble(black_box(Some(&reference)), None, SummaryMode::Immediate));
    });
}

criterion_group!(benches, bench_summarize, bench_workload, bench_assemble);
criterion_main!(benches);
