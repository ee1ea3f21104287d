//! Benchmarks for the query tracker hot path.
//!
//! Benchmarks cover:
//! - Activity log insert/clear on the file-backed and disabled variants
//! - Description formatting into a slot
//! - Admission insert/delete, bounded and unbounded
//! - Contended admission with many concurrent tasks

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;

use query_tracker::core::{describe, AdmissionController, RequestContext};
use query_tracker::infra::activity_log::{ActivityLog, MappedActivityLog, NoopActivityLog};

use tokio::runtime::Runtime;

// ============================================================================
// Helper Functions
// ============================================================================

fn bench_context() -> RequestContext {
    RequestContext::new()
        .with_tenant("bench-tenant")
        .with_trace_id("4bf92f3577b34da6a3ce929d0e0e4736")
}

const QUERY: &str = "sum by (job) (rate(http_requests_total{status=~\"5..\"}[5m]))";

// ============================================================================
// Activity Log Benchmarks
// ============================================================================

fn bench_log_insert_clear(c: &mut Criterion) {
    let mut group = c.benchmark_group("log_insert_clear");
    let dir = tempfile::tempdir().unwrap();

    for capacity in [16usize, 1_024, 16_384] {
        let log = MappedActivityLog::open(dir.path().join(format!("bench-{capacity}.log")), capacity).unwrap();
        let ctx = bench_context();
        let description = describe(&ctx, &ctx, QUERY);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("mapped", capacity), &capacity, |b, _| {
            b.iter(|| {
                let slot = log.insert(&description).unwrap();
                log.clear(black_box(slot));
            });
        });
    }

    group.bench_function("disabled", |b| {
        let log = NoopActivityLog;
        b.iter(|| {
            let slot = log.insert(&black_box(QUERY));
            black_box(slot);
        });
    });
    group.finish();
}

fn bench_log_half_full(c: &mut Criterion) {
    let mut group = c.benchmark_group("log_half_full");
    let dir = tempfile::tempdir().unwrap();
    let capacity = 1_024;
    let log = MappedActivityLog::open(dir.path().join("half.log"), capacity).unwrap();
    for i in 0..capacity / 2 {
        log.insert(&format_args!("query=held_{i}")).unwrap();
    }
    group.bench_function("insert_clear", |b| {
        b.iter(|| {
            let slot = log.insert(&black_box(QUERY)).unwrap();
            log.clear(slot);
        });
    });
    group.finish();
}

// ============================================================================
// Admission Benchmarks
// ============================================================================

fn bench_admission(c: &mut Criterion) {
    let mut group = c.benchmark_group("admission_insert_delete");
    let dir = tempfile::tempdir().unwrap();

    for limit in [-1i64, 64] {
        let controller = AdmissionController::new(limit, NoopActivityLog);
        let ctx = bench_context();
        group.bench_with_input(BenchmarkId::new("disabled_log", limit), &limit, |b, _| {
            b.to_async(Runtime::new().unwrap()).iter(|| async {
                let handle = controller.insert(&ctx, QUERY).await.unwrap();
                controller.delete(handle);
            });
        });

        let log = MappedActivityLog::open(dir.path().join(format!("adm-{limit}.log")), 1_024).unwrap();
        let controller = AdmissionController::new(limit, log);
        group.bench_with_input(BenchmarkId::new("mapped_log", limit), &limit, |b, _| {
            b.to_async(Runtime::new().unwrap()).iter(|| async {
                let handle = controller.insert(&ctx, QUERY).await.unwrap();
                controller.delete(handle);
            });
        });
    }
    group.finish();
}

fn bench_contended_admission(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_admission");
    let dir = tempfile::tempdir().unwrap();
    let log = MappedActivityLog::open(dir.path().join("contended.log"), 4_096).unwrap();
    let controller = Arc::new(AdmissionController::new(16, log));

    for tasks in [64u64, 512] {
        group.throughput(Throughput::Elements(tasks));
        group.bench_with_input(BenchmarkId::from_parameter(tasks), &tasks, |b, &tasks| {
            b.to_async(Runtime::new().unwrap()).iter(|| {
                let controller = Arc::clone(&controller);
                async move {
                    let joins: Vec<_> = (0..tasks)
                        .map(|i| {
                            let controller = Arc::clone(&controller);
                            tokio::spawn(async move {
                                let ctx = RequestContext::new().with_tenant(format!("t{}", i % 8));
                                let handle = controller.insert(&ctx, QUERY).await.unwrap();
                                tokio::task::yield_now().await;
                                controller.delete(handle);
                            })
                        })
                        .collect();
                    for j in joins {
                        j.await.unwrap();
                    }
                }
            });
        });
    }
    group.finish();
}

// ============================================================================
// Benchmark Groups
// ============================================================================

criterion_group!(log_benches, bench_log_insert_clear, bench_log_half_full);

criterion_group!(admission_benches, bench_admission, bench_contended_admission);

criterion_main!(log_benches, admission_benches);
