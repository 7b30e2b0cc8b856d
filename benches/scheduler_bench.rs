//! Benchmarks for the job runner.
//!
//! Benchmarks cover:
//! - PriorityLock acquire/release, uncontended and contended
//! - ResourceTable availability checks and reservations
//! - WorkerPool round trips
//! - End-to-end draining of a job batch

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use prometheus_job_runner::config::WorkerPoolConfig;
use prometheus_job_runner::core::{Job, JobRunner, ResourceTable, WorkerPool};
use prometheus_job_runner::{LockClass, PriorityLock};

// ============================================================================
// PriorityLock Benchmarks
// ============================================================================

fn bench_lock_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("priority_lock_uncontended");
    let lock = PriorityLock::new(0_u64);

    for class in LockClass::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(class), &class, |b, &class| {
            b.iter(|| {
                let mut guard = lock.acquire(class);
                *guard += 1;
                black_box(*guard);
            });
        });
    }
    group.finish();
}

fn bench_lock_contended(c: &mut Criterion) {
    c.bench_function("priority_lock_scheduling_vs_recovery", |b| {
        let lock = Arc::new(PriorityLock::new(0_u64));
        let running = Arc::new(AtomicBool::new(true));
        let background = {
            let lock = Arc::clone(&lock);
            let running = Arc::clone(&running);
            thread::spawn(move || {
                while running.load(Ordering::Relaxed) {
                    *lock.acquire(LockClass::Recovery) += 1;
                    thread::yield_now();
                }
            })
        };

        b.iter(|| black_box(*lock.acquire(LockClass::Scheduling)));

        running.store(false, Ordering::Relaxed);
        let _ = background.join();
    });
}

// ============================================================================
// ResourceTable Benchmarks
// ============================================================================

fn bench_resource_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("resource_table");

    for width in [1_usize, 8, 64] {
        let table = ResourceTable::new((0..width).map(|i| (format!("res-{i}"), 4)));
        let job: Vec<String> = (0..width).map(|i| format!("res-{i}")).collect();

        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::new("is_available", width), &job, |b, job| {
            b.iter(|| black_box(table.is_available(job)));
        });
        group.bench_with_input(BenchmarkId::new("reduce_recover", width), &job, |b, job| {
            let mut table = table.clone();
            b.iter(|| {
                table.reduce(0, job).unwrap();
                table.recover(0, job);
            });
        });
    }
    group.finish();
}

// ============================================================================
// WorkerPool Benchmarks
// ============================================================================

fn bench_pool_invoke(c: &mut Criterion) {
    let mut group = c.benchmark_group("worker_pool_invoke");

    for workers in [1, 4] {
        let pool = WorkerPool::new(&WorkerPoolConfig::new().with_worker_count(workers)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, _| {
            b.iter(|| black_box(pool.invoke_and_wait_uninterruptible(|| 1_u64).unwrap()));
        });
        pool.shutdown();
    }
    group.finish();
}

// ============================================================================
// End-to-End Scenario
// ============================================================================

fn bench_drain_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("job_runner_drain");
    group.sample_size(20);

    for job_count in [16_u64, 128] {
        group.throughput(Throughput::Elements(job_count));
        group.bench_with_input(
            BenchmarkId::from_parameter(job_count),
            &job_count,
            |b, &job_count| {
                b.iter(|| {
                    let jobs = (0..job_count)
                        .map(|i| {
                            let name = if i % 3 == 0 { "gpu" } else { "cpu" };
                            Job::new([name], || Duration::ZERO)
                        })
                        .collect();
                    let runner = JobRunner::from_parts([("cpu", 4), ("gpu", 1)], jobs, 4).unwrap();
                    assert!(runner.wait_idle(Duration::from_secs(30)));
                    runner.shutdown();
                });
            },
        );
    }
    group.finish();
}

// ============================================================================
// Benchmark Groups
// ============================================================================

criterion_group!(lock_benches, bench_lock_uncontended, bench_lock_contended);

criterion_group!(resource_benches, bench_resource_table);

criterion_group!(pool_benches, bench_pool_invoke);

criterion_group!(scenario_benches, bench_drain_batch);

criterion_main!(lock_benches, resource_benches, pool_benches, scenario_benches);
