// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Lock round-trip benchmarks.
//
// Run with:
//   cargo bench --bench contention
//
// Groups:
//   uncontended: enter/exit of each role on an idle lock, both policies
//   nested:      recursive read depth under SupportsRecursion
//   mixed:       one thread's read round trips while background threads
//                hammer the same lock (readers only, and readers + a writer)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use librwlock::{RecursionPolicy, ReentrantRwLock};

const POLICIES: &[(&str, RecursionPolicy)] = &[
    ("no_recursion", RecursionPolicy::NoRecursion),
    ("recursion", RecursionPolicy::SupportsRecursion),
];

// ---------------------------------------------------------------------------
// Uncontended round trips
// ---------------------------------------------------------------------------

fn bench_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended");

    for &(label, policy) in POLICIES {
        let lock = ReentrantRwLock::new(policy);
        group.bench_function(BenchmarkId::new("read", label), |b| {
            b.iter(|| {
                lock.enter_read().unwrap();
                lock.exit_read().unwrap();
            });
        });
        group.bench_function(BenchmarkId::new("write", label), |b| {
            b.iter(|| {
                lock.enter_write().unwrap();
                lock.exit_write().unwrap();
            });
        });
        group.bench_function(BenchmarkId::new("upgrade_to_write", label), |b| {
            b.iter(|| {
                lock.enter_upgradeable_read().unwrap();
                lock.enter_write().unwrap();
                lock.exit_write().unwrap();
                lock.exit_upgradeable_read().unwrap();
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Recursive reads
// ---------------------------------------------------------------------------

fn bench_nested(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested");
    let lock = ReentrantRwLock::new(RecursionPolicy::SupportsRecursion);

    for depth in [1u32, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &d| {
            b.iter(|| {
                for _ in 0..d {
                    lock.enter_read().unwrap();
                }
                black_box(lock.recursive_read_count());
                for _ in 0..d {
                    lock.exit_read().unwrap();
                }
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Mixed load: background threads keep the lock busy
// ---------------------------------------------------------------------------

fn spawn_background(
    lock: &Arc<ReentrantRwLock>,
    stop: &Arc<AtomicBool>,
    readers: usize,
    writer: bool,
) -> Vec<thread::JoinHandle<()>> {
    let mut handles = Vec::new();
    for _ in 0..readers {
        let lock = Arc::clone(lock);
        let stop = Arc::clone(stop);
        handles.push(thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                lock.enter_read().unwrap();
                lock.exit_read().unwrap();
            }
        }));
    }
    if writer {
        let lock = Arc::clone(lock);
        let stop = Arc::clone(stop);
        handles.push(thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                lock.enter_write().unwrap();
                lock.exit_write().unwrap();
                thread::yield_now();
            }
        }));
    }
    handles
}

fn bench_mixed(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed");

    for &(label, writer) in &[("readers", false), ("readers_writer", true)] {
        let lock = Arc::new(ReentrantRwLock::default());
        let stop = Arc::new(AtomicBool::new(false));
        let handles = spawn_background(&lock, &stop, 3, writer);

        group.bench_function(label, |b| {
            b.iter(|| {
                lock.enter_read().unwrap();
                lock.exit_read().unwrap();
            });
        });

        stop.store(true, Ordering::Relaxed);
        for h in handles {
            h.join().unwrap();
        }
    }

    group.finish();
}

criterion_group!(benches, bench_uncontended, bench_nested, bench_mixed);
criterion_main!(benches);
