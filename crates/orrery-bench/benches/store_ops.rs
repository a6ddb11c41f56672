//! Criterion micro-benchmarks for snapshot store reads under a running scheduler.

use std::hint::black_box;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use orrery_bench::ringed_system;
use orrery_core::BodyId;
use orrery_engine::{EngineConfig, Frame, Scheduler};

fn bench_reads_while_ticking(c: &mut Criterion) {
    let config = EngineConfig {
        target_interval: Duration::from_millis(1),
        worker_count: Some(2),
        ..EngineConfig::default()
    };
    let mut scheduler = Scheduler::new(ringed_system(42, 5_000), config, |_: &Frame| {}).unwrap();
    let store = scheduler.store();
    scheduler.start().unwrap();

    c.bench_function("store_latest", |b| {
        b.iter(|| black_box(store.latest()));
    });

    c.bench_function("store_read_one", |b| {
        b.iter(|| black_box(store.read(BodyId(3))));
    });

    c.bench_function("store_sample_all", |b| {
        b.iter(|| {
            let snap = store.latest();
            let sum: f64 = snap.iter().map(|(_, p)| p.x + p.y).sum();
            black_box(sum)
        });
    });

    scheduler.request_stop();
    scheduler.await_stopped().unwrap();
}

criterion_group!(benches, bench_reads_while_ticking);
criterion_main!(benches);
