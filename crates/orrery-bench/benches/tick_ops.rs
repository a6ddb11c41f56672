//! Criterion benchmarks for lockstep ticks at several system sizes.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use orrery_bench::{reference_system, ringed_system};
use orrery_engine::{BodySystem, EngineConfig, TickEngine};

fn engine(specs: Vec<orrery_core::BodySpec>, workers: Option<usize>) -> TickEngine {
    let system = BodySystem::new(specs).unwrap();
    let config = EngineConfig {
        worker_count: workers,
        ..EngineConfig::default()
    };
    TickEngine::new(system, &config).unwrap()
}

fn bench_reference_tick(c: &mut Criterion) {
    let mut engine = engine(reference_system(), None);
    engine.step();

    c.bench_function("tick_reference_12", |b| {
        b.iter(|| {
            let outcome = engine.step();
            black_box(&outcome);
        });
    });
}

fn bench_ring_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_ringed");
    for rocks in [500usize, 5_000, 50_000] {
        for workers in [1usize, 4] {
            let mut engine = engine(ringed_system(42, rocks), Some(workers));
            engine.step();
            group.bench_with_input(
                BenchmarkId::new(format!("{workers}w"), rocks),
                &rocks,
                |b, _| {
                    b.iter(|| black_box(engine.step()));
                },
            );
        }
    }
    group.finish();
}

fn bench_1000_ticks_reference(c: &mut Criterion) {
    c.bench_function("1000_ticks_reference_12", |b| {
        b.iter(|| {
            let mut engine = engine(reference_system(), Some(2));
            for _ in 0..1000 {
                black_box(engine.step());
            }
        });
    });
}

criterion_group!(
    benches,
    bench_reference_tick,
    bench_ring_scaling,
    bench_1000_ticks_reference
);
criterion_main!(benches);
