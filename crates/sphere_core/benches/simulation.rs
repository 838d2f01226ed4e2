//! Engine benchmarks for sphere_core.
//!
//! Run with: `cargo bench -p sphere_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sphere_core::prelude::*;
use sphere_test_utils::fixtures::{duel_engine, duel_world, ring_engine};

/// Full reference duel: 7 seconds at 1000 sub-steps per second.
pub fn duel_benchmark(c: &mut Criterion) {
    c.bench_function("duel_7s", |b| {
        b.iter(|| {
            let mut engine = duel_engine();
            engine.simulate(black_box(2.0), 2000).unwrap();
            engine.simulate(black_box(5.0), 5000).unwrap();
            black_box(engine.state_hash())
        })
    });
}

/// Many agents each with a guided missile in flight.
pub fn crowd_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("crowd_1s");
    let world = duel_world()
        .with_guidance(2.0)
        .expect("valid guidance gain");

    for count in [8usize, 32, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut engine = ring_engine(count, world);
                for i in 0..count {
                    engine.launch_missile(i, Some(1.5)).unwrap();
                }
                engine.simulate(1.0, 1000).unwrap();
                black_box(engine.missiles().len())
            })
        });
    }
    group.finish();
}

pub fn state_hash_benchmark(c: &mut Criterion) {
    let engine = ring_engine(128, duel_world());
    c.bench_function("state_hash_128", |b| b.iter(|| black_box(&engine).state_hash()));
}

criterion_group!(benches, duel_benchmark, crowd_benchmark, state_hash_benchmark);
criterion_main!(benches);
