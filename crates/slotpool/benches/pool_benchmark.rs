//! # Slot Pool Benchmark
//!
//! Compares claiming and releasing a slot against a fresh zero-filled heap
//! block and a plain `Box`, for a small and a large object.
//!
//! Run with: `cargo bench --package slotpool`

// Benchmarks don't need docs
#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use slotpool::{heap_alloc, pool_alloc, HeapBox, PoolBox};

const MAX_CLIENTS: usize = 64;

struct Projectile {
    pos: [f32; 2],
    vel: [f32; 2],
    owner: usize,
}
pool_alloc!(Projectile, MAX_CLIENTS);
heap_alloc!(Projectile);

struct Character {
    core: [f32; 64],
    input: [i32; 32],
}
pool_alloc!(Character, MAX_CLIENTS);
heap_alloc!(Character);

fn projectile(owner: usize) -> Projectile {
    Projectile {
        pos: [1.0, 2.0],
        vel: [0.5, -0.5],
        owner,
    }
}

fn character() -> Character {
    Character {
        core: [0.25; 64],
        input: [1; 32],
    }
}

/// Benchmark: one allocate/free cycle per iteration.
fn bench_single_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_cycle");

    group.bench_function("pool_small", |b| {
        b.iter(|| {
            let shot = PoolBox::new(black_box(7), projectile(7));
            black_box((shot.owner, shot.pos, shot.vel))
        });
    });
    group.bench_function("heap_small", |b| {
        b.iter(|| black_box(HeapBox::new(projectile(7)).owner));
    });
    group.bench_function("box_small", |b| {
        b.iter(|| black_box(Box::new(projectile(7)).owner));
    });

    group.bench_function("pool_large", |b| {
        b.iter(|| {
            let ch = PoolBox::new(black_box(3), character());
            black_box((ch.core[0], ch.input[0]))
        });
    });
    group.bench_function("heap_large", |b| {
        b.iter(|| {
            let ch = HeapBox::new(character());
            black_box((ch.core[0], ch.input[0]))
        });
    });

    group.finish();
}

/// Benchmark: fill every client slot, then release them all.
fn bench_full_tick(c: &mut Criterion) {
    c.bench_function("pool_fill_and_drain_64", |b| {
        b.iter(|| {
            let shots: Vec<_> = (0..MAX_CLIENTS)
                .map(|id| PoolBox::new(id, projectile(id)))
                .collect();
            black_box(shots.len())
        });
    });
}

criterion_group!(benches, bench_single_cycle, bench_full_tick);
criterion_main!(benches);
