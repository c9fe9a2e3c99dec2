//! Criterion micro-benchmarks for the linear allocator.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use strata_alloc::{ArenaConfig, LinearAllocator, RawAllocator};
use strata_bench::{mixed_sizes, words, DEFAULT_SEED};

/// Benchmark: 10K mixed-size allocations into a fresh arena.
fn bench_arena_alloc_10k(c: &mut Criterion) {
    let sizes = mixed_sizes(10_000, 64, DEFAULT_SEED);
    c.bench_function("arena_alloc_10k", |b| {
        b.iter(|| {
            let arena = LinearAllocator::new();
            for &size in &sizes {
                black_box(arena.allocate(size, 8));
            }
            arena.allocated_bytes()
        });
    });
}

/// Benchmark: the same workload with a large first block.
fn bench_arena_alloc_presized(c: &mut Criterion) {
    let sizes = mixed_sizes(10_000, 64, DEFAULT_SEED);
    let total: usize = sizes.iter().map(|size| size + 8).sum();
    c.bench_function("arena_alloc_10k_presized", |b| {
        b.iter(|| {
            let config = ArenaConfig::new(total);
            let arena = LinearAllocator::with_config(config, RawAllocator).unwrap();
            for &size in &sizes {
                black_box(arena.allocate(size, 8));
            }
            arena.owned_buffer_count()
        });
    });
}

/// Benchmark: allocation into a donated stack buffer.
fn bench_arena_borrowed_buffer(c: &mut Criterion) {
    c.bench_function("arena_borrowed_4k", |b| {
        b.iter(|| {
            let mut buffer = [0u8; 4096];
            let arena = LinearAllocator::new();
            arena.provide_buffer(&mut buffer);
            for i in 0..256u64 {
                black_box(arena.construct(i));
            }
            arena.owned_buffer_count()
        });
    });
}

/// Benchmark: interning 10K strings.
fn bench_arena_copy_str(c: &mut Criterion) {
    let words = words(10_000, DEFAULT_SEED);
    c.bench_function("arena_copy_str_10k", |b| {
        b.iter(|| {
            let arena = LinearAllocator::new();
            for word in &words {
                black_box(arena.copy_str(word));
            }
            arena.allocated_bytes()
        });
    });
}

criterion_group!(
    benches,
    bench_arena_alloc_10k,
    bench_arena_alloc_presized,
    bench_arena_borrowed_buffer,
    bench_arena_copy_str
);
criterion_main!(benches);
