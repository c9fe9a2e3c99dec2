//! Criterion micro-benchmarks for vector growth and hash table operations.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use indexmap::IndexSet;
use strata_bench::{unique_keys, words, DEFAULT_SEED};
use strata_collections::{Map, MultiMap, Vector, VectorSet};

/// Benchmark: append 1K values, inline capacity 4 vs 64.
fn bench_vector_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("vector_append_1k");
    group.bench_function("inline_4", |b| {
        b.iter(|| {
            let mut vector: Vector<u32, 4> = Vector::new();
            for i in 0..1000 {
                vector.append(i);
            }
            black_box(vector.len())
        });
    });
    group.bench_function("inline_64", |b| {
        b.iter(|| {
            let mut vector: Vector<u32, 64> = Vector::new();
            for i in 0..1000 {
                vector.append(i);
            }
            black_box(vector.len())
        });
    });
    group.bench_function("std_vec", |b| {
        b.iter(|| {
            let mut vector = Vec::new();
            for i in 0..1000u32 {
                vector.push(i);
            }
            black_box(vector.len())
        });
    });
    group.finish();
}

/// Benchmark: fill a set with shuffled keys, against `IndexSet`.
fn bench_set_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_insert");
    for n in [100u32, 10_000] {
        let keys = unique_keys(n, DEFAULT_SEED);
        group.bench_with_input(BenchmarkId::new("vector_set", n), &keys, |b, keys| {
            b.iter(|| {
                let mut set: VectorSet<u32> = VectorSet::new();
                for &key in keys {
                    set.add(key);
                }
                black_box(set.len())
            });
        });
        group.bench_with_input(BenchmarkId::new("index_set", n), &keys, |b, keys| {
            b.iter(|| {
                let mut set = IndexSet::new();
                for &key in keys {
                    set.insert(key);
                }
                black_box(set.len())
            });
        });
    }
    group.finish();
}

/// Benchmark: hit and miss lookups in a 10K set.
fn bench_set_lookup(c: &mut Criterion) {
    let keys = unique_keys(10_000, DEFAULT_SEED);
    let set: VectorSet<u32> = keys.iter().copied().collect();
    c.bench_function("set_lookup_hit_10k", |b| {
        b.iter(|| keys.iter().filter(|key| set.contains(*key)).count());
    });
    c.bench_function("set_lookup_miss_10k", |b| {
        b.iter(|| (10_000..20_000u32).filter(|key| set.contains(key)).count());
    });
}

/// Benchmark: remove half of a 10K set, then refill it.
fn bench_set_churn(c: &mut Criterion) {
    let keys = unique_keys(10_000, DEFAULT_SEED);
    c.bench_function("set_churn_10k", |b| {
        let mut set: VectorSet<u32> = keys.iter().copied().collect();
        b.iter(|| {
            for key in &keys[..5000] {
                set.remove(key);
            }
            for &key in &keys[..5000] {
                set.add_new(key);
            }
            black_box(set.len())
        });
    });
}

/// Benchmark: word counting with `Map` and grouping with `MultiMap`.
fn bench_word_tables(c: &mut Criterion) {
    let words = words(10_000, DEFAULT_SEED);
    c.bench_function("map_word_count_10k", |b| {
        b.iter(|| {
            let mut counts: Map<&str, u32> = Map::new();
            for word in &words {
                *counts.lookup_or_add_default(word.as_str()) += 1;
            }
            black_box(counts.len())
        });
    });
    c.bench_function("multi_map_group_by_len_10k", |b| {
        b.iter(|| {
            let mut groups: MultiMap<usize, &str> = MultiMap::new();
            for word in &words {
                groups.add(word.len(), word.as_str());
            }
            black_box(groups.key_amount())
        });
    });
}

criterion_group!(
    benches,
    bench_vector_append,
    bench_set_insert,
    bench_set_lookup,
    bench_set_churn,
    bench_word_tables
);
criterion_main!(benches);
