//! Deterministic workloads for the Strata benchmarks.
//!
//! Every generator is seeded, so a profile produces the same keys on every
//! run and machine:
//!
//! - [`unique_keys`]: `n` distinct integers in random order
//! - [`words`]: `n` short lowercase strings with repeats
//! - [`mixed_sizes`]: allocation sizes for arena runs

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seed used by the benchmarks unless they say otherwise.
pub const DEFAULT_SEED: u64 = 0x5eed;

/// `n` distinct keys from `0..n`, shuffled.
pub fn unique_keys(n: u32, seed: u64) -> Vec<u32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut keys: Vec<u32> = (0..n).collect();
    // Fisher-Yates.
    for i in (1..keys.len()).rev() {
        let j = (rng.next_u64() % (i as u64 + 1)) as usize;
        keys.swap(i, j);
    }
    keys
}

/// `n` words of 1 to 8 letters drawn from a small alphabet, so that
/// repeats are common.
pub fn words(n: usize, seed: u64) -> Vec<String> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let len = 1 + (rng.next_u32() % 8) as usize;
            (0..len)
                .map(|_| char::from(b'a' + (rng.next_u32() % 6) as u8))
                .collect()
        })
        .collect()
}

/// `n` allocation sizes between 1 and `max` bytes.
pub fn mixed_sizes(n: usize, max: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| 1 + (rng.next_u64() % max as u64) as usize)
        .collect()
}
