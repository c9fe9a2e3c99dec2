//! Test utilities and instrumented types for Strata development.
//!
//! - [`CountingAllocator`] wraps [`RawAllocator`] and records every
//!   allocation and free, so tests can assert that containers release
//!   their memory.
//! - [`DropCounter`] counts how many times values are dropped.
//! - [`CollidingHash`] sends every key to the same slot chain.
//! - [`init_tracing`] installs a test-writer subscriber once.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::cell::Cell;
use std::ptr::NonNull;
use std::rc::Rc;

use strata_alloc::{Allocator, RawAllocator};
use strata_core::HashFn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Counters {
    allocations: Cell<usize>,
    frees: Cell<usize>,
    bytes: Cell<usize>,
    fail_after: Cell<Option<usize>>,
}

/// Allocator that counts calls and delegates to [`RawAllocator`].
///
/// Clones share their counters, so the handle kept by a test sees the
/// traffic of the copy moved into a container.
#[derive(Clone, Debug, Default)]
pub struct CountingAllocator {
    counters: Rc<Counters>,
}

impl CountingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful allocations so far.
    pub fn allocations(&self) -> usize {
        self.counters.allocations.get()
    }

    /// Frees so far.
    pub fn frees(&self) -> usize {
        self.counters.frees.get()
    }

    /// Allocations not yet freed.
    pub fn live(&self) -> usize {
        self.allocations() - self.frees()
    }

    /// Total bytes requested by successful allocations.
    pub fn bytes_allocated(&self) -> usize {
        self.counters.bytes.get()
    }

    /// Make every allocation after the next `remaining` ones fail.
    pub fn fail_after(&self, remaining: usize) {
        self.counters.fail_after.set(Some(remaining));
    }
}

#[allow(unsafe_code)]
impl Allocator for CountingAllocator {
    fn allocate(&self, size: usize, alignment: usize) -> Option<NonNull<u8>> {
        if let Some(remaining) = self.counters.fail_after.get() {
            if remaining == 0 {
                return None;
            }
            self.counters.fail_after.set(Some(remaining - 1));
        }
        let ptr = RawAllocator.allocate(size, alignment)?;
        let counters = &self.counters;
        counters.allocations.set(counters.allocations.get() + 1);
        counters.bytes.set(counters.bytes.get() + size);
        Some(ptr)
    }

    unsafe fn free(&self, ptr: NonNull<u8>) {
        self.counters.frees.set(self.counters.frees.get() + 1);
        // SAFETY: every pointer handed out came from `RawAllocator`.
        unsafe { RawAllocator.free(ptr) }
    }
}

/// Shared counter bumped by each [`DropCounter`] when it is dropped.
#[derive(Clone, Debug, Default)]
pub struct DropTally(Rc<Cell<usize>>);

impl DropTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracked value carrying `id`.
    pub fn track(&self, id: u32) -> DropCounter {
        DropCounter {
            id,
            tally: self.clone(),
        }
    }

    /// Drops observed so far.
    pub fn get(&self) -> usize {
        self.0.get()
    }
}

/// Value that reports its drop to a [`DropTally`].
///
/// Equality and hashing only look at `id`.
#[derive(Debug)]
pub struct DropCounter {
    pub id: u32,
    tally: DropTally,
}

impl Clone for DropCounter {
    fn clone(&self) -> Self {
        self.tally.track(self.id)
    }
}

impl PartialEq for DropCounter {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DropCounter {}

impl Drop for DropCounter {
    fn drop(&mut self) {
        let cell = &self.tally.0;
        cell.set(cell.get() + 1);
    }
}

impl HashFn<DropCounter> for strata_core::DefaultHash {
    fn hash(&self, key: &DropCounter) -> u32 {
        HashFn::<u32>::hash(self, &key.id)
    }
}

/// Hash function that maps every key to the same value.
///
/// Forces every lookup down one probe chain, which exercises tombstones
/// and perturbation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollidingHash;

impl<K: ?Sized> HashFn<K> for CollidingHash {
    fn hash(&self, _key: &K) -> u32 {
        7
    }
}

/// Install a `fmt` subscriber writing to the test harness.
///
/// Filtering follows `RUST_LOG`, defaulting to `warn`. Safe to call from
/// every test; only the first call installs anything.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
