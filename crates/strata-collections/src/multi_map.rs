//! A map from each key to a run of values.
//!
//! Keys live in a [`Map`] whose values are small run descriptors
//! `{ptr, len, capacity}`. The run storage is carved from a
//! [`LinearAllocator`] owned by the multimap. A run starts with capacity 1
//! and doubles when full; the old run is left in the arena and only
//! reclaimed when the multimap is dropped.

#![allow(unsafe_code)]

use std::borrow::Borrow;
use std::fmt;
use std::ptr::{self, NonNull};
use std::slice;

use strata_alloc::{LinearAllocator, RawAllocator};
use strata_core::{DefaultHash, HashFn};

use crate::map::Map;

/// Values of one key, stored in arena memory.
struct Run<V> {
    ptr: NonNull<V>,
    len: usize,
    capacity: usize,
}

impl<V> Run<V> {
    const fn empty() -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            capacity: 0,
        }
    }

    fn as_slice(&self) -> &[V] {
        // SAFETY: the first `len` slots of the run are initialized, and a
        // dangling pointer is valid for an empty slice.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    fn as_mut_slice(&mut self) -> &mut [V] {
        // SAFETY: as above; runs are never aliased.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    fn push(&mut self, arena: &LinearAllocator<'_>, value: V) {
        if self.len == self.capacity {
            self.relocate(arena, (self.capacity * 2).max(1));
        }
        // SAFETY: `len < capacity` and slot `len` is unused.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
    }

    /// Move the values into a fresh run of `capacity` slots. The old run is
    /// abandoned in the arena.
    fn relocate(&mut self, arena: &LinearAllocator<'_>, capacity: usize) {
        let slots = arena.allocate_array::<V>(capacity);
        let new_ptr = NonNull::from(slots).cast::<V>();
        // SAFETY: the new run is fresh arena memory of `capacity > len`
        // slots; the values are moved bitwise and the old slots are never
        // read again.
        unsafe { ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), self.len) };
        self.ptr = new_ptr;
        self.capacity = capacity;
    }
}

/// A map from keys to ordered lists of values.
pub struct MultiMap<K, V, H = DefaultHash> {
    map: Map<K, Run<V>, H>,
    arena: LinearAllocator<'static>,
}

// SAFETY: every run is owned by exactly one multimap, and the arena holding
// them moves along with it.
unsafe impl<K: Send, V: Send, H: Send> Send for MultiMap<K, V, H> {}
// SAFETY: shared access only hands out `&K` and `&V`.
unsafe impl<K: Sync, V: Sync, H: Sync> Sync for MultiMap<K, V, H> {}

impl<K, V, H: Default> MultiMap<K, V, H> {
    /// Create an empty multimap. Does not allocate.
    pub fn new() -> Self {
        Self::with_hasher(H::default())
    }
}

impl<K, V, H> MultiMap<K, V, H> {
    /// Create an empty multimap using `hasher`.
    pub fn with_hasher(hasher: H) -> Self {
        Self {
            map: Map::with_hasher_in(hasher, RawAllocator),
            arena: LinearAllocator::new(),
        }
    }

    /// Number of distinct keys.
    pub fn key_amount(&self) -> usize {
        self.map.len()
    }

    /// Whether there are no keys.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over the keys.
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> + '_ {
        self.map.keys()
    }

    /// Iterate over every value of every key.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.map.values().flat_map(Run::as_slice)
    }

    /// Iterate mutably over every value of every key.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.map.values_mut().flat_map(Run::as_mut_slice)
    }

    /// Iterate over each key with its values.
    pub fn items(&self) -> impl ExactSizeIterator<Item = (&K, &[V])> + '_ {
        self.map.items().map(|(key, run)| (key, run.as_slice()))
    }

    /// Bytes handed out by the run arena, abandoned runs included.
    pub fn run_bytes(&self) -> usize {
        self.arena.allocated_bytes()
    }
}

impl<K: Eq, V, H: HashFn<K>> MultiMap<K, V, H> {
    /// Append `value` to the values of `key`. Returns whether the key was
    /// new.
    pub fn add(&mut self, key: K, value: V) -> bool {
        let mut is_new = false;
        let run = self.map.lookup_or_add(key, || {
            is_new = true;
            Run::empty()
        });
        run.push(&self.arena, value);
        is_new
    }

    /// Add a value for a key that must not be present yet.
    pub fn add_new(&mut self, key: K, value: V) {
        debug_assert!(!self.contains(&key), "add_new of a present key");
        self.add(key, value);
    }

    /// Append clones of `values` to the values of `key`.
    ///
    /// An empty `values` leaves the multimap untouched; a present key
    /// always has at least one value.
    pub fn add_multiple(&mut self, key: K, values: &[V])
    where
        V: Clone,
    {
        if values.is_empty() {
            return;
        }
        let run = self.map.lookup_or_add(key, Run::empty);
        for value in values {
            run.push(&self.arena, value.clone());
        }
    }

    /// Like [`MultiMap::add_multiple`] for a key that must not be present.
    pub fn add_multiple_new(&mut self, key: K, values: &[V])
    where
        V: Clone,
    {
        debug_assert!(!self.contains(&key), "add_multiple_new of a present key");
        self.add_multiple(key, values);
    }

    /// Append clones of every value of `other`, key by key.
    pub fn add_multiple_from<G>(&mut self, other: &MultiMap<K, V, G>)
    where
        K: Clone,
        V: Clone,
    {
        for (key, values) in other.items() {
            self.add_multiple(key.clone(), values);
        }
    }

    /// Whether `key` has any values.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFn<Q>,
    {
        self.map.contains(key)
    }

    /// Number of values of `key`, zero when missing.
    pub fn value_amount<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFn<Q>,
    {
        self.map.lookup_try(key).map_or(0, |run| run.len)
    }

    /// The values of `key` in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not present.
    pub fn lookup<Q>(&self, key: &Q) -> &[V]
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFn<Q>,
    {
        self.map.lookup(key).as_slice()
    }

    /// The values of `key`, or an empty slice when it is missing.
    pub fn lookup_default<Q>(&self, key: &Q) -> &[V]
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFn<Q>,
    {
        self.map.lookup_try(key).map_or(&[][..], Run::as_slice)
    }
}

impl<K, V, H> Drop for MultiMap<K, V, H> {
    fn drop(&mut self) {
        for run in self.map.values_mut() {
            let len = run.len;
            run.len = 0;
            // SAFETY: the first `len` slots held live values and are now
            // outside the run. The arena releases the memory afterwards.
            unsafe {
                ptr::drop_in_place(ptr::slice_from_raw_parts_mut(run.ptr.as_ptr(), len));
            }
        }
    }
}

impl<K, V, H: Default> Default for MultiMap<K, V, H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Clones get a fresh arena sized to the values alone.
impl<K: Eq + Clone, V: Clone, H: HashFn<K> + Clone> Clone for MultiMap<K, V, H> {
    fn clone(&self) -> Self {
        let mut copy = Self::with_hasher(self.map.hasher().clone());
        copy.add_multiple_from(self);
        copy
    }
}

impl<K: fmt::Debug, V: fmt::Debug, H> fmt::Debug for MultiMap<K, V, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.items()).finish()
    }
}

impl<K: Eq, V, H: HashFn<K>> Extend<(K, V)> for MultiMap<K, V, H> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.add(key, value);
        }
    }
}

impl<K: Eq, V, H: HashFn<K> + Default> FromIterator<(K, V)> for MultiMap<K, V, H> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut multi_map = Self::new();
        multi_map.extend(iter);
        multi_map
    }
}
