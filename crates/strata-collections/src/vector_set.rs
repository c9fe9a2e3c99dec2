//! A hash set whose elements live in one contiguous [`Vector`].
//!
//! Elements keep their insertion order until the first removal. A removal
//! moves the last element into the freed position and re-points the slot
//! that referenced it, so the elements always form a dense slice.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Index;
use std::slice;

use strata_alloc::{Allocator, RawAllocator};
use strata_core::{DefaultHash, HashFn};

use crate::open_addressing::{SlotSearch, SlotTable, TableStats};
use crate::vector::Vector;

/// Insertion-ordered set backed by a slot table and a [`Vector`].
///
/// `H` must hash a value and each of its borrowed forms identically.
pub struct VectorSet<T, H = DefaultHash, A: Allocator = RawAllocator> {
    table: SlotTable<8, A>,
    elements: Vector<T, 4, A>,
    hasher: H,
}

impl<T, H: Default> VectorSet<T, H, RawAllocator> {
    /// Create an empty set. Does not allocate.
    pub fn new() -> Self {
        Self::new_in(RawAllocator)
    }
}

impl<T: Eq + Clone, H: HashFn<T> + Default> VectorSet<T, H, RawAllocator> {
    /// Set of the distinct values of `values`, in first-seen order.
    pub fn from_slice(values: &[T]) -> Self {
        let mut set = Self::new();
        set.add_multiple(values.iter().cloned());
        set
    }
}

impl<T, H: Default, A: Allocator> VectorSet<T, H, A> {
    /// Create an empty set drawing memory from `allocator`.
    pub fn new_in(allocator: A) -> Self {
        Self::with_hasher_in(H::default(), allocator)
    }
}

impl<T, H, A: Allocator> VectorSet<T, H, A> {
    /// Create an empty set using `hasher`.
    pub fn with_hasher_in(hasher: H, allocator: A) -> Self {
        let table = SlotTable::new_in(allocator.clone());
        let elements = Vector::new_in(allocator);
        debug_assert!(table.slots_usable() <= elements.capacity());
        Self {
            table,
            elements,
            hasher,
        }
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the set has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate in storage order.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.elements.iter()
    }

    /// The elements in storage order.
    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }
}

impl<T: Eq, H: HashFn<T>, A: Allocator> VectorSet<T, H, A> {
    /// Make room for at least `min_usable` elements without rebuilding.
    pub fn reserve(&mut self, min_usable: usize) {
        if self.table.slots_usable() < min_usable {
            self.grow(min_usable);
        }
    }

    #[cold]
    #[inline(never)]
    fn grow(&mut self, min_usable: usize) {
        let hasher = &self.hasher;
        let entries = self
            .elements
            .iter()
            .enumerate()
            .map(|(index, value)| (hasher.hash(value), index));
        self.table = self.table.rebuilt(min_usable, entries);
        self.elements.reserve(self.table.slots_usable());
    }

    #[inline]
    fn ensure_can_add(&mut self) {
        if self.table.should_grow() {
            self.grow(self.len() + 1);
        }
    }

    fn push_at(&mut self, position: usize, value: T) {
        self.table.occupy(position, self.elements.len());
        self.elements.append(value);
    }

    /// Add `value`, which must not be present yet.
    ///
    /// Skips the equality checks of [`VectorSet::add`]; adding a duplicate
    /// is caught in debug builds.
    pub fn add_new(&mut self, value: T) {
        debug_assert!(!self.contains(&value), "add_new of a present value");
        self.ensure_can_add();
        let position = self.table.vacant(self.hasher.hash(&value));
        self.push_at(position, value);
    }

    /// Add `value` unless it is present. Returns whether it was added.
    pub fn add(&mut self, value: T) -> bool {
        self.ensure_can_add();
        let elements = &self.elements;
        let search = self
            .table
            .find_or_vacant(self.hasher.hash(&value), |index| elements[index] == value);
        match search {
            SlotSearch::Occupied(_) => false,
            SlotSearch::Vacant { position } => {
                self.push_at(position, value);
                true
            }
        }
    }

    /// Add every value that is not present yet.
    pub fn add_multiple(&mut self, values: impl IntoIterator<Item = T>) {
        for value in values {
            self.add(value);
        }
    }

    /// Whether an element equal to `value` is present.
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFn<Q>,
    {
        self.index_try(value).is_some()
    }

    /// Position of `value` in [`VectorSet::as_slice`].
    pub fn index_try<Q>(&self, value: &Q) -> Option<usize>
    where
        T: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFn<Q>,
    {
        let elements = &self.elements;
        self.table
            .find(<H as HashFn<Q>>::hash(&self.hasher, value), |index| {
                Q::eq(value, elements[index].borrow())
            })
            .map(|found| found.index)
    }

    /// Position of `value` in [`VectorSet::as_slice`].
    ///
    /// # Panics
    ///
    /// Panics if `value` is not present.
    pub fn index<Q>(&self, value: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFn<Q>,
    {
        match self.index_try(value) {
            Some(index) => index,
            None => panic!("value is not in the set"),
        }
    }

    /// Remove `value` and return the stored element.
    ///
    /// # Panics
    ///
    /// Panics if `value` is not present.
    pub fn remove<Q>(&mut self, value: &Q) -> T
    where
        T: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFn<Q>,
    {
        match self.try_remove(value) {
            Some(removed) => removed,
            None => panic!("value is not in the set"),
        }
    }

    /// Remove `value` if present and return the stored element.
    pub fn try_remove<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFn<Q>,
    {
        let elements = &self.elements;
        let found = self
            .table
            .find(<H as HashFn<Q>>::hash(&self.hasher, value), |index| {
                Q::eq(value, elements[index].borrow())
            })?;
        self.table.vacate(found.position);
        let last = self.elements.len() - 1;
        let removed = self.elements.remove_and_reorder(found.index);
        if found.index != last {
            let moved_hash = <H as HashFn<T>>::hash(&self.hasher, &self.elements[found.index]);
            self.table.repoint(moved_hash, last, found.index);
        }
        Some(removed)
    }

    /// Remove and return the last element.
    ///
    /// # Panics
    ///
    /// Panics if the set is empty.
    pub fn pop(&mut self) -> T {
        assert!(!self.is_empty(), "pop from an empty set");
        let value = self.elements.pop_last();
        let index = self.elements.len();
        self.table.vacate_index(self.hasher.hash(&value), index);
        value
    }

    /// Occupancy summary.
    pub fn stats(&self) -> TableStats {
        let hasher = &self.hasher;
        self.table.stats(
            self.elements
                .iter()
                .enumerate()
                .map(|(index, value)| (hasher.hash(value), index)),
        )
    }
}

impl<T, H: Default, A: Allocator + Default> Default for VectorSet<T, H, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T: Clone, H: Clone, A: Allocator> Clone for VectorSet<T, H, A> {
    fn clone(&self) -> Self {
        let mut elements = self.elements.clone();
        // Keep `slots_usable <= capacity` so appends never reallocate
        // between rebuilds.
        elements.reserve(self.table.slots_usable());
        Self {
            table: self.table.clone(),
            elements,
            hasher: self.hasher.clone(),
        }
    }
}

impl<T: fmt::Debug, H, A: Allocator> fmt::Debug for VectorSet<T, H, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Sets are equal when they hold the same elements, in any order.
impl<T: Eq, H: HashFn<T>, A: Allocator> PartialEq for VectorSet<T, H, A> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|value| other.contains(value))
    }
}

impl<T: Eq, H: HashFn<T>, A: Allocator> Eq for VectorSet<T, H, A> {}

impl<T, H, A: Allocator> Index<usize> for VectorSet<T, H, A> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.elements[index]
    }
}

impl<T: Eq, H: HashFn<T>, A: Allocator> Extend<T> for VectorSet<T, H, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.add_multiple(iter);
    }
}

impl<T: Eq, H: HashFn<T> + Default> FromIterator<T> for VectorSet<T, H, RawAllocator> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.add_multiple(iter);
        set
    }
}

impl<'a, T, H, A: Allocator> IntoIterator for &'a VectorSet<T, H, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
