//! Small-buffer-optimized growable array.
//!
//! A [`Vector`] keeps up to `N` elements inside the object itself and moves
//! them to a single allocator-provided heap buffer once that is exceeded.
//! Heap capacities are always powers of two (except for exact-size copies),
//! so any pattern of `append` and `reserve` is amortized O(1).
//!
//! Moving a `Vector` is a plain Rust move: inline elements are relocated
//! bitwise, a heap buffer is handed over by pointer. [`Vector::take`] leaves
//! the source empty and inline.

#![allow(unsafe_code)]

use std::borrow::{Borrow, BorrowMut};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;
use std::mem::{self, ManuallyDrop};
use std::ops::{Deref, DerefMut, Range};
use std::ptr;
use std::slice;

use strata_alloc::{handle_alloc_failure, Allocator, RawAllocator};
use strata_core::{ceil_power_of_two, AllocError};

use crate::storage::Storage;

/// Default number of inline elements.
pub const DEFAULT_INLINE_CAPACITY: usize = 4;

/// A contiguous growable array with `N` inline slots.
///
/// Dereferences to `[T]`, so slice methods and indexing are available.
/// Indexing is bounds-checked and panics on violation.
pub struct Vector<T, const N: usize = DEFAULT_INLINE_CAPACITY, A: Allocator = RawAllocator> {
    len: usize,
    storage: Storage<T, N>,
    allocator: A,
}

// SAFETY: a `Vector` owns its elements exactly like `Vec<T>` does.
unsafe impl<T: Send, const N: usize, A: Allocator + Send> Send for Vector<T, N, A> {}
// SAFETY: shared access only hands out `&T`.
unsafe impl<T: Sync, const N: usize, A: Allocator + Sync> Sync for Vector<T, N, A> {}

/// Snapshot of a vector's memory layout, see [`Vector::stats`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VectorStats {
    /// Number of elements.
    pub len: usize,
    /// Number of elements that fit without reallocating.
    pub capacity: usize,
    /// Number of inline slots (`N`).
    pub inline_capacity: usize,
    /// Whether the elements live in the inline slots.
    pub is_inline: bool,
    /// Size of the vector object itself in bytes.
    pub object_size: usize,
}

impl fmt::Display for VectorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Vector:")?;
        writeln!(f, "  Elements: {}", self.len)?;
        writeln!(f, "  Capacity: {}", self.capacity)?;
        write!(
            f,
            "  Inline Elements: {}  Object Size: {}",
            self.inline_capacity, self.object_size
        )
    }
}

impl<T, const N: usize> Vector<T, N, RawAllocator> {
    /// Create an empty vector. Does not allocate.
    #[inline]
    pub const fn new() -> Self {
        Self {
            len: 0,
            storage: Storage::inline(),
            allocator: RawAllocator,
        }
    }

    /// Create a vector of `len` default values.
    pub fn with_len(len: usize) -> Self
    where
        T: Default,
    {
        let mut vector = Self::new();
        vector.reserve(len);
        for _ in 0..len {
            // SAFETY: reserved above.
            unsafe { vector.append_unchecked(T::default()) };
        }
        vector
    }

    /// Create a vector of `len` clones of `value`.
    pub fn from_elem(len: usize, value: T) -> Self
    where
        T: Clone,
    {
        let mut vector = Self::new();
        vector.append_n_times(&value, len);
        vector
    }

    /// Create a vector holding clones of `values`.
    pub fn from_slice(values: &[T]) -> Self
    where
        T: Clone,
    {
        let mut vector = Self::new();
        vector.extend_from_slice(values);
        vector
    }
}

impl<T, const N: usize, A: Allocator> Vector<T, N, A> {
    /// Create an empty vector drawing heap storage from `allocator`.
    #[inline]
    pub fn new_in(allocator: A) -> Self {
        Self {
            len: 0,
            storage: Storage::inline(),
            allocator,
        }
    }

    /// Empty vector whose storage holds exactly `capacity` elements.
    fn with_exact_capacity_in(capacity: usize, allocator: A) -> Self {
        let storage =
            Storage::exact(capacity, &allocator).unwrap_or_else(|err| handle_alloc_failure(err));
        Self {
            len: 0,
            storage,
            allocator,
        }
    }

    /// Convert from a vector with a different inline size.
    ///
    /// Heap storage is adopted without copying. Inline elements are
    /// relocated into this vector's inline slots, or into an exact-size heap
    /// buffer when they do not fit.
    pub fn from_vector<const M: usize>(other: Vector<T, M, A>) -> Self {
        let other = ManuallyDrop::new(other);
        let len = other.len;
        // SAFETY: `other` is never dropped, so its allocator is moved out
        // exactly once.
        let allocator = unsafe { ptr::read(&other.allocator) };
        match other.storage {
            Storage::Heap { ptr, capacity } => Self {
                len,
                storage: Storage::Heap { ptr, capacity },
                allocator,
            },
            Storage::Inline(ref slots) => {
                let mut vector = Self::with_exact_capacity_in(len, allocator);
                // SAFETY: the first `len` inline slots of `other` are
                // initialized and are relocated into fresh storage of at
                // least `len` slots; `other` never touches them again.
                unsafe {
                    ptr::copy_nonoverlapping(slots.as_ptr().cast::<T>(), vector.as_mut_ptr(), len);
                }
                vector.len = len;
                vector
            }
        }
    }

    /// Move the contents out, leaving `self` empty and inline.
    ///
    /// O(1) for heap-backed vectors.
    pub fn take(&mut self) -> Self {
        let empty = Self::new_in(self.allocator.clone());
        mem::replace(self, empty)
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the vector has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of elements that fit without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Whether the elements live in the inline slots.
    #[inline]
    pub fn is_inline(&self) -> bool {
        self.storage.is_inline()
    }

    /// The allocator heap storage comes from.
    #[inline]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Raw pointer to the first element slot.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.storage.as_ptr()
    }

    /// Mutable raw pointer to the first element slot.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.storage.as_mut_ptr()
    }

    /// View the elements as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the first `len` slots are initialized.
        unsafe { slice::from_raw_parts(self.as_ptr(), self.len) }
    }

    /// View the elements as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: the first `len` slots are initialized.
        unsafe { slice::from_raw_parts_mut(self.as_mut_ptr(), self.len) }
    }

    /// Make room for at least `min_capacity` elements in total.
    ///
    /// Never shrinks. A heap capacity is always rounded up to a power of two.
    pub fn reserve(&mut self, min_capacity: usize) {
        if let Err(err) = self.try_reserve(min_capacity) {
            handle_alloc_failure(err);
        }
    }

    /// Fallible form of [`Vector::reserve`].
    pub fn try_reserve(&mut self, min_capacity: usize) -> Result<(), AllocError> {
        if self.capacity() >= min_capacity {
            return Ok(());
        }
        self.grow(min_capacity)
    }

    #[cold]
    #[inline(never)]
    fn grow(&mut self, min_capacity: usize) -> Result<(), AllocError> {
        let capacity = ceil_power_of_two(min_capacity).ok_or(AllocError::CapacityOverflow)?;
        let new_ptr = self.allocator.allocate_array::<T>(capacity)?;
        // SAFETY: the new buffer holds `capacity > len` slots and does not
        // overlap the old storage. Elements are relocated bitwise and the old
        // buffer is released without dropping them.
        unsafe {
            ptr::copy_nonoverlapping(self.as_ptr(), new_ptr.as_ptr(), self.len);
        }
        self.storage.release(&self.allocator);
        self.storage = Storage::Heap {
            ptr: new_ptr,
            capacity,
        };
        Ok(())
    }

    #[inline]
    fn ensure_space_for_one(&mut self) {
        if self.len == self.capacity() {
            let doubled = self
                .len
                .checked_mul(2)
                .unwrap_or_else(|| handle_alloc_failure(AllocError::CapacityOverflow));
            self.reserve(doubled.max(1));
        }
    }

    /// Append `value` at the end, growing when full.
    #[inline]
    pub fn append(&mut self, value: T) {
        self.ensure_space_for_one();
        // SAFETY: room for one more element was ensured above.
        unsafe { self.append_unchecked(value) };
    }

    /// Append `value` without checking capacity.
    ///
    /// # Safety
    ///
    /// `len() < capacity()` must hold, for example after a matching
    /// [`Vector::reserve`].
    #[inline]
    pub unsafe fn append_unchecked(&mut self, value: T) {
        debug_assert!(self.len < self.capacity());
        // SAFETY: the caller guarantees slot `len` exists and is unused.
        unsafe { self.as_mut_ptr().add(self.len).write(value) };
        self.len += 1;
    }

    /// Append `value` and return its index.
    pub fn append_and_get_index(&mut self, value: T) -> usize {
        let index = self.len;
        self.append(value);
        index
    }

    /// Append `value` unless an equal element is already present.
    ///
    /// Linear in the length of the vector.
    pub fn append_non_duplicates(&mut self, value: T)
    where
        T: PartialEq,
    {
        if !self.contains(&value) {
            self.append(value);
        }
    }

    /// Append a clone of each element of `values` not already present.
    pub fn extend_non_duplicates(&mut self, values: &[T])
    where
        T: Clone + PartialEq,
    {
        for value in values {
            self.append_non_duplicates(value.clone());
        }
    }

    /// Append `n` clones of `value`.
    pub fn append_n_times(&mut self, value: &T, n: usize)
    where
        T: Clone,
    {
        self.reserve(self.required_len(n));
        for _ in 0..n {
            // SAFETY: reserved above.
            unsafe { self.append_unchecked(value.clone()) };
        }
    }

    /// Append clones of every element of `values`.
    pub fn extend_from_slice(&mut self, values: &[T])
    where
        T: Clone,
    {
        self.reserve(self.required_len(values.len()));
        for value in values {
            // SAFETY: reserved above.
            unsafe { self.append_unchecked(value.clone()) };
        }
    }

    fn required_len(&self, additional: usize) -> usize {
        self.len
            .checked_add(additional)
            .unwrap_or_else(|| handle_alloc_failure(AllocError::CapacityOverflow))
    }

    /// Drop the last element.
    ///
    /// # Panics
    ///
    /// Panics if the vector is empty.
    pub fn remove_last(&mut self) {
        drop(self.pop_last());
    }

    /// Remove the last element and return it.
    ///
    /// # Panics
    ///
    /// Panics if the vector is empty.
    pub fn pop_last(&mut self) -> T {
        assert!(!self.is_empty(), "pop_last on an empty vector");
        self.len -= 1;
        // SAFETY: slot `len` was initialized and is now outside the live
        // range, so it is read exactly once.
        unsafe { self.as_ptr().add(self.len).read() }
    }

    /// Remove the element at `index` and move the last element into its
    /// place. O(1); does not preserve order.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove_and_reorder(&mut self, index: usize) -> T {
        assert!(
            index < self.len,
            "remove_and_reorder index {index} out of bounds (len {})",
            self.len
        );
        let last = self.len - 1;
        self.len = last;
        let base = self.as_mut_ptr();
        // SAFETY: both `index` and `last` were live. The removed value is
        // read out before the last element is relocated over it.
        unsafe {
            let removed = base.add(index).read();
            if index < last {
                ptr::copy_nonoverlapping(base.add(last), base.add(index), 1);
            }
            removed
        }
    }

    /// Remove the first element equal to `value`, filling the gap with the
    /// last element.
    ///
    /// # Panics
    ///
    /// Panics if no element equals `value`.
    pub fn remove_first_occurrence_and_reorder(&mut self, value: &T) -> T
    where
        T: PartialEq,
    {
        let index = self.index(value);
        self.remove_and_reorder(index)
    }

    /// Drop every element, keeping the current storage.
    pub fn clear(&mut self) {
        let len = self.len;
        // Zero first so a panicking destructor cannot cause a double drop.
        self.len = 0;
        // SAFETY: the first `len` slots were initialized and are now
        // outside the live range.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.as_mut_ptr(), len));
        }
    }

    /// Drop every element and release heap storage.
    pub fn clear_and_make_small(&mut self) {
        self.clear();
        self.storage.release(&self.allocator);
    }

    /// Index of the first element equal to `value`.
    pub fn index_try(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.iter().position(|element| element == value)
    }

    /// Index of the first element equal to `value`.
    ///
    /// # Panics
    ///
    /// Panics if no element equals `value`.
    pub fn index(&self, value: &T) -> usize
    where
        T: PartialEq,
    {
        match self.index_try(value) {
            Some(index) => index,
            None => panic!("value is not in the vector"),
        }
    }

    /// Whether any element equals `value`. Linear.
    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.index_try(value).is_some()
    }

    /// The last element.
    ///
    /// # Panics
    ///
    /// Panics if the vector is empty.
    pub fn last(&self) -> &T {
        assert!(!self.is_empty(), "last on an empty vector");
        &self.as_slice()[self.len - 1]
    }

    /// The last element, mutably.
    ///
    /// # Panics
    ///
    /// Panics if the vector is empty.
    pub fn last_mut(&mut self) -> &mut T {
        assert!(!self.is_empty(), "last_mut on an empty vector");
        let last = self.len - 1;
        &mut self.as_mut_slice()[last]
    }

    /// Overwrite every element with a clone of `value`.
    pub fn fill(&mut self, value: &T)
    where
        T: Clone,
    {
        self.as_mut_slice().fill(value.clone());
    }

    /// Overwrite the elements at `indices` with clones of `value`.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    pub fn fill_indices(&mut self, indices: &[usize], value: &T)
    where
        T: Clone,
    {
        let elements = self.as_mut_slice();
        for &index in indices {
            elements[index] = value.clone();
        }
    }

    /// The range of valid indices, `0..len()`.
    #[inline]
    pub fn index_range(&self) -> Range<usize> {
        0..self.len
    }

    /// Memory layout summary.
    pub fn stats(&self) -> VectorStats {
        VectorStats {
            len: self.len,
            capacity: self.capacity(),
            inline_capacity: N,
            is_inline: self.is_inline(),
            object_size: mem::size_of::<Self>(),
        }
    }
}

impl<T, const N: usize, A: Allocator> Drop for Vector<T, N, A> {
    fn drop(&mut self) {
        self.clear();
        self.storage.release(&self.allocator);
    }
}

impl<T, const N: usize, A: Allocator> Deref for Vector<T, N, A> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, const N: usize, A: Allocator> DerefMut for Vector<T, N, A> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, const N: usize, A: Allocator> AsRef<[T]> for Vector<T, N, A> {
    fn as_ref(&self) -> &[T] {
        self
    }
}

impl<T, const N: usize, A: Allocator> AsMut<[T]> for Vector<T, N, A> {
    fn as_mut(&mut self) -> &mut [T] {
        self
    }
}

impl<T, const N: usize, A: Allocator> Borrow<[T]> for Vector<T, N, A> {
    fn borrow(&self) -> &[T] {
        self
    }
}

impl<T, const N: usize, A: Allocator> BorrowMut<[T]> for Vector<T, N, A> {
    fn borrow_mut(&mut self) -> &mut [T] {
        self
    }
}

impl<T, const N: usize, A: Allocator + Default> Default for Vector<T, N, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

/// Copies land in inline slots when they fit, otherwise in an exact-size
/// heap buffer.
impl<T: Clone, const N: usize, A: Allocator> Clone for Vector<T, N, A> {
    fn clone(&self) -> Self {
        let mut copy = Self::with_exact_capacity_in(self.len, self.allocator.clone());
        for value in self.iter() {
            // SAFETY: the copy has exactly `self.len` slots.
            unsafe { copy.append_unchecked(value.clone()) };
        }
        copy
    }
}

impl<T: fmt::Debug, const N: usize, A: Allocator> fmt::Debug for Vector<T, N, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T, U, const N: usize, const M: usize, A, B> PartialEq<Vector<U, M, B>> for Vector<T, N, A>
where
    T: PartialEq<U>,
    A: Allocator,
    B: Allocator,
{
    fn eq(&self, other: &Vector<U, M, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, const N: usize, A: Allocator> Eq for Vector<T, N, A> {}

impl<T, U, const N: usize, A: Allocator> PartialEq<[U]> for Vector<T, N, A>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &[U]) -> bool {
        self.as_slice() == other
    }
}

impl<T, U, const N: usize, const M: usize, A: Allocator> PartialEq<[U; M]> for Vector<T, N, A>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &[U; M]) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Hash, const N: usize, A: Allocator> Hash for Vector<T, N, A> {
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.as_slice().hash(state);
    }
}

impl<T, const N: usize, A: Allocator> Extend<T> for Vector<T, N, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        self.reserve(self.required_len(lower));
        for value in iter {
            self.append(value);
        }
    }
}

impl<'a, T: Copy + 'a, const N: usize, A: Allocator> Extend<&'a T> for Vector<T, N, A> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T, const N: usize> FromIterator<T> for Vector<T, N, RawAllocator> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut vector = Self::new();
        vector.extend(iter);
        vector
    }
}

impl<T, const N: usize, const M: usize> From<[T; M]> for Vector<T, N, RawAllocator> {
    fn from(values: [T; M]) -> Self {
        values.into_iter().collect()
    }
}

impl<T: Clone, const N: usize> From<&[T]> for Vector<T, N, RawAllocator> {
    fn from(values: &[T]) -> Self {
        Self::from_slice(values)
    }
}

impl<'a, T, const N: usize, A: Allocator> IntoIterator for &'a Vector<T, N, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, const N: usize, A: Allocator> IntoIterator for &'a mut Vector<T, N, A> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T, const N: usize, A: Allocator> IntoIterator for Vector<T, N, A> {
    type Item = T;
    type IntoIter = IntoIter<T, N, A>;

    fn into_iter(mut self) -> Self::IntoIter {
        let end = self.len;
        // Ownership of the elements moves to the iterator.
        self.len = 0;
        IntoIter {
            vector: self,
            next: 0,
            end,
        }
    }
}

/// Owning iterator over the elements of a [`Vector`].
pub struct IntoIter<T, const N: usize, A: Allocator> {
    /// Holds the storage; its `len` is zero so it never drops elements.
    vector: Vector<T, N, A>,
    next: usize,
    end: usize,
}

impl<T, const N: usize, A: Allocator> IntoIter<T, N, A> {
    /// The elements not yet yielded.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: slots `next..end` are initialized and not yet yielded.
        unsafe {
            slice::from_raw_parts(
                self.vector.as_ptr().add(self.next),
                self.end - self.next,
            )
        }
    }
}

impl<T, const N: usize, A: Allocator> Iterator for IntoIter<T, N, A> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.next == self.end {
            return None;
        }
        // SAFETY: slot `next` is initialized and read exactly once.
        let value = unsafe { self.vector.as_ptr().add(self.next).read() };
        self.next += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl<T, const N: usize, A: Allocator> DoubleEndedIterator for IntoIter<T, N, A> {
    fn next_back(&mut self) -> Option<T> {
        if self.next == self.end {
            return None;
        }
        self.end -= 1;
        // SAFETY: slot `end` is initialized and read exactly once.
        Some(unsafe { self.vector.as_ptr().add(self.end).read() })
    }
}

impl<T, const N: usize, A: Allocator> ExactSizeIterator for IntoIter<T, N, A> {}

impl<T, const N: usize, A: Allocator> FusedIterator for IntoIter<T, N, A> {}

impl<T, const N: usize, A: Allocator> Drop for IntoIter<T, N, A> {
    fn drop(&mut self) {
        let remaining = self.end - self.next;
        let start = self.next;
        self.next = self.end;
        // SAFETY: slots `start..start + remaining` were never yielded. The
        // storage itself is released by the inner vector.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.vector.as_mut_ptr().add(start),
                remaining,
            ));
        }
    }
}

impl<T: fmt::Debug, const N: usize, A: Allocator> fmt::Debug for IntoIter<T, N, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.as_slice()).finish()
    }
}
