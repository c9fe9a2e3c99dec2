//! Fixed-length array with small-buffer optimization.
//!
//! The length of an [`Array`] is chosen at construction and never changes.
//! Up to `N` elements are stored inline, larger arrays use exactly one
//! allocation of the requested length. The slot table keeps its slots in
//! one.

#![allow(unsafe_code)]

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr;
use std::slice;

use strata_alloc::{handle_alloc_failure, Allocator, RawAllocator};

use crate::storage::Storage;

/// A fixed-length array with `N` inline slots.
pub struct Array<T, const N: usize = 4, A: Allocator = RawAllocator> {
    len: usize,
    storage: Storage<T, N>,
    allocator: A,
}

// SAFETY: an `Array` owns its elements.
unsafe impl<T: Send, const N: usize, A: Allocator + Send> Send for Array<T, N, A> {}
// SAFETY: shared access only hands out `&T`.
unsafe impl<T: Sync, const N: usize, A: Allocator + Sync> Sync for Array<T, N, A> {}

impl<T, const N: usize> Array<T, N, RawAllocator> {
    /// Array of `len` default values.
    pub fn with_len(len: usize) -> Self
    where
        T: Default,
    {
        Self::with_len_in(len, RawAllocator)
    }

    /// Array of `len` clones of `value`.
    pub fn from_elem(len: usize, value: T) -> Self
    where
        T: Clone,
    {
        Self::from_elem_in(len, value, RawAllocator)
    }

    /// Array holding clones of `values`.
    pub fn from_slice(values: &[T]) -> Self
    where
        T: Clone,
    {
        Self::from_slice_in(values, RawAllocator)
    }
}

impl<T, const N: usize, A: Allocator> Array<T, N, A> {
    /// Array of `len` default values in `allocator`.
    pub fn with_len_in(len: usize, allocator: A) -> Self
    where
        T: Default,
    {
        Self::from_fn_in(len, allocator, |_| T::default())
    }

    /// Array of `len` clones of `value` in `allocator`.
    pub fn from_elem_in(len: usize, value: T, allocator: A) -> Self
    where
        T: Clone,
    {
        Self::from_fn_in(len, allocator, |_| value.clone())
    }

    /// Array holding clones of `values` in `allocator`.
    pub fn from_slice_in(values: &[T], allocator: A) -> Self
    where
        T: Clone,
    {
        Self::from_fn_in(values.len(), allocator, |i| values[i].clone())
    }

    fn from_fn_in(len: usize, allocator: A, mut make: impl FnMut(usize) -> T) -> Self {
        let storage =
            Storage::exact(len, &allocator).unwrap_or_else(|err| handle_alloc_failure(err));
        let mut array = Self {
            len: 0,
            storage,
            allocator,
        };
        for i in 0..len {
            let value = make(i);
            // SAFETY: the storage holds at least `len` slots; `array.len`
            // tracks how many are initialized if `make` panics.
            unsafe { array.storage.as_mut_ptr().add(i).write(value) };
            array.len = i + 1;
        }
        array
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

    /// View the elements as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: all `len` slots are initialized.
        unsafe { slice::from_raw_parts(self.storage.as_ptr(), self.len) }
    }

    /// View the elements as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: all `len` slots are initialized.
        unsafe { slice::from_raw_parts_mut(self.storage.as_mut_ptr(), self.len) }
    }
}

impl<T, const N: usize, A: Allocator> Drop for Array<T, N, A> {
    fn drop(&mut self) {
        let len = self.len;
        self.len = 0;
        // SAFETY: the first `len` slots were initialized.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.storage.as_mut_ptr(), len));
        }
        self.storage.release(&self.allocator);
    }
}

impl<T, const N: usize, A: Allocator> Deref for Array<T, N, A> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, const N: usize, A: Allocator> DerefMut for Array<T, N, A> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Clone, const N: usize, A: Allocator> Clone for Array<T, N, A> {
    fn clone(&self) -> Self {
        Self::from_slice_in(self, self.allocator.clone())
    }
}

impl<T: fmt::Debug, const N: usize, A: Allocator> fmt::Debug for Array<T, N, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, const N: usize, A: Allocator> PartialEq for Array<T, N, A> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, const N: usize, A: Allocator> Eq for Array<T, N, A> {}

impl<T: Clone, const N: usize> From<&[T]> for Array<T, N, RawAllocator> {
    fn from(values: &[T]) -> Self {
        Self::from_slice(values)
    }
}

impl<'a, T, const N: usize, A: Allocator> IntoIterator for &'a Array<T, N, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
