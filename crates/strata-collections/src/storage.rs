//! Inline-or-heap element storage shared by [`Vector`](crate::Vector) and
//! [`Array`](crate::Array).
//!
//! `Storage` only tracks where the slots live and how many there are. The
//! owner tracks how many of them are initialized, drops them, and hands the
//! heap buffer back through [`Storage::release`].

#![allow(unsafe_code)]

use std::mem::MaybeUninit;
use std::ptr::NonNull;

use strata_alloc::Allocator;
use strata_core::AllocError;

pub(crate) enum Storage<T, const N: usize> {
    /// The object's own slots.
    Inline([MaybeUninit<T>; N]),
    /// One allocation of `capacity` slots obtained from the owner's allocator.
    Heap { ptr: NonNull<T>, capacity: usize },
}

impl<T, const N: usize> Storage<T, N> {
    #[inline]
    pub(crate) const fn inline() -> Self {
        Self::Inline([const { MaybeUninit::uninit() }; N])
    }

    /// Storage for exactly `capacity` slots: inline when it fits, otherwise
    /// an exact-size heap allocation.
    pub(crate) fn exact<A: Allocator>(capacity: usize, allocator: &A) -> Result<Self, AllocError> {
        if capacity <= N {
            return Ok(Self::inline());
        }
        let ptr = allocator.allocate_array::<T>(capacity)?;
        Ok(Self::Heap { ptr, capacity })
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        match self {
            Self::Inline(_) => N,
            Self::Heap { capacity, .. } => *capacity,
        }
    }

    #[inline]
    pub(crate) fn is_inline(&self) -> bool {
        matches!(self, Self::Inline(_))
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> *const T {
        match self {
            Self::Inline(slots) => slots.as_ptr().cast(),
            Self::Heap { ptr, .. } => ptr.as_ptr(),
        }
    }

    #[inline]
    pub(crate) fn as_mut_ptr(&mut self) -> *mut T {
        match self {
            Self::Inline(slots) => slots.as_mut_ptr().cast(),
            Self::Heap { ptr, .. } => ptr.as_ptr(),
        }
    }

    /// Free the heap buffer, if any, and fall back to empty inline slots.
    ///
    /// Elements still in the buffer are forgotten, not dropped.
    pub(crate) fn release<A: Allocator>(&mut self, allocator: &A) {
        if let Self::Heap { ptr, .. } = *self {
            // SAFETY: heap storage is always obtained from the owner's
            // allocator, and it is forgotten right after being freed.
            unsafe { allocator.free(ptr.cast()) };
            *self = Self::inline();
        }
    }
}
