//! The pluggable allocator capability.
//!
//! Every container is parametrized over an [`Allocator`] value and stores
//! it by value, so storage strategy can be swapped without touching
//! container code. The provided allocators are zero-sized and `Copy`.

#![allow(unsafe_code)]

use std::alloc::{handle_alloc_error, Layout};
use std::mem;
use std::ptr::NonNull;

use strata_core::AllocError;

use crate::raw;

/// A source of raw, aligned memory.
///
/// Implementations do no error translation: `allocate` returns `None`
/// when memory is exhausted and leaves the policy to the caller.
pub trait Allocator: Clone {
    /// Allocate `size` bytes aligned to `alignment` (a power of two).
    fn allocate(&self, size: usize, alignment: usize) -> Option<NonNull<u8>>;

    /// Release memory obtained from [`Allocator::allocate`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this allocator (or a clone of
    /// it) and must not have been freed since.
    unsafe fn free(&self, ptr: NonNull<u8>);

    /// Allocate uninitialized storage for `len` values of `T`.
    ///
    /// Reports [`AllocError::CapacityOverflow`] when the byte size does not
    /// fit in `isize`, and [`AllocError::OutOfMemory`] when the allocator
    /// fails.
    fn allocate_array<T>(&self, len: usize) -> Result<NonNull<T>, AllocError> {
        let size = array_bytes::<T>(len)?;
        let alignment = mem::align_of::<T>();
        self.allocate(size, alignment)
            .map(NonNull::cast)
            .ok_or(AllocError::OutOfMemory { size, alignment })
    }
}

/// Byte size of an array of `len` values of `T`, checked against `isize::MAX`.
pub fn array_bytes<T>(len: usize) -> Result<usize, AllocError> {
    len.checked_mul(mem::size_of::<T>())
        .filter(|&bytes| bytes <= isize::MAX as usize)
        .ok_or(AllocError::CapacityOverflow)
}

/// Turn an allocation failure on an infallible path into the matching
/// fatal outcome: a panic for overflow, an abort for exhaustion.
#[cold]
pub fn handle_alloc_failure(err: AllocError) -> ! {
    match err {
        AllocError::CapacityOverflow => panic!("capacity overflow"),
        AllocError::OutOfMemory { size, alignment } => {
            let layout = Layout::from_size_align(size, alignment)
                .unwrap_or_else(|_| Layout::new::<u8>());
            handle_alloc_error(layout)
        }
    }
}

/// Allocator backed by the platform aligned-allocation primitive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawAllocator;

impl Allocator for RawAllocator {
    #[inline]
    fn allocate(&self, size: usize, alignment: usize) -> Option<NonNull<u8>> {
        raw::aligned_alloc(size, alignment)
    }

    #[inline]
    unsafe fn free(&self, ptr: NonNull<u8>) {
        // SAFETY: forwarded from the caller; `ptr` came from `aligned_alloc`.
        unsafe { raw::aligned_free(ptr) }
    }
}

/// Allocator that always uses the header-based fallback primitive.
///
/// Useful on targets whose native aligned allocator is unreliable and for
/// exercising the fallback path in tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FallbackAllocator;

impl Allocator for FallbackAllocator {
    #[inline]
    fn allocate(&self, size: usize, alignment: usize) -> Option<NonNull<u8>> {
        raw::aligned_alloc_fallback(size, alignment)
    }

    #[inline]
    unsafe fn free(&self, ptr: NonNull<u8>) {
        // SAFETY: forwarded from the caller; `ptr` came from the fallback.
        unsafe { raw::aligned_free_fallback(ptr) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<A: Allocator>(allocator: A) {
        let ptr = allocator.allocate_array::<u64>(32).unwrap();
        assert_eq!(ptr.as_ptr().addr() % mem::align_of::<u64>(), 0);
        unsafe {
            for i in 0..32 {
                ptr.as_ptr().add(i).write(i as u64);
            }
            assert_eq!(ptr.as_ptr().add(31).read(), 31);
            allocator.free(ptr.cast());
        }
    }

    #[test]
    fn raw_allocator_round_trip() {
        round_trip(RawAllocator);
    }

    #[test]
    fn fallback_allocator_round_trip() {
        round_trip(FallbackAllocator);
    }

    #[test]
    fn array_bytes_detects_overflow() {
        assert_eq!(array_bytes::<u64>(4), Ok(32));
        assert_eq!(
            array_bytes::<u64>(usize::MAX / 4),
            Err(AllocError::CapacityOverflow)
        );
    }

    #[test]
    fn zero_sized_elements_need_no_bytes() {
        assert_eq!(array_bytes::<()>(usize::MAX), Ok(0));
    }

    #[test]
    #[should_panic(expected = "capacity overflow")]
    fn overflow_is_a_panic() {
        handle_alloc_failure(AllocError::CapacityOverflow);
    }
}
