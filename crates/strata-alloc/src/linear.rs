//! Bump-pointer arena over growing buffers.
//!
//! A [`LinearAllocator`] never reuses memory and has no per-object
//! deallocation. It carves consecutive regions out of the current buffer;
//! when a request does not fit, it switches to a donated ("borrowed")
//! buffer if one is large enough, otherwise it allocates a new owned buffer
//! at least twice as large as the previous one. Owned buffers are released
//! when the arena is dropped; borrowed buffers are never freed by it.
//!
//! Allocation goes through `&self`, so any number of arena-backed
//! references can be alive at once. Values placed in the arena are never
//! dropped by it.

#![allow(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};
use std::ptr::{self, NonNull};
use std::slice;

use smallvec::SmallVec;
use strata_core::{align_up, ceil_power_of_two, is_power_of_two, AllocError};
use tracing::trace;

use crate::allocator::{array_bytes, handle_alloc_failure, Allocator, RawAllocator};
use crate::config::ArenaConfig;
use crate::error::ArenaError;

/// A buffer the arena allocated and must free.
#[derive(Clone, Copy, Debug)]
struct OwnedBuffer {
    ptr: NonNull<u8>,
    size: usize,
}

/// A donated buffer that has not been switched to yet.
#[derive(Clone, Copy, Debug)]
struct BorrowedBuffer {
    ptr: NonNull<u8>,
    len: usize,
}

/// Bump allocator with buffer donation.
///
/// `'buf` is the lifetime of donated buffers; an arena that is never given
/// one can be `LinearAllocator<'static>`.
pub struct LinearAllocator<'buf, A: Allocator = RawAllocator> {
    allocator: A,
    owned_buffers: RefCell<SmallVec<[OwnedBuffer; 4]>>,
    unused_borrowed_buffers: RefCell<SmallVec<[BorrowedBuffer; 4]>>,
    /// Next free byte of the current buffer; null before the first buffer.
    current_begin: Cell<*mut u8>,
    /// One past the last byte of the current buffer.
    current_end: Cell<*mut u8>,
    next_min_block_size: Cell<usize>,
    block_alignment: usize,
    allocated_bytes: Cell<usize>,
    _borrowed: PhantomData<&'buf mut [u8]>,
}

// SAFETY: the arena exclusively owns its owned buffers and holds the only
// access to its borrowed ones (taken as `&'buf mut`). Every reference it
// hands out borrows the arena, so it cannot be moved while one is alive.
unsafe impl<A: Allocator + Send> Send for LinearAllocator<'_, A> {}

impl LinearAllocator<'_, RawAllocator> {
    /// Create an empty arena over the platform allocator.
    pub fn new() -> Self {
        Self::new_in(RawAllocator)
    }
}

impl Default for LinearAllocator<'_, RawAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'buf, A: Allocator> LinearAllocator<'buf, A> {
    /// Create an empty arena drawing owned buffers from `allocator`.
    ///
    /// No memory is requested until the first allocation.
    pub fn new_in(allocator: A) -> Self {
        Self::from_valid_config(&ArenaConfig::default(), allocator)
    }

    /// Create an empty arena with explicit block sizing.
    pub fn with_config(config: ArenaConfig, allocator: A) -> Result<Self, ArenaError> {
        config.validate()?;
        Ok(Self::from_valid_config(&config, allocator))
    }

    /// Create an arena and acquire its first owned block immediately.
    ///
    /// Unlike the lazy constructors, an exhausted `allocator` surfaces here
    /// as [`ArenaError::Alloc`] instead of aborting on first use.
    pub fn with_preallocated(config: ArenaConfig, allocator: A) -> Result<Self, ArenaError> {
        let arena = Self::with_config(config, allocator)?;
        arena.acquire_buffer(arena.next_min_block_size.get())?;
        Ok(arena)
    }

    fn from_valid_config(config: &ArenaConfig, allocator: A) -> Self {
        Self {
            allocator,
            owned_buffers: RefCell::new(SmallVec::new()),
            unused_borrowed_buffers: RefCell::new(SmallVec::new()),
            current_begin: Cell::new(ptr::null_mut()),
            current_end: Cell::new(ptr::null_mut()),
            next_min_block_size: Cell::new(config.initial_block_size),
            block_alignment: config.block_alignment,
            allocated_bytes: Cell::new(0),
            _borrowed: PhantomData,
        }
    }

    /// Donate `buffer` for future use.
    ///
    /// Borrowed buffers are consulted, in donation order, before a new
    /// owned buffer is allocated. The arena never frees them.
    pub fn provide_buffer(&self, buffer: &'buf mut [u8]) {
        let len = buffer.len();
        let ptr = NonNull::from(buffer).cast::<u8>();
        self.unused_borrowed_buffers
            .borrow_mut()
            .push(BorrowedBuffer { ptr, len });
    }

    /// Allocate `size` bytes aligned to `alignment`.
    ///
    /// Aborts through [`std::alloc::handle_alloc_error`] when the
    /// underlying allocator is exhausted.
    ///
    /// # Panics
    ///
    /// Panics if `alignment` is not a power of two.
    pub fn allocate(&self, size: usize, alignment: usize) -> NonNull<u8> {
        match self.try_allocate(size, alignment) {
            Ok(ptr) => ptr,
            Err(err) => handle_alloc_failure(err),
        }
    }

    /// Fallible form of [`LinearAllocator::allocate`].
    ///
    /// # Panics
    ///
    /// Panics if `alignment` is not a power of two.
    pub fn try_allocate(&self, size: usize, alignment: usize) -> Result<NonNull<u8>, AllocError> {
        assert!(
            is_power_of_two(alignment),
            "alignment must be a power of two (got {alignment})"
        );

        let ptr = match self.bump(size, alignment) {
            Some(ptr) => ptr,
            None => {
                // size + alignment bytes always fit an aligned region of size.
                let needed = size
                    .checked_add(alignment)
                    .ok_or(AllocError::CapacityOverflow)?;
                self.acquire_buffer(needed)?;
                self.bump(size, alignment)
                    .ok_or(AllocError::OutOfMemory { size, alignment })?
            }
        };
        self.allocated_bytes.set(self.allocated_bytes.get() + size);
        Ok(ptr)
    }

    /// Allocate uninitialized storage for `len` values of `T`.
    #[allow(clippy::mut_from_ref)]
    pub fn allocate_array<T>(&self, len: usize) -> &mut [MaybeUninit<T>] {
        let size = array_bytes::<T>(len).unwrap_or_else(|err| handle_alloc_failure(err));
        let ptr = self.allocate(size, mem::align_of::<T>()).cast::<MaybeUninit<T>>();
        // SAFETY: the region holds `len` values of `T`, is correctly aligned,
        // and is handed out exactly once. `MaybeUninit` needs no init.
        unsafe { slice::from_raw_parts_mut(ptr.as_ptr(), len) }
    }

    /// Move `value` into the arena and return a reference to it.
    ///
    /// The value lives as long as the arena borrow and is never dropped.
    #[allow(clippy::mut_from_ref)]
    pub fn construct<T>(&self, value: T) -> &mut T {
        let ptr = self
            .allocate(mem::size_of::<T>(), mem::align_of::<T>())
            .cast::<T>();
        // SAFETY: `ptr` is aligned, sized for `T`, and not aliased.
        unsafe {
            ptr.as_ptr().write(value);
            &mut *ptr.as_ptr()
        }
    }

    /// Clone every element of `source` into a fresh arena slice.
    #[allow(clippy::mut_from_ref)]
    pub fn construct_array_copy<T: Clone>(&self, source: &[T]) -> &mut [T] {
        let slots = self.allocate_array::<T>(source.len());
        for (slot, value) in slots.iter_mut().zip(source) {
            slot.write(value.clone());
        }
        // SAFETY: every slot was initialized above.
        unsafe { &mut *(slots as *mut [MaybeUninit<T>] as *mut [T]) }
    }

    /// Construct `len` values with `make(index)` and an array of references
    /// to them.
    ///
    /// The values are contiguous; the reference array is allocated first.
    #[allow(clippy::mut_from_ref)]
    pub fn construct_elements_and_pointer_array<T>(
        &self,
        len: usize,
        mut make: impl FnMut(usize) -> T,
    ) -> &mut [&mut T] {
        let pointers = self.allocate_array::<&mut T>(len);
        let elements = self.allocate_array::<T>(len);
        for (index, (pointer, element)) in pointers.iter_mut().zip(elements).enumerate() {
            pointer.write(element.write(make(index)));
        }
        // SAFETY: every pointer slot was initialized above.
        unsafe { &mut *(pointers as *mut [MaybeUninit<&mut T>] as *mut [&mut T]) }
    }

    /// Copy `text` plus a terminating NUL into the arena.
    ///
    /// The returned view excludes the terminator.
    pub fn copy_str(&self, text: &str) -> &str {
        let len = text.len();
        let ptr = self.allocate(len + 1, 1);
        // SAFETY: the region holds `len + 1` bytes, does not overlap `text`,
        // and the copied bytes are valid UTF-8.
        unsafe {
            ptr::copy_nonoverlapping(text.as_ptr(), ptr.as_ptr(), len);
            ptr.as_ptr().add(len).write(0);
            std::str::from_utf8_unchecked(slice::from_raw_parts(ptr.as_ptr(), len))
        }
    }

    /// Sum of all requested sizes, excluding alignment padding.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes.get()
    }

    /// Number of buffers the arena allocated itself.
    pub fn owned_buffer_count(&self) -> usize {
        self.owned_buffers.borrow().len()
    }

    /// Total size of the owned buffers in bytes.
    pub fn owned_bytes(&self) -> usize {
        self.owned_buffers.borrow().iter().map(|b| b.size).sum()
    }

    /// Number of donated buffers not yet switched to.
    pub fn borrowed_buffer_count(&self) -> usize {
        self.unused_borrowed_buffers.borrow().len()
    }

    /// Bytes left in the current buffer before alignment padding.
    pub fn remaining_in_current(&self) -> usize {
        self.current_end.get().addr() - self.current_begin.get().addr()
    }

    /// Carve `size` bytes out of the current buffer, if they fit.
    fn bump(&self, size: usize, alignment: usize) -> Option<NonNull<u8>> {
        let begin = NonNull::new(self.current_begin.get())?;
        let begin_addr = begin.as_ptr().addr();
        let padding = align_up(begin_addr, alignment)? - begin_addr;
        let needed = padding.checked_add(size)?;
        if needed > self.remaining_in_current() {
            return None;
        }
        // SAFETY: padding + size <= remaining, so both the start and the new
        // cursor stay within (or one past) the current buffer.
        unsafe {
            let start = begin.as_ptr().add(padding);
            self.current_begin.set(start.add(size));
            Some(NonNull::new_unchecked(start))
        }
    }

    /// Switch to a buffer holding at least `min_size` bytes.
    fn acquire_buffer(&self, min_size: usize) -> Result<(), AllocError> {
        {
            let mut borrowed = self.unused_borrowed_buffers.borrow_mut();
            if let Some(pos) = borrowed.iter().position(|b| b.len >= min_size) {
                let buffer = borrowed.swap_remove(pos);
                trace!(
                    len = buffer.len,
                    min_size,
                    "linear allocator switched to borrowed buffer"
                );
                self.install(buffer.ptr, buffer.len);
                return Ok(());
            }
        }

        let size = ceil_power_of_two(min_size.max(self.next_min_block_size.get()))
            .ok_or(AllocError::CapacityOverflow)?;
        let alignment = self.block_alignment;
        let ptr = self
            .allocator
            .allocate(size, alignment)
            .ok_or(AllocError::OutOfMemory { size, alignment })?;
        self.next_min_block_size.set(size.saturating_mul(2));
        self.owned_buffers
            .borrow_mut()
            .push(OwnedBuffer { ptr, size });
        trace!(
            size,
            owned_buffers = self.owned_buffer_count(),
            "linear allocator acquired owned buffer"
        );
        self.install(ptr, size);
        Ok(())
    }

    fn install(&self, ptr: NonNull<u8>, len: usize) {
        self.current_begin.set(ptr.as_ptr());
        // SAFETY: one past the end of a `len`-byte buffer.
        self.current_end.set(unsafe { ptr.as_ptr().add(len) });
    }
}

impl<A: Allocator> Drop for LinearAllocator<'_, A> {
    fn drop(&mut self) {
        let owned = self.owned_buffers.get_mut();
        if !owned.is_empty() {
            trace!(
                buffers = owned.len(),
                allocated_bytes = self.allocated_bytes.get(),
                "linear allocator releasing owned buffers"
            );
        }
        for buffer in owned.drain(..) {
            // SAFETY: each owned buffer came from `self.allocator` and is
            // released exactly once, here.
            unsafe { self.allocator.free(buffer.ptr) };
        }
    }
}

impl<A: Allocator> fmt::Debug for LinearAllocator<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearAllocator")
            .field("allocated_bytes", &self.allocated_bytes())
            .field("owned_buffers", &self.owned_buffer_count())
            .field("owned_bytes", &self.owned_bytes())
            .field("borrowed_buffers", &self.borrowed_buffer_count())
            .field("next_min_block_size", &self.next_min_block_size.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::FallbackAllocator;

    fn addr(ptr: NonNull<u8>) -> usize {
        ptr.as_ptr().addr()
    }

    #[test]
    fn first_allocation_creates_one_buffer() {
        let arena = LinearAllocator::new();
        assert_eq!(arena.owned_buffer_count(), 0);
        let ptr = arena.allocate(16, 8);
        assert_eq!(addr(ptr) % 8, 0);
        assert_eq!(arena.owned_buffer_count(), 1);
        assert_eq!(arena.allocated_bytes(), 16);
    }

    #[test]
    fn sequential_allocations_are_adjacent() {
        let arena = LinearAllocator::new();
        let a = arena.allocate(8, 8);
        let b = arena.allocate(8, 8);
        assert_eq!(addr(b), addr(a) + 8);
    }

    #[test]
    fn alignment_padding_is_inserted() {
        let arena = LinearAllocator::new();
        let a = arena.allocate(1, 1);
        let b = arena.allocate(4, 16);
        assert_eq!(addr(b) % 16, 0);
        assert!(addr(b) > addr(a));
        assert_eq!(arena.allocated_bytes(), 5);
    }

    #[test]
    fn owned_blocks_double() {
        let arena = LinearAllocator::new();
        // 64 + 1 bytes needed -> 128-byte block, next minimum 256.
        arena.allocate(64, 1);
        assert_eq!(arena.owned_bytes(), 128);
        // 64 bytes remain; 200 does not fit -> max(201, 256) = 256.
        arena.allocate(200, 1);
        assert_eq!(arena.owned_buffer_count(), 2);
        assert_eq!(arena.owned_bytes(), 128 + 256);
    }

    #[test]
    fn large_request_gets_dedicated_power_of_two_block() {
        let arena = LinearAllocator::new();
        arena.allocate(1000, 8);
        assert_eq!(arena.owned_bytes(), 1024);
    }

    #[test]
    fn borrowed_buffer_is_used_before_owning() {
        let mut storage = [0u8; 1024];
        let range = storage.as_ptr_range();
        let (start, end) = (range.start.addr(), range.end.addr());
        {
            let arena = LinearAllocator::new();
            arena.provide_buffer(&mut storage);
            assert_eq!(arena.borrowed_buffer_count(), 1);
            let ptr = arena.allocate(100, 4);
            assert!(addr(ptr) >= start && addr(ptr) + 100 <= end);
            assert_eq!(arena.owned_buffer_count(), 0);
            assert_eq!(arena.borrowed_buffer_count(), 0);
        }
    }

    #[test]
    fn too_small_borrowed_buffer_is_skipped() {
        let mut small = [0u8; 16];
        let arena = LinearAllocator::new();
        arena.provide_buffer(&mut small);
        arena.allocate(64, 8);
        assert_eq!(arena.owned_buffer_count(), 1);
        assert_eq!(arena.borrowed_buffer_count(), 1);
    }

    #[test]
    fn construct_places_value() {
        let arena = LinearAllocator::new();
        let a = arena.construct(41u64);
        let b = arena.construct(String::from("arena"));
        *a += 1;
        assert_eq!(*a, 42);
        assert_eq!(b.as_str(), "arena");
        assert_eq!((a as *mut u64).addr() % mem::align_of::<u64>(), 0);
    }

    #[test]
    fn construct_array_copy_clones_elements() {
        let arena = LinearAllocator::new();
        let source = vec![String::from("a"), String::from("b"), String::from("c")];
        let copy = arena.construct_array_copy(&source);
        copy[1].push('!');
        assert_eq!(copy.to_vec(), vec!["a", "b!", "c"]);
        assert_eq!(source[1], "b");
    }

    #[test]
    fn pointer_array_references_contiguous_elements() {
        let arena = LinearAllocator::new();
        let pointers = arena.construct_elements_and_pointer_array(4, |i| i as u32 * 10);
        *pointers[2] += 1;
        let values: Vec<u32> = pointers.iter().map(|value| **value).collect();
        assert_eq!(values, [0, 10, 21, 30]);
        for pair in pointers.windows(2) {
            let first: *const u32 = &*pair[0];
            let second: *const u32 = &*pair[1];
            assert_eq!(second.addr() - first.addr(), mem::size_of::<u32>());
        }
        assert!(arena
            .construct_elements_and_pointer_array(0, |_| 0u8)
            .is_empty());
    }

    #[test]
    fn copy_str_appends_terminator() {
        let arena = LinearAllocator::new();
        let copied = arena.copy_str("hello");
        assert_eq!(copied, "hello");
        let terminator = unsafe { *copied.as_ptr().add(copied.len()) };
        assert_eq!(terminator, 0);
    }

    #[test]
    fn copy_empty_str() {
        let arena = LinearAllocator::new();
        assert_eq!(arena.copy_str(""), "");
        assert_eq!(arena.allocated_bytes(), 1);
    }

    #[test]
    fn zero_sized_allocation_is_aligned() {
        let arena = LinearAllocator::new();
        let ptr = arena.allocate(0, 32);
        assert_eq!(addr(ptr) % 32, 0);
        let unit = arena.construct(());
        assert_eq!(*unit, ());
    }

    #[test]
    fn allocate_array_has_requested_len() {
        let arena = LinearAllocator::new();
        let slots = arena.allocate_array::<u32>(10);
        assert_eq!(slots.len(), 10);
        for (i, slot) in slots.iter_mut().enumerate() {
            slot.write(i as u32);
        }
    }

    #[test]
    fn config_controls_first_block() {
        let arena = LinearAllocator::with_config(ArenaConfig::new(4096), RawAllocator).unwrap();
        arena.allocate(1, 1);
        assert_eq!(arena.owned_bytes(), 4096);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = LinearAllocator::with_config(ArenaConfig::new(0), RawAllocator);
        assert!(matches!(result, Err(ArenaError::InvalidConfig { .. })));
    }

    #[test]
    fn preallocated_arena_owns_first_block() {
        let arena = LinearAllocator::with_preallocated(ArenaConfig::new(256), RawAllocator).unwrap();
        assert_eq!(arena.owned_buffer_count(), 1);
        assert_eq!(arena.remaining_in_current(), 256);
        arena.allocate(200, 1);
        assert_eq!(arena.owned_buffer_count(), 1);
        assert!(matches!(
            LinearAllocator::with_preallocated(ArenaConfig::new(0), RawAllocator),
            Err(ArenaError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn fallback_backed_arena_works() {
        let arena = LinearAllocator::new_in(FallbackAllocator);
        let values = arena.construct_array_copy(&[1u64, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(values.iter().sum::<u64>(), 55);
    }

    #[test]
    #[should_panic(expected = "alignment must be a power of two")]
    fn non_power_of_two_alignment_panics() {
        let arena = LinearAllocator::new();
        arena.allocate(8, 3);
    }

    #[test]
    fn try_allocate_reports_overflow() {
        let arena = LinearAllocator::new();
        assert_eq!(
            arena.try_allocate(usize::MAX, 8),
            Err(AllocError::CapacityOverflow)
        );
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        const BLOCK: usize = 1 << 16;

        proptest! {
            #[test]
            fn allocations_within_one_buffer_are_disjoint_and_aligned(
                requests in proptest::collection::vec((1usize..256, 0u32..7), 1..64),
            ) {
                let arena = LinearAllocator::with_config(ArenaConfig::new(BLOCK), RawAllocator).unwrap();
                let mut regions = Vec::new();
                for &(size, shift) in &requests {
                    let alignment = 1usize << shift;
                    let ptr = arena.allocate(size, alignment);
                    prop_assert_eq!(addr(ptr) % alignment, 0);
                    regions.push((addr(ptr), size));
                }
                // Worst case 64 * (255 + 63) bytes stays inside one block.
                prop_assert_eq!(arena.owned_buffer_count(), 1);
                regions.sort_unstable();
                for pair in regions.windows(2) {
                    prop_assert!(pair[0].0 + pair[0].1 <= pair[1].0);
                }
            }

            #[test]
            fn allocated_bytes_sums_requests(
                sizes in proptest::collection::vec(0usize..512, 0..40),
            ) {
                let arena = LinearAllocator::new();
                for &size in &sizes {
                    arena.allocate(size, 8);
                }
                prop_assert_eq!(arena.allocated_bytes(), sizes.iter().sum::<usize>());
            }
        }
    }
}
