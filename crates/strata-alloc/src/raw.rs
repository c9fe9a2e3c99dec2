//! Platform aligned allocation.
//!
//! [`aligned_alloc`] picks the native primitive of the target
//! (`posix_memalign` on unix, `_aligned_malloc` on Windows) and falls back
//! to a header-based scheme over plain `malloc` everywhere else. The
//! fallback is always compiled so it can be exercised on every platform.
//!
//! Every `unsafe` block in this module carries a `// SAFETY:` comment.

#![allow(unsafe_code)]

use std::mem;
use std::ptr::NonNull;

/// Smallest alignment handed to the platform primitive.
pub const MIN_ALIGNMENT: usize = mem::size_of::<*const ()>();

/// Stored immediately before every pointer returned by the fallback.
#[repr(C)]
#[derive(Clone, Copy)]
struct FallbackHeader {
    /// Distance in bytes from the `malloc` result to the aligned pointer.
    offset: u32,
}

const HEADER_SIZE: usize = mem::size_of::<FallbackHeader>();

/// Coerce `alignment` up to [`MIN_ALIGNMENT`], rejecting non-powers of two.
fn normalize_alignment(alignment: usize) -> Option<usize> {
    debug_assert!(
        alignment.is_power_of_two(),
        "alignment must be a power of two (got {alignment})"
    );
    if !alignment.is_power_of_two() {
        return None;
    }
    Some(alignment.max(MIN_ALIGNMENT))
}

/// Allocate `size` bytes aligned to `alignment`.
///
/// `alignment` must be a power of two and is raised to at least pointer
/// size. A zero `size` is treated as one byte so the result is always a
/// unique pointer. Returns `None` when memory is exhausted.
pub fn aligned_alloc(size: usize, alignment: usize) -> Option<NonNull<u8>> {
    let alignment = normalize_alignment(alignment)?;
    platform::alloc(size.max(1), alignment)
}

/// Release a pointer obtained from [`aligned_alloc`].
///
/// # Safety
///
/// `ptr` must have been returned by [`aligned_alloc`] and not freed since.
pub unsafe fn aligned_free(ptr: NonNull<u8>) {
    // SAFETY: forwarded from the caller.
    unsafe { platform::free(ptr) }
}

/// Header-based aligned allocation over plain `malloc`.
///
/// Over-allocates by `alignment - 1` plus the header size, places the
/// result at the first aligned address leaving room for the header, and
/// records the distance back to the `malloc` pointer in the header.
pub fn aligned_alloc_fallback(size: usize, alignment: usize) -> Option<NonNull<u8>> {
    let alignment = normalize_alignment(alignment)?;
    if alignment > u32::MAX as usize {
        return None;
    }
    let malloc_size = size
        .max(1)
        .checked_add(HEADER_SIZE)?
        .checked_add(alignment - 1)?;

    // SAFETY: `malloc` accepts any size; a null result is handled below.
    let real = NonNull::new(unsafe { libc::malloc(malloc_size) }.cast::<u8>())?;

    let real_addr = real.as_ptr().addr();
    let aligned_addr = (real_addr + HEADER_SIZE + alignment - 1) & !(alignment - 1);
    let offset = aligned_addr - real_addr;

    // SAFETY: HEADER_SIZE <= offset <= HEADER_SIZE + alignment - 1, so the
    // aligned pointer, the `size` bytes after it, and the header bytes
    // before it all lie inside the `malloc_size` block.
    unsafe {
        let aligned = real.as_ptr().add(offset);
        aligned
            .sub(HEADER_SIZE)
            .cast::<FallbackHeader>()
            .write_unaligned(FallbackHeader {
                offset: offset as u32,
            });
        Some(NonNull::new_unchecked(aligned))
    }
}

/// Release a pointer obtained from [`aligned_alloc_fallback`].
///
/// # Safety
///
/// `ptr` must have been returned by [`aligned_alloc_fallback`] and not
/// freed since.
pub unsafe fn aligned_free_fallback(ptr: NonNull<u8>) {
    // SAFETY: the caller guarantees a header precedes `ptr` and that
    // `ptr - offset` is the live `malloc` result it was carved from.
    unsafe {
        let header = ptr
            .as_ptr()
            .sub(HEADER_SIZE)
            .cast::<FallbackHeader>()
            .read_unaligned();
        libc::free(ptr.as_ptr().sub(header.offset as usize).cast());
    }
}

#[cfg(unix)]
mod platform {
    use std::ptr::{self, NonNull};

    pub(super) fn alloc(size: usize, alignment: usize) -> Option<NonNull<u8>> {
        let mut out: *mut libc::c_void = ptr::null_mut();
        // SAFETY: `alignment` is a power of two and a multiple of the
        // pointer size, and `out` is a valid location for the result.
        let status = unsafe { libc::posix_memalign(&mut out, alignment, size) };
        if status != 0 {
            return None;
        }
        NonNull::new(out.cast::<u8>())
    }

    pub(super) unsafe fn free(ptr: NonNull<u8>) {
        // SAFETY: `ptr` came from `posix_memalign`, which pairs with `free`.
        unsafe { libc::free(ptr.as_ptr().cast()) }
    }
}

#[cfg(windows)]
mod platform {
    use std::ptr::NonNull;

    pub(super) fn alloc(size: usize, alignment: usize) -> Option<NonNull<u8>> {
        // SAFETY: `alignment` is a power of two.
        NonNull::new(unsafe { libc::aligned_malloc(size, alignment) }.cast::<u8>())
    }

    pub(super) unsafe fn free(ptr: NonNull<u8>) {
        // SAFETY: `ptr` came from `_aligned_malloc`.
        unsafe { libc::aligned_free(ptr.as_ptr().cast()) }
    }
}

#[cfg(not(any(unix, windows)))]
mod platform {
    use std::ptr::NonNull;

    pub(super) fn alloc(size: usize, alignment: usize) -> Option<NonNull<u8>> {
        super::aligned_alloc_fallback(size, alignment)
    }

    pub(super) unsafe fn free(ptr: NonNull<u8>) {
        // SAFETY: `ptr` came from the fallback allocator.
        unsafe { super::aligned_free_fallback(ptr) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALIGNMENTS: [usize; 8] = [1, 2, 4, 8, 16, 64, 256, 4096];

    #[test]
    fn native_pointers_are_aligned() {
        for &alignment in &ALIGNMENTS {
            let ptr = aligned_alloc(100, alignment).unwrap();
            assert_eq!(ptr.as_ptr().addr() % alignment.max(MIN_ALIGNMENT), 0);
            unsafe { aligned_free(ptr) };
        }
    }

    #[test]
    fn fallback_pointers_are_aligned() {
        for &alignment in &ALIGNMENTS {
            let ptr = aligned_alloc_fallback(100, alignment).unwrap();
            assert_eq!(ptr.as_ptr().addr() % alignment.max(MIN_ALIGNMENT), 0);
            unsafe { aligned_free_fallback(ptr) };
        }
    }

    #[test]
    fn small_alignment_is_raised_to_pointer_size() {
        let ptr = aligned_alloc(3, 1).unwrap();
        assert_eq!(ptr.as_ptr().addr() % MIN_ALIGNMENT, 0);
        unsafe { aligned_free(ptr) };
    }

    #[test]
    fn zero_size_yields_unique_pointers() {
        let a = aligned_alloc(0, 8).unwrap();
        let b = aligned_alloc(0, 8).unwrap();
        assert_ne!(a, b);
        unsafe {
            aligned_free(a);
            aligned_free(b);
        }
    }

    #[test]
    fn fallback_memory_is_writable_end_to_end() {
        let size = 333;
        let ptr = aligned_alloc_fallback(size, 64).unwrap();
        unsafe {
            std::ptr::write_bytes(ptr.as_ptr(), 0xAB, size);
            let bytes = std::slice::from_raw_parts(ptr.as_ptr(), size);
            assert!(bytes.iter().all(|&b| b == 0xAB));
            aligned_free_fallback(ptr);
        }
    }

    #[test]
    fn fallback_header_records_offset_within_bounds() {
        for &alignment in &ALIGNMENTS {
            let alignment_used = alignment.max(MIN_ALIGNMENT);
            let ptr = aligned_alloc_fallback(16, alignment).unwrap();
            let header = unsafe {
                ptr.as_ptr()
                    .sub(HEADER_SIZE)
                    .cast::<FallbackHeader>()
                    .read_unaligned()
            };
            let offset = header.offset as usize;
            assert!(offset >= HEADER_SIZE);
            assert!(offset < HEADER_SIZE + alignment_used);
            unsafe { aligned_free_fallback(ptr) };
        }
    }

    #[test]
    fn oversized_request_returns_none() {
        assert!(aligned_alloc_fallback(usize::MAX, 8).is_none());
        assert!(aligned_alloc(usize::MAX / 2, 8).is_none());
    }
}
