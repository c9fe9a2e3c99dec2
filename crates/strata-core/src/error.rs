//! Allocation error types shared by the allocators and containers.

use std::error::Error;
use std::fmt;

/// Errors reported by the fallible (`try_*`) allocation entry points.
///
/// The infallible entry points treat both variants as fatal: a capacity
/// overflow panics and an exhausted allocator aborts through
/// [`std::alloc::handle_alloc_error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// The requested element count does not fit in `usize` bytes.
    CapacityOverflow,
    /// The underlying allocator could not provide the memory.
    OutOfMemory {
        /// Number of bytes requested.
        size: usize,
        /// Requested alignment in bytes.
        alignment: usize,
    },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityOverflow => write!(f, "capacity overflow"),
            Self::OutOfMemory { size, alignment } => {
                write!(
                    f,
                    "out of memory: requested {size} bytes aligned to {alignment}"
                )
            }
        }
    }
}

impl Error for AllocError {}
