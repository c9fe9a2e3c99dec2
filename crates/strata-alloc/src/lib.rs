//! Aligned allocation and the linear arena for Strata containers.
//!
//! This crate owns every raw memory concern in the workspace and is the
//! only one besides `strata-collections` that contains `unsafe` code.
//!
//! # Architecture
//!
//! ```text
//! raw::aligned_alloc / aligned_free   (posix_memalign, _aligned_malloc, header fallback)
//! └── Allocator trait
//!     ├── RawAllocator       (platform primitive)
//!     ├── FallbackAllocator  (header-based primitive everywhere)
//!     └── LinearAllocator    (bump arena over owned + borrowed buffers)
//! ```
//!
//! Containers store their allocator by value and ask it for element
//! storage through [`Allocator::allocate_array`]. Infallible container
//! paths route failures through [`handle_alloc_failure`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod allocator;
pub mod config;
pub mod error;
pub mod linear;
pub mod raw;

// Public re-exports for the primary API surface.
pub use allocator::{array_bytes, handle_alloc_failure, Allocator, FallbackAllocator, RawAllocator};
pub use config::ArenaConfig;
pub use error::ArenaError;
pub use linear::LinearAllocator;
pub use strata_core::AllocError;
