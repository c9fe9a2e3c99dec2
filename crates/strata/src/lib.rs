//! Strata: small-buffer containers, open-addressing hash tables, and a
//! linear arena allocator.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Strata sub-crates. For most users, adding `strata` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use strata::prelude::*;
//!
//! // Up to 8 values live inside the vector itself.
//! let mut scores: Vector<u32, 8> = Vector::new();
//! scores.extend([30, 10, 20]);
//! assert!(scores.is_inline());
//!
//! // Sets and maps keep their elements contiguous.
//! let mut seen: VectorSet<&str> = VectorSet::new();
//! assert!(seen.add("a"));
//! assert!(!seen.add("a"));
//!
//! let mut ages: Map<String, u32> = Map::new();
//! ages.add_new("ada".to_string(), 36);
//! assert_eq!(*ages.lookup("ada"), 36);
//!
//! // Arena allocation: values live as long as the arena.
//! let arena = LinearAllocator::new();
//! let name = arena.copy_str("strata");
//! let numbers = arena.construct_array_copy(&[1, 2, 3]);
//! assert_eq!((name, &numbers[..]), ("strata", &[1, 2, 3][..]));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `strata-core` | Hash capability, `AllocError`, power-of-two math |
//! | [`alloc`] | `strata-alloc` | `Allocator` trait, raw and linear allocators |
//! | [`collections`] | `strata-collections` | Vector, Array, Stack, VectorSet, Map, MultiMap |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and traits (`strata-core`).
///
/// Contains the [`types::HashFn`] capability, [`types::DefaultHash`], and
/// the alignment helpers shared by the allocators.
pub use strata_core as types;

/// Allocators (`strata-alloc`).
///
/// The [`alloc::Allocator`] trait, the platform-backed
/// [`alloc::RawAllocator`], and the bump arena [`alloc::LinearAllocator`].
pub use strata_alloc as alloc;

/// Containers (`strata-collections`).
///
/// Inline-first [`collections::Vector`] and the hash tables built on
/// [`collections::SlotTable`].
pub use strata_collections as collections;

/// Common imports for typical Strata usage.
///
/// ```rust
/// use strata::prelude::*;
/// ```
pub mod prelude {
    // Core
    pub use strata_core::{AllocError, DefaultHash, HashFn};

    // Allocators
    pub use strata_alloc::{Allocator, ArenaConfig, LinearAllocator, RawAllocator};

    // Containers
    pub use strata_collections::{Array, Map, MultiMap, Stack, Vector, VectorSet};
}
