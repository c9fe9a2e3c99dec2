//! Small-buffer containers and open-addressing hash tables.
//!
//! # Architecture
//!
//! ```text
//! Vector<T, N, A>        inline-first growable array
//! ├── Array<T, N, A>     fixed length, allocated once
//! ├── Stack<T, N, A>     LIFO wrapper
//! └── SlotTable<N, A>    index slots + probe sequence
//!     ├── VectorSet<T>   dense elements, table of indices
//!     └── Map<K, V>      dense (key, value) entries, table of indices
//!         └── MultiMap<K, V>  key -> run of values in a LinearAllocator
//! ```
//!
//! The first `N` elements of a [`Vector`] live inside the value itself.
//! Growing past that allocates through the container's [`Allocator`]
//! (`strata_alloc::Allocator`), doubling to the next power of two.
//!
//! [`VectorSet`] and [`Map`] keep their elements contiguous in insertion
//! order. Removal moves the last element into the freed position, so the
//! order is only insertion order until the first removal.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod array;
pub mod map;
pub mod multi_map;
pub mod open_addressing;
pub mod stack;
mod storage;
pub mod vector;
pub mod vector_set;

// Public re-exports for the primary API surface.
pub use array::Array;
pub use map::{Entry, Map, OccupiedEntry, VacantEntry};
pub use multi_map::MultiMap;
pub use open_addressing::{
    IndexSlot, ProbeSequence, SlotMatch, SlotSearch, SlotState, SlotTable, TableStats,
};
pub use stack::Stack;
pub use strata_alloc::Allocator;
pub use vector::{IntoIter, Vector, VectorStats, DEFAULT_INLINE_CAPACITY};
pub use vector_set::VectorSet;
