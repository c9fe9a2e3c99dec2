//! Core types and traits for the Strata container runtime.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the pieces every other Strata crate agrees on: the injected hash
//! capability, the allocation error type, and the power-of-two and
//! alignment arithmetic used by the allocators and growth policies.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod hash;
pub mod math;

pub use error::AllocError;
pub use hash::{DefaultHash, HashFn};
pub use math::{align_up, ceil_power_of_two, is_power_of_two};
