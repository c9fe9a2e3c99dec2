//! Open-addressing slot table shared by the hashed containers.
//!
//! A [`SlotTable`] only stores indices into a container's element array;
//! the container owns the elements and supplies hashes and equality. Every
//! operation walks the same [`ProbeSequence`], so any key present can be
//! found along the path that was used to insert it.
//!
//! # Probing
//!
//! ```text
//! hash, perturb = h(key), h(key)
//! loop:
//!     visit (hash + 0..4) & mask
//!     perturb >>= 5
//!     hash = hash * 5 + 1 + perturb
//! ```
//!
//! Removal leaves a tombstone, which keeps later probes walking. Tombstones
//! count towards the load and are only reclaimed when the table is rebuilt.

use std::fmt;
use std::iter::FusedIterator;

use strata_alloc::{Allocator, RawAllocator};
use strata_core::ceil_power_of_two;
use tracing::trace;

use crate::array::Array;

/// One slot: empty, tombstone, or an index into element storage.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexSlot(i32);

/// Decoded state of an [`IndexSlot`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// Never used since the last rebuild. Terminates a probe.
    Empty,
    /// Previously used. Stepped over by probes.
    Tombstone,
    /// Holds the index of an element.
    Occupied(usize),
}

impl IndexSlot {
    const EMPTY_TAG: i32 = -1;
    const TOMBSTONE_TAG: i32 = -2;

    /// An empty slot.
    pub const EMPTY: Self = Self(Self::EMPTY_TAG);

    /// A tombstone.
    pub const TOMBSTONE: Self = Self(Self::TOMBSTONE_TAG);

    /// Largest element index a slot can hold.
    pub const MAX_INDEX: usize = i32::MAX as usize;

    /// A slot holding `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` exceeds [`IndexSlot::MAX_INDEX`].
    #[inline]
    pub fn occupied(index: usize) -> Self {
        assert!(
            index <= Self::MAX_INDEX,
            "element index {index} does not fit in a slot"
        );
        Self(index as i32)
    }

    /// Decode the slot.
    #[inline]
    pub fn state(self) -> SlotState {
        match self.0 {
            Self::EMPTY_TAG => SlotState::Empty,
            Self::TOMBSTONE_TAG => SlotState::Tombstone,
            index => SlotState::Occupied(index as usize),
        }
    }

    /// Whether the slot was never used.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == Self::EMPTY_TAG
    }

    /// Whether the slot is a tombstone.
    #[inline]
    pub fn is_tombstone(self) -> bool {
        self.0 == Self::TOMBSTONE_TAG
    }

    /// Whether the slot holds an index.
    #[inline]
    pub fn is_set(self) -> bool {
        self.0 >= 0
    }

    /// Whether the slot holds exactly `index`.
    #[inline]
    pub fn has_index(self, index: usize) -> bool {
        self.is_set() && self.0 as usize == index
    }
}

impl Default for IndexSlot {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for IndexSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state() {
            SlotState::Empty => f.write_str("Empty"),
            SlotState::Tombstone => f.write_str("Tombstone"),
            SlotState::Occupied(index) => write!(f, "Occupied({index})"),
        }
    }
}

/// The endless sequence of slot positions visited for one hash.
#[derive(Clone, Debug)]
pub struct ProbeSequence {
    hash: u32,
    perturb: u32,
    mask: u32,
    offset: u32,
}

impl ProbeSequence {
    /// Probe a table whose slot count is `mask + 1`.
    #[inline]
    pub fn new(hash: u32, mask: u32) -> Self {
        Self {
            hash,
            perturb: hash,
            mask,
            offset: 0,
        }
    }
}

impl Iterator for ProbeSequence {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.offset == PROBE_STRIDE {
            self.perturb >>= PERTURB_SHIFT;
            self.hash = self
                .hash
                .wrapping_mul(5)
                .wrapping_add(1)
                .wrapping_add(self.perturb);
            self.offset = 0;
        }
        let position = self.hash.wrapping_add(self.offset) & self.mask;
        self.offset += 1;
        Some(position as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

impl FusedIterator for ProbeSequence {}

const PROBE_STRIDE: u32 = 4;
const PERTURB_SHIFT: u32 = 5;

/// An occupied slot found by a probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotMatch {
    /// Slot position in the table.
    pub position: usize,
    /// Element index stored in the slot.
    pub index: usize,
}

/// Outcome of [`SlotTable::find_or_vacant`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotSearch {
    /// A slot whose element matched.
    Occupied(SlotMatch),
    /// The first empty slot on the probe path.
    Vacant {
        /// Slot position to pass to [`SlotTable::occupy`].
        position: usize,
    },
}

/// Table of [`IndexSlot`]s with `N` inline slots.
///
/// `N` must be a power of two of at least 2. The slot count is always a
/// power of two and at most half of the slots are usable, so a probe
/// always reaches an empty slot.
#[derive(Clone)]
pub struct SlotTable<const N: usize = 8, A: Allocator = RawAllocator> {
    slots: Array<IndexSlot, N, A>,
    slots_set: usize,
    slots_dummy: usize,
    slots_usable: usize,
    slot_mask: u32,
}

impl<const N: usize> SlotTable<N, RawAllocator> {
    /// Create an empty table of `N` slots.
    pub fn new() -> Self {
        Self::new_in(RawAllocator)
    }
}

impl<const N: usize> Default for SlotTable<N, RawAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, A: Allocator> SlotTable<N, A> {
    /// Slots visited per probe step before perturbing.
    pub const PROBE_STRIDE: u32 = PROBE_STRIDE;

    /// Right shift applied to the perturbation at each probe step.
    pub const PERTURB_SHIFT: u32 = PERTURB_SHIFT;

    /// Numerator of the maximum load factor.
    pub const MAX_LOAD_FACTOR_NUMERATOR: usize = 1;

    /// Denominator of the maximum load factor.
    pub const MAX_LOAD_FACTOR_DENOMINATOR: usize = 2;

    const VALID_INLINE_SIZE: () = assert!(
        N.is_power_of_two() && N >= 2,
        "inline slot count must be a power of two of at least 2"
    );

    /// Create an empty table of `N` slots in `allocator`.
    pub fn new_in(allocator: A) -> Self {
        Self::with_total_in(N, allocator)
    }

    /// Create an empty table with at least `min_usable` usable slots.
    pub fn with_usable_in(min_usable: usize, allocator: A) -> Self {
        Self::with_total_in(Self::total_for_usable(min_usable), allocator)
    }

    fn total_for_usable(min_usable: usize) -> usize {
        let min_total = min_usable
            .saturating_mul(Self::MAX_LOAD_FACTOR_DENOMINATOR)
            .div_ceil(Self::MAX_LOAD_FACTOR_NUMERATOR);
        match ceil_power_of_two(min_total) {
            Some(total) => total.max(N),
            None => panic!("slot table for {min_usable} usable slots overflows"),
        }
    }

    fn with_total_in(total: usize, allocator: A) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_INLINE_SIZE;
        assert!(
            total - 1 <= u32::MAX as usize,
            "slot table of {total} slots is too large"
        );
        Self {
            slots: Array::from_elem_in(total, IndexSlot::EMPTY, allocator),
            slots_set: 0,
            slots_dummy: 0,
            slots_usable: total / Self::MAX_LOAD_FACTOR_DENOMINATOR
                * Self::MAX_LOAD_FACTOR_NUMERATOR,
            slot_mask: (total - 1) as u32,
        }
    }

    /// Total number of slots.
    #[inline]
    pub fn slots_total(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots that may be set or tombstoned before a rebuild.
    #[inline]
    pub fn slots_usable(&self) -> usize {
        self.slots_usable
    }

    /// Number of occupied slots.
    #[inline]
    pub fn slots_set(&self) -> usize {
        self.slots_set
    }

    /// Number of tombstones.
    #[inline]
    pub fn slots_dummy(&self) -> usize {
        self.slots_dummy
    }

    /// `slots_total() - 1`.
    #[inline]
    pub fn slot_mask(&self) -> u32 {
        self.slot_mask
    }

    /// The slot at `position`.
    #[inline]
    pub fn slot(&self, position: usize) -> IndexSlot {
        self.slots[position]
    }

    /// Whether one more insertion would exceed the load limit.
    #[inline]
    pub fn should_grow(&self) -> bool {
        self.slots_set + self.slots_dummy >= self.slots_usable
    }

    /// The probe path for `hash` in this table.
    #[inline]
    pub fn probe(&self, hash: u32) -> ProbeSequence {
        ProbeSequence::new(hash, self.slot_mask)
    }

    /// Find the occupied slot on the path of `hash` whose element index
    /// satisfies `is_match`.
    pub fn find(&self, hash: u32, mut is_match: impl FnMut(usize) -> bool) -> Option<SlotMatch> {
        for position in self.probe(hash) {
            match self.slots[position].state() {
                SlotState::Empty => return None,
                SlotState::Occupied(index) if is_match(index) => {
                    return Some(SlotMatch { position, index });
                }
                _ => {}
            }
        }
        unreachable!("probe sequences are endless")
    }

    /// Like [`SlotTable::find`], but report the first empty slot on the
    /// path when nothing matches. Tombstones are not reused.
    pub fn find_or_vacant(&self, hash: u32, mut is_match: impl FnMut(usize) -> bool) -> SlotSearch {
        for position in self.probe(hash) {
            match self.slots[position].state() {
                SlotState::Empty => return SlotSearch::Vacant { position },
                SlotState::Occupied(index) if is_match(index) => {
                    return SlotSearch::Occupied(SlotMatch { position, index });
                }
                _ => {}
            }
        }
        unreachable!("probe sequences are endless")
    }

    /// The first empty slot on the path of `hash`.
    pub fn vacant(&self, hash: u32) -> usize {
        match self.find_or_vacant(hash, |_| false) {
            SlotSearch::Vacant { position } => position,
            SlotSearch::Occupied(_) => unreachable!("nothing matches"),
        }
    }

    /// Position of the slot holding exactly `index` on the path of `hash`.
    pub fn position_of(&self, hash: u32, index: usize) -> Option<usize> {
        self.find(hash, |candidate| candidate == index)
            .map(|found| found.position)
    }

    /// Store `index` in the empty slot at `position`.
    pub fn occupy(&mut self, position: usize, index: usize) {
        debug_assert!(self.slots[position].is_empty(), "slot {position} is in use");
        self.slots[position] = IndexSlot::occupied(index);
        self.slots_set += 1;
    }

    /// Turn the occupied slot at `position` into a tombstone.
    pub fn vacate(&mut self, position: usize) {
        assert!(self.slots[position].is_set(), "slot {position} is not occupied");
        self.slots[position] = IndexSlot::TOMBSTONE;
        self.slots_set -= 1;
        self.slots_dummy += 1;
    }

    /// Tombstone the slot holding `index` on the path of `hash`.
    ///
    /// # Panics
    ///
    /// Panics if no such slot exists.
    pub fn vacate_index(&mut self, hash: u32, index: usize) {
        match self.position_of(hash, index) {
            Some(position) => self.vacate(position),
            None => panic!("element index {index} is not reachable from its hash"),
        }
    }

    /// Rewrite the slot on the path of `hash` that holds `old_index` so it
    /// holds `new_index`. Used after an element has been relocated.
    ///
    /// # Panics
    ///
    /// Panics if no slot on the path holds `old_index`.
    pub fn repoint(&mut self, hash: u32, old_index: usize, new_index: usize) {
        match self.position_of(hash, old_index) {
            Some(position) => self.slots[position] = IndexSlot::occupied(new_index),
            None => panic!("element index {old_index} is not reachable from its hash"),
        }
    }

    /// Place `index` in the first empty slot on the path of `hash`.
    pub fn insert_rebuilt(&mut self, hash: u32, index: usize) {
        let position = self.vacant(hash);
        self.occupy(position, index);
    }

    /// A fresh table with at least `min_usable` usable slots holding every
    /// `(hash, index)` entry. Tombstones are not carried over.
    pub fn rebuilt(&self, min_usable: usize, entries: impl IntoIterator<Item = (u32, usize)>) -> Self {
        let mut table = Self::with_usable_in(min_usable, self.slots.allocator().clone());
        for (hash, index) in entries {
            table.insert_rebuilt(hash, index);
        }
        trace!(
            old_total = self.slots_total(),
            new_total = table.slots_total(),
            entries = table.slots_set,
            dropped_tombstones = self.slots_dummy,
            "slot table rebuilt"
        );
        table
    }

    /// Reset every slot to empty, keeping the slot count.
    pub fn clear(&mut self) {
        self.slots.fill(IndexSlot::EMPTY);
        self.slots_set = 0;
        self.slots_dummy = 0;
    }

    /// Mean number of slots visited before reaching each entry.
    pub fn average_collisions(&self, entries: impl IntoIterator<Item = (u32, usize)>) -> f32 {
        let mut total = 0usize;
        let mut count = 0usize;
        for (hash, index) in entries {
            total += self.collisions(hash, index);
            count += 1;
        }
        if count == 0 {
            return 0.0;
        }
        total as f32 / count as f32
    }

    fn collisions(&self, hash: u32, index: usize) -> usize {
        self.probe(hash)
            .position(|position| {
                let slot = self.slots[position];
                slot.is_empty() || slot.has_index(index)
            })
            .unwrap_or(0)
    }
}

impl<const N: usize, A: Allocator> fmt::Debug for SlotTable<N, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotTable")
            .field("slots_total", &self.slots_total())
            .field("slots_usable", &self.slots_usable)
            .field("slots_set", &self.slots_set)
            .field("slots_dummy", &self.slots_dummy)
            .finish()
    }
}

/// Occupancy summary of a hashed container.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TableStats {
    /// Number of elements.
    pub len: usize,
    /// Usable slots before the next rebuild.
    pub slots_usable: usize,
    /// Total slots.
    pub slots_total: usize,
    /// Tombstones awaiting a rebuild.
    pub slots_dummy: usize,
    /// Mean slots visited before reaching an element.
    pub average_collisions: f32,
}

impl fmt::Display for TableStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Size: {}", self.len)?;
        writeln!(f, "  Usable Slots: {}", self.slots_usable)?;
        writeln!(f, "  Total Slots: {}", self.slots_total)?;
        writeln!(f, "  Tombstones: {}", self.slots_dummy)?;
        write!(f, "  Average Collisions: {}", self.average_collisions)
    }
}

impl<const N: usize, A: Allocator> SlotTable<N, A> {
    /// Stats for a container whose entries hash as given.
    pub fn stats(&self, entries: impl IntoIterator<Item = (u32, usize)>) -> TableStats {
        TableStats {
            len: self.slots_set,
            slots_usable: self.slots_usable,
            slots_total: self.slots_total(),
            slots_dummy: self.slots_dummy,
            average_collisions: self.average_collisions(entries),
        }
    }
}
