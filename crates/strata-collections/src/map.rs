//! Insertion-ordered hash map over a dense key/value array.
//!
//! [`Map`] uses the same slot discipline as
//! [`VectorSet`](crate::VectorSet): slots hold indices into a [`Vector`] of
//! `(key, value)` pairs, removal swaps the last pair into the gap and
//! re-points its slot.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Index;

use strata_alloc::{Allocator, RawAllocator};
use strata_core::{DefaultHash, HashFn};

use crate::open_addressing::{SlotMatch, SlotSearch, SlotTable, TableStats};
use crate::vector::Vector;

/// Hash map keeping its entries in one contiguous array.
///
/// `H` must hash a key and each of its borrowed forms identically.
pub struct Map<K, V, H = DefaultHash, A: Allocator = RawAllocator> {
    table: SlotTable<8, A>,
    entries: Vector<(K, V), 4, A>,
    hasher: H,
}

impl<K, V, H: Default> Map<K, V, H, RawAllocator> {
    /// Create an empty map. Does not allocate.
    pub fn new() -> Self {
        Self::new_in(RawAllocator)
    }
}

impl<K, V, H: Default, A: Allocator> Map<K, V, H, A> {
    /// Create an empty map drawing memory from `allocator`.
    pub fn new_in(allocator: A) -> Self {
        Self::with_hasher_in(H::default(), allocator)
    }
}

impl<K, V, H, A: Allocator> Map<K, V, H, A> {
    /// Create an empty map using `hasher`.
    pub fn with_hasher_in(hasher: H, allocator: A) -> Self {
        Self {
            table: SlotTable::new_in(allocator.clone()),
            entries: Vector::new_in(allocator),
            hasher,
        }
    }

    /// The hash function.
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the keys in storage order.
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> + '_ {
        self.entries.iter().map(|(key, _)| key)
    }

    /// Iterate over the values in storage order.
    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> + '_ {
        self.entries.iter().map(|(_, value)| value)
    }

    /// Iterate mutably over the values in storage order.
    pub fn values_mut(&mut self) -> impl ExactSizeIterator<Item = &mut V> + '_ {
        self.entries.iter_mut().map(|(_, value)| value)
    }

    /// Iterate over the entries in storage order.
    pub fn items(&self) -> impl ExactSizeIterator<Item = (&K, &V)> + '_ {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    /// Iterate over the entries with mutable values.
    pub fn items_mut(&mut self) -> impl ExactSizeIterator<Item = (&K, &mut V)> + '_ {
        self.entries.iter_mut().map(|(key, value)| (&*key, value))
    }

    /// Remove every entry, keeping the slot count.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.table.clear();
    }
}

impl<K: Eq, V, H: HashFn<K>, A: Allocator> Map<K, V, H, A> {
    #[inline]
    fn hash_key<Q>(&self, key: &Q) -> u32
    where
        Q: ?Sized,
        H: HashFn<Q>,
    {
        <H as HashFn<Q>>::hash(&self.hasher, key)
    }

    fn find<Q>(&self, key: &Q) -> Option<SlotMatch>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFn<Q>,
    {
        let entries = &self.entries;
        self.table
            .find(self.hash_key(key), |index| Q::eq(key, entries[index].0.borrow()))
    }

    /// Make room for at least `min_usable` entries without rebuilding.
    pub fn reserve(&mut self, min_usable: usize) {
        if self.table.slots_usable() < min_usable {
            self.grow(min_usable);
        }
    }

    #[cold]
    #[inline(never)]
    fn grow(&mut self, min_usable: usize) {
        let hasher = &self.hasher;
        let entries = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, (key, _))| (<H as HashFn<K>>::hash(hasher, key), index));
        self.table = self.table.rebuilt(min_usable, entries);
        self.entries.reserve(self.table.slots_usable());
    }

    #[inline]
    fn ensure_can_add(&mut self) {
        if self.table.should_grow() {
            self.grow(self.len() + 1);
        }
    }

    fn push_at(&mut self, position: usize, key: K, value: V) -> usize {
        let index = self.entries.len();
        self.table.occupy(position, index);
        self.entries.append((key, value));
        index
    }

    /// Remove the entry at `found` and return it.
    fn remove_found(&mut self, found: SlotMatch) -> (K, V) {
        self.table.vacate(found.position);
        let last = self.entries.len() - 1;
        let removed = self.entries.remove_and_reorder(found.index);
        if found.index != last {
            let moved_hash = self.hash_key::<K>(&self.entries[found.index].0);
            self.table.repoint(moved_hash, last, found.index);
        }
        removed
    }

    /// The entry for `key`, for in-place inspection or insertion.
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, H, A> {
        self.ensure_can_add();
        let entries = &self.entries;
        let search = self
            .table
            .find_or_vacant(self.hash_key::<K>(&key), |index| entries[index].0 == key);
        match search {
            SlotSearch::Occupied(found) => Entry::Occupied(OccupiedEntry { map: self, found }),
            SlotSearch::Vacant { position } => Entry::Vacant(VacantEntry {
                map: self,
                key,
                position,
            }),
        }
    }

    /// Insert `key`, which must not be present yet.
    ///
    /// Skips key comparisons; a duplicate is caught in debug builds.
    pub fn add_new(&mut self, key: K, value: V) {
        debug_assert!(!self.contains(&key), "add_new of a present key");
        self.ensure_can_add();
        let position = self.table.vacant(self.hash_key::<K>(&key));
        self.push_at(position, key, value);
    }

    /// Insert `key` unless it is present. Returns whether it was inserted;
    /// an existing value is left untouched.
    pub fn add(&mut self, key: K, value: V) -> bool {
        match self.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Insert `key`, replacing the value of an existing entry. Returns
    /// whether the key was new.
    pub fn add_override(&mut self, key: K, value: V) -> bool {
        match self.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
            Entry::Occupied(mut entry) => {
                entry.insert(value);
                false
            }
        }
    }

    /// Insert `create()` when `key` is new, otherwise apply `modify` to the
    /// existing value. Returns whether the key was new.
    pub fn add_or_modify(
        &mut self,
        key: K,
        create: impl FnOnce() -> V,
        modify: impl FnOnce(&mut V),
    ) -> bool {
        match self.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(create());
                true
            }
            Entry::Occupied(entry) => {
                modify(entry.into_mut());
                false
            }
        }
    }

    /// The value of `key`, inserting `create()` first when it is new.
    pub fn lookup_or_add(&mut self, key: K, create: impl FnOnce() -> V) -> &mut V {
        self.entry(key).or_insert_with(create)
    }

    /// The value of `key`, inserting `V::default()` first when it is new.
    pub fn lookup_or_add_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.entry(key).or_default()
    }

    /// Whether `key` is present.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFn<Q>,
    {
        self.find(key).is_some()
    }

    /// The value of `key`, if present.
    pub fn lookup_try<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFn<Q>,
    {
        let found = self.find(key)?;
        Some(&self.entries[found.index].1)
    }

    /// The value of `key`, mutably, if present.
    pub fn lookup_try_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFn<Q>,
    {
        let found = self.find(key)?;
        Some(&mut self.entries[found.index].1)
    }

    /// The value of `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not present.
    pub fn lookup<Q>(&self, key: &Q) -> &V
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFn<Q>,
    {
        match self.lookup_try(key) {
            Some(value) => value,
            None => panic!("key is not in the map"),
        }
    }

    /// The value of `key`, mutably.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not present.
    pub fn lookup_mut<Q>(&mut self, key: &Q) -> &mut V
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFn<Q>,
    {
        match self.lookup_try_mut(key) {
            Some(value) => value,
            None => panic!("key is not in the map"),
        }
    }

    /// A clone of the value of `key`, or `default` when it is missing.
    pub fn lookup_default<Q>(&self, key: &Q, default: V) -> V
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFn<Q>,
        V: Clone,
    {
        self.lookup_try(key).cloned().unwrap_or(default)
    }

    /// Remove `key` and return its value.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not present.
    pub fn remove<Q>(&mut self, key: &Q) -> V
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFn<Q>,
    {
        match self.try_remove(key) {
            Some(value) => value,
            None => panic!("key is not in the map"),
        }
    }

    /// Remove `key` if present and return its value.
    pub fn try_remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: HashFn<Q>,
    {
        let found = self.find(key)?;
        Some(self.remove_found(found).1)
    }

    /// Occupancy summary.
    pub fn stats(&self) -> TableStats {
        let hasher = &self.hasher;
        self.table.stats(
            self.entries
                .iter()
                .enumerate()
                .map(|(index, (key, _))| (<H as HashFn<K>>::hash(hasher, key), index)),
        )
    }
}

/// A view into one key of a [`Map`].
pub enum Entry<'a, K, V, H, A: Allocator> {
    /// The key is present.
    Occupied(OccupiedEntry<'a, K, V, H, A>),
    /// The key is missing.
    Vacant(VacantEntry<'a, K, V, H, A>),
}

/// A present key of a [`Map`].
pub struct OccupiedEntry<'a, K, V, H, A: Allocator> {
    map: &'a mut Map<K, V, H, A>,
    found: SlotMatch,
}

/// A missing key of a [`Map`], with its insertion slot already chosen.
pub struct VacantEntry<'a, K, V, H, A: Allocator> {
    map: &'a mut Map<K, V, H, A>,
    key: K,
    position: usize,
}

impl<'a, K: Eq, V, H: HashFn<K>, A: Allocator> Entry<'a, K, V, H, A> {
    /// The key of this entry.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }

    /// The value, inserting `value` first when the key is missing.
    pub fn or_insert(self, value: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(value),
        }
    }

    /// The value, inserting `create()` first when the key is missing.
    pub fn or_insert_with(self, create: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(create()),
        }
    }

    /// The value, inserting `V::default()` first when the key is missing.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(V::default)
    }

    /// Apply `modify` to the value when the key is present.
    pub fn and_modify(mut self, modify: impl FnOnce(&mut V)) -> Self {
        if let Entry::Occupied(entry) = &mut self {
            modify(entry.get_mut());
        }
        self
    }
}

impl<'a, K: Eq, V, H: HashFn<K>, A: Allocator> OccupiedEntry<'a, K, V, H, A> {
    /// The stored key.
    pub fn key(&self) -> &K {
        &self.map.entries[self.found.index].0
    }

    /// The value.
    pub fn get(&self) -> &V {
        &self.map.entries[self.found.index].1
    }

    /// The value, mutably.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.map.entries[self.found.index].1
    }

    /// The value, borrowed for the lifetime of the map.
    pub fn into_mut(self) -> &'a mut V {
        let map = self.map;
        &mut map.entries[self.found.index].1
    }

    /// Replace the value and return the old one.
    pub fn insert(&mut self, value: V) -> V {
        std::mem::replace(self.get_mut(), value)
    }

    /// Remove the entry and return its value.
    pub fn remove(self) -> V {
        self.map.remove_found(self.found).1
    }
}

impl<'a, K: Eq, V, H: HashFn<K>, A: Allocator> VacantEntry<'a, K, V, H, A> {
    /// The key that would be inserted.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Give the key back without inserting.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Insert `value` and return it.
    pub fn insert(self, value: V) -> &'a mut V {
        let VacantEntry { map, key, position } = self;
        let index = map.push_at(position, key, value);
        &mut map.entries[index].1
    }
}

impl<K, V, H: Default, A: Allocator + Default> Default for Map<K, V, H, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<K: Clone, V: Clone, H: Clone, A: Allocator> Clone for Map<K, V, H, A> {
    fn clone(&self) -> Self {
        let mut entries = self.entries.clone();
        entries.reserve(self.table.slots_usable());
        Self {
            table: self.table.clone(),
            entries,
            hasher: self.hasher.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, H, A: Allocator> fmt::Debug for Map<K, V, H, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.items()).finish()
    }
}

/// Maps are equal when they hold the same entries, in any order.
impl<K: Eq, V: PartialEq, H: HashFn<K>, A: Allocator> PartialEq for Map<K, V, H, A> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .items()
                .all(|(key, value)| other.lookup_try(key) == Some(value))
    }
}

impl<K: Eq, V: Eq, H: HashFn<K>, A: Allocator> Eq for Map<K, V, H, A> {}

impl<K, Q, V, H, A> Index<&Q> for Map<K, V, H, A>
where
    K: Eq + Borrow<Q>,
    Q: Eq + ?Sized,
    H: HashFn<K> + HashFn<Q>,
    A: Allocator,
{
    type Output = V;

    fn index(&self, key: &Q) -> &V {
        self.lookup(key)
    }
}

impl<K: Eq, V, H: HashFn<K>, A: Allocator> Extend<(K, V)> for Map<K, V, H, A> {
    /// Later duplicates override earlier ones.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.add_override(key, value);
        }
    }
}

impl<K: Eq, V, H: HashFn<K> + Default> FromIterator<(K, V)> for Map<K, V, H, RawAllocator> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_does_not_overwrite() {
        let mut map: Map<u32, &str> = Map::new();
        assert!(map.add(1, "one"));
        assert!(!map.add(1, "uno"));
        assert_eq!(*map.lookup(&1), "one");
    }

    #[test]
    fn add_override_replaces() {
        let mut map: Map<u32, &str> = Map::new();
        assert!(map.add_override(1, "one"));
        assert!(!map.add_override(1, "uno"));
        assert_eq!(map[&1], "uno");
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn add_or_modify_counts() {
        let mut counts: Map<&str, u32> = Map::new();
        for word in ["a", "b", "a", "c", "a"] {
            counts.add_or_modify(word, || 1, |count| *count += 1);
        }
        assert_eq!(counts.lookup("a"), &3);
        assert_eq!(counts.lookup_default("z", 0), 0);
        assert_eq!(counts.lookup_default("b", 0), 1);
    }

    #[test]
    fn lookup_or_add_inserts_once() {
        let mut map: Map<String, Vec<u8>> = Map::new();
        map.lookup_or_add("k".to_string(), Vec::new).push(1);
        map.lookup_or_add("k".to_string(), || unreachable!()).push(2);
        map.lookup_or_add_default("j".to_string()).push(3);
        assert_eq!(map.lookup("k"), &[1, 2]);
        assert_eq!(map.lookup("j"), &[3]);
    }

    #[test]
    fn entry_api() {
        let mut map: Map<u8, i32> = Map::new();
        *map.entry(1).or_insert(10) += 1;
        map.entry(1).and_modify(|v| *v *= 2).or_insert(0);
        map.entry(2).and_modify(|v| *v *= 2).or_insert(5);
        assert_eq!(map[&1], 22);
        assert_eq!(map[&2], 5);

        match map.entry(2) {
            Entry::Occupied(entry) => assert_eq!(entry.remove(), 5),
            Entry::Vacant(_) => panic!("key 2 is present"),
        }
        match map.entry(3) {
            Entry::Vacant(entry) => assert_eq!(entry.into_key(), 3),
            Entry::Occupied(_) => panic!("key 3 is missing"),
        }
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn remove_keeps_other_keys_reachable() {
        let mut map: Map<u32, u32> = (0..50).map(|i| (i, i * 10)).collect();
        for i in (0..50).step_by(3) {
            assert_eq!(map.remove(&i), i * 10);
        }
        for i in 0..50 {
            assert_eq!(map.lookup_try(&i).copied(), (i % 3 != 0).then_some(i * 10));
        }
        assert_eq!(map.try_remove(&0), None);
    }

    #[test]
    #[should_panic(expected = "key is not in the map")]
    fn lookup_missing_panics() {
        let map: Map<u32, u32> = Map::new();
        map.lookup(&7);
    }

    #[test]
    fn insertion_order_is_kept_without_removals() {
        let map: Map<&str, u8> = [("z", 1), ("a", 2), ("m", 3)].into_iter().collect();
        assert!(map.keys().copied().eq(["z", "a", "m"]));
        assert!(map.values().copied().eq([1, 2, 3]));
    }

    #[test]
    fn mutable_iteration() {
        let mut map: Map<u8, u8> = [(1, 1), (2, 2)].into_iter().collect();
        for value in map.values_mut() {
            *value *= 10;
        }
        for (key, value) in map.items_mut() {
            *value += key;
        }
        *map.lookup_mut(&1) += 100;
        let items: Vec<(u8, u8)> = map.items().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(items, [(1, 111), (2, 22)]);
    }

    #[test]
    fn clear_then_reuse() {
        let mut map: Map<u32, u32> = (0..20).map(|i| (i, i)).collect();
        map.clear();
        assert!(map.is_empty());
        assert!(!map.contains(&3));
        map.add_new(3, 4);
        assert_eq!(map[&3], 4);
    }

    #[test]
    fn clone_and_equality() {
        let a: Map<u32, String> = (0..10).map(|i| (i, i.to_string())).collect();
        let mut b = a.clone();
        assert_eq!(a, b);
        b.add_override(3, "three".to_string());
        assert_ne!(a, b);
        b.add(100, "x".to_string());
        assert_eq!(b.len(), 11);
    }

    #[test]
    fn debug_format() {
        let map: Map<u8, char> = [(1, 'a')].into_iter().collect();
        assert_eq!(format!("{map:?}"), "{1: 'a'}");
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use indexmap::IndexMap;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn matches_index_map(
                ops in proptest::collection::vec((any::<bool>(), 0u8..48, any::<u16>()), 0..300),
            ) {
                let mut map: Map<u8, u16> = Map::new();
                let mut model: IndexMap<u8, u16> = IndexMap::new();
                for (insert, key, value) in ops {
                    if insert {
                        let is_new = !model.contains_key(&key);
                        model.insert(key, value);
                        prop_assert_eq!(map.add_override(key, value), is_new);
                    } else {
                        prop_assert_eq!(map.try_remove(&key), model.swap_remove(&key));
                    }
                    prop_assert_eq!(map.len(), model.len());
                }
                for (key, value) in &model {
                    prop_assert_eq!(map.lookup_try(key), Some(value));
                }
                let keys: Vec<u8> = map.keys().copied().collect();
                let model_keys: Vec<u8> = model.keys().copied().collect();
                prop_assert_eq!(keys, model_keys);
            }
        }
    }
}
