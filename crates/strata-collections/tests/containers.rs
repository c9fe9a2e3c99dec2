//! End-to-end behaviour of the containers through the public API.

use strata_collections::{Array, Map, MultiMap, Stack, Vector, VectorSet};
use strata_test_utils::{init_tracing, CollidingHash};

#[test]
fn vector_set_survives_mass_insert_and_remove() {
    init_tracing();
    let mut set: VectorSet<i32> = VectorSet::new();
    for value in 1..=1000 {
        assert!(set.add(value));
    }
    assert_eq!(set.len(), 1000);
    for value in 1..=500 {
        set.remove(&value);
    }
    assert_eq!(set.len(), 500);
    for value in 1..=1000 {
        assert_eq!(set.contains(&value), value > 500, "value {value}");
    }
    for &value in set.iter() {
        assert_eq!(set[set.index(&value)], value);
    }
}

#[test]
fn vector_set_with_colliding_hash_keeps_every_value() {
    let mut set: VectorSet<u32, CollidingHash> = VectorSet::new();
    set.add_multiple(0..64);
    for value in (0..64).step_by(2) {
        set.remove(&value);
    }
    // Tombstones left by the removals must not hide the survivors.
    for value in 0..64 {
        assert_eq!(set.contains(&value), value % 2 == 1);
    }
    assert!(set.add(0));
    assert!(!set.add(1));
    assert_eq!(set.len(), 33);
}

#[test]
fn map_word_count() {
    let text = "the quick brown fox jumps over the lazy dog the end";
    let mut counts: Map<&str, usize> = Map::new();
    for word in text.split(' ') {
        *counts.lookup_or_add_default(word) += 1;
    }
    assert_eq!(counts.len(), 9);
    assert_eq!(*counts.lookup("the"), 3);
    assert_eq!(counts.lookup_default("cat", 0), 0);

    let first_keys: Vec<&str> = counts.keys().copied().take(3).collect();
    assert_eq!(first_keys, ["the", "quick", "brown"]);
}

#[test]
fn map_with_string_keys_looks_up_by_str() {
    let mut map: Map<String, u32> = Map::new();
    map.add_new("alpha".to_string(), 1);
    map.add_new("beta".to_string(), 2);
    assert!(map.contains("alpha"));
    assert_eq!(map["beta"], 2);
    assert_eq!(map.try_remove("alpha"), Some(1));
    assert!(!map.contains("alpha"));
}

#[test]
fn multi_map_groups_values() {
    let mut by_parity: MultiMap<bool, u32> = MultiMap::new();
    for value in 0..10 {
        by_parity.add(value % 2 == 0, value);
    }
    assert_eq!(by_parity.key_amount(), 2);
    assert_eq!(by_parity.lookup(&true), &[0, 2, 4, 6, 8]);
    assert_eq!(by_parity.lookup(&false), &[1, 3, 5, 7, 9]);
    assert_eq!(by_parity.values().count(), 10);
}

#[test]
fn stack_drives_iterative_traversal() {
    // Depth-first walk of a binary heap layout of 15 nodes.
    let mut stack: Stack<usize> = Stack::new();
    let mut visited = Vector::<usize, 16>::new();
    stack.push(0);
    while !stack.is_empty() {
        let node = stack.pop();
        visited.append(node);
        for child in [2 * node + 2, 2 * node + 1] {
            if child < 15 {
                stack.push(child);
            }
        }
    }
    assert_eq!(visited.len(), 15);
    assert_eq!(visited[..4], [0, 1, 3, 7]);
}

#[test]
fn array_and_vector_interoperate() {
    let array: Array<u16, 4> = Array::from_slice(&[1, 2, 3, 4, 5, 6]);
    assert!(!array.is_inline());
    let vector: Vector<u16, 2> = array.iter().copied().collect();
    assert_eq!(vector, [1, 2, 3, 4, 5, 6]);
    assert_eq!(vector.as_slice(), array.as_slice());
}
