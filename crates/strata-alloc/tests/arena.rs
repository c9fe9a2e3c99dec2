//! Arena buffer ownership observed through an instrumented allocator.

use std::error::Error;

use strata_alloc::{AllocError, ArenaConfig, ArenaError, LinearAllocator};
use strata_test_utils::{init_tracing, CountingAllocator};

#[test]
fn owned_buffers_are_freed_on_drop() {
    init_tracing();
    let allocator = CountingAllocator::new();
    {
        let arena: LinearAllocator<'_, _> = LinearAllocator::new_in(allocator.clone());
        for i in 0..100u32 {
            let value = arena.construct(i);
            assert_eq!(*value, i);
            arena.copy_str("some text");
        }
        assert!(allocator.allocations() > 1);
        assert_eq!(allocator.live(), arena.owned_buffer_count());
    }
    assert_eq!(allocator.live(), 0);
}

#[test]
fn empty_arena_never_allocates() {
    let allocator = CountingAllocator::new();
    drop(LinearAllocator::new_in(allocator.clone()));
    assert_eq!(allocator.allocations(), 0);
}

#[test]
fn borrowed_buffers_are_never_freed() {
    let allocator = CountingAllocator::new();
    let mut donated = [0u8; 256];
    {
        let arena = LinearAllocator::new_in(allocator.clone());
        arena.provide_buffer(&mut donated);
        let slots = arena.allocate_array::<u64>(16);
        assert_eq!(slots.len(), 16);
        assert_eq!(arena.owned_buffer_count(), 0);
    }
    assert_eq!(allocator.allocations(), 0);
    assert_eq!(allocator.frees(), 0);
}

#[test]
fn block_sizes_double_from_config() {
    let allocator = CountingAllocator::new();
    let config = ArenaConfig::new(32);
    let arena = LinearAllocator::with_config(config, allocator.clone()).unwrap();
    arena.allocate(32, 1);
    arena.allocate(64, 1);
    arena.allocate(128, 1);
    assert_eq!(allocator.allocations(), 3);
    assert_eq!(allocator.bytes_allocated(), 64 + 128 + 256);
    assert_eq!(arena.allocated_bytes(), 32 + 64 + 128);
}

#[test]
fn preallocation_failure_is_reported() {
    let allocator = CountingAllocator::new();
    allocator.fail_after(0);
    let err = LinearAllocator::with_preallocated(ArenaConfig::new(64), allocator.clone())
        .unwrap_err();
    assert!(matches!(
        err,
        ArenaError::Alloc(AllocError::OutOfMemory { size: 64, .. })
    ));
    assert!(err.source().is_some());
    assert_eq!(allocator.allocations(), 0);
}

#[test]
fn preallocation_uses_one_block_from_config() {
    let allocator = CountingAllocator::new();
    let arena = LinearAllocator::with_preallocated(ArenaConfig::new(128), allocator.clone()).unwrap();
    assert_eq!(allocator.allocations(), 1);
    assert_eq!(allocator.bytes_allocated(), 128);
    arena.allocate(128, 1);
    assert_eq!(allocator.allocations(), 1);
}
