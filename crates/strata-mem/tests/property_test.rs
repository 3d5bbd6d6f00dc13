//! Property-based tests for the allocators.
//!
//! Arbitrary allocation sequences, pool workloads and segment array sizes
//! checked against simple reference models.

use std::collections::BTreeMap;

use proptest::prelude::*;
use strata_mem::arena::{Arena, Fill};
use strata_mem::pool::{Pool, PoolKey};
use strata_mem::segment::{self, SegmentArray};

const ARENA_SIZE: usize = 1 << 20;

fn align_strategy() -> impl Strategy<Value = usize> {
    (0u32..=6).prop_map(|shift| 1usize << shift)
}

/// Pool operations: allocate a value, or free the n-th live key.
#[derive(Debug, Clone)]
enum PoolOp {
    Alloc(u32),
    Free(usize),
}

fn pool_op_strategy() -> impl Strategy<Value = PoolOp> {
    prop_oneof![
        3 => any::<u32>().prop_map(PoolOp::Alloc),
        2 => any::<usize>().prop_map(PoolOp::Free),
    ]
}

// ============================================================================
// Arena Property Tests
// ============================================================================

proptest! {
    #[test]
    fn allocations_are_aligned_and_disjoint(
        requests in proptest::collection::vec((1usize..64, align_strategy(), 0usize..8), 1..64),
    ) {
        let arena = Arena::with_capacity(ARENA_SIZE);
        let mut ranges = Vec::new();

        for &(elem_size, align, count) in &requests {
            let ptr = arena.allocate(elem_size, align, count, Fill::Uninit);
            let start = ptr.as_ptr().addr();
            prop_assert_eq!(start % align, 0);
            prop_assert!(arena.owns(ptr.as_ptr()) || count == 0);
            ranges.push((start, start + elem_size * count));
        }

        ranges.retain(|(lo, hi)| lo < hi);
        ranges.sort_unstable();
        for pair in ranges.windows(2) {
            prop_assert!(pair[0].1 <= pair[1].0, "overlap: {:?}", pair);
        }
    }

    #[test]
    fn zeroed_allocations_read_zero_after_reuse(
        sizes in proptest::collection::vec(1usize..512, 1..16),
    ) {
        let arena = Arena::with_capacity(ARENA_SIZE);
        let mark = arena.save();

        for &size in &sizes {
            let dirty = arena.alloc_uninit::<u8>(size);
            unsafe { dirty.as_ptr().write_bytes(0xAB, size) };
        }
        arena.restore(mark);

        for &size in &sizes {
            let clean = arena.alloc::<u8>(size);
            let bytes = unsafe { std::slice::from_raw_parts(clean.as_ptr(), size) };
            prop_assert!(bytes.iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn restore_returns_exact_remaining(
        outer in proptest::collection::vec(0usize..256, 0..8),
        inner in proptest::collection::vec(0usize..256, 0..8),
    ) {
        let arena = Arena::with_capacity(ARENA_SIZE);
        for &n in &outer {
            arena.alloc::<u32>(n);
        }
        let before = arena.remaining();
        {
            let scope = arena.scope();
            for &n in &inner {
                scope.alloc::<u64>(n);
            }
        }
        prop_assert_eq!(arena.remaining(), before);
    }
}

// ============================================================================
// Pool Property Tests
// ============================================================================

proptest! {
    #[test]
    fn pool_matches_reference_model(
        ops in proptest::collection::vec(pool_op_strategy(), 1..200),
    ) {
        let arena = Arena::with_capacity(ARENA_SIZE);
        let mut pool: Pool<'_, u32> = unsafe { Pool::new(&arena) };
        let mut model: BTreeMap<PoolKey, u32> = BTreeMap::new();

        for op in ops {
            match op {
                PoolOp::Alloc(value) => {
                    let key = pool.alloc_with(value);
                    prop_assert!(model.insert(key, value).is_none());
                }
                PoolOp::Free(n) if !model.is_empty() => {
                    let key = *model.keys().nth(n % model.len()).unwrap();
                    pool.dealloc(key);
                    model.remove(&key);
                }
                PoolOp::Free(_) => {}
            }

            prop_assert_eq!(pool.len(), model.len());
            prop_assert_eq!(pool.len() + pool.free_len(), pool.node_count());
        }

        let survivors: BTreeMap<PoolKey, u32> =
            pool.iter().map(|(key, value)| (key, *value)).collect();
        prop_assert_eq!(survivors, model);
    }
}

// ============================================================================
// SegmentArray Property Tests
// ============================================================================

proptest! {
    #[test]
    fn segment_index_math_is_consistent(idx in 0u64..segment::MAX_LEN) {
        let idx = idx as usize;
        let seg = segment::segment_for_item(idx);
        prop_assert!(segment::capacity_for_segment_count(seg) <= idx);
        prop_assert!(idx < segment::capacity_for_segment_count(seg + 1));
    }

    #[test]
    fn segment_elements_never_move(
        chunks in proptest::collection::vec(proptest::collection::vec(any::<u16>(), 0..300), 1..10),
    ) {
        let arena = Arena::with_capacity(ARENA_SIZE);
        let mut items = unsafe { SegmentArray::new(&arena) };
        let mut expected = Vec::new();
        let mut first: Option<*const u16> = None;

        for chunk in &chunks {
            items.push_slice(chunk);
            expected.extend_from_slice(chunk);
            if first.is_none() && !items.is_empty() {
                first = Some(&items[0] as *const u16);
            }
        }

        prop_assert_eq!(items.len(), expected.len());
        prop_assert!(items.iter().copied().eq(expected.iter().copied()));
        if let Some(addr) = first {
            prop_assert!(std::ptr::eq(addr, &items[0]));
        }
    }
}
