//! Arena-backed object pool with O(1) allocation and release.
//!
//! A [`Pool`] hands out [`PoolKey`]s for values stored in nodes carved from
//! an [`Arena`]. Released nodes go onto a free list and are reused by later
//! allocations, so a pool that cycles through a bounded working set stops
//! touching the arena once it has warmed up.
//!
//! # Design
//!
//! - **One node per carve**: a fresh allocation carves exactly one node
//!   from the arena and [`preallocate`](Pool::preallocate) carves one block
//!   of `count` nodes, so nodes never move and the pool never reserves more
//!   than it was asked for
//! - **Node table**: keys index a [`SegmentArray`] of node addresses, which
//!   keeps key lookup O(1) and bounds-checked
//! - **Two lists**: live nodes form a doubly linked *used* list (for O(1)
//!   unlink and for iteration), free nodes a singly linked *free* list
//! - **Index links**: links are `u32` node indices rather than pointers,
//!   which keeps keys plain `Copy` data
//! - **Debug sentinels**: in debug builds every node carries a tag that
//!   distinguishes live from free nodes, so double frees and stale keys
//!   panic at the point of misuse
//!
//! # Examples
//!
//! ```
//! use strata_mem::arena::Arena;
//! use strata_mem::pool::Pool;
//!
//! let arena = Arena::with_capacity(64 * 1024);
//! // SAFETY: `arena` is not restored while `pool` is alive.
//! let mut pool: Pool<'_, String> = unsafe { Pool::new(&arena) };
//!
//! let a = pool.alloc();
//! pool[a].push_str("hello");
//! let b = pool.alloc_with("world".to_owned());
//! assert_eq!(pool.len(), 2);
//!
//! pool.dealloc(a);
//! assert_eq!(pool.get(a), None);
//!
//! // The freed node is reused.
//! let c = pool.alloc();
//! assert_eq!(c, a);
//! assert_eq!(pool[b], "world");
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Index, IndexMut};
use std::ptr::{self, NonNull};

use strata_log::debug;

use crate::arena::Arena;
#[cfg(debug_assertions)]
use crate::config::{POOL_FREE_SENTINEL, POOL_NODE_SENTINEL};
use crate::sanitizer;
use crate::segment::SegmentArray;

/// End of a list.
const NIL: u32 = u32::MAX;

/// `prev` link of a node sitting on the free list.
const FREED: u32 = u32::MAX - 1;

// ============================================================================
// Keys and Nodes
// ============================================================================

/// Handle to a value in a [`Pool`].
///
/// Keys are plain indices. After the value is released the key is stale;
/// it may be handed out again by a later allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolKey(u32);

impl PoolKey {
    /// Index of the node this key refers to.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

struct Node<T> {
    #[cfg(debug_assertions)]
    sentinel: u32,
    next: u32,
    /// Previous live node, or [`FREED`] while on the free list.
    prev: u32,
    value: Option<T>,
}

impl<T> Node<T> {
    fn vacant(next: u32) -> Self {
        Node {
            #[cfg(debug_assertions)]
            sentinel: POOL_FREE_SENTINEL,
            next,
            prev: FREED,
            value: None,
        }
    }

    #[inline]
    fn is_live(&self) -> bool {
        self.prev != FREED
    }

    fn poison_value(&self) {
        sanitizer::poison(ptr::addr_of!(self.value).cast(), mem::size_of::<Option<T>>());
    }

    fn unpoison_value(&self) {
        sanitizer::unpoison(ptr::addr_of!(self.value).cast(), mem::size_of::<Option<T>>());
    }
}

// ============================================================================
// Pool
// ============================================================================

/// Pool of `T` values with stable addresses, backed by an arena.
///
/// Values are dropped when released, on [`clear`](Pool::clear), and when the
/// pool itself is dropped. The node memory stays in the arena until the
/// arena is restored.
pub struct Pool<'a, T> {
    /// Address of every node ever carved, indexed by key.
    nodes: SegmentArray<'a, NonNull<Node<T>>>,
    used_head: u32,
    free_head: u32,
    len: usize,
    free_len: usize,
}

impl<'a, T> Pool<'a, T> {
    /// Creates an empty pool that allocates nodes from `arena`.
    ///
    /// # Safety
    ///
    /// While the pool is alive, `arena` must not be restored to any state
    /// saved before one of the pool's node allocations.
    #[must_use]
    pub unsafe fn new(arena: &'a Arena) -> Self {
        Pool {
            // SAFETY: forwarded to our caller.
            nodes: unsafe { SegmentArray::new(arena) },
            used_head: NIL,
            free_head: NIL,
            len: 0,
            free_len: 0,
        }
    }

    /// Number of live values.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the pool holds no live values.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of nodes on the free list.
    #[inline]
    #[must_use]
    pub fn free_len(&self) -> usize {
        self.free_len
    }

    /// Number of nodes ever carved from the arena, live or free.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    fn node(&self, idx: u32) -> &Node<T> {
        // SAFETY: every table entry points at an initialized node that lives
        // as long as the arena is not restored past it (constructor contract).
        unsafe { self.nodes[idx as usize].as_ref() }
    }

    #[inline]
    fn node_mut(&mut self, idx: u32) -> &mut Node<T> {
        // SAFETY: as in `node`; nodes are disjoint allocations, and
        // `&mut self` makes this the only reference into the pool.
        unsafe { &mut *self.nodes[idx as usize].as_ptr() }
    }

    /// Allocates a node holding `T::default()`.
    pub fn alloc(&mut self) -> PoolKey
    where
        T: Default,
    {
        self.alloc_with(T::default())
    }

    /// Allocates a node holding `value`.
    ///
    /// Reuses the most recently released node if there is one, otherwise
    /// carves exactly one new node from the arena. The node becomes the head
    /// of the used list.
    pub fn alloc_with(&mut self, value: T) -> PoolKey {
        let idx = match self.free_head {
            NIL => {
                let idx = self.carve_nodes(1);
                self.node(idx).unpoison_value();
                idx
            }
            idx => {
                let node = self.node_mut(idx);
                #[cfg(debug_assertions)]
                assert_eq!(
                    node.sentinel, POOL_FREE_SENTINEL,
                    "pool free list corrupted at node {idx}"
                );
                node.unpoison_value();
                let next = node.next;
                self.free_head = next;
                self.free_len -= 1;
                idx
            }
        };

        let old_head = self.used_head;
        let node = self.node_mut(idx);
        #[cfg(debug_assertions)]
        {
            node.sentinel = POOL_NODE_SENTINEL;
        }
        node.prev = NIL;
        node.next = old_head;
        node.value = Some(value);

        if old_head != NIL {
            self.node_mut(old_head).prev = idx;
        }
        self.used_head = idx;
        self.len += 1;

        PoolKey(idx)
    }

    /// Releases the value behind `key`, dropping it.
    ///
    /// The node is unlinked from the used list in O(1) and becomes the next
    /// one handed out.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `key` was already released or was never
    /// handed out by this pool. Release builds ignore such keys.
    pub fn dealloc(&mut self, key: PoolKey) {
        drop(self.release(key));
    }

    /// Releases the value behind `key` and returns it.
    ///
    /// Returns `None` for a stale key in release builds.
    ///
    /// # Panics
    ///
    /// Same as [`dealloc`](Pool::dealloc).
    pub fn take(&mut self, key: PoolKey) -> Option<T> {
        self.release(key)
    }

    fn release(&mut self, key: PoolKey) -> Option<T> {
        let idx = key.0;
        debug_assert!(
            key.index() < self.nodes.len(),
            "pool key {idx} was never allocated"
        );
        if key.index() >= self.nodes.len() {
            return None;
        }

        let free_head = self.free_head;
        let node = self.node_mut(idx);
        #[cfg(debug_assertions)]
        assert_eq!(
            node.sentinel, POOL_NODE_SENTINEL,
            "pool node {idx} freed twice"
        );
        if !node.is_live() {
            return None;
        }

        let (prev, next) = (node.prev, node.next);
        let value = node.value.take();
        node.poison_value();
        #[cfg(debug_assertions)]
        {
            node.sentinel = POOL_FREE_SENTINEL;
        }
        node.prev = FREED;
        node.next = free_head;

        if prev == NIL {
            self.used_head = next;
        } else {
            self.node_mut(prev).next = next;
        }
        if next != NIL {
            self.node_mut(next).prev = prev;
        }

        self.free_head = idx;
        self.len -= 1;
        self.free_len += 1;
        value
    }

    /// Carves `count` nodes from the arena in one block and puts them on the
    /// free list.
    ///
    /// The last node carved is at the head of the free list, so it is the
    /// first one handed out.
    pub fn preallocate(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let last = self.carve_nodes(count);
        self.free_head = last;
        self.free_len += count;

        debug!(
            "pool preallocated {} nodes ({} free, {} total)",
            count,
            self.free_len,
            self.nodes.len()
        );
    }

    /// Releases every live value. Node memory stays with the pool.
    pub fn clear(&mut self) {
        while self.used_head != NIL {
            self.dealloc(PoolKey(self.used_head));
        }
    }

    /// Whether `key` refers to a live value.
    #[must_use]
    pub fn contains(&self, key: PoolKey) -> bool {
        key.index() < self.nodes.len() && self.node(key.0).is_live()
    }

    /// Returns the value behind `key`, or `None` if it has been released.
    #[inline]
    #[must_use]
    pub fn get(&self, key: PoolKey) -> Option<&T> {
        if !self.contains(key) {
            return None;
        }
        self.node(key.0).value.as_ref()
    }

    /// Mutable variant of [`get`](Pool::get).
    #[inline]
    #[must_use]
    pub fn get_mut(&mut self, key: PoolKey) -> Option<&mut T> {
        if !self.contains(key) {
            return None;
        }
        self.node_mut(key.0).value.as_mut()
    }

    /// Iterates over live values, most recently allocated first.
    pub fn iter(&self) -> Iter<'_, 'a, T> {
        Iter {
            nodes: &self.nodes,
            cursor: self.used_head,
            remaining: self.len,
        }
    }

    /// Mutable variant of [`iter`](Pool::iter).
    pub fn iter_mut(&mut self) -> IterMut<'_, 'a, T> {
        IterMut {
            nodes: &self.nodes,
            cursor: self.used_head,
            remaining: self.len,
            _marker: PhantomData,
        }
    }

    /// Iterates over the keys of live values.
    pub fn keys(&self) -> impl Iterator<Item = PoolKey> + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// Carves `count` vacant nodes as one block, each linked to the one
    /// before it, the first to the current free head. Returns the index of
    /// the last node.
    fn carve_nodes(&mut self, count: usize) -> u32 {
        let first = self.nodes.len();
        assert!(
            count <= FREED as usize - first,
            "pool node index space exhausted"
        );

        let block = self.nodes.arena().alloc_uninit::<Node<T>>(count);
        let mut next = self.free_head;
        for i in 0..count {
            // SAFETY: `block` was carved for `count` nodes.
            let node = unsafe { block.add(i) };
            // SAFETY: the slot is aligned, in bounds and not yet initialized.
            unsafe { node.as_ptr().write(Node::vacant(next)) };
            // SAFETY: just initialized.
            unsafe { node.as_ref() }.poison_value();
            self.nodes.push(node);
            next = (first + i) as u32;
        }
        next
    }
}

impl<T> Drop for Pool<'_, T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> Index<PoolKey> for Pool<'_, T> {
    type Output = T;

    fn index(&self, key: PoolKey) -> &T {
        match self.get(key) {
            Some(value) => value,
            None => panic!("stale pool key {}", key.0),
        }
    }
}

impl<T> IndexMut<PoolKey> for Pool<'_, T> {
    fn index_mut(&mut self, key: PoolKey) -> &mut T {
        match self.get_mut(key) {
            Some(value) => value,
            None => panic!("stale pool key {}", key.0),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Pool<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'p, 'a, T> IntoIterator for &'p Pool<'a, T> {
    type Item = (PoolKey, &'p T);
    type IntoIter = Iter<'p, 'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ============================================================================
// Iterators
// ============================================================================

/// Iterator over the live values of a [`Pool`].
pub struct Iter<'p, 'a, T> {
    nodes: &'p SegmentArray<'a, NonNull<Node<T>>>,
    cursor: u32,
    remaining: usize,
}

impl<'p, T> Iterator for Iter<'p, '_, T> {
    type Item = (PoolKey, &'p T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let idx = self.cursor;
        // SAFETY: the pool is borrowed for 'p and its nodes outlive it.
        let node = unsafe { self.nodes[idx as usize].as_ref() };
        self.cursor = node.next;
        self.remaining -= 1;
        node.value.as_ref().map(|value| (PoolKey(idx), value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, '_, T> {}

/// Mutable iterator over the live values of a [`Pool`].
///
/// Reads the node table through a shared borrow and hands out `&mut T`
/// into the nodes themselves, which are separate arena allocations.
pub struct IterMut<'p, 'a, T> {
    nodes: &'p SegmentArray<'a, NonNull<Node<T>>>,
    cursor: u32,
    remaining: usize,
    _marker: PhantomData<&'p mut T>,
}

impl<'p, T> Iterator for IterMut<'p, '_, T> {
    type Item = (PoolKey, &'p mut T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let idx = self.cursor;
        let node = self.nodes[idx as usize];
        // SAFETY: the iterator was created from the pool's unique borrow for
        // 'p, the used list visits each node at most once, and no node lies
        // inside the table, so the references handed out never alias.
        let node = unsafe { &mut *node.as_ptr() };
        self.cursor = node.next;
        self.remaining -= 1;
        node.value.as_mut().map(|value| (PoolKey(idx), value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for IterMut<'_, '_, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::rc::Rc;

    fn arena() -> Arena {
        Arena::with_capacity(256 * 1024)
    }

    struct DropCounter(Rc<Cell<usize>>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_empty_pool() {
        let arena = arena();
        let pool: Pool<'_, u64> = unsafe { Pool::new(&arena) };
        assert!(pool.is_empty());
        assert_eq!(pool.free_len(), 0);
        assert_eq!(pool.node_count(), 0);
        assert_eq!(pool.iter().count(), 0);
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn test_alloc_is_default() {
        let arena = arena();
        let mut pool: Pool<'_, u64> = unsafe { Pool::new(&arena) };
        let key = pool.alloc();
        assert_eq!(pool[key], 0);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_realloc_reuses_node() {
        let arena = arena();
        let mut pool: Pool<'_, u64> = unsafe { Pool::new(&arena) };
        let first = pool.alloc();
        pool[first] = 7;
        let addr: *const u64 = &pool[first];

        pool.dealloc(first);
        assert!(pool.is_empty());
        assert_eq!(pool.free_len(), 1);

        let used_before = arena.used();
        let second = pool.alloc();
        assert_eq!(first, second);
        assert!(std::ptr::eq(addr, &pool[second]));
        assert_eq!(pool[second], 0);
        assert_eq!(arena.used(), used_before);
        assert_eq!(pool.free_len(), 0);
    }

    #[test]
    fn test_dealloc_out_of_order() {
        let arena = arena();
        let mut pool: Pool<'_, u32> = unsafe { Pool::new(&arena) };
        let keys: Vec<PoolKey> = (0..4).map(|i| pool.alloc_with(i)).collect();

        pool.dealloc(keys[2]);
        pool.dealloc(keys[0]);
        pool.dealloc(keys[3]);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[keys[1]], 1);

        let survivors: Vec<PoolKey> = pool.keys().collect();
        assert_eq!(survivors, vec![keys[1]]);

        // Most recently freed first.
        assert_eq!(pool.alloc(), keys[3]);
        assert_eq!(pool.alloc(), keys[0]);
        assert_eq!(pool.alloc(), keys[2]);
        assert_eq!(pool.node_count(), 4);
    }

    #[test]
    fn test_iteration_visits_survivors_once() {
        let arena = arena();
        let mut pool: Pool<'_, usize> = unsafe { Pool::new(&arena) };
        let keys: Vec<PoolKey> = (0..200).map(|i| pool.alloc_with(i)).collect();
        for key in keys.iter().filter(|k| k.index() % 3 == 0) {
            pool.dealloc(*key);
        }

        let seen: Vec<usize> = pool.iter().map(|(_, v)| *v).collect();
        let unique: HashSet<usize> = seen.iter().copied().collect();
        assert_eq!(seen.len(), pool.len());
        assert_eq!(unique.len(), seen.len());
        assert!(seen.iter().all(|v| v % 3 != 0));
        assert_eq!(pool.iter().len(), pool.len());
    }

    #[test]
    fn test_iteration_order_is_newest_first() {
        let arena = arena();
        let mut pool: Pool<'_, u8> = unsafe { Pool::new(&arena) };
        for i in 0..3 {
            pool.alloc_with(i);
        }
        let values: Vec<u8> = pool.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![2, 1, 0]);
    }

    #[test]
    fn test_iter_mut() {
        let arena = arena();
        let mut pool: Pool<'_, u32> = unsafe { Pool::new(&arena) };
        let a = pool.alloc_with(1);
        let b = pool.alloc_with(2);
        for (_, value) in pool.iter_mut() {
            *value *= 10;
        }
        assert_eq!(pool[a], 10);
        assert_eq!(pool[b], 20);
    }

    #[test]
    fn test_iter_mut_references_coexist() {
        let arena = arena();
        let mut pool: Pool<'_, u32> = unsafe { Pool::new(&arena) };
        for i in 0..200 {
            pool.alloc_with(i);
        }

        let mut refs: Vec<&mut u32> = pool.iter_mut().map(|(_, v)| v).collect();
        assert_eq!(refs.len(), 200);
        for value in &mut refs {
            **value += 1000;
        }
        drop(refs);

        let mut values: Vec<u32> = pool.iter().map(|(_, v)| *v).collect();
        values.sort_unstable();
        assert!(values.iter().copied().eq(1000..1200));
    }

    #[test]
    fn test_preallocate() {
        let arena = arena();
        let node_size = mem::size_of::<Node<u64>>();
        let table_segment = 64 * mem::size_of::<NonNull<Node<u64>>>();
        let mut pool: Pool<'_, u64> = unsafe { Pool::new(&arena) };

        pool.preallocate(3);
        assert_eq!(pool.free_len(), 3);
        assert_eq!(pool.len(), 0);
        assert_eq!(pool.node_count(), 3);
        assert_eq!(arena.used(), 3 * node_size + table_segment);

        let used = arena.used();
        let keys: Vec<PoolKey> = (0..3).map(|_| pool.alloc()).collect();
        assert_eq!(arena.used(), used);
        assert_eq!(keys[0].index(), 2);
        assert_eq!(pool.free_len(), 0);

        // The fourth value needs a fresh node, carved on its own.
        pool.alloc();
        assert_eq!(arena.used(), used + node_size);
        assert_eq!(pool.node_count(), 4);
        assert_eq!(pool.len(), 4);
    }

    #[test]
    fn test_preallocate_zero_is_noop() {
        let arena = arena();
        let mut pool: Pool<'_, u64> = unsafe { Pool::new(&arena) };
        pool.preallocate(0);
        assert_eq!(pool.free_len(), 0);
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn test_fresh_alloc_carves_one_node() {
        let arena = arena();
        let node_size = mem::size_of::<Node<u64>>();
        let mut pool: Pool<'_, u64> = unsafe { Pool::new(&arena) };

        pool.alloc();
        let after_first = arena.used();
        for i in 1..10 {
            pool.alloc();
            assert_eq!(arena.used(), after_first + i * node_size);
        }
    }

    #[test]
    fn test_large_values_fit_small_arena() {
        let arena = Arena::with_capacity(4096);
        let mut pool: Pool<'_, [u8; 256]> = unsafe { Pool::new(&arena) };

        let keys: Vec<PoolKey> = (0..10u8).map(|i| pool.alloc_with([i; 256])).collect();
        assert_eq!(pool.len(), 10);
        for (i, key) in keys.iter().enumerate() {
            assert!(pool[*key].iter().all(|&b| b == i as u8));
        }
        assert!(arena.remaining() > 0);
    }

    #[test]
    fn test_get_after_dealloc_is_none() {
        let arena = arena();
        let mut pool: Pool<'_, u64> = unsafe { Pool::new(&arena) };
        let key = pool.alloc();
        assert!(pool.contains(key));
        pool.dealloc(key);
        assert!(!pool.contains(key));
        assert_eq!(pool.get(key), None);
        assert!(pool.get_mut(key).is_none());
    }

    #[test]
    fn test_take_returns_value() {
        let arena = arena();
        let mut pool = unsafe { Pool::new(&arena) };
        let key = pool.alloc_with(String::from("taken"));
        assert_eq!(pool.take(key).as_deref(), Some("taken"));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_clear_drops_each_value_once() {
        let arena = arena();
        let drops = Rc::new(Cell::new(0));
        let mut pool = unsafe { Pool::new(&arena) };
        for _ in 0..10 {
            pool.alloc_with(DropCounter(Rc::clone(&drops)));
        }
        let key = pool.keys().next().unwrap();
        pool.dealloc(key);
        assert_eq!(drops.get(), 1);

        pool.clear();
        assert_eq!(drops.get(), 10);
        assert!(pool.is_empty());
        assert_eq!(pool.free_len(), 10);

        drop(pool);
        assert_eq!(drops.get(), 10);
    }

    #[test]
    fn test_drop_releases_values() {
        let arena = arena();
        let drops = Rc::new(Cell::new(0));
        {
            let mut pool = unsafe { Pool::new(&arena) };
            pool.alloc_with(DropCounter(Rc::clone(&drops)));
            pool.alloc_with(DropCounter(Rc::clone(&drops)));
        }
        assert_eq!(drops.get(), 2);
    }

    #[test]
    fn test_values_do_not_move_when_pool_grows() {
        let arena = arena();
        let mut pool: Pool<'_, u64> = unsafe { Pool::new(&arena) };
        let first = pool.alloc_with(99);
        let addr: *const u64 = &pool[first];
        for i in 0..1000 {
            pool.alloc_with(i);
        }
        assert!(std::ptr::eq(addr, &pool[first]));
        assert_eq!(pool[first], 99);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "freed twice")]
    fn test_double_free_panics_in_debug() {
        let arena = arena();
        let mut pool: Pool<'_, u64> = unsafe { Pool::new(&arena) };
        let key = pool.alloc();
        pool.dealloc(key);
        pool.dealloc(key);
    }

    #[test]
    #[should_panic(expected = "stale pool key")]
    fn test_index_stale_key_panics() {
        let arena = arena();
        let mut pool: Pool<'_, u64> = unsafe { Pool::new(&arena) };
        let key = pool.alloc();
        pool.dealloc(key);
        let _ = pool[key];
    }
}
