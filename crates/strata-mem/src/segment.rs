//! Address-stable growable array.
//!
//! A [`SegmentArray`] stores its elements in power-of-two sized segments
//! carved from an [`Arena`]. Growing allocates one more segment and never
//! touches the existing ones, so the address of an element stays valid for
//! the whole life of the array. This is the property a `Vec` cannot give.
//!
//! Segment `k` holds `64 << k` elements. The six smallest power-of-two sizes
//! (1 through 32) are skipped, so 26 segments cover just under 2^32
//! elements while the first segment is already a useful size.
//!
//! ```text
//! item:     0 .. 63 | 64 .. 191 | 192 .. 447 | 448 .. 959 | ...
//! segment:      0   |     1     |      2     |      3     | ...
//! ```
//!
//! Locating an item is O(1): the segment index is `floor(log2(i / 64 + 1))`,
//! computed with a leading-zero count, and the offset inside the segment is
//! `i` minus the capacity of all earlier segments.
//!
//! Elements are never dropped. Like everything else in an arena, their bytes
//! are reclaimed when the arena is restored.
//!
//! # Examples
//!
//! ```
//! use strata_mem::arena::Arena;
//! use strata_mem::segment::SegmentArray;
//!
//! let arena = Arena::with_capacity(64 * 1024);
//! // SAFETY: `arena` is not restored while `items` is alive.
//! let mut items = unsafe { SegmentArray::new(&arena) };
//!
//! items.push(1u32);
//! let first: *const u32 = &items[0];
//!
//! for i in 2..=1000 {
//!     items.push(i);
//! }
//! assert_eq!(items.len(), 1000);
//! assert_eq!(items.num_segments(), 5);
//! assert!(std::ptr::eq(first, &items[0]));
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};
use std::ptr::NonNull;

use strata_log::trace;

use crate::arena::Arena;
use crate::config::{SEGMENT_SLOTS, SEGMENT_SMALL_SIZES_SKIPPED};

/// Number of elements in segment 0.
pub const FIRST_SEGMENT_LEN: usize = 1 << SEGMENT_SMALL_SIZES_SKIPPED;

/// Largest number of elements a `SegmentArray` can hold.
///
/// Computed in `u64` because it does not fit a 32-bit `usize`. On such
/// targets the address space runs out long before the last segment.
pub const MAX_LEN: u64 =
    ((FIRST_SEGMENT_LEN as u64) << SEGMENT_SLOTS) - FIRST_SEGMENT_LEN as u64;

/// Number of elements in segment `idx`.
#[inline(always)]
#[must_use]
pub const fn size_of_segment(idx: usize) -> usize {
    FIRST_SEGMENT_LEN << idx
}

/// Total number of elements held by the first `count` segments.
///
/// The sizes form a geometric series, so the sum telescopes to
/// `size_of_segment(count) - size_of_segment(0)`.
#[inline(always)]
#[must_use]
pub const fn capacity_for_segment_count(count: usize) -> usize {
    size_of_segment(count) - size_of_segment(0)
}

/// Index of the segment that holds item `idx`.
#[inline(always)]
#[must_use]
pub const fn segment_for_item(idx: usize) -> usize {
    let x = (idx >> SEGMENT_SMALL_SIZES_SKIPPED) + 1;
    (usize::BITS - 1 - x.leading_zeros()) as usize
}

/// Growable array whose elements never move.
pub struct SegmentArray<'a, T> {
    arena: &'a Arena,
    len: usize,
    num_segments: usize,
    segments: [Option<NonNull<T>>; SEGMENT_SLOTS],
    _marker: PhantomData<T>,
}

impl<'a, T> SegmentArray<'a, T> {
    /// Creates an empty array that allocates its segments from `arena`.
    ///
    /// No memory is allocated until the first push.
    ///
    /// # Safety
    ///
    /// While the array is alive, `arena` must not be restored to any state
    /// saved before one of the array's segment allocations. Segments are
    /// allocated lazily, so this covers every push.
    #[must_use]
    pub unsafe fn new(arena: &'a Arena) -> Self {
        SegmentArray {
            arena,
            len: 0,
            num_segments: 0,
            segments: [None; SEGMENT_SLOTS],
            _marker: PhantomData,
        }
    }

    /// The arena segments are allocated from.
    #[must_use]
    pub fn arena(&self) -> &'a Arena {
        self.arena
    }

    /// Number of valid elements.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the array holds no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of segments allocated so far.
    #[inline]
    #[must_use]
    pub fn num_segments(&self) -> usize {
        self.num_segments
    }

    /// Number of elements the allocated segments can hold.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        capacity_for_segment_count(self.num_segments)
    }

    /// Address of the slot for item `idx`.
    ///
    /// # Panics
    ///
    /// Panics if the segment holding `idx` has not been allocated.
    #[inline]
    fn slot_for_item(&self, idx: usize) -> NonNull<T> {
        let segment = segment_for_item(idx);
        let offset = idx - capacity_for_segment_count(segment);
        let base = match self.segments.get(segment).copied().flatten() {
            Some(base) => base,
            None => panic!("item {idx} lies in unallocated segment {segment}"),
        };
        // SAFETY: `offset < size_of_segment(segment)` by construction of
        // `segment_for_item`, and the segment was allocated for that many
        // elements.
        unsafe { base.add(offset) }
    }

    /// Returns the element at `idx`, if `idx < len`.
    #[inline]
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&T> {
        if idx >= self.len {
            return None;
        }
        // SAFETY: slots below `len` are initialized and live as long as the
        // arena is not restored past them (constructor contract).
        Some(unsafe { self.slot_for_item(idx).as_ref() })
    }

    /// Returns the element at `idx` mutably, if `idx < len`.
    #[inline]
    #[must_use]
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        if idx >= self.len {
            return None;
        }
        // SAFETY: as in `get`; `&mut self` makes the borrow unique.
        Some(unsafe { self.slot_for_item(idx).as_mut() })
    }

    /// Appends `value` and returns a reference to its slot.
    ///
    /// Allocates one new segment when every allocated segment is full.
    /// Existing elements are never moved.
    pub fn push(&mut self, value: T) -> &mut T {
        self.grow_if_needed();

        let slot = self.slot_for_item(self.len);
        // SAFETY: `len < capacity`, so the slot is inside an allocated
        // segment and currently unused.
        unsafe { slot.as_ptr().write(value) };
        self.len += 1;
        // SAFETY: just initialized.
        unsafe { &mut *slot.as_ptr() }
    }

    /// Appends `T::default()` and returns a reference to it.
    pub fn push_default(&mut self) -> &mut T
    where
        T: Default,
    {
        self.push(T::default())
    }

    /// Appends every element of `elements`, one copy per segment touched.
    pub fn push_slice(&mut self, mut elements: &[T])
    where
        T: Copy,
    {
        while !elements.is_empty() {
            self.grow_if_needed();

            let (tail, free) = self.free_tail();
            let count = free.min(elements.len());
            // SAFETY: `tail` is valid for `free >= count` unused slots in the
            // last segment, and arena memory cannot overlap `elements`.
            unsafe {
                std::ptr::copy_nonoverlapping(elements.as_ptr(), tail.as_ptr(), count);
            }

            elements = &elements[count..];
            self.len += count;
        }
    }

    /// The initialized elements of segment `idx`.
    ///
    /// Empty for segments that are not allocated or not yet reached.
    #[must_use]
    pub fn segment(&self, idx: usize) -> &[T] {
        if idx >= self.num_segments {
            return &[];
        }
        let first = capacity_for_segment_count(idx);
        let count = self.len.saturating_sub(first).min(size_of_segment(idx));
        match self.segments[idx] {
            // SAFETY: the first `count` slots of this segment are initialized.
            Some(base) if count > 0 => unsafe {
                std::slice::from_raw_parts(base.as_ptr(), count)
            },
            _ => &[],
        }
    }

    /// Iterates over the elements in index order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.num_segments).flat_map(move |idx| self.segment(idx).iter())
    }

    /// Copies all elements, in order, into one contiguous block carved from
    /// `arena`.
    ///
    /// The block lives in `arena` and follows its save/restore rules. An
    /// empty array yields an empty slice without allocating.
    pub fn copy_to_slice(&self, arena: &Arena) -> NonNull<[T]>
    where
        T: Copy,
    {
        if self.len == 0 {
            return NonNull::slice_from_raw_parts(NonNull::dangling(), 0);
        }

        let dst = arena.alloc_uninit::<T>(self.len);
        let mut copied = 0;
        for idx in 0..self.num_segments {
            let src = self.segment(idx);
            // SAFETY: `dst` holds `len` slots and `copied + src.len() <= len`.
            unsafe {
                std::ptr::copy_nonoverlapping(
                    src.as_ptr(),
                    dst.as_ptr().add(copied),
                    src.len(),
                );
            }
            copied += src.len();
        }
        debug_assert_eq!(copied, self.len);

        NonNull::slice_from_raw_parts(dst, self.len)
    }

    /// The unused tail of the last segment and its length.
    fn free_tail(&self) -> (NonNull<T>, usize) {
        debug_assert!(self.num_segments > 0);
        let free = self.capacity() - self.len;
        debug_assert!(free <= size_of_segment(self.num_segments - 1));
        (self.slot_for_item(self.len), free)
    }

    #[inline]
    fn grow_if_needed(&mut self) {
        if self.len >= self.capacity() {
            self.grow();
        }
    }

    /// Allocates the next segment.
    #[cold]
    fn grow(&mut self) {
        let idx = self.num_segments;
        assert!(
            idx < SEGMENT_SLOTS,
            "segment array is full ({MAX_LEN} elements)"
        );

        let segment = self.arena.alloc_uninit::<T>(size_of_segment(idx));
        self.segments[idx] = Some(segment);
        self.num_segments += 1;

        trace!(
            "segment array grew to {} segments ({} slots)",
            self.num_segments,
            self.capacity()
        );
    }
}

impl<T> Index<usize> for SegmentArray<'_, T> {
    type Output = T;

    #[inline]
    fn index(&self, idx: usize) -> &T {
        let len = self.len;
        match self.get(idx) {
            Some(value) => value,
            None => panic!("index {idx} out of bounds for segment array of length {len}"),
        }
    }
}

impl<T> IndexMut<usize> for SegmentArray<'_, T> {
    #[inline]
    fn index_mut(&mut self, idx: usize) -> &mut T {
        let len = self.len;
        match self.get_mut(idx) {
            Some(value) => value,
            None => panic!("index {idx} out of bounds for segment array of length {len}"),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SegmentArray<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
