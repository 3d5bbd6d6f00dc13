//! Bump-pointer region allocator.
//!
//! An [`Arena`] bounds a contiguous region `[begin, end)`. Allocation carves
//! bytes off the top: `end` is the live cursor and moves down towards
//! `begin`. There is no per-object free. The only way to reclaim memory is to
//! [`save`](Arena::save) the cursor and later [`restore`](Arena::restore) it,
//! which logically frees everything allocated in between without running any
//! destructors.
//!
//! # Architecture
//!
//! - [`Arena`]: the region and its cursor, shared by `&Arena` on one thread
//! - [`ArenaState`]: a copied `{begin, end}` pair
//! - [`ArenaSaved`]: an arena paired with a saved state, restored explicitly
//! - [`Scope`]: a saved state that restores itself on drop
//!
//! Allocation never fails by returning an error. When a request does not fit
//! the installed [OOM handler](crate::oom) is called, which by default logs
//! and aborts.
//!
//! # Safety model
//!
//! Allocation is safe and returns raw [`NonNull`] pointers. Reading or
//! writing through them is `unsafe` and valid only until the arena is
//! restored to a state saved before the allocation. The arena does not track
//! outstanding pointers.
//!
//! # Examples
//!
//! ```
//! use strata_mem::arena::{Arena, Scope};
//!
//! let arena = Arena::with_capacity(4096);
//!
//! let header = arena.alloc_value(7u64);
//! {
//!     let temp = Scope::new(&arena);
//!     let scratch = temp.alloc::<u32>(256);
//!     unsafe { scratch.as_ptr().write(1) };
//!     // everything allocated through `temp` is reclaimed here
//! }
//!
//! unsafe { assert_eq!(*header.as_ptr(), 7) };
//! assert_eq!(arena.used(), 8);
//! ```

use std::alloc::{self, Layout};
use std::cell::Cell;
use std::fmt;
use std::mem::{self, MaybeUninit};
use std::ops::Deref;
use std::ptr::NonNull;

use strata_log::debug;

use crate::error::{Error, Result};
use crate::{oom, sanitizer};

/// Alignment of owned backing regions.
const BACKING_ALIGNMENT: usize = 16;

/// Whether a fresh allocation is zeroed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// The returned bytes read as zero.
    Zeroed,
    /// The returned bytes hold whatever the region held before.
    Uninit,
}

/// A snapshot of an arena's live bounds.
///
/// Obtained from [`Arena::save`] and handed back to [`Arena::restore`].
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ArenaState {
    beg: NonNull<u8>,
    end: NonNull<u8>,
}

impl ArenaState {
    /// Address of the lower bound.
    #[must_use]
    pub fn begin(&self) -> usize {
        self.beg.as_ptr().addr()
    }

    /// Address of the cursor.
    #[must_use]
    pub fn end(&self) -> usize {
        self.end.as_ptr().addr()
    }

    /// Bytes still available in this state.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.end() - self.begin()
    }
}

impl fmt::Debug for ArenaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaState")
            .field("begin", &self.beg)
            .field("end", &self.end)
            .finish()
    }
}

/// Usage figures for an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
    /// Size of the whole region in bytes.
    pub capacity: usize,
    /// Bytes between the cursor and the top of the region.
    pub used: usize,
    /// Bytes between the lower bound and the cursor.
    pub remaining: usize,
    /// Largest `used` ever observed, across restores.
    pub peak_used: usize,
}

/// A bump-pointer region allocator.
///
/// `Arena` is neither `Send` nor `Sync`: it belongs to the thread that
/// created it, and every structure built on it borrows it from that thread.
///
/// # Examples
///
/// ```
/// use strata_mem::arena::{Arena, Fill};
///
/// let arena = Arena::with_capacity(1024);
///
/// let p = arena.allocate(4, 16, 3, Fill::Zeroed);
/// assert_eq!(p.as_ptr().addr() % 16, 0);
///
/// let before = arena.remaining();
/// let saved = arena.save();
/// arena.alloc::<u64>(32);
/// arena.restore(saved);
/// assert_eq!(arena.remaining(), before);
/// ```
pub struct Arena {
    /// Lowest address of the region.
    base: NonNull<u8>,
    /// One past the highest address of the region.
    limit: NonNull<u8>,
    /// Live lower bound.
    beg: Cell<NonNull<u8>>,
    /// Live cursor; allocations are carved below it.
    end: Cell<NonNull<u8>>,
    /// High-water mark of `used`.
    peak: Cell<usize>,
    /// Layout of the backing region if this arena allocated it.
    owned: Option<Layout>,
}

impl Arena {
    /// Creates an arena over a freshly allocated region of `capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or too large for a layout, and aborts
    /// through [`alloc::handle_alloc_error`] if the system allocator fails.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        match Self::try_with_capacity(capacity) {
            Ok(arena) => arena,
            Err(Error::BackingAllocationFailed { size }) => {
                // `size` was accepted by `Layout` in `try_with_capacity`.
                let layout = Layout::from_size_align(size, BACKING_ALIGNMENT)
                    .unwrap_or(Layout::new::<u8>());
                alloc::handle_alloc_error(layout)
            }
            Err(err) => panic!("cannot create arena: {err}"),
        }
    }

    /// Creates an arena over a freshly allocated region of `capacity` bytes.
    ///
    /// # Errors
    ///
    /// - [`Error::ZeroCapacity`] if `capacity` is zero
    /// - [`Error::CapacityOverflow`] if no layout can describe the region
    /// - [`Error::BackingAllocationFailed`] if the system allocator fails
    pub fn try_with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::ZeroCapacity);
        }
        let layout = Layout::from_size_align(capacity, BACKING_ALIGNMENT)
            .map_err(|_| Error::CapacityOverflow {
                requested: capacity,
            })?;

        // SAFETY: layout has a non-zero size.
        let base = unsafe { alloc::alloc(layout) };
        let base = NonNull::new(base).ok_or(Error::BackingAllocationFailed {
            size: capacity,
        })?;

        // SAFETY: `base` is valid for `capacity` bytes.
        let mut arena = unsafe { Self::from_raw_parts(base, capacity) };
        arena.owned = Some(layout);

        debug!("created arena {:p} with an owned {} byte region", base, capacity);
        Ok(arena)
    }

    /// Creates an arena over a region supplied by the caller.
    ///
    /// The arena never frees the region.
    ///
    /// # Safety
    ///
    /// `begin` must be valid for reads and writes of `len` bytes for the
    /// whole lifetime of the arena, and nothing else may access the region
    /// while the arena is alive.
    #[must_use]
    pub unsafe fn from_raw_parts(begin: NonNull<u8>, len: usize) -> Self {
        // SAFETY: the caller guarantees `begin + len` is within (or one past)
        // the same allocation.
        let limit = unsafe { begin.add(len) };
        sanitizer::poison(begin.as_ptr(), len);

        Arena {
            base: begin,
            limit,
            beg: Cell::new(begin),
            end: Cell::new(limit),
            peak: Cell::new(0),
            owned: None,
        }
    }

    /// Creates an arena over a leaked or static buffer.
    #[must_use]
    pub fn from_static(buf: &'static mut [MaybeUninit<u8>]) -> Self {
        let len = buf.len();
        let begin = NonNull::from(buf).cast::<u8>();
        // SAFETY: the exclusive 'static borrow is valid for `len` bytes forever
        // and is consumed here.
        unsafe { Self::from_raw_parts(begin, len) }
    }

    /// Carves `count` elements of `elem_size` bytes aligned to `align`.
    ///
    /// The returned address is aligned to `align` and the
    /// `elem_size * count` bytes after it belong to the caller until the
    /// arena is restored to a state saved before this call. If the request
    /// does not fit, the OOM handler runs and the request is checked again.
    ///
    /// `align` must be a power of two.
    pub fn allocate(
        &self,
        elem_size: usize,
        align: usize,
        count: usize,
        fill: Fill,
    ) -> NonNull<u8> {
        debug_assert!(
            align.is_power_of_two(),
            "alignment {align} is not a power of two"
        );
        let align = sanitizer::effective_alignment(align);

        loop {
            let beg = self.beg.get();
            let end = self.end.get();
            let available = end.as_ptr().addr() - beg.as_ptr().addr();

            if let Some((size, pad)) = fit(elem_size, count, align, end, available) {
                // SAFETY: `size + pad <= end - beg`, so the new cursor stays
                // within `[beg, end]`.
                let start = unsafe { end.sub(size + pad) };
                self.end.set(start);
                self.bump_peak();

                sanitizer::unpoison(start.as_ptr(), size);
                if fill == Fill::Zeroed {
                    // SAFETY: `[start, start + size)` was just carved out and
                    // lies inside the region.
                    unsafe { start.as_ptr().write_bytes(0, size) };
                }
                return start;
            }

            debug!(
                "arena {:p} cannot fit {} x {} bytes (align {}), {} available",
                self, count, elem_size, align, available
            );
            oom::handle_oom(self);
        }
    }

    /// Allocates `count` zeroed `T`s.
    ///
    /// The pointer is aligned for `T`. Whether all-zero bytes are a valid
    /// `T` is the caller's concern.
    #[inline]
    pub fn alloc<T>(&self, count: usize) -> NonNull<T> {
        self.allocate(mem::size_of::<T>(), mem::align_of::<T>(), count, Fill::Zeroed)
            .cast()
    }

    /// Allocates `count` `T`s without initializing them.
    #[inline]
    pub fn alloc_uninit<T>(&self, count: usize) -> NonNull<T> {
        self.allocate(mem::size_of::<T>(), mem::align_of::<T>(), count, Fill::Uninit)
            .cast()
    }

    /// Moves `value` into the arena. Its destructor will never run.
    #[inline]
    pub fn alloc_value<T>(&self, value: T) -> NonNull<T> {
        let ptr = self.alloc_uninit::<T>(1);
        // SAFETY: freshly carved, aligned and sized for one `T`.
        unsafe { ptr.as_ptr().write(value) };
        ptr
    }

    /// Copies `src` into the arena.
    pub fn alloc_slice_copy<T: Copy>(&self, src: &[T]) -> NonNull<[T]> {
        let ptr = self.alloc_uninit::<T>(src.len());
        // SAFETY: the destination was just carved for `src.len()` elements
        // and cannot overlap `src`.
        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), ptr.as_ptr(), src.len());
        }
        NonNull::slice_from_raw_parts(ptr, src.len())
    }

    /// Copies the live bounds.
    #[inline]
    #[must_use]
    pub fn save(&self) -> ArenaState {
        ArenaState {
            beg: self.beg.get(),
            end: self.end.get(),
        }
    }

    /// Pairs this arena with its current state.
    #[inline]
    #[must_use]
    pub fn saved(&self) -> ArenaSaved<'_> {
        ArenaSaved {
            arena: self,
            saved: self.save(),
        }
    }

    /// Saves the current state and restores it when the returned guard drops.
    #[inline]
    #[must_use]
    pub fn scope(&self) -> Scope<'_> {
        Scope::new(self)
    }

    /// Overwrites the live bounds with `state`.
    ///
    /// Everything allocated since `state` was saved is logically freed; no
    /// destructors run. Under the sanitizer the reclaimed range is poisoned.
    pub fn restore(&self, state: ArenaState) {
        debug_assert!(
            self.base <= state.beg && state.beg <= state.end && state.end <= self.limit,
            "state {state:?} does not belong to arena {self:p}"
        );

        let end = self.end.get();
        if state.end > end {
            sanitizer::poison(end.as_ptr(), state.end.as_ptr().addr() - end.as_ptr().addr());
        }

        self.beg.set(state.beg);
        self.end.set(state.end);
    }

    /// Size of the whole region in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.limit.as_ptr().addr() - self.base.as_ptr().addr()
    }

    /// Bytes that can still be carved (ignoring alignment padding).
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.save().remaining()
    }

    /// Bytes currently allocated, including padding.
    #[must_use]
    pub fn used(&self) -> usize {
        self.capacity() - self.remaining()
    }

    /// Returns usage figures.
    #[must_use]
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            capacity: self.capacity(),
            used: self.used(),
            remaining: self.remaining(),
            peak_used: self.peak.get(),
        }
    }

    /// Whether `ptr` points into this arena's region.
    #[must_use]
    pub fn owns<T: ?Sized>(&self, ptr: *const T) -> bool {
        let addr = ptr.cast::<u8>().addr();
        self.base.as_ptr().addr() <= addr && addr < self.limit.as_ptr().addr()
    }

    fn bump_peak(&self) {
        let used = self.used();
        if used > self.peak.get() {
            self.peak.set(used);
        }
    }
}

/// Size and padding for a request below `end`, if it fits in `available`.
///
/// The start address `end - size - pad` is a multiple of `align`.
#[inline(always)]
fn fit(
    elem_size: usize,
    count: usize,
    align: usize,
    end: NonNull<u8>,
    available: usize,
) -> Option<(usize, usize)> {
    let size = elem_size.checked_mul(count)?;
    if size > available {
        return None;
    }
    let unaligned_start = end.as_ptr().addr() - size;
    let pad = unaligned_start & (align - 1);
    (size + pad <= available).then_some((size, pad))
}

impl Drop for Arena {
    fn drop(&mut self) {
        if let Some(layout) = self.owned {
            sanitizer::unpoison(self.base.as_ptr(), layout.size());
            // SAFETY: `base` came from `alloc::alloc(layout)` in
            // `try_with_capacity` and is freed exactly once.
            unsafe { alloc::dealloc(self.base.as_ptr(), layout) };
        }
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("region", &(self.base..self.limit))
            .field("state", &self.save())
            .field("owned", &self.owned.is_some())
            .finish()
    }
}

/// An arena together with a state to return it to.
///
/// This is what the scratch registry hands out. The holder must call
/// [`release`](Self::release) before its scope ends, in LIFO order with any
/// other saves of the same arena; nothing enforces it. Convert into a
/// [`Scope`] to have it released automatically.
#[must_use = "an ArenaSaved must be released, or converted into a Scope"]
pub struct ArenaSaved<'a> {
    arena: &'a Arena,
    saved: ArenaState,
}

impl<'a> ArenaSaved<'a> {
    /// The arena to allocate from.
    #[inline]
    #[must_use]
    pub fn arena(&self) -> &'a Arena {
        self.arena
    }

    /// The state that [`release`](Self::release) returns to.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ArenaState {
        self.saved
    }

    /// Rewinds the arena to the saved state and keeps the save point, e.g.
    /// at the top of every loop iteration.
    #[inline]
    pub fn reset(&self) {
        self.arena.restore(self.saved);
    }

    /// Rewinds the arena to the saved state and ends the save point.
    #[inline]
    pub fn release(self) {
        self.arena.restore(self.saved);
    }

    /// Turns this save point into a guard that releases on drop.
    #[inline]
    pub fn into_scope(self) -> Scope<'a> {
        Scope::from(self)
    }
}

impl Deref for ArenaSaved<'_> {
    type Target = Arena;

    #[inline]
    fn deref(&self) -> &Arena {
        self.arena
    }
}

impl fmt::Debug for ArenaSaved<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaSaved")
            .field("arena", &format_args!("{:p}", self.arena))
            .field("saved", &self.saved)
            .finish()
    }
}

/// Restores an arena on every exit path of the block that owns it.
///
/// ```
/// use strata_mem::arena::{Arena, Scope};
///
/// fn fill(arena: &Arena) -> Result<(), String> {
///     let temp = Scope::new(arena);
///     temp.alloc::<u8>(128);
///     Err("early exit".into())
/// }
///
/// let arena = Arena::with_capacity(1024);
/// assert!(fill(&arena).is_err());
/// assert_eq!(arena.remaining(), 1024);
/// ```
#[must_use = "a Scope restores its arena as soon as it is dropped"]
pub struct Scope<'a> {
    arena: &'a Arena,
    saved: ArenaState,
}

impl<'a> Scope<'a> {
    /// Saves `arena` now.
    #[inline]
    pub fn new(arena: &'a Arena) -> Self {
        Scope {
            arena,
            saved: arena.save(),
        }
    }

    /// The arena this scope restores.
    #[inline]
    #[must_use]
    pub fn arena(&self) -> &'a Arena {
        self.arena
    }

    /// The state restored on drop.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ArenaState {
        self.saved
    }

    /// Rewinds to the saved state now, keeping the scope alive.
    #[inline]
    pub fn reset(&self) {
        self.arena.restore(self.saved);
    }
}

impl<'a> From<ArenaSaved<'a>> for Scope<'a> {
    #[inline]
    fn from(saved: ArenaSaved<'a>) -> Self {
        Scope {
            arena: saved.arena,
            saved: saved.saved,
        }
    }
}

impl Deref for Scope<'_> {
    type Target = Arena;

    #[inline]
    fn deref(&self) -> &Arena {
        self.arena
    }
}

impl Drop for Scope<'_> {
    #[inline]
    fn drop(&mut self) {
        self.arena.restore(self.saved);
    }
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("arena", &format_args!("{:p}", self.arena))
            .field("saved", &self.saved)
            .finish()
    }
}
