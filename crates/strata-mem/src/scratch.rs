//! Per-thread scratch arenas.
//!
//! Every worker thread is given exactly two arenas at startup with
//! [`set_allocators_for_thread`]. A function that needs temporary memory asks
//! for a scratch arena with [`get_scratch`], passing the arenas it is already
//! allocating its results from. The registry picks whichever of the two
//! thread arenas does not alias the caller's, so scratch allocations can
//! never be reclaimed out from under the caller's results.
//!
//! # Conflict rule
//!
//! | conflicts     | scratch arena |
//! |---------------|---------------|
//! | `[]`          | `arena0`      |
//! | `[arena0]`    | `arena1`      |
//! | `[other]`     | `arena0`      |
//!
//! Two candidates are enough for one caller-owned arena plus scratch,
//! including nesting: a callee that receives its caller's scratch arena as
//! its output arena gets the other one for its own scratch. Asking to avoid
//! two or more arenas at once cannot be served and panics.
//!
//! # Storage
//!
//! By default the pair lives in native thread-local storage. With the
//! `thread-table` feature it lives in a fixed process-wide table of
//! [`MAX_THREAD_CONTEXTS`] slots, and each thread keeps only its slot index.
//! Slots are never recycled; claiming more than the table holds is fatal.
//!
//! # Examples
//!
//! ```
//! use strata_mem::arena::Arena;
//! use strata_mem::scratch;
//!
//! let a0: &'static Arena = Box::leak(Box::new(Arena::with_capacity(4096)));
//! let a1: &'static Arena = Box::leak(Box::new(Arena::with_capacity(4096)));
//! scratch::set_allocators_for_thread(a0, a1);
//!
//! fn squares(out: &Arena, n: usize) -> *mut u64 {
//!     let temp = scratch::scratch_scope(&[out]);
//!     let work = temp.alloc::<u64>(n).as_ptr();
//!     let result = out.alloc::<u64>(n).as_ptr();
//!     for i in 0..n {
//!         unsafe {
//!             *work.add(i) = i as u64;
//!             *result.add(i) = *work.add(i) * *work.add(i);
//!         }
//!     }
//!     result
//! }
//!
//! let out = scratch::get_scratch(&[]);
//! let result = squares(&out, 16);
//! unsafe { assert_eq!(*result.add(3), 9) };
//! assert_eq!(a1.remaining(), 4096);
//! out.release();
//! assert_eq!(a0.remaining(), 4096);
//! ```

use std::ptr;

use strata_log::debug;

use crate::arena::{Arena, ArenaSaved, Scope};
use crate::config::MAX_THREAD_CONTEXTS;

#[cfg(not(feature = "thread-table"))]
use local as backend;
#[cfg(feature = "thread-table")]
use table as backend;

/// The two arenas assigned to one thread.
pub type ThreadAllocators = (&'static Arena, &'static Arena);

/// Assigns the calling thread's two scratch arenas.
///
/// Meant to run once, at worker startup. Calling it again replaces the pair;
/// any outstanding scratch save points still refer to the old arenas.
///
/// # Panics
///
/// Panics if `arena0` and `arena1` are the same arena, since the conflict
/// rule relies on them being distinct.
pub fn set_allocators_for_thread(arena0: &'static Arena, arena1: &'static Arena) {
    assert!(
        !ptr::eq(arena0, arena1),
        "scratch allocators for a thread must be two distinct arenas"
    );

    backend::store(arena0, arena1);

    debug!(
        "scratch allocators set for thread {:?}: {:p} ({} bytes), {:p} ({} bytes)",
        std::thread::current().id(),
        arena0,
        arena0.capacity(),
        arena1,
        arena1.capacity(),
    );
}

/// The calling thread's arenas, if they have been set.
#[must_use]
pub fn allocators_for_thread() -> Option<ThreadAllocators> {
    backend::load()
}

/// Whether [`set_allocators_for_thread`] has run on this thread.
#[must_use]
pub fn is_configured() -> bool {
    allocators_for_thread().is_some()
}

/// Returns a save point on a thread arena that is not in `conflicts`.
///
/// The holder allocates through the returned value and must
/// [`release`](ArenaSaved::release) it before returning, in LIFO order with
/// other save points on the same arena. Prefer [`scratch_scope`] unless the
/// release point is not lexical.
///
/// # Panics
///
/// Panics if the thread has no allocators set, or if `conflicts` names more
/// than one arena.
pub fn get_scratch(conflicts: &[&Arena]) -> ArenaSaved<'static> {
    select(conflicts).saved()
}

/// Like [`get_scratch`] but restores the arena when the guard drops.
///
/// # Panics
///
/// Same as [`get_scratch`].
pub fn scratch_scope(conflicts: &[&Arena]) -> Scope<'static> {
    Scope::new(select(conflicts))
}

fn select(conflicts: &[&Arena]) -> &'static Arena {
    let Some((arena0, arena1)) = allocators_for_thread() else {
        panic!(
            "scratch allocators not set for thread {:?}; call set_allocators_for_thread first",
            std::thread::current().id()
        );
    };

    match conflicts {
        [] => arena0,
        [only] if ptr::eq(*only, arena0) => arena1,
        [_] => arena0,
        _ => panic!(
            "scratch arenas can avoid at most one conflicting arena, got {}",
            conflicts.len()
        ),
    }
}

#[cfg(not(feature = "thread-table"))]
mod local {
    use std::cell::Cell;

    use super::ThreadAllocators;
    use crate::arena::Arena;

    thread_local! {
        static ALLOCATORS: Cell<Option<ThreadAllocators>> = const { Cell::new(None) };
    }

    pub(super) fn store(arena0: &'static Arena, arena1: &'static Arena) {
        ALLOCATORS.with(|slot| slot.set(Some((arena0, arena1))));
    }

    pub(super) fn load() -> Option<ThreadAllocators> {
        ALLOCATORS.with(Cell::get)
    }
}

// Built in every configuration so its tests always run.
#[cfg_attr(not(feature = "thread-table"), allow(dead_code))]
mod table {
    use std::cell::Cell;
    use std::ptr;
    use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

    use strata_log::fatal;

    use super::{MAX_THREAD_CONTEXTS, ThreadAllocators};
    use crate::arena::Arena;

    struct Slot {
        arena0: AtomicPtr<Arena>,
        arena1: AtomicPtr<Arena>,
    }

    impl Slot {
        const EMPTY: Slot = Slot {
            arena0: AtomicPtr::new(ptr::null_mut()),
            arena1: AtomicPtr::new(ptr::null_mut()),
        };
    }

    static TABLE: [Slot; MAX_THREAD_CONTEXTS] = [const { Slot::EMPTY }; MAX_THREAD_CONTEXTS];
    static NEXT_SLOT: AtomicUsize = AtomicUsize::new(0);

    thread_local! {
        static SLOT_INDEX: Cell<Option<usize>> = const { Cell::new(None) };
    }

    fn claim_slot() -> usize {
        if let Some(idx) = SLOT_INDEX.with(Cell::get) {
            return idx;
        }

        let idx = NEXT_SLOT.fetch_add(1, Ordering::Relaxed);
        if idx >= MAX_THREAD_CONTEXTS {
            fatal!(
                "thread context table exhausted: {} slots, thread {:?} needs one more",
                MAX_THREAD_CONTEXTS,
                std::thread::current().id()
            );
            std::process::abort();
        }
        SLOT_INDEX.with(|slot| slot.set(Some(idx)));
        idx
    }

    pub(super) fn store(arena0: &'static Arena, arena1: &'static Arena) {
        let slot = &TABLE[claim_slot()];
        slot.arena0.store(ptr::from_ref(arena0).cast_mut(), Ordering::Relaxed);
        slot.arena1.store(ptr::from_ref(arena1).cast_mut(), Ordering::Relaxed);
    }

    pub(super) fn load() -> Option<ThreadAllocators> {
        let idx = SLOT_INDEX.with(Cell::get)?;
        let slot = &TABLE[idx];
        let arena0 = slot.arena0.load(Ordering::Relaxed);
        let arena1 = slot.arena1.load(Ordering::Relaxed);
        if arena0.is_null() || arena1.is_null() {
            return None;
        }
        // SAFETY: a slot is written only by the thread that claimed it, from
        // `&'static Arena`s, and read back only by that same thread.
        unsafe { Some((&*arena0, &*arena1)) }
    }

}
