// Common test utilities for integration tests
//
// Scratch-using tests run on their own thread with two fresh arenas, and
// check afterwards that every scratch save point was released.

#![allow(dead_code)]

use std::thread;

use strata_mem::arena::Arena;
use strata_mem::config::DEFAULT_SCRATCH_ARENA_SIZE;
use strata_mem::scratch;

/// Leaks a fresh arena of `capacity` bytes.
pub fn leaked_arena(capacity: usize) -> &'static Arena {
    Box::leak(Box::new(Arena::with_capacity(capacity)))
}

/// Runs `f` on a new thread whose scratch allocators are two 32 KiB arenas.
///
/// Panics (failing the test) if `f` panics or if either arena is not back at
/// full capacity when `f` returns.
pub fn with_scratch_thread<F, R>(f: F) -> R
where
    F: FnOnce(&'static Arena, &'static Arena) -> R + Send + 'static,
    R: Send + 'static,
{
    thread::spawn(move || {
        let arena0 = leaked_arena(DEFAULT_SCRATCH_ARENA_SIZE);
        let arena1 = leaked_arena(DEFAULT_SCRATCH_ARENA_SIZE);
        scratch::set_allocators_for_thread(arena0, arena1);

        let result = f(arena0, arena1);

        assert_eq!(
            arena0.remaining(),
            arena0.capacity(),
            "scratch arena 0 leaked {} bytes",
            arena0.used()
        );
        assert_eq!(
            arena1.remaining(),
            arena1.capacity(),
            "scratch arena 1 leaked {} bytes",
            arena1.used()
        );
        result
    })
    .join()
    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}
