//! Strata memory substrate
//!
//! Region-based memory management for a native runtime:
//!
//! - **Arenas**: bump-pointer regions with explicit save/restore ([`arena`])
//! - **Scratch registry**: two arenas per thread and an O(1) rule for picking
//!   one that does not alias the caller's ([`scratch`], [`factory`])
//! - **OOM hook**: process-wide policy for exhausted arenas ([`oom`])
//! - **Pools**: free-list recycling of fixed-type nodes ([`pool`])
//! - **Segment arrays**: growable arrays whose elements never move
//!   ([`segment`])
//!
//! Everything here is single-threaded. An arena and every structure built on
//! it belong to one thread, and the arena must outlive the structures'
//! allocations.
//!
//! # Example
//!
//! ```
//! use strata_mem::{Arena, Pool, SegmentArray};
//!
//! let arena = Arena::with_capacity(64 * 1024);
//! let mark = arena.save();
//! {
//!     // SAFETY: the arena is restored only after both structures are gone.
//!     let mut pool: Pool<'_, u64> = unsafe { Pool::new(&arena) };
//!     let mut ids = unsafe { SegmentArray::new(&arena) };
//!
//!     for i in 0..100 {
//!         let key = pool.alloc_with(i);
//!         ids.push(key);
//!     }
//!     assert_eq!(pool[ids[42]], 42);
//! }
//! arena.restore(mark);
//! assert_eq!(arena.used(), 0);
//! ```

pub mod arena;
pub mod config;
pub mod error;
pub mod factory;
pub mod oom;
pub mod pool;
pub mod sanitizer;
pub mod scratch;
pub mod segment;

pub use arena::{Arena, ArenaSaved, ArenaState, ArenaStats, Fill, Scope};
pub use config::ScratchConfig;
pub use error::{Error, Result};
pub use factory::ScratchFactory;
pub use oom::{OomHandler, set_oom_handler};
pub use pool::{Pool, PoolKey};
pub use scratch::{get_scratch, scratch_scope, set_allocators_for_thread};
pub use segment::SegmentArray;
