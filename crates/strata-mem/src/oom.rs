//! Out-of-memory policy hook.
//!
//! When an [`Arena`] cannot satisfy a request it calls the installed
//! handler and then checks again. The default handler logs the arena and
//! aborts the process. A replacement must either terminate, unwind (for
//! example `panic!`, which is what test harnesses do), or make room in the
//! arena; a handler that returns without doing any of these makes the
//! allocation retry forever.
//!
//! The hook is process-wide and shared by every thread.
//!
//! # Example
//!
//! ```
//! use std::panic::{AssertUnwindSafe, catch_unwind};
//!
//! use strata_mem::arena::Arena;
//! use strata_mem::oom;
//!
//! fn unwind_on_oom(arena: &Arena) {
//!     panic!("arena out of memory: {} bytes left", arena.remaining());
//! }
//!
//! let previous = oom::set_oom_handler(unwind_on_oom);
//! let arena = Arena::with_capacity(64);
//! let result = catch_unwind(AssertUnwindSafe(|| arena.alloc::<u8>(65)));
//! assert!(result.is_err());
//! oom::set_oom_handler(previous);
//! ```

use std::sync::{PoisonError, RwLock};

use strata_log::{fatal, warn};

use crate::arena::Arena;

/// Signature of an OOM handler. Receives the arena that ran out of space.
pub type OomHandler = fn(&Arena);

static OOM_HANDLER: RwLock<OomHandler> = RwLock::new(default_oom_handler);

/// Installs `handler` and returns the one it replaced.
pub fn set_oom_handler(handler: OomHandler) -> OomHandler {
    let mut slot = OOM_HANDLER.write().unwrap_or_else(PoisonError::into_inner);
    warn!("replacing arena OOM handler");
    std::mem::replace(&mut *slot, handler)
}

/// Restores [`default_oom_handler`].
pub fn reset_oom_handler() {
    set_oom_handler(default_oom_handler);
}

/// Returns the installed handler.
#[must_use]
pub fn oom_handler() -> OomHandler {
    *OOM_HANDLER.read().unwrap_or_else(PoisonError::into_inner)
}

/// Called from the arena allocation path.
///
/// The lock is released before the handler runs so that an unwinding
/// handler never poisons it.
#[cold]
#[inline(never)]
pub(crate) fn handle_oom(arena: &Arena) {
    let handler = oom_handler();
    handler(arena);
}

/// Logs the exhausted arena and aborts.
pub fn default_oom_handler(arena: &Arena) {
    fatal!(
        "arena {:p} is out of memory: capacity {} bytes, {} remaining, peak {} used",
        arena,
        arena.capacity(),
        arena.remaining(),
        arena.stats().peak_used,
    );

    #[cfg(feature = "oom-backtrace")]
    fatal!("{:?}", backtrace::Backtrace::new());

    std::process::abort();
}
