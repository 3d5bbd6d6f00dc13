//! Worker-startup helper for scratch arenas.
//!
//! `ScratchFactory` holds the size of the per-thread scratch arenas and
//! creates them on demand. A thread pool calls
//! [`install_for_current_thread`](ScratchFactory::install_for_current_thread)
//! at the top of each worker to give it its two arenas.
//!
//! # Design
//!
//! - **No pooling**: arenas are created fresh for each thread
//! - **Thread lifetime**: installed arenas are leaked so they outlive every
//!   scratch save point on the thread
//! - **Cheap factory**: just a copyable config value
//!
//! # Examples
//!
//! ```
//! use strata_mem::factory::ScratchFactory;
//! use strata_mem::scratch;
//!
//! let factory = ScratchFactory::new(16 * 1024);
//!
//! std::thread::spawn(move || {
//!     factory.install_for_current_thread().unwrap();
//!
//!     let temp = scratch::scratch_scope(&[]);
//!     let words = temp.alloc::<u32>(64);
//!     unsafe { words.as_ptr().write(7) };
//! })
//! .join()
//! .unwrap();
//! ```

use strata_log::debug;

use crate::arena::Arena;
use crate::config::ScratchConfig;
use crate::error::Result;
use crate::scratch::{self, ThreadAllocators};

/// Creates the scratch arenas for worker threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchFactory {
    config: ScratchConfig,
}

impl ScratchFactory {
    /// Creates a factory for arenas of `arena_size` bytes each.
    ///
    /// The size is checked when arenas are created.
    #[must_use]
    pub const fn new(arena_size: usize) -> Self {
        Self {
            config: ScratchConfig::new(arena_size),
        }
    }

    /// Creates a factory from a validated config.
    ///
    /// # Errors
    ///
    /// Returns the config's validation error.
    pub fn from_config(config: ScratchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Creates a factory sized by `STRATA_SCRATCH_ARENA_SIZE`, or the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is set to an invalid size.
    pub fn from_env() -> Result<Self> {
        Self::from_config(ScratchConfig::from_env()?)
    }

    /// Size of each arena this factory creates.
    #[must_use]
    pub const fn arena_size(&self) -> usize {
        self.config.arena_size
    }

    /// Creates one arena of the configured size.
    ///
    /// # Errors
    ///
    /// Returns an error if the size is invalid or the backing region cannot
    /// be allocated.
    pub fn create_arena(&self) -> Result<Arena> {
        self.config.validate()?;
        Arena::try_with_capacity(self.config.arena_size)
    }

    /// Creates both arenas of a thread's pair, or neither.
    ///
    /// If the second arena fails, the first is dropped before the error is
    /// returned.
    fn create_pair(&self) -> Result<(Arena, Arena)> {
        let arena0 = self.create_arena()?;
        let arena1 = self.create_arena()?;
        Ok((arena0, arena1))
    }

    /// Gives the calling thread its two scratch arenas.
    ///
    /// A thread that already has allocators keeps them and gets them back,
    /// so calling this more than once is harmless. The arenas are leaked:
    /// they live until the process exits.
    ///
    /// # Errors
    ///
    /// Returns an error if either arena cannot be created. Nothing is
    /// installed in that case.
    pub fn install_for_current_thread(&self) -> Result<ThreadAllocators> {
        if let Some(existing) = scratch::allocators_for_thread() {
            return Ok(existing);
        }

        let (arena0, arena1) = self.create_pair()?;
        let arena0: &'static Arena = Box::leak(Box::new(arena0));
        let arena1: &'static Arena = Box::leak(Box::new(arena1));
        scratch::set_allocators_for_thread(arena0, arena1);

        debug!(
            "installed two {} byte scratch arenas for thread {:?}",
            self.config.arena_size,
            std::thread::current().id()
        );
        Ok((arena0, arena1))
    }
}

impl Default for ScratchFactory {
    fn default() -> Self {
        Self {
            config: ScratchConfig::default(),
        }
    }
}

impl From<ScratchConfig> for ScratchFactory {
    fn from(config: ScratchConfig) -> Self {
        Self { config }
    }
}
