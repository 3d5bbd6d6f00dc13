//! Tunables shared by the allocators.

use crate::error::{Error, Result};

/// Size of each per-thread scratch arena when none is configured (32 KiB).
pub const DEFAULT_SCRATCH_ARENA_SIZE: usize = 32 * 1024;

/// Capacity of the fixed thread context table (`thread-table` feature).
pub const MAX_THREAD_CONTEXTS: usize = 4096;

/// Tag stored in every live pool node in debug builds.
pub const POOL_NODE_SENTINEL: u32 = 0xBEEF_B00F;

/// Tag stored in pool nodes that sit on the free list in debug builds.
pub const POOL_FREE_SENTINEL: u32 = 0xDEAD_F7EE;

/// Power-of-two segment sizes skipped by `SegmentArray` (1..=32).
pub const SEGMENT_SMALL_SIZES_SKIPPED: u32 = 6;

/// Number of segment slots in a `SegmentArray`.
pub const SEGMENT_SLOTS: usize = 26;

/// Minimum alignment applied to arena allocations under AddressSanitizer.
pub const ASAN_MIN_ALIGNMENT: usize = 8;

/// Environment variable overriding [`ScratchConfig::arena_size`].
pub const SCRATCH_SIZE_ENV_VAR: &str = "STRATA_SCRATCH_ARENA_SIZE";

/// Sizing for the two scratch arenas each worker thread owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchConfig {
    /// Capacity of each of the two arenas, in bytes.
    pub arena_size: usize,
}

impl ScratchConfig {
    /// Creates a config with the given per-arena size.
    #[must_use]
    pub const fn new(arena_size: usize) -> Self {
        Self { arena_size }
    }

    /// Reads `STRATA_SCRATCH_ARENA_SIZE`, falling back to the default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the variable is set but is not a
    /// positive integer.
    pub fn from_env() -> Result<Self> {
        Self::from_env_value(std::env::var(SCRATCH_SIZE_ENV_VAR).ok().as_deref())
    }

    /// Builds a config from the raw value of `STRATA_SCRATCH_ARENA_SIZE`.
    ///
    /// `None` means the variable is unset and yields the default. Surrounding
    /// whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the value is not a positive
    /// integer that fits in an `isize`.
    pub fn from_env_value(raw: Option<&str>) -> Result<Self> {
        let Some(raw) = raw else {
            return Ok(Self::default());
        };
        let arena_size = raw
            .trim()
            .parse::<usize>()
            .map_err(|e| Error::InvalidConfig {
                reason: format!("{SCRATCH_SIZE_ENV_VAR}={raw:?}: {e}"),
            })?;
        let config = Self::new(arena_size);
        config.validate()?;
        Ok(config)
    }

    /// Checks that the values can back real arenas.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for a zero size or one that does not
    /// fit in an `isize`.
    pub fn validate(&self) -> Result<()> {
        if self.arena_size == 0 {
            return Err(Error::InvalidConfig {
                reason: "arena_size must be non-zero".into(),
            });
        }
        if self.arena_size > isize::MAX as usize {
            return Err(Error::InvalidConfig {
                reason: format!("arena_size {} exceeds isize::MAX", self.arena_size),
            });
        }
        Ok(())
    }
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SCRATCH_ARENA_SIZE)
    }
}
