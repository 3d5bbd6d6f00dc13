//! Error types for `strata-mem`.
//!
//! Only setup paths are fallible: creating a backing region and validating
//! configuration. Running out of arena space, pool corruption and contract
//! violations are not errors in this sense; they go through the OOM hook or
//! trap.

use std::fmt;

/// Errors reported while setting up arenas and scratch allocators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The system allocator refused to provide a backing region.
    BackingAllocationFailed {
        /// Requested region size in bytes.
        size: usize,
    },

    /// A backing region of zero bytes was requested.
    ZeroCapacity,

    /// The requested region size does not form a valid layout.
    CapacityOverflow {
        /// Requested region size in bytes.
        requested: usize,
    },

    /// A configuration value is out of range.
    InvalidConfig {
        /// What is wrong with it.
        reason: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackingAllocationFailed { size } => {
                write!(f, "failed to allocate a {size} byte arena region")
            }
            Error::ZeroCapacity => write!(f, "arena capacity must be non-zero"),
            Error::CapacityOverflow { requested } => {
                write!(f, "arena capacity {requested} exceeds the address space")
            }
            Error::InvalidConfig { reason } => {
                write!(f, "invalid configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type for `strata-mem` setup operations.
pub type Result<T> = std::result::Result<T, Error>;
