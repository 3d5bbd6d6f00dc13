//! Leveled logging for the strata memory substrate.
//!
//! A small, dependency-free logger: one process-wide atomic level, macros
//! that capture the calling module path, and colored output on stderr.
//! Allocator code logs rarely and almost never on a hot path, so every
//! message is formatted and written synchronously.
//!
//! # Example
//!
//! ```
//! use strata_log::{debug, error, info, Level};
//!
//! strata_log::set_level(Level::Debug);
//!
//! let capacity = 32 * 1024;
//! info!("scratch arenas ready ({} bytes each)", capacity);
//! debug!("pool preallocated {} nodes", 16);
//! error!("arena exhausted");
//! ```
//!
//! The level can also be taken from the `STRATA_LOG` environment variable:
//!
//! ```
//! strata_log::init_from_env();
//! ```

use std::fmt::Arguments;
use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering};

/// Name of the environment variable read by [`init_from_env`].
pub const LOG_ENV_VAR: &str = "STRATA_LOG";

/// Severity of a log message.
///
/// Lower values are more severe. A message is emitted when its level is at
/// or below the logger's current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// The process is about to terminate.
    Fatal = 0,
    /// An operation failed.
    Error = 1,
    /// Something looks wrong but execution continues.
    Warn = 2,
    /// Coarse lifecycle events.
    Info = 3,
    /// Detailed diagnostics.
    Debug = 4,
    /// Everything.
    Trace = 5,
}

impl Level {
    const fn color_code(self) -> &'static str {
        match self {
            Level::Fatal => "\x1b[1;31m",
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[36m",
            Level::Trace => "\x1b[35m",
        }
    }

    /// Returns the upper-case name of this level.
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Fatal => "FATAL",
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Fatal,
            1 => Level::Error,
            2 => Level::Warn,
            3 => Level::Info,
            4 => Level::Debug,
            _ => Level::Trace,
        }
    }

    /// Parses a level name, ignoring case.
    ///
    /// # Example
    ///
    /// ```
    /// use strata_log::Level;
    ///
    /// assert_eq!(Level::from_str("fatal"), Ok(Level::Fatal));
    /// assert_eq!(Level::from_str("Debug"), Ok(Level::Debug));
    /// assert!(Level::from_str("loud").is_err());
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FATAL" => Ok(Level::Fatal),
            "ERROR" => Ok(Level::Error),
            "WARN" | "WARNING" => Ok(Level::Warn),
            "INFO" => Ok(Level::Info),
            "DEBUG" => Ok(Level::Debug),
            "TRACE" => Ok(Level::Trace),
            _ => Err(format!("invalid log level: {s}")),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-wide level filter.
pub struct Logger {
    level: AtomicU8,
}

impl Logger {
    const fn new(level: Level) -> Self {
        Logger {
            level: AtomicU8::new(level as u8),
        }
    }

    /// Sets the most verbose level that will be emitted.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    /// Returns the current level.
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Whether a message at `level` passes the filter.
    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        level as u8 <= self.level.load(Ordering::Relaxed)
    }
}

static LOGGER: Logger = Logger::new(Level::Warn);

/// Returns the global logger.
#[inline]
pub fn logger() -> &'static Logger {
    &LOGGER
}

/// Sets the global level.
pub fn set_level(level: Level) {
    LOGGER.set_level(level);
}

/// Sets the global level from its name.
///
/// # Errors
///
/// Returns a message naming the input when it is not a level name.
pub fn set_level_from_str(s: &str) -> Result<(), String> {
    set_level(Level::from_str(s)?);
    Ok(())
}

/// Applies the level named by `STRATA_LOG`, if it is set and valid.
///
/// Returns the level now in effect. An unparsable value leaves the level
/// unchanged and is reported once at `Warn`.
pub fn init_from_env() -> Level {
    if let Ok(value) = std::env::var(LOG_ENV_VAR) {
        match Level::from_str(&value) {
            Ok(level) => set_level(level),
            Err(msg) => __log_with_target(
                Level::Warn,
                module_path!(),
                format_args!("{LOG_ENV_VAR}: {msg}"),
            ),
        }
    }
    LOGGER.level()
}

#[doc(hidden)]
pub fn __log_with_target(level: Level, target: &str, args: Arguments) {
    const RESET: &str = "\x1b[0m";

    if !LOGGER.enabled(level) {
        return;
    }

    let color = level.color_code();
    let mut stderr = std::io::stderr().lock();
    // A failed write to stderr has nowhere better to go.
    let _ = writeln!(stderr, "{color}[{level}]{RESET} {target}: {args}");
}

/// Logs at an explicit level.
///
/// ```
/// use strata_log::{log, Level};
///
/// log!(level: Level::Info, "bumped {} bytes", 128);
/// ```
#[macro_export]
macro_rules! log {
    (level: $level:expr, $($arg:tt)*) => {{
        let level = $level;
        if $crate::logger().enabled(level) {
            $crate::__log_with_target(level, module_path!(), format_args!($($arg)*));
        }
    }};
}

/// Logs at [`Level::Fatal`]. Does not terminate the process by itself.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Fatal, $($arg)*) };
}

/// Logs at [`Level::Error`].
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Error, $($arg)*) };
}

/// Logs at [`Level::Warn`].
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Warn, $($arg)*) };
}

/// Logs at [`Level::Info`].
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Info, $($arg)*) };
}

/// Logs at [`Level::Debug`].
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Debug, $($arg)*) };
}

/// Logs at [`Level::Trace`].
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Trace, $($arg)*) };
}
