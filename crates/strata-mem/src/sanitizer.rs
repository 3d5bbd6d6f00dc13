//! AddressSanitizer region hooks.
//!
//! With the `asan` feature these forward to the sanitizer runtime so that
//! reclaimed arena ranges and freed pool slots fault on access. Without it
//! they compile to nothing.

#[cfg(feature = "asan")]
unsafe extern "C" {
    fn __asan_poison_memory_region(addr: *const u8, size: usize);
    fn __asan_unpoison_memory_region(addr: *const u8, size: usize);
}

/// Marks `[addr, addr + size)` inaccessible.
///
/// The sanitizer may poison only a sub-range because of its 8-byte
/// granularity.
#[cfg(feature = "asan")]
#[inline(always)]
pub fn poison(addr: *const u8, size: usize) {
    if size != 0 {
        // SAFETY: the runtime only updates shadow memory for the range; callers
        // pass ranges inside regions they own.
        unsafe { __asan_poison_memory_region(addr, size) }
    }
}

/// Marks `[addr, addr + size)` accessible again.
#[cfg(feature = "asan")]
#[inline(always)]
pub fn unpoison(addr: *const u8, size: usize) {
    if size != 0 {
        // SAFETY: see `poison`.
        unsafe { __asan_unpoison_memory_region(addr, size) }
    }
}

/// Marks `[addr, addr + size)` inaccessible. No-op without `asan`.
#[cfg(not(feature = "asan"))]
#[inline(always)]
pub fn poison(_addr: *const u8, _size: usize) {}

/// Marks `[addr, addr + size)` accessible again. No-op without `asan`.
#[cfg(not(feature = "asan"))]
#[inline(always)]
pub fn unpoison(_addr: *const u8, _size: usize) {}

/// Whether the sanitizer hooks are compiled in.
#[must_use]
pub const fn is_active() -> bool {
    cfg!(feature = "asan")
}

/// Raises `align` to the sanitizer granularity when the hooks are active.
#[inline(always)]
pub(crate) const fn effective_alignment(align: usize) -> usize {
    if is_active() && align < crate::config::ASAN_MIN_ALIGNMENT {
        crate::config::ASAN_MIN_ALIGNMENT
    } else {
        align
    }
}
