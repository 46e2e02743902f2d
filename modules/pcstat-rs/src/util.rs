//! Utility functions for page arithmetic and feature probing

use crate::error::{PcstatError, Result};
use crate::sys;

/// Get the OS page size in bytes
///
/// Read once per process with `sysconf(_SC_PAGESIZE)`. There is no
/// fallback value, since a wrong guess would skew every page count.
///
/// # Errors
/// Returns [`PcstatError::PageSize`] if `sysconf` fails.
pub fn page_size() -> Result<u64> {
    sys::page_size().map_err(PcstatError::PageSize)
}

/// Convert bytes to page count, rounding up
#[inline]
pub const fn bytes_to_pages(bytes: u64, page_size: u64) -> u64 {
    bytes.div_ceil(page_size)
}

/// Percentage of `cached` out of `pages`
///
/// Returns NaN when `pages` is zero; callers decide how to show it.
pub fn percent_of(cached: u64, pages: u64) -> f64 {
    if pages == 0 {
        return f64::NAN;
    }
    (cached as f64 / pages as f64) * 100.0
}

/// Check if the running kernel implements `cachestat(2)` (Linux 6.5+)
///
/// Probes with an invalid descriptor. A kernel that implements the
/// syscall rejects the descriptor with `EBADF`; `ENOSYS` (old kernel) or
/// `EPERM` (seccomp filter) mean it cannot be used.
pub fn is_cachestat_available() -> bool {
    let range = sys::CachestatRange::default();
    match unsafe { sys::cachestat(-1, &range, 0) } {
        Ok(_) => true,
        Err(err) => err.raw_os_error() == Some(libc::EBADF),
    }
}
