//! Aggregate residency via `cachestat(2)`
//!
//! One syscall over the file's byte range returns counts of cached, dirty,
//! writeback, evicted and recently evicted pages. No mapping is needed.
//! Requires Linux 6.5 or newer.

use std::fs::File;
use std::os::fd::AsRawFd;

use crate::error::{PcstatError, Result};
use crate::sys::{self, CachestatRange};
use crate::types::{CachestatResult, Strategy};
use crate::util::{bytes_to_pages, page_size};

/// Get aggregate page cache counters for the first `size` bytes of `file`
///
/// An empty file yields a zeroed result without calling the kernel.
///
/// # Errors
/// Returns [`PcstatError::QueryFailed`] if the syscall fails, for example
/// with `ENOSYS` on older kernels. The failure is never turned into a
/// mincore query. [`PcstatError::PageSize`] if the page size is unknown.
pub fn file_cachestat(file: &File, size: u64) -> Result<CachestatResult> {
    if size == 0 {
        return Ok(CachestatResult::default());
    }

    let pages = bytes_to_pages(size, page_size()?);
    let range = CachestatRange { off: 0, len: size };

    let cstat = unsafe { sys::cachestat(file.as_raw_fd(), &range, 0) }.map_err(|source| {
        PcstatError::QueryFailed {
            strategy: Strategy::Cachestat,
            source,
        }
    })?;
    log::trace!("cachestat over {size} bytes: {cstat:?}");

    Ok(CachestatResult {
        pages,
        cache: cstat.nr_cache,
        dirty: cstat.nr_dirty,
        writeback: cstat.nr_writeback,
        evicted: cstat.nr_evicted,
        recently_evicted: cstat.nr_recently_evicted,
    })
}
