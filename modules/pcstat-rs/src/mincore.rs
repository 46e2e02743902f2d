//! Per-page residency via `mmap(2)` + `mincore(2)`
//!
//! The file is mapped read-only and shared, `mincore` reports one byte per
//! page, and bit 0 of each byte tells whether that page is in the page
//! cache. Mapping a file does not fault its pages in, so the query does not
//! disturb what it measures.

use std::fs::File;

use crate::error::{PcstatError, Result};
use crate::sys::Mapping;
use crate::types::Strategy;

/// Get the per-page residency of the first `size` bytes of `file`
///
/// Returns one entry per page in file order, `true` when the page is
/// resident. An empty file yields an empty vector without mapping anything.
///
/// # Errors
/// - [`PcstatError::MapFailed`] if the file cannot be mapped
/// - [`PcstatError::QueryFailed`] if `mincore(2)` fails
pub fn file_mincore(file: &File, size: u64) -> Result<Vec<bool>> {
    if size == 0 {
        return Ok(Vec::new());
    }

    let len = usize::try_from(size)
        .map_err(|_| PcstatError::MapFailed(std::io::Error::from_raw_os_error(libc::EOVERFLOW)))?;

    // Unmapped on drop, including when mincore fails below
    let mapping = Mapping::map_file(file, len).map_err(PcstatError::MapFailed)?;

    let vec = mapping
        .mincore()
        .map_err(|source| PcstatError::QueryFailed {
            strategy: Strategy::Mincore,
            source,
        })?;

    Ok(vec.iter().map(|&byte| byte & 0x1 != 0).collect())
}
