//! Page cache status of a file
//!
//! [`get_pcstatus`] opens the file, validates it, computes the page count
//! and runs the selected strategy. The raw [`Residency`] it gets back is
//! reduced into a [`PcStatus`] record by a single reducer, whichever
//! strategy produced it.
//!
//! The file may change size between the stat and the residency query. No
//! re-stat or retry is attempted; the record is a best-effort snapshot.

use std::fs::File;

use chrono::{DateTime, Local};

use crate::cachestat::file_cachestat;
use crate::error::{PcstatError, Result};
use crate::mincore::file_mincore;
use crate::types::{PcStatus, Residency, Strategy};
use crate::util::{bytes_to_pages, page_size, percent_of};

/// Get the page cache status of `name`
///
/// `use_cachestat` selects the aggregate `cachestat(2)` strategy; otherwise
/// the per-page `mincore(2)` strategy is used.
///
/// # Errors
/// - [`PcstatError::NotFound`] / [`PcstatError::Open`] if the file cannot be opened
/// - [`PcstatError::Stat`] if its metadata cannot be read
/// - [`PcstatError::NotRegularFile`] for directories and other non-regular files
/// - [`PcstatError::PageSize`] if the OS page size cannot be read
/// - [`PcstatError::MapFailed`] / [`PcstatError::QueryFailed`] from the strategy
///
/// # Example
/// ```no_run
/// let status = pcstat_rs::get_pcstatus("/etc/hostname", false)?;
/// println!("{} pages, {} cached", status.pages, status.cached);
/// # Ok::<(), pcstat_rs::PcstatError>(())
/// ```
pub fn get_pcstatus(name: &str, use_cachestat: bool) -> Result<PcStatus> {
    PcStatus::query(name, Strategy::from(use_cachestat))
}

impl PcStatus {
    /// Query the page cache status of `name` using `strategy`
    ///
    /// See [`get_pcstatus`].
    pub fn query(name: &str, strategy: Strategy) -> Result<Self> {
        // Closed on drop, on every return path below
        let file = File::open(name).map_err(|err| PcstatError::from_open(name, err))?;

        let stat_err = |source: std::io::Error| PcstatError::Stat {
            path: name.to_string(),
            source,
        };
        let metadata = file.metadata().map_err(stat_err)?;
        if !metadata.is_file() {
            return Err(PcstatError::NotRegularFile {
                path: name.to_string(),
                is_dir: metadata.is_dir(),
            });
        }
        let mtime = metadata.modified().map_err(stat_err)?;

        let size = metadata.len();
        let timestamp = Local::now();
        let mtime = DateTime::from(mtime);

        if size == 0 {
            log::debug!("{name}: empty file, skipping {strategy} query");
            return Ok(Self::reduce(name, size, timestamp, mtime, 0, None));
        }

        let pages = bytes_to_pages(size, page_size()?);
        log::debug!("{name}: {size} bytes, {pages} pages, querying with {strategy}");

        let residency = match strategy {
            Strategy::Mincore => Residency::Bitmap(file_mincore(&file, size)?),
            Strategy::Cachestat => Residency::Aggregate(file_cachestat(&file, size)?),
        };
        let status = Self::reduce(name, size, timestamp, mtime, pages, Some(residency));

        log::debug!(
            "{name}: {}/{} pages cached ({:.2}%)",
            status.cached,
            status.pages,
            status.percent
        );
        Ok(status)
    }

    /// Build a record from the page count and a strategy result
    ///
    /// `pages` is computed from the size; `None` means no query was issued
    /// (empty file). The bitmap has one entry per page by construction and
    /// the cachestat counters never touch `pages`.
    pub(crate) fn reduce(
        name: &str,
        size: u64,
        timestamp: DateTime<Local>,
        mtime: DateTime<Local>,
        pages: u64,
        residency: Option<Residency>,
    ) -> Self {
        let mut status = Self {
            name: name.to_string(),
            size,
            timestamp,
            mtime,
            pages,
            cached: 0,
            uncached: pages,
            percent: percent_of(0, pages),
            per_page: None,
            dirty: None,
            writeback: None,
            evicted: None,
            recently_evicted: None,
        };
        let Some(residency) = residency else {
            return status;
        };

        let mut cached = residency.cached_pages();
        if cached > pages {
            // File grew between stat and query
            log::warn!(
                "{name}: {} reported {cached} cached pages for a {pages}-page file, clamping",
                residency.strategy()
            );
            cached = pages;
        }

        match residency {
            Residency::Bitmap(bits) => {
                debug_assert_eq!(bits.len() as u64, pages, "one bitmap entry per page");
                status.per_page = Some(bits);
            }
            Residency::Aggregate(cstat) => {
                debug_assert_eq!(cstat.pages, pages, "cachestat page count from the same size");
                status.dirty = Some(cstat.dirty);
                status.writeback = Some(cstat.writeback);
                status.evicted = Some(cstat.evicted);
                status.recently_evicted = Some(cstat.recently_evicted);
            }
        }

        status.cached = cached;
        status.uncached = pages - cached;
        status.percent = percent_of(cached, pages);
        status
    }
}
