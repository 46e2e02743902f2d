//! Page cache status for regular files
//!
//! This crate reports how many pages of a file currently reside in the
//! Linux page cache. Two strategies are available:
//!
//! - **mincore**: maps the file and asks `mincore(2)` about every page,
//!   giving a per-page residency bitmap
//! - **cachestat**: a single `cachestat(2)` call (Linux 6.5+) returning
//!   cached, dirty, writeback, evicted and recently evicted counters
//!   without any mapping
//!
//! Both results are reduced into one [`PcStatus`] record.
//!
//! # Architecture
//!
//! - **`sys`**: Raw FFI for `mmap`, `mincore`, `cachestat` (unsafe)
//! - **`types`**: Status record, strategy selector and raw results
//! - **`error`**: Error types and handling
//! - **`mincore`** / **`cachestat`**: The two residency strategies
//! - **`status`**: Builds a status record for a path
//! - **`maps`**: Files mapped by a running process
//! - **`util`**: Page arithmetic and feature detection
//!
//! # Example
//!
//! ```no_run
//! use pcstat_rs::get_pcstatus;
//!
//! let status = get_pcstatus("/var/log/syslog", false)
//!     .expect("Failed to get page cache status");
//!
//! match status.percent_cached() {
//!     Some(percent) => println!("{}: {:.2}% cached", status.name, percent),
//!     None => println!("{}: empty file", status.name),
//! }
//! ```
//!
//! # Consistency
//!
//! Each record is a snapshot. A file that changes size while it is being
//! queried produces a best-effort result.

#![warn(missing_docs)]
#![warn(unsafe_op_in_unsafe_fn)]

pub mod cachestat;
pub mod error;
pub mod maps;
pub mod mincore;
pub mod status;
pub mod sys;
pub mod types;
pub mod util;

// Public API exports
pub use cachestat::file_cachestat;
pub use error::{PcstatError, Result};
pub use maps::{mapped_files, parse_maps};
pub use mincore::file_mincore;
pub use status::get_pcstatus;
pub use types::{CachestatResult, PcStatus, Residency, Strategy};
pub use util::{bytes_to_pages, is_cachestat_available, page_size, percent_of};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
