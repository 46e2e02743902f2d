//! Error types for page cache status queries

use std::io;

use thiserror::Error;

use crate::types::Strategy;

/// Result type alias for pcstat operations
pub type Result<T> = std::result::Result<T, PcstatError>;

/// Errors that can occur while computing page cache status
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PcstatError {
    /// The path does not exist
    #[error("could not open file for read: {path}: {source}")]
    NotFound {
        /// Path as given by the caller
        path: String,
        /// Underlying open error
        #[source]
        source: io::Error,
    },

    /// The path exists but could not be opened (e.g. permission denied)
    #[error("could not open file for read: {path}: {source}")]
    Open {
        /// Path as given by the caller
        path: String,
        /// Underlying open error
        #[source]
        source: io::Error,
    },

    /// Metadata retrieval failed after a successful open
    #[error("could not stat file: {path}: {source}")]
    Stat {
        /// Path as given by the caller
        path: String,
        /// Underlying stat error
        #[source]
        source: io::Error,
    },

    /// Target is a directory or another non-regular file type
    #[error("{path}: {}", file_kind(.is_dir))]
    NotRegularFile {
        /// Path as given by the caller
        path: String,
        /// Whether the target is a directory
        is_dir: bool,
    },

    /// The OS page size could not be determined
    #[error("could not read page size: {0}")]
    PageSize(#[source] io::Error),

    /// The file could not be mapped into the address space
    #[error("could not mmap file: {0}")]
    MapFailed(#[source] io::Error),

    /// The residency query failed at the kernel boundary
    #[error("{strategy} syscall failed: {source}")]
    QueryFailed {
        /// Strategy whose query failed
        strategy: Strategy,
        /// Underlying syscall error
        #[source]
        source: io::Error,
    },

    /// Reading a procfs file failed
    #[error("could not read {path}: {source}")]
    Procfs {
        /// Procfs path that was read
        path: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

fn file_kind(is_dir: &bool) -> &'static str {
    if *is_dir {
        "file is a directory"
    } else {
        "not a regular file"
    }
}

impl PcstatError {
    /// Classify a failed `open` of `path`
    pub fn from_open(path: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => PcstatError::NotFound {
                path: path.to_string(),
                source: err,
            },
            _ => PcstatError::Open {
                path: path.to_string(),
                source: err,
            },
        }
    }

    /// Check whether the error came from a missing path
    pub fn is_not_found(&self) -> bool {
        matches!(self, PcstatError::NotFound { .. })
    }

    /// Check whether the error means the kernel lacks the requested mechanism
    ///
    /// `cachestat(2)` returns `ENOSYS` on kernels older than 6.5.
    pub fn is_unsupported(&self) -> bool {
        match self {
            PcstatError::QueryFailed { source, .. } => matches!(
                source.raw_os_error(),
                Some(libc::ENOSYS) | Some(libc::EOPNOTSUPP)
            ),
            _ => false,
        }
    }
}
