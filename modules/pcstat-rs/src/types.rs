//! Type definitions for page cache status
//!
//! This module contains the status record returned to callers, the
//! strategy selector, and the raw per-strategy results that the status
//! builder reduces into a record.

use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Residency measurement strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Map the file and query each page with `mincore(2)`
    #[default]
    Mincore,
    /// Ask the kernel for aggregate counters with `cachestat(2)`
    Cachestat,
}

impl Strategy {
    /// Name of the syscall backing this strategy
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mincore => "mincore",
            Self::Cachestat => "cachestat",
        }
    }
}

impl From<bool> for Strategy {
    /// `true` selects [`Strategy::Cachestat`]
    fn from(use_cachestat: bool) -> Self {
        if use_cachestat {
            Self::Cachestat
        } else {
            Self::Mincore
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Aggregate counters from `cachestat(2)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachestatResult {
    /// Pages spanned by the queried range, computed from its size
    pub pages: u64,
    /// Pages in the page cache
    pub cache: u64,
    /// Dirty pages
    pub dirty: u64,
    /// Pages under writeback
    pub writeback: u64,
    /// Evicted pages
    pub evicted: u64,
    /// Recently evicted pages
    pub recently_evicted: u64,
}

/// Raw residency data produced by one of the strategies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Residency {
    /// One entry per page, `true` when resident
    Bitmap(Vec<bool>),
    /// Summary counters over the whole file
    Aggregate(CachestatResult),
}

impl Residency {
    /// Strategy that produced this result
    pub const fn strategy(&self) -> Strategy {
        match self {
            Self::Bitmap(_) => Strategy::Mincore,
            Self::Aggregate(_) => Strategy::Cachestat,
        }
    }

    /// Number of resident pages reported
    pub fn cached_pages(&self) -> u64 {
        match self {
            Self::Bitmap(bits) => bits.iter().filter(|&&b| b).count() as u64,
            Self::Aggregate(cstat) => cstat.cache,
        }
    }
}

/// Page cache status of a single file
///
/// Produced once per query and never mutated afterwards. Field names in
/// JSON follow the `pcstat` output format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcStatus {
    /// File name as given by the caller
    #[serde(rename = "filename")]
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Time right before the residency query
    pub timestamp: DateTime<Local>,
    /// Last modification time of the file
    pub mtime: DateTime<Local>,
    /// Total memory pages spanned by the file
    pub pages: u64,
    /// Pages that are cached
    pub cached: u64,
    /// Pages that are not cached
    pub uncached: u64,
    /// Percentage of pages cached, NaN for an empty file (`null` in JSON)
    #[serde(deserialize_with = "nan_from_null")]
    pub percent: f64,
    /// Per-page status, only filled by the mincore strategy
    #[serde(rename = "status", default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<Vec<bool>>,
    /// Dirty pages, only filled by the cachestat strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dirty: Option<u64>,
    /// Pages under writeback, only filled by the cachestat strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writeback: Option<u64>,
    /// Evicted pages, only filled by the cachestat strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evicted: Option<u64>,
    /// Recently evicted pages, only filled by the cachestat strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recently_evicted: Option<u64>,
}

impl PcStatus {
    /// Percentage of pages cached, `None` when the file spans no pages
    pub fn percent_cached(&self) -> Option<f64> {
        if self.pages == 0 {
            None
        } else {
            Some(self.percent)
        }
    }

    /// Whether every page of the file is resident
    pub fn is_fully_cached(&self) -> bool {
        self.pages > 0 && self.cached == self.pages
    }

    /// Strategy that filled this record, if a query was issued
    pub fn strategy(&self) -> Option<Strategy> {
        if self.per_page.is_some() {
            Some(Strategy::Mincore)
        } else if self.dirty.is_some() {
            Some(Strategy::Cachestat)
        } else {
            None
        }
    }
}

// serde_json writes NaN as null
fn nan_from_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}
