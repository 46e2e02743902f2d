//! Discovery of files mapped by a process
//!
//! Reads `/proc/[pid]/maps` and returns the backing files of its mappings,
//! so their page cache status can be queried.

use std::collections::HashSet;

use crate::error::{PcstatError, Result};

/// Procfs path of a process's memory map
pub fn maps_path(pid: u32) -> String {
    format!("/proc/{}/maps", pid)
}

/// List the files mapped by process `pid`
///
/// Paths are unique and in first-seen order.
///
/// # Errors
/// Returns [`PcstatError::Procfs`] if the maps file cannot be read (no such
/// process, or permission denied).
pub fn mapped_files(pid: u32) -> Result<Vec<String>> {
    let path = maps_path(pid);
    let content =
        std::fs::read_to_string(&path).map_err(|source| PcstatError::Procfs { path, source })?;
    let files = parse_maps(&content);
    log::debug!("process {pid} maps {} files", files.len());
    Ok(files)
}

/// Extract backing file paths from the contents of a maps file
///
/// Each line is `address perms offset dev inode [pathname]`. Anonymous
/// mappings, pseudo paths such as `[heap]` and files marked `(deleted)`
/// are skipped.
pub fn parse_maps(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for line in content.lines() {
        // The pathname may contain spaces, so split off the five fixed fields
        let Some(pathname) = line.splitn(6, char::is_whitespace).nth(5) else {
            continue;
        };
        let pathname = pathname.trim_start();
        if !pathname.starts_with('/') || pathname.ends_with(" (deleted)") {
            continue;
        }
        if seen.insert(pathname) {
            files.push(pathname.to_string());
        }
    }

    files
}
