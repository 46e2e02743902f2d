//! Integration tests for pcstat-rs

use std::io::Write;
use std::os::fd::AsRawFd;

use pcstat_rs::{
    PcStatus, PcstatError, Strategy, get_pcstatus, is_cachestat_available, page_size,
};
use tempfile::NamedTempFile;

fn file_with_len(len: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&vec![0x5au8; len]).unwrap();
    file.flush().unwrap();
    file
}

fn path_of(file: &NamedTempFile) -> &str {
    file.path().to_str().unwrap()
}

fn assert_counts_consistent(status: &PcStatus) {
    assert_eq!(status.cached + status.uncached, status.pages);
    assert_eq!(status.pages, status.size.div_ceil(page_size().unwrap()));
}

#[test]
fn test_empty_file_mincore() {
    let file = file_with_len(0);
    let status = get_pcstatus(path_of(&file), false).unwrap();

    assert_eq!(status.size, 0);
    assert_eq!(status.pages, 0);
    assert_eq!(status.cached, 0);
    assert_eq!(status.uncached, 0);
    assert!(status.percent.is_nan());
    assert_eq!(status.percent_cached(), None);
    assert_eq!(status.per_page, None);
    assert_eq!(status.dirty, None);
}

#[test]
fn test_empty_file_cachestat_skips_query() {
    // Succeeds even where cachestat(2) is missing: no syscall is issued
    let file = file_with_len(0);
    let status = get_pcstatus(path_of(&file), true).unwrap();

    assert_eq!(status.pages, 0);
    assert_eq!(status.cached, 0);
    assert_eq!(status.dirty, None);
    assert_eq!(status.writeback, None);
    assert_eq!(status.evicted, None);
    assert_eq!(status.recently_evicted, None);
}

#[test]
fn test_one_page_resident_mincore() {
    let file = file_with_len(page_size().unwrap() as usize);
    let status = get_pcstatus(path_of(&file), false).unwrap();

    assert_eq!(status.name, path_of(&file));
    assert_eq!(status.pages, 1);
    assert_eq!(status.per_page, Some(vec![true]));
    assert_eq!(status.cached, 1);
    assert_eq!(status.uncached, 0);
    assert_eq!(status.percent, 100.0);
    assert!(status.is_fully_cached());
}

/// Flush a file and ask the kernel to drop its pages from the page cache
///
/// Returns false when the pages stay resident anyway (tmpfs keeps them).
fn evict(file: &NamedTempFile) -> bool {
    file.as_file().sync_all().unwrap();
    let ret = unsafe {
        libc::posix_fadvise(file.as_file().as_raw_fd(), 0, 0, libc::POSIX_FADV_DONTNEED)
    };
    assert_eq!(ret, 0);
    get_pcstatus(path_of(file), false).unwrap().cached == 0
}

#[test]
fn test_one_page_not_resident() {
    // Prefer the target dir: /tmp is often tmpfs, which ignores DONTNEED
    let mut file = NamedTempFile::new_in(env!("CARGO_TARGET_TMPDIR")).unwrap();
    file.write_all(&vec![0x5au8; page_size().unwrap() as usize]).unwrap();
    if !evict(&file) {
        println!("page cache eviction not honoured here, skipping");
        return;
    }

    let status = get_pcstatus(path_of(&file), false).unwrap();
    assert_eq!(status.pages, 1);
    assert_eq!(status.cached, 0);
    assert_eq!(status.uncached, 1);
    assert_eq!(status.percent, 0.0);
    assert_eq!(status.per_page, Some(vec![false]));

    if !is_cachestat_available() {
        return;
    }
    let status = get_pcstatus(path_of(&file), true).unwrap();
    assert_eq!(status.pages, 1);
    assert_eq!(status.cached, 0);
    assert_eq!(status.percent, 0.0);
    assert!(status.dirty.is_some());
    assert_eq!(status.per_page, None);
}

#[test]
fn test_page_count_rounds_up() {
    let page = page_size().unwrap() as usize;
    for len in [1, page - 1, page, page + 1, 2 * page, 3 * page + 7] {
        let file = file_with_len(len);
        let status = get_pcstatus(path_of(&file), false).unwrap();

        assert_eq!(status.size, len as u64);
        assert_counts_consistent(&status);
        let bits = status.per_page.as_ref().unwrap();
        assert_eq!(bits.len() as u64, status.pages);
        assert_eq!(bits.iter().filter(|&&b| b).count() as u64, status.cached);
    }
}

#[test]
fn test_cachestat_counters_present() {
    if !is_cachestat_available() {
        println!("cachestat not available, skipping");
        return;
    }

    let page = page_size().unwrap() as usize;
    let file = file_with_len(page * 3 + 1);
    let status = get_pcstatus(path_of(&file), true).unwrap();

    assert_eq!(status.pages, 4);
    assert_counts_consistent(&status);
    assert!(status.dirty.is_some());
    assert!(status.writeback.is_some());
    assert!(status.evicted.is_some());
    assert!(status.recently_evicted.is_some());
    assert_eq!(status.per_page, None);
    assert_eq!(status.strategy(), Some(Strategy::Cachestat));
}

#[test]
fn test_cachestat_failure_is_not_downgraded() {
    if is_cachestat_available() {
        return;
    }

    let file = file_with_len(10);
    let err = get_pcstatus(path_of(&file), true).unwrap_err();
    assert!(matches!(
        err,
        PcstatError::QueryFailed {
            strategy: Strategy::Cachestat,
            ..
        }
    ));
}

#[test]
fn test_directory_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_str().unwrap();

    for use_cachestat in [false, true] {
        let err = get_pcstatus(path, use_cachestat).unwrap_err();
        assert!(matches!(err, PcstatError::NotRegularFile { is_dir: true, .. }));
        assert!(err.to_string().contains("file is a directory"));
    }
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist");

    let err = get_pcstatus(path.to_str().unwrap(), false).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_name_is_not_canonicalized() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("data"), b"hello").unwrap();
    let name = format!("{}/./data", dir.path().display());

    let status = PcStatus::query(&name, Strategy::Mincore).unwrap();
    assert_eq!(status.name, name);
}

#[test]
fn test_mtime_and_timestamp() {
    let file = file_with_len(100);
    let status = get_pcstatus(path_of(&file), false).unwrap();
    assert!(status.mtime <= status.timestamp);
}

#[test]
fn test_json_fields_mincore() {
    let file = file_with_len(100);
    let status = get_pcstatus(path_of(&file), false).unwrap();

    let value = serde_json::to_value(&status).unwrap();
    let obj = value.as_object().unwrap();
    for key in [
        "filename", "size", "timestamp", "mtime", "pages", "cached", "uncached", "percent",
        "status",
    ] {
        assert!(obj.contains_key(key), "missing {key}");
    }
    for key in ["dirty", "writeback", "evicted", "recently_evicted"] {
        assert!(!obj.contains_key(key), "unexpected {key}");
    }
}

#[test]
fn test_json_fields_cachestat() {
    if !is_cachestat_available() {
        return;
    }

    let file = file_with_len(100);
    let status = get_pcstatus(path_of(&file), true).unwrap();

    let value = serde_json::to_value(&status).unwrap();
    let obj = value.as_object().unwrap();
    assert!(!obj.contains_key("status"));
    assert!(obj.contains_key("dirty"));
    assert!(obj.contains_key("recently_evicted"));
}

#[test]
fn test_json_empty_file_percent_is_null() {
    let file = file_with_len(0);
    let status = get_pcstatus(path_of(&file), false).unwrap();

    let json = serde_json::to_string(&status).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value["percent"].is_null());

    let back: PcStatus = serde_json::from_str(&json).unwrap();
    assert!(back.percent.is_nan());
    assert_eq!(back.pages, 0);
}

#[test]
fn test_concurrent_queries() {
    let files: Vec<_> = (1..=4).map(|n| file_with_len(n * 5000)).collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = files
            .iter()
            .map(|file| scope.spawn(move || get_pcstatus(path_of(file), false)))
            .collect();
        for handle in handles {
            let status = handle.join().unwrap().unwrap();
            assert_counts_consistent(&status);
        }
    });
}
