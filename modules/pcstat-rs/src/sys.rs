//! Low-level FFI bindings for page cache residency queries
//!
//! This module wraps the raw `mmap(2)`, `mincore(2)` and `cachestat(2)`
//! system calls. The higher-level `mincore` and `cachestat` modules build
//! safe strategies on top of it.
//!
//! # Safety
//!
//! The raw calls are unsafe. [`Mapping`] owns its region and unmaps it on
//! drop, so callers never handle the pointer lifetime themselves.

use libc::{c_long, c_uint, c_void};
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::ptr::NonNull;
use std::sync::OnceLock;

/// Syscall number of `cachestat(2)`
///
/// Allocated from the unified syscall table, so it is the same on every
/// Linux architecture.
pub const SYS_CACHESTAT: c_long = 451;

/// Byte range argument of `cachestat(2)`
///
/// Mirrors the kernel's `struct cachestat_range`. A `len` of zero means
/// "to the end of the file".
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachestatRange {
    /// Start offset in bytes
    pub off: u64,
    /// Length in bytes
    pub len: u64,
}

/// Output of `cachestat(2)`
///
/// Mirrors the kernel's `struct cachestat`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cachestat {
    /// Pages in the page cache
    pub nr_cache: u64,
    /// Dirty pages
    pub nr_dirty: u64,
    /// Pages under writeback
    pub nr_writeback: u64,
    /// Evicted pages
    pub nr_evicted: u64,
    /// Recently evicted pages
    pub nr_recently_evicted: u64,
}

static PAGE_SIZE: OnceLock<u64> = OnceLock::new();

/// Read the OS page size
///
/// Queried with `sysconf(_SC_PAGESIZE)` on first success and cached for the
/// rest of the process.
pub fn page_size() -> io::Result<u64> {
    if let Some(&size) = PAGE_SIZE.get() {
        return Ok(size);
    }
    let ret = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if ret <= 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(*PAGE_SIZE.get_or_init(|| ret as u64))
}

/// Issue `cachestat(2)` on a raw file descriptor
///
/// # Safety
/// `fd` must be a file descriptor owned by the caller for the duration of
/// the call (an invalid descriptor is reported as `EBADF`, not UB).
pub unsafe fn cachestat(fd: RawFd, range: &CachestatRange, flags: c_uint) -> io::Result<Cachestat> {
    let mut cstat = Cachestat::default();
    let ret = unsafe {
        libc::syscall(
            SYS_CACHESTAT,
            fd,
            range as *const CachestatRange,
            &mut cstat as *mut Cachestat,
            flags,
        )
    };
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(cstat)
    }
}

/// Read-only shared mapping of a file region
///
/// The region is unmapped when the value is dropped, on success and error
/// paths alike.
#[derive(Debug)]
pub struct Mapping {
    ptr: NonNull<c_void>,
    len: usize,
}

impl Mapping {
    /// Map `len` bytes of `file` starting at offset 0 with `PROT_READ`
    /// and `MAP_SHARED`
    ///
    /// `len` must be non-zero; mapping an empty region fails with `EINVAL`.
    pub fn map_file<F: AsRawFd>(file: &F, len: usize) -> io::Result<Self> {
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        let ptr = NonNull::new(ptr).ok_or_else(|| io::Error::from_raw_os_error(libc::EFAULT))?;
        log::trace!("mapped {len} bytes at {ptr:p}");
        Ok(Self { ptr, len })
    }

    /// Query residency of every page in the mapping with `mincore(2)`
    ///
    /// Returns one byte per page of the mapping; bit 0 is set when that
    /// page is resident.
    pub fn mincore(&self) -> io::Result<Vec<u8>> {
        let page = usize::try_from(page_size()?)
            .map_err(|_| io::Error::from_raw_os_error(libc::EOVERFLOW))?;
        // mincore writes exactly this many bytes
        let mut vec = vec![0u8; self.len.div_ceil(page)];
        let ret = unsafe {
            libc::mincore(
                self.ptr.as_ptr(),
                self.len,
                vec.as_mut_ptr() as *mut libc::c_uchar,
            )
        };
        if ret != 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(vec)
        }
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        let ret = unsafe { libc::munmap(self.ptr.as_ptr(), self.len) };
        if ret != 0 {
            log::warn!(
                "munmap of {} bytes at {:p} failed: {}",
                self.len,
                self.ptr,
                io::Error::last_os_error()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_struct_layout() {
        assert_eq!(std::mem::size_of::<CachestatRange>(), 16);
        assert_eq!(std::mem::size_of::<Cachestat>(), 40);
    }

    #[test]
    fn test_page_size() {
        let size = page_size().unwrap();
        assert!(size.is_power_of_two());
        assert!(size >= 4096);
        assert_eq!(page_size().unwrap(), size);
    }

    #[test]
    fn test_map_empty_region_fails() {
        let file = tempfile::tempfile().unwrap();
        assert!(Mapping::map_file(&file, 0).is_err());
    }

    #[test]
    fn test_map_and_mincore() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(&[0xabu8; 100]).unwrap();
        file.flush().unwrap();

        let mapping = Mapping::map_file(&file, 100).unwrap();
        assert_eq!(mapping.mincore().unwrap().len(), 1);
    }

    #[test]
    fn test_mincore_vector_covers_every_page() {
        let page = page_size().unwrap() as usize;
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(&vec![0xaau8; page * 8]).unwrap();
        file.flush().unwrap();

        let mapping = Mapping::map_file(&file, page * 8).unwrap();
        let vec = mapping.mincore().unwrap();
        assert_eq!(vec.len(), 8);

        // A partial trailing page still gets its own byte
        let mapping = Mapping::map_file(&file, page * 7 + 1).unwrap();
        assert_eq!(mapping.mincore().unwrap().len(), 8);
    }
}
