//! Executable memory regions
//!
//! Each region is an anonymous private mapping, readable, writable and
//! executable, rounded up to whole pages. The region is unmapped when its
//! owner drops it, so a compiled function's code lives exactly as long as the
//! handle that can call it.

use core_types::{VmError, VmResult};
use std::ptr::NonNull;
use tracing::{trace, warn};

/// An owned mapping holding machine code.
#[derive(Debug)]
pub struct ExecutableMemory {
    ptr: NonNull<u8>,
    mapped_len: usize,
    code_len: usize,
}

impl ExecutableMemory {
    /// Map a fresh region and copy `code` to its start.
    ///
    /// # Errors
    ///
    /// `JitAllocationFailed` if `code` is empty or the mapping fails.
    pub fn from_code(code: &[u8]) -> VmResult<Self> {
        if code.is_empty() {
            return Err(VmError::jit_allocation_failed(
                "cannot map an empty code region",
            ));
        }
        let mapped_len = round_to_page(code.len());
        let ptr = map_region(mapped_len).map_err(|e| {
            warn!(target: "evm::jit", bytes = mapped_len, "executable mapping failed: {}", e);
            e
        })?;
        // SAFETY: `ptr` is a fresh writable mapping of `mapped_len >= code.len()`
        // bytes that no one else references.
        unsafe {
            std::ptr::copy_nonoverlapping(code.as_ptr(), ptr.as_ptr(), code.len());
        }
        trace!(target: "evm::jit", bytes = mapped_len, "mapped executable region");
        Ok(Self {
            ptr,
            mapped_len,
            code_len: code.len(),
        })
    }

    /// Start of the region, which is also the entry point.
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Bytes of machine code copied in.
    pub fn code_len(&self) -> usize {
        self.code_len
    }

    /// Bytes actually mapped.
    pub fn mapped_len(&self) -> usize {
        self.mapped_len
    }

    /// The machine code.
    pub fn code(&self) -> &[u8] {
        // SAFETY: the first `code_len` bytes were initialised in `from_code`
        // and the mapping lives as long as `self`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.code_len) }
    }
}

impl Drop for ExecutableMemory {
    fn drop(&mut self) {
        if let Err(e) = unmap_region(self.ptr, self.mapped_len) {
            warn!(target: "evm::jit", "{}", e);
        } else {
            trace!(target: "evm::jit", bytes = self.mapped_len, "released executable region");
        }
    }
}

/// System page size.
pub fn page_size() -> usize {
    #[cfg(unix)]
    {
        // SAFETY: sysconf has no preconditions.
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            return size as usize;
        }
    }
    4096
}

fn round_to_page(len: usize) -> usize {
    let page = page_size();
    len.div_ceil(page) * page
}

#[cfg(unix)]
fn map_region(len: usize) -> VmResult<NonNull<u8>> {
    #[cfg(target_os = "macos")]
    let flags = libc::MAP_ANON | libc::MAP_PRIVATE | libc::MAP_JIT;
    #[cfg(not(target_os = "macos"))]
    let flags = libc::MAP_ANON | libc::MAP_PRIVATE;

    // SAFETY: anonymous mapping with no address hint; the result is checked.
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC,
            flags,
            -1,
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        return Err(VmError::jit_allocation_failed(format!(
            "mmap failed: {}",
            std::io::Error::last_os_error()
        )));
    }
    NonNull::new(ptr.cast::<u8>())
        .ok_or_else(|| VmError::jit_allocation_failed("mmap returned null"))
}

#[cfg(unix)]
fn unmap_region(ptr: NonNull<u8>, len: usize) -> VmResult<()> {
    // SAFETY: `ptr`/`len` describe a mapping created by `map_region` that is
    // unmapped exactly once, from `Drop`.
    let rc = unsafe { libc::munmap(ptr.as_ptr().cast(), len) };
    if rc != 0 {
        return Err(VmError::jit_allocation_failed(format!(
            "munmap failed: {}",
            std::io::Error::last_os_error()
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
fn map_region(_len: usize) -> VmResult<NonNull<u8>> {
    Err(VmError::jit_allocation_failed(
        "executable memory is not available on this platform",
    ))
}

#[cfg(not(unix))]
fn unmap_region(_ptr: NonNull<u8>, _len: usize) -> VmResult<()> {
    Ok(())
}
