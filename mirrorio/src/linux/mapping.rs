// SPDX-License-Identifier: MIT

use std::fs::File;
use std::os::fd::AsRawFd;
use std::ptr::NonNull;

use crate::errors::*;

/// Read/write `MAP_SHARED` view of the first `len` bytes of a device.
///
/// Stores land on the device through the page cache; `sync` forces them out.
/// The mapping is released on drop.
#[derive(Debug)]
pub struct SharedMapping {
    ptr: NonNull<u8>,
    len: usize,
}

impl SharedMapping {
    pub fn map(file: &File, len: usize) -> BlockIOResult<Self> {
        if len == 0 {
            return Err(BlockIOError::Other("refusing to map an empty region"));
        }
        // SAFETY: fresh mapping at a kernel-chosen address over an open fd.
        let addr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(BlockIOError::last_os("mmap"));
        }
        let ptr = NonNull::new(addr.cast::<u8>()).ok_or(BlockIOError::Other("mmap returned null"))?;
        Ok(Self { ptr, len })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Synchronously writes every dirty page back to the device.
    pub fn sync(&mut self) -> BlockIOResult {
        // SAFETY: ptr/len describe the live mapping created in `map`.
        let rc = unsafe { libc::msync(self.ptr.as_ptr().cast(), self.len, libc::MS_SYNC) };
        if rc < 0 {
            return Err(BlockIOError::last_os("msync"));
        }
        Ok(())
    }
}

impl AsRef<[u8]> for SharedMapping {
    fn as_ref(&self) -> &[u8] {
        // SAFETY: the mapping is readable for `len` bytes while `self` lives.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl AsMut<[u8]> for SharedMapping {
    fn as_mut(&mut self) -> &mut [u8] {
        // SAFETY: writable for `len` bytes and uniquely borrowed through `&mut self`.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for SharedMapping {
    fn drop(&mut self) {
        // SAFETY: unmapping the region created in `map`; no slices outlive `self`.
        unsafe {
            libc::munmap(self.ptr.as_ptr().cast(), self.len);
        }
    }
}
