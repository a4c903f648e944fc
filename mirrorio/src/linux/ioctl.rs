// SPDX-License-Identifier: MIT

//! Raw ioctl plumbing for block devices and file block maps.

use std::fs::File;
use std::os::fd::AsRawFd;

use libc::{c_int, c_ulong};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::*;

const IOC_NONE: u32 = 0;
const IOC_WRITE: u32 = 1;
const IOC_READ: u32 = 2;

const fn ioc(dir: u32, ty: u8, nr: u8, size: usize) -> c_ulong {
    ((dir << 30) | ((size as u32) << 16) | ((ty as u32) << 8) | nr as u32) as c_ulong
}

const BLKSSZGET: c_ulong = ioc(IOC_NONE, 0x12, 104, 0);
const BLKGETSIZE64: c_ulong = ioc(IOC_READ, 0x12, 114, size_of::<usize>());
const FIBMAP: c_ulong = ioc(IOC_NONE, 0x00, 1, 0);
const FIGETBSZ: c_ulong = ioc(IOC_NONE, 0x00, 2, 0);
const FS_IOC_FIEMAP: c_ulong = ioc(IOC_READ | IOC_WRITE, b'f', 11, size_of::<FiemapHeader>());

/// Flush dirty data before mapping so delayed allocations are resolved.
pub const FIEMAP_FLAG_SYNC: u32 = 0x0000_0001;

/// Extent slots carried by one FIEMAP request.
pub const FIEMAP_MAX_EXTENTS: usize = 4096;

/// `struct fiemap` without the trailing flexible array.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Debug, Clone, Copy)]
#[repr(C)]
pub struct FiemapHeader {
    pub fm_start: u64,
    pub fm_length: u64,
    pub fm_flags: u32,
    pub fm_mapped_extents: u32,
    pub fm_extent_count: u32,
    pub fm_reserved: u32,
}

/// `struct fiemap_extent`.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Debug, Clone, Copy)]
#[repr(C)]
pub struct FiemapExtent {
    pub fe_logical: u64,
    pub fe_physical: u64,
    pub fe_length: u64,
    pub fe_reserved64: [u64; 2],
    pub fe_flags: u32,
    pub fe_reserved: [u32; 3],
}

/// Header plus extent array, laid out the way the kernel expects.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct FiemapRequest {
    pub header: FiemapHeader,
    pub extents: [FiemapExtent; FIEMAP_MAX_EXTENTS],
}

const _: () = assert!(size_of::<FiemapHeader>() == 32);
const _: () = assert!(size_of::<FiemapExtent>() == 56);

/// Logical sector size of a block device.
pub fn sector_size(file: &File) -> BlockIOResult<u32> {
    let mut size: c_int = 0;
    // SAFETY: BLKSSZGET writes one int through the pointer.
    let rc = unsafe { libc::ioctl(file.as_raw_fd(), BLKSSZGET as _, &mut size as *mut c_int) };
    if rc < 0 {
        return Err(BlockIOError::last_os("BLKSSZGET"));
    }
    u32::try_from(size).map_err(|_| BlockIOError::Other("BLKSSZGET returned a negative size"))
}

/// Size of a block device in bytes.
pub fn device_bytes(file: &File) -> BlockIOResult<u64> {
    let mut bytes: u64 = 0;
    // SAFETY: BLKGETSIZE64 writes one u64 through the pointer.
    let rc = unsafe { libc::ioctl(file.as_raw_fd(), BLKGETSIZE64 as _, &mut bytes as *mut u64) };
    if rc < 0 {
        return Err(BlockIOError::last_os("BLKGETSIZE64"));
    }
    Ok(bytes)
}

/// Block size of the filesystem holding `file`.
pub fn fs_block_size(file: &File) -> BlockIOResult<u32> {
    let mut size: c_int = 0;
    // SAFETY: FIGETBSZ writes one int through the pointer.
    let rc = unsafe { libc::ioctl(file.as_raw_fd(), FIGETBSZ as _, &mut size as *mut c_int) };
    if rc < 0 {
        return Err(BlockIOError::last_os("FIGETBSZ"));
    }
    u32::try_from(size).map_err(|_| BlockIOError::Other("FIGETBSZ returned a negative size"))
}

/// Physical block behind logical `block` of `file`, 0 if unmapped.
pub fn fibmap(file: &File, block: u32) -> BlockIOResult<u32> {
    let mut inout = c_int::try_from(block).map_err(|_| BlockIOError::OutOfBounds)?;
    // SAFETY: FIBMAP reads and rewrites one int through the pointer.
    let rc = unsafe { libc::ioctl(file.as_raw_fd(), FIBMAP as _, &mut inout as *mut c_int) };
    if rc < 0 {
        return Err(BlockIOError::last_os("FIBMAP"));
    }
    Ok(inout as u32)
}

/// Runs FS_IOC_FIEMAP with the header already filled in.
pub fn fiemap(file: &File, request: &mut FiemapRequest) -> BlockIOResult {
    // SAFETY: the request is a correctly sized `struct fiemap` whose extent
    // array holds `fm_extent_count` slots, checked by the caller.
    let rc = unsafe {
        libc::ioctl(
            file.as_raw_fd(),
            FS_IOC_FIEMAP as _,
            request as *mut FiemapRequest,
        )
    };
    if rc < 0 {
        return Err(BlockIOError::last_os("FS_IOC_FIEMAP"));
    }
    Ok(())
}
