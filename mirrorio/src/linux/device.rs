// SPDX-License-Identifier: MIT

use std::fs::File;
use std::os::unix::fs::{FileTypeExt, MetadataExt};

use super::ioctl;
use crate::errors::*;

/// Sector size assumed for image files.
pub const IMAGE_SECTOR_SIZE: u32 = 512;
pub const MIN_SECTOR_SIZE: u32 = 512;
pub const MAX_SECTOR_SIZE: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    BlockDevice,
    RegularFile,
}

/// Geometry of an opened target device or image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub kind: DeviceKind,
    pub sector_size: u32,
    pub total_sectors: u32,
    /// Device number for block devices, 0 for images.
    pub rdev: u64,
}

impl DeviceInfo {
    /// Characterizes `file`, rejecting anything the overlay cannot address.
    pub fn probe(file: &File) -> BlockIOResult<Self> {
        let meta = file.metadata().map_err(|e| BlockIOError::io("fstat", e))?;
        let file_type = meta.file_type();

        let (kind, sector_size, bytes, rdev) = if file_type.is_block_device() {
            let sector_size = ioctl::sector_size(file)?;
            let bytes = ioctl::device_bytes(file)?;
            (DeviceKind::BlockDevice, sector_size, bytes, meta.rdev())
        } else if file_type.is_file() {
            (DeviceKind::RegularFile, IMAGE_SECTOR_SIZE, meta.len(), 0)
        } else {
            return Err(BlockIOError::Other(
                "target is neither a block device nor a regular file",
            ));
        };

        check_sector_size(sector_size)?;
        let total_sectors = sectors_in(bytes, sector_size)?;
        Ok(Self {
            kind,
            sector_size,
            total_sectors,
            rdev,
        })
    }

    #[inline]
    pub fn bytes(&self) -> u64 {
        self.total_sectors as u64 * self.sector_size as u64
    }
}

/// Accepts power-of-two sector sizes in 512..=4096.
pub fn check_sector_size(sector_size: u32) -> BlockIOResult {
    if !(MIN_SECTOR_SIZE..=MAX_SECTOR_SIZE).contains(&sector_size) || !sector_size.is_power_of_two()
    {
        return Err(BlockIOError::SectorSize(sector_size));
    }
    Ok(())
}

/// Whole sectors in `bytes`; the count must be nonzero and fit a 32-bit LBA.
pub fn sectors_in(bytes: u64, sector_size: u32) -> BlockIOResult<u32> {
    let sector_size = sector_size as u64;
    if bytes == 0 {
        return Err(BlockIOError::Other("zero-capacity device"));
    }
    if bytes % sector_size != 0 {
        return Err(BlockIOError::Other(
            "device size is not a multiple of the sector size",
        ));
    }
    let sectors = bytes / sector_size;
    if sectors >= u32::MAX as u64 {
        return Err(BlockIOError::Other("rejecting oversized device"));
    }
    Ok(sectors as u32)
}

/// Block size of the filesystem `file` lives on.
pub fn fs_block_size(file: &File) -> BlockIOResult<u32> {
    ioctl::fs_block_size(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sector_size_bounds() {
        for ok in [512, 1024, 2048, 4096] {
            assert!(check_sector_size(ok).is_ok());
        }
        for bad in [0, 256, 768, 8192] {
            assert!(matches!(
                check_sector_size(bad),
                Err(BlockIOError::SectorSize(s)) if s == bad
            ));
        }
    }

    #[test]
    fn sector_counts() {
        assert_eq!(sectors_in(1 << 20, 512).unwrap(), 2048);
        assert!(sectors_in(0, 512).is_err());
        assert!(sectors_in(1000, 512).is_err());
        assert!(sectors_in(u32::MAX as u64 * 512, 512).is_err());
    }

    #[test]
    fn probe_image_file() {
        let file = tempfile::tempfile().unwrap();
        file.set_len(4 << 20).unwrap();
        let info = DeviceInfo::probe(&file).unwrap();
        assert_eq!(info.kind, DeviceKind::RegularFile);
        assert_eq!(info.sector_size, 512);
        assert_eq!(info.total_sectors, 8192);
        assert_eq!(info.bytes(), 4 << 20);
    }

    #[test]
    fn probe_rejects_empty_and_ragged_images() {
        let file = tempfile::tempfile().unwrap();
        assert!(DeviceInfo::probe(&file).is_err());
        file.set_len(513).unwrap();
        assert!(DeviceInfo::probe(&file).is_err());
    }
}
