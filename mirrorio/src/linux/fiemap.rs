// SPDX-License-Identifier: MIT

use std::fs::File;

use zerocopy::FromZeros;

use super::ioctl::{self, FIEMAP_FLAG_SYNC, FIEMAP_MAX_EXTENTS, FiemapRequest};
use crate::blockmap::{BlockMapper, ExtentFlags, RawExtent};
use crate::errors::*;

/// `BlockMapper` backed by FS_IOC_FIEMAP and FIBMAP on an open file.
///
/// The FIEMAP request buffer (~224 KiB) is allocated on first use and reused
/// for every later query on this file.
pub struct FileBlockMapper<'a> {
    file: &'a File,
    request: Option<Box<FiemapRequest>>,
}

impl<'a> FileBlockMapper<'a> {
    pub fn new(file: &'a File) -> Self {
        Self {
            file,
            request: None,
        }
    }

    fn request(&mut self) -> BlockIOResult<&mut FiemapRequest> {
        if self.request.is_none() {
            let fresh = FiemapRequest::new_box_zeroed()
                .map_err(|_| BlockIOError::Other("cannot allocate extent map buffer"))?;
            self.request = Some(fresh);
        }
        self.request
            .as_deref_mut()
            .ok_or(BlockIOError::Other("extent map buffer missing"))
    }
}

impl BlockMapper for FileBlockMapper<'_> {
    fn map_extents(&mut self, start: u64, len: u64, max: usize) -> BlockIOResult<Vec<RawExtent>> {
        let file = self.file;
        let slots = max.clamp(1, FIEMAP_MAX_EXTENTS);
        let request = self.request()?;

        request.header.fm_start = start;
        request.header.fm_length = len;
        request.header.fm_flags = FIEMAP_FLAG_SYNC;
        request.header.fm_mapped_extents = 0;
        request.header.fm_extent_count = slots as u32;
        request.header.fm_reserved = 0;

        ioctl::fiemap(file, request)?;

        let mapped = (request.header.fm_mapped_extents as usize).min(slots);
        Ok(request.extents[..mapped]
            .iter()
            .map(|e| RawExtent {
                logical: e.fe_logical,
                physical: e.fe_physical,
                length: e.fe_length,
                flags: ExtentFlags::from_bits_retain(e.fe_flags),
            })
            .collect())
    }

    fn map_block(&mut self, block: u32) -> BlockIOResult<u32> {
        ioctl::fibmap(self.file, block)
    }
}
