// SPDX-License-Identifier: MIT

//! Logical-to-physical block mapping of a source file.
//!
//! `BlockMapper` is the seam between the overlay builder and the kernel:
//! the Linux implementation issues FIEMAP/FIBMAP, tests plug in fakes.

use bitflags::bitflags;

use crate::errors::BlockIOResult;

bitflags! {
    /// `fe_flags` of a FIEMAP extent.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ExtentFlags: u32 {
        const LAST           = 0x0000_0001;
        const UNKNOWN        = 0x0000_0002;
        const DELALLOC       = 0x0000_0004;
        const ENCODED        = 0x0000_0008;
        const DATA_ENCRYPTED = 0x0000_0080;
        const NOT_ALIGNED    = 0x0000_0100;
        const DATA_INLINE    = 0x0000_0200;
        const DATA_TAIL      = 0x0000_0400;
        const UNWRITTEN      = 0x0000_0800;
        const MERGED         = 0x0000_1000;
        const SHARED         = 0x0000_2000;
    }
}

impl ExtentFlags {
    /// Flags that still describe a plain, stable 1:1 block mapping.
    pub const TOLERATED: ExtentFlags = ExtentFlags::LAST.union(ExtentFlags::MERGED);

    #[inline]
    pub fn is_plain(self) -> bool {
        self.difference(Self::TOLERATED).is_empty()
    }
}

/// One extent as reported by the kernel, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawExtent {
    pub logical: u64,
    pub physical: u64,
    pub length: u64,
    pub flags: ExtentFlags,
}

impl RawExtent {
    #[inline]
    pub fn is_last(&self) -> bool {
        self.flags.contains(ExtentFlags::LAST)
    }
}

/// Maps logical blocks of one open file to physical blocks of its device.
pub trait BlockMapper {
    /// Returns at most `max` extents overlapping the byte range
    /// `[start, start + len)`, in logical order.
    fn map_extents(&mut self, start: u64, len: u64, max: usize) -> BlockIOResult<Vec<RawExtent>>;

    /// Returns the physical block backing logical block `block`, or 0 when
    /// the block has no stable mapping.
    fn map_block(&mut self, block: u32) -> BlockIOResult<u32>;
}

impl<T: BlockMapper + ?Sized> BlockMapper for &mut T {
    #[inline]
    fn map_extents(&mut self, start: u64, len: u64, max: usize) -> BlockIOResult<Vec<RawExtent>> {
        (**self).map_extents(start, len, max)
    }

    #[inline]
    fn map_block(&mut self, block: u32) -> BlockIOResult<u32> {
        (**self).map_block(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_flags() {
        assert!(ExtentFlags::empty().is_plain());
        assert!(ExtentFlags::LAST.is_plain());
        assert!((ExtentFlags::LAST | ExtentFlags::MERGED).is_plain());
        assert!(!ExtentFlags::SHARED.is_plain());
        assert!(!(ExtentFlags::LAST | ExtentFlags::DATA_INLINE).is_plain());
        assert!(!ExtentFlags::from_bits_retain(0x8000_0000).is_plain());
    }
}
