// SPDX-License-Identifier: MIT

use core::ops::Range;

use mirrorio::BlockIO;

use crate::{ensure, errors::*, fat32::constant::*, fat32::layout::Fat32Layout};

/// The metadata region: every byte from sector 0 up to the first data sector.
///
/// The backing is either private memory committed at the end or a shared
/// mapping of the device itself.
pub struct MetaRegion<B> {
    backing: B,
    layout: Fat32Layout,
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> MetaRegion<B> {
    pub fn new(backing: B, layout: &Fat32Layout) -> FsLayoutResult<Self> {
        let expected = layout.region_bytes()?;
        ensure!(
            backing.as_ref().len() == expected,
            FsLayoutError::Invalid("metadata region size does not match layout")
        );
        Ok(Self {
            backing,
            layout: *layout,
        })
    }

    #[inline]
    pub fn layout(&self) -> &Fat32Layout {
        &self.layout
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        self.backing.as_ref()
    }

    #[inline]
    pub fn into_backing(self) -> B {
        self.backing
    }

    fn fat_entry_offset(&self, cluster: u32) -> FsChainResult<usize> {
        ensure!(
            cluster < self.layout.fat_entry_count(),
            FsChainError::OutOfRange { cluster }
        );
        Ok(self.layout.fat_offset() + cluster as usize * FAT_ENTRY_SIZE)
    }

    pub fn fat_entry(&self, cluster: u32) -> FsChainResult<u32> {
        let off = self.fat_entry_offset(cluster)?;
        let mut raw = [0u8; FAT_ENTRY_SIZE];
        raw.copy_from_slice(&self.backing.as_ref()[off..off + FAT_ENTRY_SIZE]);
        Ok(u32::from_le_bytes(raw) & FAT_ENTRY_MASK)
    }

    pub fn set_fat_entry(&mut self, cluster: u32, value: u32) -> FsChainResult {
        let off = self.fat_entry_offset(cluster)?;
        self.backing.as_mut()[off..off + FAT_ENTRY_SIZE].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Number of 32-byte slots in the root directory.
    #[inline]
    pub fn dir_slot_count(&self) -> usize {
        self.layout.root_dir_bytes() / FAT_DIR_ENTRY_SIZE
    }

    pub fn dir_slot(&self, index: usize) -> Option<&[u8]> {
        if index >= self.dir_slot_count() {
            return None;
        }
        let off = self.layout.root_dir_offset() + index * FAT_DIR_ENTRY_SIZE;
        Some(&self.backing.as_ref()[off..off + FAT_DIR_ENTRY_SIZE])
    }

    pub fn set_dir_slot(&mut self, index: usize, raw: &[u8]) -> FsDirResult {
        ensure!(
            index < self.dir_slot_count() && raw.len() == FAT_DIR_ENTRY_SIZE,
            FsDirError::Other("directory slot out of range")
        );
        let off = self.layout.root_dir_offset() + index * FAT_DIR_ENTRY_SIZE;
        self.backing.as_mut()[off..off + FAT_DIR_ENTRY_SIZE].copy_from_slice(raw);
        Ok(())
    }

    /// Boot sector, FSInfo and backup boot sector.
    pub fn boot_sectors_mut(&mut self) -> &mut [u8] {
        let span = self.boot_span();
        &mut self.backing.as_mut()[span]
    }

    /// FAT and root directory.
    pub fn metadata_span(&self) -> Range<usize> {
        self.layout.fat_offset()..self.backing.as_ref().len()
    }

    pub fn metadata_mut(&mut self) -> &mut [u8] {
        let span = self.metadata_span();
        &mut self.backing.as_mut()[span]
    }

    pub fn boot_span(&self) -> Range<usize> {
        0..FAT_MIN_RESERVED_SECTORS as usize * self.layout.sector_size as usize
    }
}

impl<B: RegionBacking> MetaRegion<B> {
    /// Persists the FAT and root directory, then the boot sectors.
    ///
    /// The boot span is only written once the metadata span is durable.
    pub fn commit(&mut self, io: &mut dyn BlockIO) -> FsResult {
        let metadata = self.metadata_span();
        let boot = self.boot_span();
        self.backing.persist(io, metadata)?;
        self.backing.persist(io, boot)?;
        Ok(())
    }
}

/// Storage behind a [`MetaRegion`] and how a span of it reaches the device.
pub trait RegionBacking: AsRef<[u8]> + AsMut<[u8]> {
    fn persist(&mut self, io: &mut dyn BlockIO, span: Range<usize>) -> FsResult;
}

impl RegionBacking for Vec<u8> {
    fn persist(&mut self, io: &mut dyn BlockIO, span: Range<usize>) -> FsResult {
        let bytes = self
            .get(span.clone())
            .ok_or(FsError::Other("commit span outside metadata region"))?;
        io.write_at(span.start as u64, bytes)?;
        io.flush()?;
        Ok(())
    }
}

/// The mapping is the device: stores are already in place, only sync.
#[cfg(target_os = "linux")]
impl RegionBacking for mirrorio::linux::SharedMapping {
    fn persist(&mut self, _io: &mut dyn BlockIO, _span: Range<usize>) -> FsResult {
        self.sync()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirrorio::prelude::*;

    fn layout() -> Fat32Layout {
        Fat32Layout::compute(512, 16384, 10000).unwrap()
    }

    #[test]
    fn size_must_match_layout() {
        let l = layout();
        assert!(MetaRegion::new(vec![0u8; 512], &l).is_err());
        assert!(MetaRegion::new(vec![0u8; l.region_bytes().unwrap()], &l).is_ok());
    }

    #[test]
    fn fat_entries_are_little_endian_and_masked() {
        let l = layout();
        let mut region = MetaRegion::new(vec![0u8; l.region_bytes().unwrap()], &l).unwrap();
        region.set_fat_entry(6, 0xFFFF_FFFF).unwrap();
        assert_eq!(region.fat_entry(6).unwrap(), FAT_EOC);

        let off = l.fat_offset() + 6 * 4;
        assert_eq!(&region.bytes()[off..off + 4], &[0xFF; 4]);
        assert!(matches!(
            region.fat_entry(l.fat_entry_count()),
            Err(FsChainError::OutOfRange { .. })
        ));
    }

    #[test]
    fn dir_slots() {
        let l = layout();
        let mut region = MetaRegion::new(vec![0u8; l.region_bytes().unwrap()], &l).unwrap();
        assert_eq!(region.dir_slot_count(), 32 * 512 / 32);
        region.set_dir_slot(3, &[0xAB; 32]).unwrap();
        assert_eq!(region.dir_slot(3).unwrap()[0], 0xAB);
        assert!(region.dir_slot(512).is_none());
        assert!(region.set_dir_slot(512, &[0u8; 32]).is_err());
    }

    #[test]
    fn commit_writes_only_metadata_and_boot_sectors() {
        let l = layout();
        let mut region = MetaRegion::new(vec![0x11u8; l.region_bytes().unwrap()], &l).unwrap();

        let mut disk = vec![0u8; l.region_bytes().unwrap()];
        {
            let mut io = MemBlockIO::new(&mut disk);
            region.commit(&mut io).unwrap();
        }
        assert!(disk[..3 * 512].iter().all(|&b| b == 0x11));
        assert!(disk[3 * 512..l.fat_offset()].iter().all(|&b| b == 0));
        assert!(disk[l.fat_offset()..].iter().all(|&b| b == 0x11));
    }
}
