// SPDX-License-Identifier: MIT

use mirrorpart::mbr::{MBR_DISK_SIGNATURE_OFFSET, MBR_LEGACY_SIGNATURE_OFFSET, Mbr};
use zerocopy::IntoBytes;

use crate::{
    errors::*,
    fat32::{constant::*, region::MetaRegion, types::*},
};

/// Fat32Formatter:
/// - Seeds the FAT (media entry, clean marker, root directory chain).
/// - Writes the volume label as the first root directory slot.
/// - Renders the hybrid sector 0, FSInfo and backup boot sector.
///
/// Everything lands in the metadata region; nothing touches the device here.
pub struct Fat32Formatter<'a, B> {
    region: &'a mut MetaRegion<B>,
}

impl<'a, B: AsRef<[u8]> + AsMut<[u8]>> Fat32Formatter<'a, B> {
    pub fn new(region: &'a mut MetaRegion<B>) -> Self {
        Self { region }
    }

    /// Clears FAT and root directory and seeds the reserved entries.
    pub fn format(&mut self, label_stamp: (u16, u16, u8)) -> FsResult {
        self.region.metadata_mut().fill(0);
        self.write_fat_region()?;
        self.write_root_dir(label_stamp)?;
        Ok(())
    }

    fn write_fat_region(&mut self) -> FsChainResult {
        let layout = *self.region.layout();
        self.region.set_fat_entry(0, FAT_MEDIA_ENTRY)?;
        self.region.set_fat_entry(1, FAT_EOC)?;

        let first = layout.start_cluster;
        let count = layout.root_dir_clusters;
        for i in 0..count {
            let entry = if i + 1 < count { first + i + 1 } else { FAT_EOC };
            self.region.set_fat_entry(first + i, entry)?;
        }
        Ok(())
    }

    fn write_root_dir(&mut self, stamp: (u16, u16, u8)) -> FsDirResult {
        let label = Fat32Entries::volume_label(*FAT_VOLUME_LABEL, stamp);
        for (index, raw) in label.slots().enumerate() {
            self.region.set_dir_slot(index, raw)?;
        }
        Ok(())
    }

    /// Renders sector 0 (BPB plus the disk signature and partition table of
    /// `mbr`), FSInfo and the backup copy of sector 0.
    pub fn write_boot_sectors(&mut self, mbr: &Mbr, volume_id: u32) -> FsResult {
        let layout = *self.region.layout();
        let ss = layout.sector_size as usize;

        let mut boot = vec![0u8; ss];
        let bpb = Fat32Bpb::from_layout(&layout, volume_id);
        boot[..size_of::<Fat32Bpb>()].copy_from_slice(bpb.as_bytes());
        // Disk signature, partition entries and the legacy signature.
        boot[MBR_DISK_SIGNATURE_OFFSET..FAT_LEGACY_SECTOR_SIZE]
            .copy_from_slice(&mbr.as_bytes()[MBR_DISK_SIGNATURE_OFFSET..]);
        write_signature(&mut boot, MBR_LEGACY_SIGNATURE_OFFSET as usize);
        write_signature(&mut boot, ss - 2);

        let mut fsinfo = vec![0u8; ss];
        fsinfo[..FAT_LEGACY_SECTOR_SIZE].copy_from_slice(Fat32FsInfo::default().as_bytes());
        write_signature(&mut fsinfo, ss - 2);

        let sectors = self.region.boot_sectors_mut();
        let at = |sector: u32| sector as usize * ss..(sector as usize + 1) * ss;
        sectors[at(0)].copy_from_slice(&boot);
        sectors[at(layout.fsinfo_sector)].copy_from_slice(&fsinfo);
        sectors[at(layout.backup_sector)].copy_from_slice(&boot);
        Ok(())
    }
}

#[inline]
fn write_signature(sector: &mut [u8], offset: usize) {
    sector[offset..offset + 2].copy_from_slice(&FAT_SIGNATURE_LE.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fat32::layout::Fat32Layout;
    use mirrorpart::mbr::{BOOT_FLAG_NONE, MbrEntry, PART_TYPE_LINUX};

    fn region(ss: u32, start: u32, sectors: u32) -> MetaRegion<Vec<u8>> {
        let l = Fat32Layout::compute(ss, start, sectors).unwrap();
        MetaRegion::new(vec![0xCCu8; l.region_bytes().unwrap()], &l).unwrap()
    }

    #[test]
    fn format_seeds_fat_and_label() {
        let mut r = region(512, 16384, 10000);
        Fat32Formatter::new(&mut r).format((0x21, 0, 0)).unwrap();

        assert_eq!(r.fat_entry(0).unwrap(), FAT_MEDIA_ENTRY);
        assert_eq!(r.fat_entry(1).unwrap(), FAT_EOC);
        assert_eq!(r.fat_entry(2).unwrap(), 3);
        assert_eq!(r.fat_entry(4).unwrap(), 5);
        assert_eq!(r.fat_entry(5).unwrap(), FAT_EOC);
        assert_eq!(r.fat_entry(6).unwrap(), FAT_FREE);

        let label = r.dir_slot(0).unwrap();
        assert_eq!(&label[..11], b"FAT32MIRROR");
        assert_eq!(label[11], 0x08);
        assert_eq!(r.dir_slot(1).unwrap()[0], FAT_ENTRY_FREE);

        // Reserved sectors are left alone.
        assert_eq!(r.bytes()[3 * 512], 0xCC);
    }

    #[test]
    fn hybrid_boot_sector_4k() {
        let mut r = region(4096, 2048, 262_144);
        let mut mbr = Mbr::new_from_entries([MbrEntry::new_empty(); 4]);
        mbr.boot_code[0x1B8..0x1BC].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        mbr.boot_code[..4].copy_from_slice(&[0xFA, 0x31, 0xC0, 0x8E]);
        mbr.set_entry(0, &MbrEntry::new(BOOT_FLAG_NONE, PART_TYPE_LINUX, 2048, 262_144))
            .unwrap();
        mbr.set_entry(1, &MbrEntry::new_fat32_hybrid(262_144)).unwrap();

        Fat32Formatter::new(&mut r)
            .write_boot_sectors(&mbr, 0x1234_5678)
            .unwrap();

        let b = r.bytes();
        assert_eq!(&b[0..3], &[0xEB, 0xFE, 0x90]);
        assert_eq!(&b[3..11], b"MSWIN4.1");
        assert_eq!(&b[0x0B..0x0D], &4096u16.to_le_bytes());
        assert_eq!(b[0x0D], 8);
        assert_eq!(b[0x10], 1);
        assert_eq!(b[0x15], 0xF8);
        assert_eq!(&b[0x20..0x24], &(2048u32 + 262_144).to_le_bytes());
        assert_eq!(&b[0x2C..0x30], &2u32.to_le_bytes());
        assert_eq!(&b[0x43..0x47], &0x1234_5678u32.to_le_bytes());
        assert_eq!(&b[0x47..0x52], b"FAT32MIRROR");
        assert_eq!(&b[0x52..0x5A], b"FAT32   ");
        // Boot code is dropped, the disk signature survives.
        assert!(b[0x5A..0x1B8].iter().all(|&x| x == 0));
        assert_eq!(&b[0x1B8..0x1BE], &[0xDE, 0xAD, 0xBE, 0xEF, 0, 0]);

        // Second partition entry: type 0x0C, start 0.
        let e = 0x1BE + 16;
        assert_eq!(b[e + 4], 0x0C);
        assert_eq!(&b[e + 8..e + 12], &[0, 0, 0, 0]);
        assert_eq!(&b[e + 12..e + 16], &262_144u32.to_le_bytes());

        assert_eq!(&b[510..512], &[0x55, 0xAA]);
        assert_eq!(&b[4094..4096], &[0x55, 0xAA]);

        let fsinfo = &b[4096..8192];
        assert_eq!(&fsinfo[0..4], b"RRaA");
        assert_eq!(&fsinfo[0x1E4..0x1E8], b"rrAa");
        assert_eq!(&fsinfo[0x1E8..0x1F0], &[0xFF; 8]);
        assert_eq!(&fsinfo[508..512], &[0x00, 0x00, 0x55, 0xAA]);
        assert_eq!(&fsinfo[4094..4096], &[0x55, 0xAA]);

        assert_eq!(&b[8192..12288], &b[0..4096]);
    }
}
