// SPDX-License-Identifier: MIT

//! Target device: geometry, partition table and the overlay plan.

use std::fs::{File, OpenOptions};
use std::path::Path;

use anyhow::Context;
use mirrorfs::prelude::*;

/// Target opened for reading and writing, with its probed geometry.
pub struct Target {
    pub file: File,
    pub info: DeviceInfo,
}

/// Everything decided about the overlay before any file is ingested.
#[derive(Debug, Clone, Copy)]
pub struct OverlayPlan {
    pub mbr: Mbr,
    pub scan: MbrScan,
    pub slot: usize,
    pub layout: Fat32Layout,
}

impl Target {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("open target '{}'", path.display()))?;
        let info =
            DeviceInfo::probe(&file).with_context(|| format!("probe target '{}'", path.display()))?;
        Ok(Self { file, info })
    }

    pub fn io(&self) -> FileBlockIO<'_> {
        FileBlockIO::new(&self.file)
    }

    /// Reads the partition table and lays the FAT32 volume out in front of
    /// the Linux partition.
    pub fn plan(&self, replace_existing: bool) -> anyhow::Result<OverlayPlan> {
        let mbr = read_mbr(&mut self.io(), self.info.sector_size).context("partition table")?;
        let scan = mbr
            .scan(self.info.total_sectors)
            .context("partition table")?;
        let slot = scan
            .overlay_slot(replace_existing)
            .context("partition table")?;
        let layout = Fat32Layout::compute(self.info.sector_size, scan.linux.start, scan.linux.sectors)
            .map_err(FsError::from)
            .context("FAT32 layout")?;
        Ok(OverlayPlan {
            mbr,
            scan,
            slot,
            layout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirrorpart::mbr::{BOOT_FLAG_NONE, MbrEntry, PART_TYPE_LINUX};
    use zerocopy::IntoBytes;

    fn image(entries: [MbrEntry; 4], sectors: u64) -> tempfile::NamedTempFile {
        let img = tempfile::NamedTempFile::new().unwrap();
        img.as_file().set_len(sectors * 512).unwrap();
        FileBlockIO::new(img.as_file())
            .write_at(0, Mbr::new_from_entries(entries).as_bytes())
            .unwrap();
        img
    }

    #[test]
    fn plans_an_image() {
        let mut entries = [MbrEntry::new_empty(); 4];
        entries[0] = MbrEntry::new(BOOT_FLAG_NONE, PART_TYPE_LINUX, 16384, 10000);
        let img = image(entries, 16384 + 10000);

        let target = Target::open(img.path()).unwrap();
        assert_eq!(target.info.kind, DeviceKind::RegularFile);
        assert_eq!(target.info.sector_size, 512);

        let plan = target.plan(false).unwrap();
        assert_eq!(plan.slot, 1);
        assert_eq!(plan.scan.linux.start, 16384);
        assert_eq!(plan.layout.cluster_count, 1250);
    }

    #[test]
    fn slack_too_small_is_fatal() {
        let mut entries = [MbrEntry::new_empty(); 4];
        entries[0] = MbrEntry::new(BOOT_FLAG_NONE, PART_TYPE_LINUX, 128, 100);
        let img = image(entries, 228);

        let err = Target::open(img.path()).unwrap().plan(false).unwrap_err();
        assert!(format!("{err:#}").contains("slack too small"));
    }
}
