// SPDX-License-Identifier: MIT

//! Volume context: one overlay build from layout to commit.
//!
//! The context owns the staged metadata region. Files are ingested one at a
//! time, `finish` seals the FAT and renders the boot sectors, `commit`
//! persists the result. With a private backing nothing reaches the device
//! before `commit`.

use mirrorio::{BlockIO, blockmap::BlockMapper};
use mirrorpart::mbr::{Mbr, MbrEntry};
use time::OffsetDateTime;

use crate::{
    ensure,
    errors::*,
    fat32::{
        chain::{ChainBuilder, sweep_free},
        constant::*,
        dir::{find_free_run, write_entries},
        extent::{ExtentResolver, MappingMode, MappingPolicy},
        formatter::Fat32Formatter,
        layout::Fat32Layout,
        region::{MetaRegion, RegionBacking},
        types::Fat32Entries,
    },
    utils::time::fat_datetime,
};

/// The mounted source filesystem files must come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceIdentity {
    pub dev_id: u64,
    pub block_size: u32,
}

/// One regular file to mirror, as seen by `fstat`.
#[derive(Debug, Clone, Copy)]
pub struct SourceFile<'a> {
    pub path: &'a [u8],
    pub dev_id: u64,
    pub size: u64,
    pub modified: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub first_cluster: u32,
    pub clusters: u32,
    pub dir_slot: usize,
    pub dir_slots: usize,
    pub mode: MappingMode,
    /// Extent mapping turned out unavailable while resolving this file.
    pub fell_back: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishReport {
    pub files: u32,
    pub claimed_clusters: u64,
    pub bad_clusters: u32,
    pub dir_slots_used: usize,
    pub data_clusters: u32,
    pub mode: MappingMode,
}

#[derive(Debug, Default, Clone, Copy)]
struct VolumeStats {
    files: u32,
    clusters: u64,
    dir_slots: usize,
}

pub struct VolumeContext<B> {
    layout: Fat32Layout,
    source: SourceIdentity,
    mbr: Mbr,
    slot: usize,
    region: MetaRegion<B>,
    resolver: ExtentResolver,
    stamp: (u16, u16, u8),
    stats: VolumeStats,
    finished: bool,
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> VolumeContext<B> {
    /// Formats `backing` as the metadata region of `layout`.
    ///
    /// `mbr` is the partition table read from the device; its entry `slot`
    /// becomes the FAT32 entry when the volume is finished.
    pub fn new(
        layout: Fat32Layout,
        mbr: Mbr,
        slot: usize,
        source: SourceIdentity,
        backing: B,
        policy: MappingPolicy,
        now: OffsetDateTime,
    ) -> FsResult<Self> {
        ensure!(
            source.block_size == layout.cluster_size,
            FsIngestError::BlockSizeMismatch {
                block_size: source.block_size,
                cluster_size: layout.cluster_size,
            }
        );

        let stamp = fat_datetime(now);
        let mut region = MetaRegion::new(backing, &layout)?;
        Fat32Formatter::new(&mut region).format(stamp)?;

        Ok(Self {
            layout,
            source,
            mbr,
            slot,
            region,
            resolver: ExtentResolver::new(policy),
            stamp,
            stats: VolumeStats::default(),
            finished: false,
        })
    }

    #[inline]
    pub fn layout(&self) -> &Fat32Layout {
        &self.layout
    }

    #[inline]
    pub fn region(&self) -> &MetaRegion<B> {
        &self.region
    }

    #[inline]
    pub fn mapping_mode(&self) -> MappingMode {
        self.resolver.mode()
    }

    /// Rejects files living outside the validated mount.
    pub fn check_device(&self, dev_id: u64) -> FsResult {
        ensure!(
            dev_id == self.source.dev_id,
            FsIngestError::WrongMount {
                expected: self.source.dev_id,
                found: dev_id,
            }
        );
        Ok(())
    }

    /// Links the blocks of `file` into the FAT and adds its root directory entries.
    pub fn ingest<M: BlockMapper + ?Sized>(
        &mut self,
        file: &SourceFile<'_>,
        mapper: &mut M,
    ) -> FsResult<IngestReport> {
        ensure!(!self.finished, FsIngestError::Sequence("volume already finished"));
        self.check_device(file.dev_id)?;
        ensure!(
            file.size < FAT_MAX_FILE_SIZE,
            FsIngestError::OversizedFile { size: file.size }
        );

        let stamp = file.modified.map(fat_datetime).unwrap_or(self.stamp);
        let mut entries = Fat32Entries::file(file.path, 0, file.size as u32, stamp)?;
        // Claim directory space before touching the FAT.
        let dir_slot = find_free_run(&self.region, entries.slot_count())?;

        let blocks = file.size.div_ceil(self.layout.cluster_size as u64) as u32;
        let mode_before = self.resolver.mode();
        self.resolver.reset();

        let mut chain = ChainBuilder::new();
        let mut block = 0;
        while block < blocks {
            let clusters = self.resolver.resolve(
                mapper,
                &self.layout,
                self.source.block_size,
                block,
                blocks - block,
            )?;
            ensure!(!clusters.is_empty(), FsError::Other("no clusters resolved"));
            chain.extend(&mut self.region, clusters)?;
            block += clusters.len() as u32;
        }
        let chain = chain.finish();

        entries.entry.set_first_cluster(chain.first_cluster);
        write_entries(&mut self.region, dir_slot, &entries)?;

        self.stats.files += 1;
        self.stats.clusters += chain.clusters as u64;
        self.stats.dir_slots += entries.slot_count();

        let mode = self.resolver.mode();
        Ok(IngestReport {
            first_cluster: chain.first_cluster,
            clusters: chain.clusters,
            dir_slot,
            dir_slots: entries.slot_count(),
            mode,
            fell_back: mode_before != MappingMode::BlockMapping && mode == MappingMode::BlockMapping,
        })
    }

    /// Marks unclaimed clusters bad, installs the FAT32 partition entry and
    /// renders the boot sectors with `volume_id` as serial.
    pub fn finish(&mut self, volume_id: u32) -> FsResult<FinishReport> {
        ensure!(!self.finished, FsIngestError::Sequence("volume already finished"));

        let bad_clusters = sweep_free(&mut self.region)?;
        self.mbr
            .set_entry(self.slot, &MbrEntry::new_fat32_hybrid(self.layout.partition_sectors))?;
        Fat32Formatter::new(&mut self.region).write_boot_sectors(&self.mbr, volume_id)?;
        self.finished = true;

        Ok(FinishReport {
            files: self.stats.files,
            claimed_clusters: self.stats.clusters,
            bad_clusters,
            // The volume label takes the first slot.
            dir_slots_used: self.stats.dir_slots + 1,
            data_clusters: self.layout.root_dir_clusters + self.layout.cluster_count,
            mode: self.resolver.mode(),
        })
    }
}

impl<B: RegionBacking> VolumeContext<B> {
    /// Writes FAT and root directory, then the boot sectors.
    pub fn commit(&mut self, io: &mut dyn BlockIO) -> FsResult {
        ensure!(self.finished, FsIngestError::Sequence("commit before finish"));
        self.region.commit(io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirrorio::blockmap::{ExtentFlags, RawExtent};
    use mirrorio::errors::{BlockIOError, BlockIOResult};
    use mirrorio::prelude::MemBlockIO;
    use mirrorpart::mbr::{BOOT_FLAG_NONE, PART_TYPE_LINUX};
    use time::{Date, Month, Time};

    const START: u32 = 16384;
    const SECTORS: u32 = 10000;
    const DEV: u64 = 0x0803;

    /// Each file is contiguous from a fixed physical block.
    struct Contiguous(u64);

    impl BlockMapper for Contiguous {
        fn map_extents(&mut self, start: u64, len: u64, _max: usize) -> BlockIOResult<Vec<RawExtent>> {
            Ok(vec![RawExtent {
                logical: start,
                physical: self.0 * 4096 + start,
                length: len,
                flags: ExtentFlags::LAST,
            }])
        }

        fn map_block(&mut self, _block: u32) -> BlockIOResult<u32> {
            Err(BlockIOError::Unsupported)
        }
    }

    fn mbr() -> Mbr {
        let mut entries = [MbrEntry::new_empty(); 4];
        entries[0] = MbrEntry::new(BOOT_FLAG_NONE, PART_TYPE_LINUX, START, SECTORS);
        Mbr::new_from_entries(entries)
    }

    fn when() -> OffsetDateTime {
        Date::from_calendar_date(2024, Month::March, 9)
            .unwrap()
            .with_time(Time::from_hms(12, 30, 10).unwrap())
            .assume_utc()
    }

    fn volume(block_size: u32) -> FsResult<VolumeContext<Vec<u8>>> {
        let layout = Fat32Layout::compute(512, START, SECTORS).unwrap();
        let backing = vec![0u8; layout.region_bytes().unwrap()];
        VolumeContext::new(
            layout,
            mbr(),
            1,
            SourceIdentity {
                dev_id: DEV,
                block_size,
            },
            backing,
            MappingPolicy::Auto,
            when(),
        )
    }

    fn file(path: &[u8], size: u64) -> SourceFile<'_> {
        SourceFile {
            path,
            dev_id: DEV,
            size,
            modified: None,
        }
    }

    #[test]
    fn block_size_must_match_clusters() {
        assert!(matches!(
            volume(1024),
            Err(FsError::Ingest(FsIngestError::BlockSizeMismatch { .. }))
        ));
    }

    #[test]
    fn ingest_links_chain_and_entries() {
        let mut v = volume(4096).unwrap();
        let report = v
            .ingest(&file(b"/mnt/movie.mkv", 3 * 4096 + 1), &mut Contiguous(100))
            .unwrap();

        assert_eq!(report.first_cluster, 106);
        assert_eq!(report.clusters, 4);
        assert_eq!(report.dir_slot, 1);
        assert_eq!(report.mode, MappingMode::ExtentMapping);
        assert!(!report.fell_back);

        let r = v.region();
        assert_eq!(r.fat_entry(106).unwrap(), 107);
        assert_eq!(r.fat_entry(109).unwrap(), FAT_EOC);

        let short = r.dir_slot(2).unwrap();
        assert_eq!(&short[..11], b"MOVIE   MKV");
        assert_eq!(&short[26..28], &106u16.to_le_bytes());
        assert_eq!(&short[28..32], &(3 * 4096u32 + 1).to_le_bytes());
    }

    #[test]
    fn empty_file_gets_entry_without_cluster() {
        let mut v = volume(4096).unwrap();
        let report = v.ingest(&file(b"/mnt/EMPTY", 0), &mut Contiguous(0)).unwrap();
        assert_eq!(report.first_cluster, 0);
        assert_eq!(report.clusters, 0);
        assert_eq!(&v.region().dir_slot(2).unwrap()[26..32], &[0u8; 6]);
    }

    #[test]
    fn duplicate_file_overlaps() {
        let mut v = volume(4096).unwrap();
        v.ingest(&file(b"/mnt/a", 4096), &mut Contiguous(5)).unwrap();
        let err = v.ingest(&file(b"/mnt/a", 4096), &mut Contiguous(5)).unwrap_err();
        assert!(matches!(err, FsError::Chain(FsChainError::Overlap { cluster: 11 })));
    }

    #[test]
    fn rejects_foreign_and_oversized_files() {
        let mut v = volume(4096).unwrap();
        let mut foreign = file(b"/mnt/x", 1);
        foreign.dev_id = 1;
        assert!(matches!(
            v.ingest(&foreign, &mut Contiguous(0)),
            Err(FsError::Ingest(FsIngestError::WrongMount { .. }))
        ));
        assert!(matches!(
            v.ingest(&file(b"/mnt/big", u32::MAX as u64), &mut Contiguous(0)),
            Err(FsError::Ingest(FsIngestError::OversizedFile { .. }))
        ));
    }

    #[test]
    fn finish_then_commit() {
        let mut v = volume(4096).unwrap();
        v.ingest(&file(b"/mnt/one.bin", 8192), &mut Contiguous(0)).unwrap();

        let mut disk = vec![0u8; START as usize * 512];
        {
            let mut io = MemBlockIO::new(&mut disk);
            assert!(v.commit(&mut io).is_err());
        }

        let report = v.finish(0xCAFE_F00D).unwrap();
        assert_eq!(report.files, 1);
        assert_eq!(report.claimed_clusters, 2);
        assert_eq!(report.dir_slots_used, 3);
        let fat_slots = v.layout().fat_entry_count() - FAT_START_CLUSTER;
        assert_eq!(report.bad_clusters, fat_slots - 4 - 2);
        assert!(v.finish(1).is_err());
        assert!(v.ingest(&file(b"/mnt/late", 1), &mut Contiguous(9)).is_err());

        {
            let mut io = MemBlockIO::new(&mut disk);
            v.commit(&mut io).unwrap();
        }
        // FAT32 slot installed in the hybrid partition table.
        let e = 0x1BE + 16;
        assert_eq!(disk[e + 4], 0x0C);
        assert_eq!(&disk[e + 12..e + 16], &SECTORS.to_le_bytes());
        assert_eq!(&disk[0x43..0x47], &0xCAFE_F00Du32.to_le_bytes());
        assert_eq!(disk[0x1BE + 4], 0x83);
        assert_eq!(&disk[512..516], b"RRaA");
        assert_eq!(&disk[..512], &disk[1024..1536]);
    }
}
