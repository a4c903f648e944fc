// SPDX-License-Identifier: MIT

use crate::{bail, ensure, errors::*, fat32::constant::*};

/// FAT32 geometry laid out in the slack in front of a Linux partition.
///
/// Sector numbers are absolute on the device: the volume starts at sector 0
/// and its data region starts exactly at `overlap_start_sector`, so cluster
/// `start_cluster + root_dir_clusters + n` is partition block `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fat32Layout {
    pub sector_size: u32,
    pub cluster_sectors: u32,
    pub cluster_size: u32,
    pub start_cluster: u32,
    pub rsvd_sectors: u32,
    pub fat_sectors: u32,
    pub root_dir_clusters: u32,
    pub overlap_start_sector: u32,
    pub partition_sectors: u32,
    /// Data clusters backed by the Linux partition.
    pub cluster_count: u32,
    pub fsinfo_sector: u32,
    pub backup_sector: u32,
}

impl Fat32Layout {
    /// Derives the geometry for a partition of `sectors` sectors starting at
    /// sector `start`.
    pub fn compute(sector_size: u32, start: u32, sectors: u32) -> FsLayoutResult<Self> {
        ensure!(
            sector_size >= FAT_LEGACY_SECTOR_SIZE as u32 && sector_size.is_power_of_two(),
            FsLayoutError::Invalid("unsupported sector size")
        );
        ensure!(sectors > 0, FsLayoutError::Invalid("empty partition"));

        // Keep data clusters on the partition's own alignment.
        let cluster_sectors = if start % FAT_DEFAULT_CLUSTER_SECTORS == 0 {
            FAT_DEFAULT_CLUSTER_SECTORS
        } else {
            1
        };
        let entries_per_sector = sector_size / FAT_ENTRY_SIZE as u32;

        // The FAT must outgrow anything a FAT16 table could describe.
        let needed = ((FAT16_CLUSTER_LIMIT - FAT_START_CLUSTER) / entries_per_sector) as u64;
        ensure!(
            start as u64 > needed,
            FsLayoutError::SlackTooSmall { start, needed }
        );

        let cluster_count = sectors.div_ceil(cluster_sectors);
        let mut root_dir_clusters = FAT_ROOT_DIR_SECTORS / cluster_sectors;

        for _ in 0..FAT_LAYOUT_MAX_PASSES {
            let in_fat = cluster_count as u64 + FAT_START_CLUSTER as u64 + root_dir_clusters as u64;
            if in_fat >= FAT_CLUSTER_LIMIT as u64 {
                bail!(FsLayoutError::TooLarge {
                    clusters: cluster_count
                });
            }

            let fat_sectors = (in_fat * FAT_ENTRY_SIZE as u64).div_ceil(sector_size as u64);
            let root_sectors = root_dir_clusters as u64 * cluster_sectors as u64;
            let metadata = root_sectors + fat_sectors + FAT_MIN_RESERVED_SECTORS as u64;
            ensure!(
                start as u64 >= metadata,
                FsLayoutError::SlackTooSmall {
                    start,
                    needed: metadata
                }
            );
            let rsvd_sectors = start as u64 - root_sectors - fat_sectors;

            // BPB_RsvdSecCnt is 16 bits: hand the excess slack to the root directory.
            if rsvd_sectors > u16::MAX as u64 {
                let excess = rsvd_sectors - u16::MAX as u64;
                root_dir_clusters += excess.div_ceil(cluster_sectors as u64) as u32;
                continue;
            }
            // Root sectors are whole clusters, so this only trips on a bad start.
            if (rsvd_sectors + fat_sectors) % cluster_sectors as u64 != 0 {
                root_dir_clusters += 1;
                continue;
            }

            return Ok(Self {
                sector_size,
                cluster_sectors,
                cluster_size: cluster_sectors * sector_size,
                start_cluster: FAT_START_CLUSTER,
                rsvd_sectors: rsvd_sectors as u32,
                fat_sectors: fat_sectors as u32,
                root_dir_clusters,
                overlap_start_sector: start,
                partition_sectors: sectors,
                cluster_count,
                fsinfo_sector: FAT_FSINFO_SECTOR,
                backup_sector: FAT_BACKUP_BOOT_SECTOR,
            });
        }

        Err(FsLayoutError::NoConvergence)
    }

    #[inline]
    pub fn root_dir_sectors(&self) -> u32 {
        self.root_dir_clusters * self.cluster_sectors
    }

    /// Bytes of reserved sectors, FAT and root directory: everything in front
    /// of the data region.
    pub fn region_bytes(&self) -> FsLayoutResult<usize> {
        let bytes = self.overlap_start_sector as u64 * self.sector_size as u64;
        ensure!(
            bytes <= FAT_MAX_REGION_BYTES,
            FsLayoutError::RegionTooLarge { bytes }
        );
        Ok(bytes as usize)
    }

    #[inline]
    pub fn fat_offset(&self) -> usize {
        self.rsvd_sectors as usize * self.sector_size as usize
    }

    #[inline]
    pub fn root_dir_offset(&self) -> usize {
        self.fat_offset() + self.fat_sectors as usize * self.sector_size as usize
    }

    #[inline]
    pub fn root_dir_bytes(&self) -> usize {
        self.root_dir_sectors() as usize * self.sector_size as usize
    }

    /// Slots the FAT sectors can hold, including rounding slack.
    #[inline]
    pub fn fat_entry_count(&self) -> u32 {
        self.fat_sectors * (self.sector_size / FAT_ENTRY_SIZE as u32)
    }

    /// First cluster aliasing a partition block.
    #[inline]
    pub fn first_data_cluster(&self) -> u32 {
        self.start_cluster + self.root_dir_clusters
    }

    /// One past the last addressable cluster.
    #[inline]
    pub fn end_cluster(&self) -> u32 {
        self.first_data_cluster() + self.cluster_count
    }

    /// `BPB_TotSec32`: the volume spans sector 0 up to the end of the partition.
    #[inline]
    pub fn volume_sectors(&self) -> u32 {
        self.overlap_start_sector + self.partition_sectors
    }

    /// Converts a physical source block of `block_size` bytes into a cluster number.
    pub fn physical_to_cluster(&self, physical: u64, block_size: u32) -> FsExtentResult<u32> {
        let cluster = (physical as u128 * self.cluster_size as u128 / block_size as u128)
            + self.first_data_cluster() as u128;
        if cluster >= self.end_cluster() as u128 {
            return Err(FsExtentError::ClusterOverflow { physical });
        }
        Ok(cluster as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_consistent(l: &Fat32Layout) {
        assert_eq!(
            l.rsvd_sectors + l.fat_sectors + l.root_dir_sectors(),
            l.overlap_start_sector
        );
        assert_eq!((l.rsvd_sectors + l.fat_sectors) % l.cluster_sectors, 0);
        assert!(l.rsvd_sectors >= FAT_MIN_RESERVED_SECTORS);
        assert!(l.rsvd_sectors <= u16::MAX as u32);
        assert!(l.fat_entry_count() >= l.end_cluster());
    }

    #[test]
    fn aligned_partition() {
        let l = Fat32Layout::compute(512, 16384, 10000).unwrap();
        assert_eq!(l.cluster_sectors, 8);
        assert_eq!(l.cluster_size, 4096);
        assert_eq!(l.cluster_count, 1250);
        assert_eq!(l.root_dir_clusters, 4);
        assert_eq!(l.fat_sectors, 10);
        assert_eq!(l.rsvd_sectors, 16342);
        assert_eq!(l.first_data_cluster(), 6);
        assert_eq!(l.volume_sectors(), 26384);
        assert_eq!(l.root_dir_offset(), (16342 + 10) * 512);
        assert_consistent(&l);
    }

    #[test]
    fn misaligned_start_uses_single_sector_clusters() {
        let l = Fat32Layout::compute(512, 16383, 1000).unwrap();
        assert_eq!(l.cluster_sectors, 1);
        assert_eq!(l.root_dir_clusters, 32);
        assert_eq!(l.cluster_count, 1000);
        assert_consistent(&l);
    }

    #[test]
    fn far_partition_grows_root_directory() {
        let l = Fat32Layout::compute(512, 2_000_000, 1_000_000).unwrap();
        assert!(l.root_dir_clusters > 4);
        assert_consistent(&l);
    }

    #[test]
    fn large_sectors() {
        let l = Fat32Layout::compute(4096, 2048, 262_144).unwrap();
        assert_eq!(l.cluster_size, 32768);
        assert_eq!(l.root_dir_clusters, 4);
        assert_consistent(&l);
    }

    #[test]
    fn slack_too_small() {
        assert!(matches!(
            Fat32Layout::compute(512, 2048, 1 << 23),
            Err(FsLayoutError::SlackTooSmall { start: 2048, .. })
        ));
        assert!(matches!(
            Fat32Layout::compute(512, 128, 100),
            Err(FsLayoutError::SlackTooSmall { needed: 511, .. })
        ));
    }

    #[test]
    fn too_many_clusters() {
        // One sector per cluster keeps the count at the sector count.
        let err = Fat32Layout::compute(512, 0x0200_0001, 0x0FFF_FFF0).unwrap_err();
        assert!(matches!(err, FsLayoutError::TooLarge { .. }));
    }

    #[test]
    fn cluster_numbers() {
        let l = Fat32Layout::compute(512, 16384, 10000).unwrap();
        assert_eq!(l.physical_to_cluster(0, 4096).unwrap(), 6);
        assert_eq!(l.physical_to_cluster(1249, 4096).unwrap(), 1255);
        assert!(matches!(
            l.physical_to_cluster(1250, 4096),
            Err(FsExtentError::ClusterOverflow { physical: 1250 })
        ));
    }

    #[test]
    fn region_bytes() {
        let l = Fat32Layout::compute(512, 16384, 10000).unwrap();
        assert_eq!(l.region_bytes().unwrap(), 16384 * 512);
    }
}
