// SPDX-License-Identifier: MIT

//! Checks that the mounted source filesystem can back the overlay.

use std::fs::File;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use anyhow::{Context, bail, ensure};
use mirrorfs::prelude::*;
use mirrorio::linux::fs_block_size;

/// Identity of the filesystem mounted at `mount`.
///
/// Its block size must equal the FAT32 cluster size so that one cluster
/// aliases exactly one filesystem block.
pub fn probe_mount(mount: &Path, cluster_size: u32) -> anyhow::Result<SourceIdentity> {
    let dir = File::open(mount).with_context(|| format!("open mount '{}'", mount.display()))?;
    let meta = dir
        .metadata()
        .with_context(|| format!("stat mount '{}'", mount.display()))?;
    ensure!(meta.is_dir(), "'{}' is not a directory", mount.display());

    let block_size = fs_block_size(&dir)
        .with_context(|| format!("block size of '{}'", mount.display()))?;
    if block_size != cluster_size {
        bail!(FsError::from(FsIngestError::BlockSizeMismatch {
            block_size,
            cluster_size,
        }));
    }

    Ok(SourceIdentity {
        dev_id: meta.dev(),
        block_size,
    })
}

/// Confirms that `partition` is the device mounted as `source` and that it
/// matches the Linux entry of the target's partition table.
pub fn check_partition(
    partition: &Path,
    source: &SourceIdentity,
    target: &DeviceInfo,
    linux: &PartitionExtent,
) -> anyhow::Result<()> {
    let file = File::open(partition)
        .with_context(|| format!("open partition '{}'", partition.display()))?;
    let info = DeviceInfo::probe(&file)
        .with_context(|| format!("probe partition '{}'", partition.display()))?;
    check_membership(&info, source, target, linux)
        .with_context(|| format!("partition '{}'", partition.display()))
}

fn check_membership(
    partition: &DeviceInfo,
    source: &SourceIdentity,
    target: &DeviceInfo,
    linux: &PartitionExtent,
) -> anyhow::Result<()> {
    ensure!(
        partition.kind == DeviceKind::BlockDevice,
        "not a block device"
    );
    ensure!(
        partition.rdev == source.dev_id,
        "device {:#x} is not the mounted filesystem ({:#x})",
        partition.rdev,
        source.dev_id
    );
    ensure!(
        partition.sector_size == target.sector_size,
        "sector size {} differs from the disk's {}",
        partition.sector_size,
        target.sector_size
    );
    ensure!(
        partition.total_sectors == linux.sectors,
        "{} sectors but the partition table entry has {}",
        partition.total_sectors,
        linux.sectors
    );
    Ok(())
}
