// SPDX-License-Identifier: MIT

use crate::{
    ensure,
    errors::*,
    fat32::{constant::*, region::MetaRegion},
};

/// Cluster chain of one ingested file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileChain {
    /// 0 for an empty file.
    pub first_cluster: u32,
    pub clusters: u32,
}

/// Threads a file's clusters through the FAT as they are resolved.
///
/// Each pushed cluster is claimed immediately with an end-of-chain marker
/// and relinked when the next one arrives, so the FAT never holds a chain
/// that points at an unclaimed cluster.
#[derive(Debug, Default)]
pub struct ChainBuilder {
    first: Option<u32>,
    last: Option<u32>,
    len: u32,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<B>(&mut self, region: &mut MetaRegion<B>, cluster: u32) -> FsChainResult
    where
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        let layout = region.layout();
        ensure!(
            (layout.first_data_cluster()..layout.end_cluster()).contains(&cluster),
            FsChainError::OutOfRange { cluster }
        );
        ensure!(
            region.fat_entry(cluster)? == FAT_FREE,
            FsChainError::Overlap { cluster }
        );

        region.set_fat_entry(cluster, FAT_EOC)?;
        match self.last {
            Some(prev) => region.set_fat_entry(prev, cluster)?,
            None => self.first = Some(cluster),
        }
        self.last = Some(cluster);
        self.len += 1;
        Ok(())
    }

    pub fn extend<B>(&mut self, region: &mut MetaRegion<B>, clusters: &[u32]) -> FsChainResult
    where
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        clusters.iter().try_for_each(|&c| self.push(region, c))
    }

    pub fn finish(self) -> FileChain {
        FileChain {
            first_cluster: self.first.unwrap_or(0),
            clusters: self.len,
        }
    }
}

/// Marks every FAT slot still free as bad; returns how many were marked.
///
/// Free slots alias blocks the source filesystem may still hand out, so a
/// FAT32 reader must never allocate them.
pub fn sweep_free<B>(region: &mut MetaRegion<B>) -> FsChainResult<u32>
where
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    let mut marked = 0;
    for cluster in FAT_START_CLUSTER..region.layout().fat_entry_count() {
        if region.fat_entry(cluster)? == FAT_FREE {
            region.set_fat_entry(cluster, FAT_BAD)?;
            marked += 1;
        }
    }
    Ok(marked)
}
