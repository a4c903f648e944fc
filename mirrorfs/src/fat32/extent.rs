// SPDX-License-Identifier: MIT

use heapless::{Deque, Vec as BoundedVec};
use mirrorio::blockmap::{BlockMapper, RawExtent};

use crate::{
    errors::*,
    fat32::{constant::*, layout::Fat32Layout},
};

/// How source file blocks are being mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingMode {
    NotYetTried,
    /// Batched extent queries work on this filesystem.
    ExtentMapping,
    /// One query per block, for the rest of the run.
    BlockMapping,
}

/// Which mapping facility the resolver may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MappingPolicy {
    /// Extent queries, falling back to per-block mapping if they are unavailable.
    #[default]
    Auto,
    BlockOnly,
}

/// Contiguous run in source blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Extent {
    logical: u64,
    physical: u64,
    length: u64,
}

/// Translates file blocks into cluster numbers of the overlay.
///
/// Extents returned by one query are cached; the cache survives across calls
/// as long as each call continues where the previous one stopped.
pub struct ExtentResolver {
    mode: MappingMode,
    pending: Deque<Extent, EXTENT_BATCH>,
    cursor: u64,
    batch: BoundedVec<u32, CLUSTER_BATCH>,
}

impl ExtentResolver {
    pub fn new(policy: MappingPolicy) -> Self {
        Self {
            mode: match policy {
                MappingPolicy::Auto => MappingMode::NotYetTried,
                MappingPolicy::BlockOnly => MappingMode::BlockMapping,
            },
            pending: Deque::new(),
            cursor: 0,
            batch: BoundedVec::new(),
        }
    }

    #[inline]
    pub fn mode(&self) -> MappingMode {
        self.mode
    }

    /// Drops cached extents; call before resolving another file.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.cursor = 0;
    }

    /// Resolves up to [`CLUSTER_BATCH`] clusters for `count` blocks starting
    /// at logical block `start`. The caller loops until `count` is covered.
    pub fn resolve<M: BlockMapper + ?Sized>(
        &mut self,
        mapper: &mut M,
        layout: &Fat32Layout,
        block_size: u32,
        start: u32,
        count: u32,
    ) -> FsExtentResult<&[u32]> {
        if start as u64 != self.cursor {
            self.pending.clear();
        }
        self.batch.clear();

        let want = (count as usize).min(CLUSTER_BATCH);
        while self.batch.len() < want {
            let block = start + self.batch.len() as u32;
            let remaining = count - self.batch.len() as u32;

            let physical = match self.mode {
                MappingMode::BlockMapping => Self::map_one(mapper, block)?,
                MappingMode::NotYetTried | MappingMode::ExtentMapping => {
                    if self.pending.is_empty() {
                        match mapper.map_extents(
                            block as u64 * block_size as u64,
                            remaining as u64 * block_size as u64,
                            EXTENT_BATCH,
                        ) {
                            Ok(raw) => {
                                self.mode = MappingMode::ExtentMapping;
                                self.load(&raw, block_size)?;
                            }
                            Err(_) if self.mode == MappingMode::NotYetTried => {
                                self.mode = MappingMode::BlockMapping;
                                continue;
                            }
                            Err(e) => return Err(FsExtentError::ExtentMapLost(e)),
                        }
                    }
                    self.take_cached(block)?
                }
            };

            let cluster = layout.physical_to_cluster(physical, block_size)?;
            self.batch
                .push(cluster)
                .map_err(|_| FsExtentError::Other("cluster batch overflow"))?;
        }

        self.cursor = start as u64 + self.batch.len() as u64;
        Ok(&self.batch)
    }

    fn map_one<M: BlockMapper + ?Sized>(mapper: &mut M, block: u32) -> FsExtentResult<u64> {
        match mapper.map_block(block)? {
            0 => Err(FsExtentError::UnmappedBlock { block }),
            physical => Ok(physical as u64),
        }
    }

    /// Validates a query result and queues it in block units.
    fn load(&mut self, raw: &[RawExtent], block_size: u32) -> FsExtentResult {
        let bs = block_size as u64;
        for extent in raw {
            if extent.logical % bs != 0 || extent.physical % bs != 0 || extent.length % bs != 0 {
                return Err(FsExtentError::Misaligned {
                    logical: extent.logical,
                    physical: extent.physical,
                    length: extent.length,
                });
            }
            if !extent.flags.is_plain() {
                return Err(FsExtentError::UnexpectedFlags {
                    logical: extent.logical,
                    flags: extent.flags.bits(),
                });
            }
            if extent.length > 0 {
                self.pending
                    .push_back(Extent {
                        logical: extent.logical / bs,
                        physical: extent.physical / bs,
                        length: extent.length / bs,
                    })
                    .map_err(|_| FsExtentError::Other("extent queue overflow"))?;
            }
            if extent.is_last() {
                break;
            }
        }
        Ok(())
    }

    /// Physical block of `block` from the cached extents.
    fn take_cached(&mut self, block: u32) -> FsExtentResult<u64> {
        let block = block as u64;
        loop {
            let Some(&front) = self.pending.front() else {
                return Err(FsExtentError::Hole { block: block as u32 });
            };
            if front.logical + front.length <= block {
                // Behind the cursor: left over from an earlier range.
                self.pending.pop_front();
                continue;
            }
            if front.logical > block {
                return Err(FsExtentError::Hole { block: block as u32 });
            }

            let physical = front.physical + (block - front.logical);
            if front.logical + front.length == block + 1 {
                self.pending.pop_front();
            }
            return Ok(physical);
        }
    }
}
