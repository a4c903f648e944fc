// SPDX-License-Identifier: MIT

use crate::{
    errors::*,
    fat32::{constant::*, region::MetaRegion, types::Fat32Entries},
};

/// First index of `needed` consecutive never-used root directory slots.
pub fn find_free_run<B>(region: &MetaRegion<B>, needed: usize) -> FsDirResult<usize>
where
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    let mut run = 0;
    for index in 0..region.dir_slot_count() {
        match region.dir_slot(index) {
            Some(slot) if slot[0] == FAT_ENTRY_FREE => {
                run += 1;
                if run == needed {
                    return Ok(index + 1 - needed);
                }
            }
            _ => run = 0,
        }
    }
    Err(FsDirError::NoSpace { needed })
}

/// Stores `entries` starting at slot `first`.
pub fn write_entries<B>(
    region: &mut MetaRegion<B>,
    first: usize,
    entries: &Fat32Entries,
) -> FsDirResult
where
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    for (offset, raw) in entries.slots().enumerate() {
        region.set_dir_slot(first + offset, raw)?;
    }
    Ok(())
}
