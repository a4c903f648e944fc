// SPDX-License-Identifier: MIT

use mirrorio::prelude::*;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::*;

pub const MBR_SIGNATURE: [u8; 2] = [0x55, 0xAA];
/// `MBR_SIGNATURE` read as a little-endian u16.
pub const MBR_SIGNATURE_LE: u16 = 0xAA55;
/// Offset of the legacy signature, independent of the device sector size.
pub const MBR_LEGACY_SIGNATURE_OFFSET: u32 = 510;
/// Disk signature (4 bytes) and its reserved word, just ahead of the entries.
pub const MBR_DISK_SIGNATURE_OFFSET: usize = 0x1B8;
pub const MBR_ENTRIES_OFFSET: usize = 0x1BE;
pub const MBR_ENTRY_COUNT: usize = 4;

pub const PART_TYPE_LINUX: u8 = 0x83;
pub const PART_TYPE_FAT32_LBA: u8 = 0x0C;
pub const BOOT_FLAG_NONE: u8 = 0x00;
pub const BOOT_FLAG_ACTIVE: u8 = 0x80;

/// What a partition slot holds, as far as the overlay is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRole {
    Empty,
    Linux,
    /// FAT32 whose boot sector shares sector 0 with the MBR.
    HybridFat32,
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)] // 16 bytes, correctly aligned
pub struct MbrEntry {
    pub boot_flag: u8,
    pub starting_chs: [u8; 3],
    pub part_type: u8,
    pub end_chs: [u8; 3],
    pub start_lba: u32,
    pub sectors: u32,
}

impl MbrEntry {
    #[inline]
    pub fn new(boot_flag: u8, part_type: u8, start_lba: u32, sectors: u32) -> Self {
        Self {
            boot_flag,
            starting_chs: [0; 3],
            part_type,
            end_chs: [0; 3],
            start_lba,
            sectors,
        }
    }

    #[inline]
    pub fn new_empty() -> Self {
        Self::new(BOOT_FLAG_NONE, 0, 0, 0)
    }

    /// Hybrid FAT32 entry: starts at sector 0 so the boot sector and the
    /// partition table share the first sector.
    #[inline]
    pub fn new_fat32_hybrid(sectors: u32) -> Self {
        Self::new(BOOT_FLAG_NONE, PART_TYPE_FAT32_LBA, 0, sectors)
    }

    /// A slot with no sectors is free whatever its type byte says.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sectors == 0
    }

    /// First sector past the partition.
    #[inline]
    pub fn end_lba(&self) -> u64 {
        self.start_lba as u64 + self.sectors as u64
    }

    pub fn role(&self, index: usize) -> PartResult<EntryRole> {
        if self.boot_flag != BOOT_FLAG_NONE && self.boot_flag != BOOT_FLAG_ACTIVE {
            return Err(MbrError::InvalidBootFlag {
                index,
                got: self.boot_flag,
            }
            .into());
        }
        if self.is_empty() {
            return Ok(EntryRole::Empty);
        }
        match (self.part_type, self.start_lba) {
            (PART_TYPE_LINUX, start) if start != 0 => Ok(EntryRole::Linux),
            (PART_TYPE_FAT32_LBA, 0) => Ok(EntryRole::HybridFat32),
            (part_type, start) => Err(MbrError::UnexpectedEntry {
                index,
                part_type,
                start,
            }
            .into()),
        }
    }
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct MbrEntryPacked {
    pub boot_flag: u8,
    pub starting_chs: [u8; 3],
    pub part_type: u8,
    pub end_chs: [u8; 3],
    pub start_lba: u32,
    pub sectors: u32,
}

impl MbrEntryPacked {
    #[inline]
    pub fn to_aligned(self) -> MbrEntry {
        MbrEntry {
            boot_flag: self.boot_flag,
            starting_chs: self.starting_chs,
            part_type: self.part_type,
            end_chs: self.end_chs,
            start_lba: u32::from_le(self.start_lba),
            sectors: u32::from_le(self.sectors),
        }
    }

    #[inline]
    pub fn from_aligned(e: &MbrEntry) -> Self {
        Self {
            boot_flag: e.boot_flag,
            starting_chs: e.starting_chs,
            part_type: e.part_type,
            end_chs: e.end_chs,
            start_lba: e.start_lba.to_le(),
            sectors: e.sectors.to_le(),
        }
    }
}

/// Classic 512-byte MBR.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct Mbr {
    pub boot_code: [u8; MBR_ENTRIES_OFFSET],
    pub entries: [MbrEntryPacked; MBR_ENTRY_COUNT],
    pub signature: [u8; 2],
}

const _: () = assert!(size_of::<Mbr>() == 512);

/// Location of a partition in device sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionExtent {
    pub index: usize,
    pub start: u32,
    pub sectors: u32,
}

/// Result of checking an MBR for overlay use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbrScan {
    pub linux: PartitionExtent,
    pub fat32_slot: Option<usize>,
    pub free_slot: Option<usize>,
}

impl MbrScan {
    /// Slot that will receive the FAT32 entry.
    ///
    /// An existing overlay is only reused when `replace_existing` is set.
    pub fn overlay_slot(&self, replace_existing: bool) -> PartResult<usize> {
        match (self.fat32_slot, self.free_slot) {
            (Some(index), _) if replace_existing => Ok(index),
            (Some(index), _) => Err(MbrError::ExistingOverlay { index }.into()),
            (None, Some(index)) => Ok(index),
            (None, None) => Err(MbrError::NoFreeSlot.into()),
        }
    }
}

impl Mbr {
    #[inline]
    pub fn new_from_entries(entries: [MbrEntry; MBR_ENTRY_COUNT]) -> Self {
        Self {
            boot_code: [0u8; MBR_ENTRIES_OFFSET],
            entries: entries.map(|e| MbrEntryPacked::from_aligned(&e)),
            signature: MBR_SIGNATURE,
        }
    }

    #[inline]
    pub fn has_valid_signature(&self) -> bool {
        self.signature == MBR_SIGNATURE
    }

    #[inline]
    pub fn aligned_entries(&self) -> [MbrEntry; MBR_ENTRY_COUNT] {
        let entries = self.entries;
        entries.map(MbrEntryPacked::to_aligned)
    }

    #[inline]
    pub fn set_entry(&mut self, index: usize, entry: &MbrEntry) -> PartResult {
        let slot = self
            .entries
            .get_mut(index)
            .ok_or(PartError::Invalid("partition slot out of range"))?;
        *slot = MbrEntryPacked::from_aligned(entry);
        Ok(())
    }

    /// Validates every slot against a device of `total_sectors` and locates
    /// the Linux partition, any existing overlay and the first free slot.
    pub fn scan(&self, total_sectors: u32) -> PartResult<MbrScan> {
        let mut linux = None;
        let mut fat32_slot = None;
        let mut free_slot = None;

        for (index, entry) in self.aligned_entries().iter().enumerate() {
            let role = entry.role(index)?;
            if entry.end_lba() > total_sectors as u64 {
                return Err(MbrError::OutOfDevice {
                    index,
                    end: entry.end_lba(),
                    total: total_sectors,
                }
                .into());
            }
            match role {
                EntryRole::Empty => {
                    free_slot.get_or_insert(index);
                }
                EntryRole::HybridFat32 => {
                    if fat32_slot.replace(index).is_some() {
                        return Err(MbrError::TooManyFat32.into());
                    }
                }
                EntryRole::Linux => {
                    let extent = PartitionExtent {
                        index,
                        start: entry.start_lba,
                        sectors: entry.sectors,
                    };
                    if linux.replace(extent).is_some() {
                        return Err(MbrError::TooManyLinux.into());
                    }
                }
            }
        }

        let linux = linux.ok_or(MbrError::MissingLinux)?;
        Ok(MbrScan {
            linux,
            fat32_slot,
            free_slot,
        })
    }
}

/// Reads sector 0 and requires the boot signature both at the legacy offset
/// and at the end of a `sector_size` sector.
pub fn read_mbr<IO: BlockIO + ?Sized>(io: &mut IO, sector_size: u32) -> PartResult<Mbr> {
    let mbr: Mbr = io.read_struct(0)?;
    for offset in [MBR_LEGACY_SIGNATURE_OFFSET, sector_size.saturating_sub(2)] {
        if io.read_u16_at(offset as u64)? != MBR_SIGNATURE_LE {
            return Err(MbrError::MissingSignature { offset }.into());
        }
    }
    Ok(mbr)
}
