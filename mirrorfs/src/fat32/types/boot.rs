// SPDX-License-Identifier: MIT

use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::fat32::{constant::*, layout::Fat32Layout};

/// FAT32 BIOS parameter block: the first 90 bytes of the boot sector.
///
/// In a hybrid sector 0 the rest of the sector up to 0x1BE stays free for
/// the MBR partition table.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
pub struct Fat32Bpb {
    pub jump_boot: [u8; 3],
    pub oem_name: [u8; 8],
    pub bytes_per_sector: U16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: U16,
    pub num_fats: u8,
    pub root_entry_count: U16,
    pub total_sectors_16: U16,
    pub media: u8,
    pub fat_size_16: U16,
    pub sectors_per_track: U16,
    pub num_heads: U16,
    pub hidden_sectors: U32,
    pub total_sectors_32: U32,

    // FAT32 Extended BPB
    pub fat_size_32: U32,
    pub ext_flags: U16,
    pub fs_version: U16,
    pub root_cluster: U32,
    pub fsinfo_sector: U16,
    pub backup_boot_sector: U16,
    pub reserved: [u8; 12],

    pub drive_number: u8,
    pub reserved1: u8,
    pub boot_signature: u8,
    pub volume_id: U32,
    pub volume_label: [u8; 11],
    pub fs_type: [u8; 8],
}

const _: () = assert!(size_of::<Fat32Bpb>() == 0x5A);

impl Fat32Bpb {
    pub fn from_layout(layout: &Fat32Layout, volume_id: u32) -> Self {
        Self {
            jump_boot: FAT_JUMP_BOOT,
            oem_name: *FAT_OEM_NAME,
            bytes_per_sector: U16::new(layout.sector_size as u16),
            sectors_per_cluster: layout.cluster_sectors as u8,
            reserved_sectors: U16::new(layout.rsvd_sectors as u16),
            num_fats: FAT_NUM_FATS,
            root_entry_count: U16::ZERO,
            total_sectors_16: U16::ZERO,
            media: FAT_MEDIA_DESCRIPTOR,
            fat_size_16: U16::ZERO,
            sectors_per_track: U16::new(FAT_SECTORS_PER_TRACK),
            num_heads: U16::new(FAT_HEADS),
            hidden_sectors: U32::ZERO,
            total_sectors_32: U32::new(layout.volume_sectors()),
            fat_size_32: U32::new(layout.fat_sectors),
            ext_flags: U16::ZERO,
            fs_version: U16::ZERO,
            root_cluster: U32::new(FAT_ROOT_CLUSTER),
            fsinfo_sector: U16::new(layout.fsinfo_sector as u16),
            backup_boot_sector: U16::new(layout.backup_sector as u16),
            reserved: [0u8; 12],
            drive_number: FAT_DRIVE_NUMBER,
            reserved1: 0,
            boot_signature: FAT_BOOT_SIGNATURE,
            volume_id: U32::new(volume_id),
            volume_label: *FAT_VOLUME_LABEL,
            fs_type: *FAT_FS_TYPE,
        }
    }
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
pub struct Fat32FsInfo {
    pub lead_signature: [u8; 4],
    pub reserved1: [u8; 480],
    pub struct_signature: [u8; 4],
    pub free_cluster_count: U32,
    pub next_free_cluster: U32,
    pub reserved2: [u8; 12],
    pub trail_signature: [u8; 4],
}

const _: () = assert!(size_of::<Fat32FsInfo>() == FAT_LEGACY_SECTOR_SIZE);

impl Default for Fat32FsInfo {
    /// Every cluster is either claimed or marked bad, so neither hint is known.
    fn default() -> Self {
        Self {
            lead_signature: *FAT_FSINFO_LEAD_SIGNATURE,
            reserved1: [0u8; 480],
            struct_signature: *FAT_FSINFO_STRUCT_SIGNATURE,
            free_cluster_count: U32::new(FAT_FSINFO_UNKNOWN),
            next_free_cluster: U32::new(FAT_FSINFO_UNKNOWN),
            reserved2: [0u8; 12],
            trail_signature: FAT_FSINFO_TRAIL_SIGNATURE,
        }
    }
}
