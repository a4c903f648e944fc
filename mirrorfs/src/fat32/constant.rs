// SPDX-License-Identifier: MIT

// === Geometry ===

pub const FAT_START_CLUSTER: u32 = 2; // first cluster number of the cluster heap
pub const FAT_ROOT_CLUSTER: u32 = 2; // BPB_RootClus
pub const FAT_DEFAULT_CLUSTER_SECTORS: u32 = 8;
pub const FAT_ROOT_DIR_SECTORS: u32 = 32;
pub const FAT_MIN_RESERVED_SECTORS: u32 = 3; // boot + FSInfo + backup
pub const FAT_FSINFO_SECTOR: u32 = 1;
pub const FAT_BACKUP_BOOT_SECTOR: u32 = 2;
pub const FAT_LAYOUT_MAX_PASSES: usize = 32;
/// Staged metadata must stay addressable as one 31-bit slice.
pub const FAT_MAX_REGION_BYTES: u64 = i32::MAX as u64;

// === FAT entries ===

pub const FAT_ENTRY_SIZE: usize = 4;
pub const FAT_ENTRY_MASK: u32 = 0x0FFF_FFFF;
pub const FAT_FREE: u32 = 0x0000_0000;
pub const FAT_BAD: u32 = 0x0FFF_FFF7;
pub const FAT_EOC: u32 = 0x0FFF_FFFF;
pub const FAT_MEDIA_ENTRY: u32 = 0x0FFF_FFF8; // FAT[0]
/// First cluster value that is not a data cluster number.
pub const FAT_CLUSTER_LIMIT: u32 = 0x0FFF_FFF0;
/// FAT12/16 cluster number ceiling; the FAT must be able to outgrow it.
pub const FAT16_CLUSTER_LIMIT: u32 = 0xFFF0;
/// Below this many data clusters readers may take the volume for FAT16.
pub const FAT32_MIN_CLUSTERS: u32 = 65525;

// === Boot sector ===

pub const FAT_JUMP_BOOT: [u8; 3] = [0xEB, 0xFE, 0x90]; // jmp $ ; no boot code
pub const FAT_OEM_NAME: &[u8; 8] = b"MSWIN4.1";
pub const FAT_NUM_FATS: u8 = 1;
pub const FAT_MEDIA_DESCRIPTOR: u8 = 0xF8;
pub const FAT_SECTORS_PER_TRACK: u16 = 63;
pub const FAT_HEADS: u16 = 255;
pub const FAT_DRIVE_NUMBER: u8 = 0x80;
pub const FAT_BOOT_SIGNATURE: u8 = 0x29;
pub const FAT_VOLUME_LABEL: &[u8; 11] = b"FAT32MIRROR";
pub const FAT_FS_TYPE: &[u8; 8] = b"FAT32   ";
pub const FAT_SIGNATURE_LE: u16 = 0xAA55;
pub const FAT_LEGACY_SECTOR_SIZE: usize = 512;

// === FSInfo ===

pub const FAT_FSINFO_LEAD_SIGNATURE: &[u8; 4] = b"RRaA";
pub const FAT_FSINFO_STRUCT_SIGNATURE: &[u8; 4] = b"rrAa";
pub const FAT_FSINFO_TRAIL_SIGNATURE: [u8; 4] = [0x00, 0x00, 0x55, 0xAA];
pub const FAT_FSINFO_UNKNOWN: u32 = 0xFFFF_FFFF;

// === Directory entries ===

pub const FAT_DIR_ENTRY_SIZE: usize = 32;
pub const FAT_ENTRY_FREE: u8 = 0x00;
pub const FAT_ENTRY_DELETED: u8 = 0xE5;
pub const FAT_ENTRY_DELETED_ESCAPE: u8 = 0x05;
pub const FAT_SHORT_NAME_PLACEHOLDER: u8 = b'_';
pub const FAT_SHORT_NAME_PAD: u8 = b' ';
pub const FAT_SHORT_STEM_LEN: usize = 8;
pub const FAT_SHORT_NAME_LEN: usize = 11;
pub const FAT_LFN_CHARS_PER_ENTRY: usize = 13;
pub const FAT_LFN_LAST_FLAG: u8 = 0x40;
pub const FAT_LFN_MAX_CHARS: usize = 255;
pub const FAT_LFN_TERMINATOR: u16 = 0x0000;
pub const FAT_LFN_PADDING: u16 = 0xFFFF;

// === Extent resolution ===

/// Extents requested per kernel extent-map query.
pub const EXTENT_BATCH: usize = 4096;
/// Cluster numbers resolved per call.
pub const CLUSTER_BATCH: usize = 256;

/// Largest size a FAT32 directory entry can record.
pub const FAT_MAX_FILE_SIZE: u64 = u32::MAX as u64;
