// SPDX-License-Identifier: MIT

use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::fat32::{attr::Fat32Attributes, constant::*};

/// Short (8.3) directory entry.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
pub struct Fat32Entry {
    pub name: [u8; 11],
    pub attr: u8,
    pub nt_reserved: u8,
    pub creation_time_tenth: u8,
    pub creation_time: U16,
    pub creation_date: U16,
    pub access_date: U16,
    pub first_cluster_high: U16,
    pub write_time: U16,
    pub write_date: U16,
    pub first_cluster_low: U16,
    pub file_size: U32,
}

const _: () = assert!(size_of::<Fat32Entry>() == FAT_DIR_ENTRY_SIZE);

impl Fat32Entry {
    pub fn new(
        name: [u8; 11],
        attr: Fat32Attributes,
        cluster: u32,
        size: u32,
        (date, time, fine): (u16, u16, u8),
    ) -> Self {
        Self {
            name,
            attr: attr.bits(),
            nt_reserved: 0,
            creation_time_tenth: fine,
            creation_time: U16::new(time),
            creation_date: U16::new(date),
            access_date: U16::new(date),
            first_cluster_high: U16::new((cluster >> 16) as u16),
            write_time: U16::new(time),
            write_date: U16::new(date),
            first_cluster_low: U16::new(cluster as u16),
            file_size: U32::new(size),
        }
    }

    #[inline]
    pub fn set_first_cluster(&mut self, cluster: u32) {
        self.first_cluster_high = U16::new((cluster >> 16) as u16);
        self.first_cluster_low = U16::new(cluster as u16);
    }

    #[inline]
    pub fn first_cluster(&self) -> u32 {
        ((self.first_cluster_high.get() as u32) << 16) | self.first_cluster_low.get() as u32
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.file_size.get()
    }
}

/// Long file name entry carrying 13 name characters.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
pub struct Fat32LfnEntry {
    pub order: u8,
    pub name1: [U16; 5],
    pub attr: u8,
    pub type_field: u8,
    pub checksum: u8,
    pub name2: [U16; 6],
    pub zero: U16,
    pub name3: [U16; 2],
}

const _: () = assert!(size_of::<Fat32LfnEntry>() == FAT_DIR_ENTRY_SIZE);

impl Fat32LfnEntry {
    pub fn new(order: u8, is_last: bool, chars: &[u16; FAT_LFN_CHARS_PER_ENTRY], checksum: u8) -> Self {
        let mut name1 = [U16::ZERO; 5];
        let mut name2 = [U16::ZERO; 6];
        let mut name3 = [U16::ZERO; 2];
        for (i, &c) in chars.iter().enumerate() {
            let c = U16::new(c);
            match i {
                0..=4 => name1[i] = c,
                5..=10 => name2[i - 5] = c,
                _ => name3[i - 11] = c,
            }
        }

        Self {
            order: if is_last { order | FAT_LFN_LAST_FLAG } else { order },
            name1,
            attr: Fat32Attributes::LFN.bits(),
            type_field: 0x00,
            checksum,
            name2,
            zero: U16::ZERO,
            name3,
        }
    }

    pub fn chars(&self) -> [u16; FAT_LFN_CHARS_PER_ENTRY] {
        let mut out = [0u16; FAT_LFN_CHARS_PER_ENTRY];
        let all = self.name1.iter().chain(&self.name2).chain(&self.name3);
        for (slot, c) in out.iter_mut().zip(all) {
            *slot = c.get();
        }
        out
    }
}

/// One file's directory entries in on-disk order: LFN chain, then the short entry.
#[derive(Debug, Clone)]
pub struct Fat32Entries {
    pub lfn: Vec<Fat32LfnEntry>,
    pub entry: Fat32Entry,
}

impl Fat32Entries {
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.lfn.len() + 1
    }

    /// Raw 32-byte records in the order they go into the directory.
    pub fn slots(&self) -> impl Iterator<Item = &[u8]> {
        self.lfn
            .iter()
            .map(|e| e.as_bytes())
            .chain(core::iter::once(self.entry.as_bytes()))
    }

    pub fn volume_label(label: [u8; 11], stamp: (u16, u16, u8)) -> Self {
        Self {
            lfn: Vec::new(),
            entry: Fat32Entry::new(label, Fat32Attributes::VOLUME_ID, 0, 0, stamp),
        }
    }
}
