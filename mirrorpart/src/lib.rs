// SPDX-License-Identifier: MIT

//! MBR handling for FAT32 overlays: reads the partition table, checks that
//! it only holds what an overlay can coexist with, and picks the slot the
//! hybrid FAT32 entry goes into.

pub mod errors;
/// Master Boot Record structures and overlay scan.
pub mod mbr;

pub use mbr::{Mbr, MbrEntry, MbrScan, PartitionExtent, read_mbr};
