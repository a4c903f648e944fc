// SPDX-License-Identifier: MIT

use core::fmt;

use mirrorio::errors::*;

/// Reasons an MBR cannot host a FAT32 overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbrError {
    /// 0x55AA missing at `offset` in the first sector.
    MissingSignature { offset: u32 },
    InvalidBootFlag { index: usize, got: u8 },
    /// Neither empty, a Linux entry with a nonzero start, nor a hybrid FAT32 entry.
    UnexpectedEntry { index: usize, part_type: u8, start: u32 },
    OutOfDevice { index: usize, end: u64, total: u32 },
    TooManyLinux,
    TooManyFat32,
    MissingLinux,
    /// A FAT32 overlay already exists in slot `index`.
    ExistingOverlay { index: usize },
    NoFreeSlot,
}

impl MbrError {
    pub fn msg(&self) -> &'static str {
        match self {
            MbrError::MissingSignature { .. } => "missing MBR signature",
            MbrError::InvalidBootFlag { .. } => "invalid partition marker",
            MbrError::UnexpectedEntry { .. } => "unexpected partition entry",
            MbrError::OutOfDevice { .. } => "bad partition",
            MbrError::TooManyLinux => "too many Linux partitions",
            MbrError::TooManyFat32 => "too many FAT32 partitions",
            MbrError::MissingLinux => "missing Linux partition",
            MbrError::ExistingOverlay { .. } => "FAT32 overlay already present",
            MbrError::NoFreeSlot => "no free partition slot",
        }
    }
}

impl fmt::Display for MbrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MbrError::MissingSignature { offset } => {
                write!(f, "{} at offset {offset:#x}", self.msg())
            }
            MbrError::InvalidBootFlag { index, got } => {
                write!(f, "{} {got:#04x} in slot {index}", self.msg())
            }
            MbrError::UnexpectedEntry {
                index,
                part_type,
                start,
            } => write!(
                f,
                "{} in slot {index}: type {part_type:#04x} starting at sector {start}",
                self.msg()
            ),
            MbrError::OutOfDevice { index, end, total } => write!(
                f,
                "{} in slot {index}: ends at sector {end}, device has {total}",
                self.msg()
            ),
            MbrError::ExistingOverlay { index } => {
                write!(f, "{} in slot {index} (use -f to rebuild it)", self.msg())
            }
            _ => write!(f, "{}", self.msg()),
        }
    }
}

/// Unified error type for partition table handling.
#[derive(Debug)]
pub enum PartError {
    IO(BlockIOError),
    Mbr(MbrError),
    Invalid(&'static str),
}

impl PartError {
    pub fn msg(&self) -> &'static str {
        match self {
            PartError::IO(e) => e.msg(),
            PartError::Mbr(e) => e.msg(),
            PartError::Invalid(msg) => msg,
        }
    }
}

impl From<BlockIOError> for PartError {
    fn from(e: BlockIOError) -> Self {
        PartError::IO(e)
    }
}

impl From<MbrError> for PartError {
    fn from(e: MbrError) -> Self {
        PartError::Mbr(e)
    }
}

impl fmt::Display for PartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartError::IO(e) => write!(f, "{e}"),
            PartError::Mbr(e) => write!(f, "{e}"),
            PartError::Invalid(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PartError::IO(e) => Some(e),
            _ => None,
        }
    }
}

pub type PartResult<T = ()> = Result<T, PartError>;
