// SPDX-License-Identifier: MIT

use core::fmt;

pub use mirrorio::errors::*;
pub use mirrorpart::errors::{MbrError, PartError};

/// Geometry that cannot be laid out in front of the Linux partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsLayoutError {
    /// More data clusters than a 28-bit FAT can address.
    TooLarge { clusters: u32 },
    /// The partition starts before `needed` metadata sectors fit.
    SlackTooSmall { start: u32, needed: u64 },
    NoConvergence,
    /// Metadata region too big to stage in memory.
    RegionTooLarge { bytes: u64 },
    Invalid(&'static str),
    Other(&'static str),
}

impl FsLayoutError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsLayoutError::TooLarge { .. } => "FS too large",
            FsLayoutError::SlackTooSmall { .. } => "slack too small",
            FsLayoutError::NoConvergence => "FAT layout did not converge",
            FsLayoutError::RegionTooLarge { .. } => "unable to map oversized metadata",
            FsLayoutError::Invalid(msg) => msg,
            FsLayoutError::Other(msg) => msg,
        }
    }
}

impl fmt::Display for FsLayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsLayoutError::TooLarge { clusters } => {
                write!(f, "{} ({clusters} clusters)", self.msg())
            }
            FsLayoutError::SlackTooSmall { start, needed } => write!(
                f,
                "{}: partition starts at sector {start}, metadata needs {needed}",
                self.msg()
            ),
            FsLayoutError::RegionTooLarge { bytes } => write!(f, "{} ({bytes} bytes)", self.msg()),
            _ => write!(f, "{}", self.msg()),
        }
    }
}

/// Source file block map that cannot be aliased by FAT clusters.
#[derive(Debug)]
pub enum FsExtentError {
    IO(BlockIOError),
    /// Extent mapping failed after it had already worked once.
    ExtentMapLost(BlockIOError),
    Misaligned {
        logical: u64,
        physical: u64,
        length: u64,
    },
    UnexpectedFlags {
        logical: u64,
        flags: u32,
    },
    /// No extent covers logical block `block`.
    Hole { block: u32 },
    /// Per-block mapping returned 0 for logical block `block`.
    UnmappedBlock { block: u32 },
    /// Physical block beyond what a cluster number can hold.
    ClusterOverflow { physical: u64 },
    Invalid(&'static str),
    Other(&'static str),
}

impl FsExtentError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsExtentError::IO(e) => e.msg(),
            FsExtentError::ExtentMapLost(_) => "extent mapping failed after previously working",
            FsExtentError::Misaligned { .. } => "unaligned extent",
            FsExtentError::UnexpectedFlags { .. } => "unexpected extent flags",
            FsExtentError::Hole { .. } => "unexpected hole in file",
            FsExtentError::UnmappedBlock { .. } => "unexpected special or non-contiguous block",
            FsExtentError::ClusterOverflow { .. } => "physical block beyond FAT32 cluster range",
            FsExtentError::Invalid(msg) => msg,
            FsExtentError::Other(msg) => msg,
        }
    }
}

impl fmt::Display for FsExtentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsExtentError::IO(e) => write!(f, "{e}"),
            FsExtentError::ExtentMapLost(e) => write!(f, "{}: {e}", self.msg()),
            FsExtentError::Misaligned {
                logical,
                physical,
                length,
            } => write!(
                f,
                "{}: logical {logical:#x} physical {physical:#x} length {length:#x}",
                self.msg()
            ),
            FsExtentError::UnexpectedFlags { logical, flags } => {
                write!(f, "{} {flags:#x} at logical {logical:#x}", self.msg())
            }
            FsExtentError::Hole { block } | FsExtentError::UnmappedBlock { block } => {
                write!(f, "{} at block {block}", self.msg())
            }
            FsExtentError::ClusterOverflow { physical } => {
                write!(f, "{} (block {physical})", self.msg())
            }
            _ => write!(f, "{}", self.msg()),
        }
    }
}

/// FAT chain consistency failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsChainError {
    /// The cluster is already in use by a chain.
    Overlap { cluster: u32 },
    /// The cluster is outside the data region.
    OutOfRange { cluster: u32 },
    Other(&'static str),
}

impl FsChainError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsChainError::Overlap { .. } => {
                "overlapping cluster, perhaps duplicate file path or copy on write?"
            }
            FsChainError::OutOfRange { .. } => "cluster outside FAT32 data region",
            FsChainError::Other(msg) => msg,
        }
    }
}

impl fmt::Display for FsChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsChainError::Overlap { cluster } | FsChainError::OutOfRange { cluster } => {
                write!(f, "{} (cluster {cluster})", self.msg())
            }
            FsChainError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

/// Root directory encoding and placement failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsDirError {
    NoSpace { needed: usize },
    NameTooLong { len: usize },
    Other(&'static str),
}

impl FsDirError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsDirError::NoSpace { .. } => "insufficient space for directory entry",
            FsDirError::NameTooLong { .. } => "file name too long",
            FsDirError::Other(msg) => msg,
        }
    }
}

impl fmt::Display for FsDirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsDirError::NoSpace { needed } => write!(f, "{} ({needed} slots)", self.msg()),
            FsDirError::NameTooLong { len } => write!(f, "{} ({len} characters)", self.msg()),
            FsDirError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

/// A source file or filesystem the overlay cannot take in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsIngestError {
    /// File lives on another device than the validated mount.
    WrongMount { expected: u64, found: u64 },
    OversizedFile { size: u64 },
    BlockSizeMismatch { block_size: u32, cluster_size: u32 },
    /// Ingest or commit attempted in the wrong phase.
    Sequence(&'static str),
    Other(&'static str),
}

impl FsIngestError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsIngestError::WrongMount { .. } => "wrong mount point",
            FsIngestError::OversizedFile { .. } => "oversized file",
            FsIngestError::BlockSizeMismatch { .. } => "source block size differs from cluster size",
            FsIngestError::Sequence(msg) => msg,
            FsIngestError::Other(msg) => msg,
        }
    }
}

impl fmt::Display for FsIngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsIngestError::WrongMount { expected, found } => write!(
                f,
                "{}: device {found:#x}, mount is on {expected:#x}",
                self.msg()
            ),
            FsIngestError::OversizedFile { size } => write!(f, "{} ({size} bytes)", self.msg()),
            FsIngestError::BlockSizeMismatch {
                block_size,
                cluster_size,
            } => write!(
                f,
                "{}: block {block_size}, cluster {cluster_size}",
                self.msg()
            ),
            _ => write!(f, "{}", self.msg()),
        }
    }
}

/// Top-level error
#[derive(Debug)]
pub enum FsError {
    IO(BlockIOError),
    Part(PartError),
    Layout(FsLayoutError),
    Extent(FsExtentError),
    Chain(FsChainError),
    Dir(FsDirError),
    Ingest(FsIngestError),
    Other(&'static str),
}

impl FsError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsError::IO(e) => e.msg(),
            FsError::Part(e) => e.msg(),
            FsError::Layout(e) => e.msg(),
            FsError::Extent(e) => e.msg(),
            FsError::Chain(e) => e.msg(),
            FsError::Dir(e) => e.msg(),
            FsError::Ingest(e) => e.msg(),
            FsError::Other(msg) => msg,
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::IO(e) => write!(f, "{e}"),
            FsError::Part(e) => write!(f, "{e}"),
            FsError::Layout(e) => write!(f, "{e}"),
            FsError::Extent(e) => write!(f, "{e}"),
            FsError::Chain(e) => write!(f, "{e}"),
            FsError::Dir(e) => write!(f, "{e}"),
            FsError::Ingest(e) => write!(f, "{e}"),
            FsError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FsError::IO(e) => e.source(),
            FsError::Part(e) => std::error::Error::source(e),
            FsError::Extent(FsExtentError::IO(e) | FsExtentError::ExtentMapLost(e)) => e.source(),
            _ => None,
        }
    }
}

// === type Fs*Result ===

pub type FsResult<T = ()> = Result<T, FsError>;
pub type FsLayoutResult<T = ()> = Result<T, FsLayoutError>;
pub type FsExtentResult<T = ()> = Result<T, FsExtentError>;
pub type FsChainResult<T = ()> = Result<T, FsChainError>;
pub type FsDirResult<T = ()> = Result<T, FsDirError>;

crate::fs_error_wiring! {
    top => FsError {
        BlockIOError   : IO,
        PartError      : Part,
        FsLayoutError  : Layout,
        FsExtentError  : Extent,
        FsChainError   : Chain,
        FsDirError     : Dir,
        FsIngestError  : Ingest,
    },
    str_into => [
        FsLayoutError,
        FsExtentError,
        FsChainError,
        FsDirError,
        FsIngestError,
    ],
    sub => {
        BlockIOError => [ FsExtentError::IO ],
    },
}
