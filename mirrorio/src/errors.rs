// SPDX-License-Identifier: MIT

use core::fmt;
use std::io;

/// Result type for BlockIO operations.
pub type BlockIOResult<T = ()> = core::result::Result<T, BlockIOError>;

/// Error type for BlockIO operations and device probing.
#[derive(Debug)]
pub enum BlockIOError {
    Other(&'static str),
    OutOfBounds,
    Unsupported,
    /// A read or write moved fewer bytes than requested.
    ShortTransfer {
        offset: u64,
        expected: usize,
        done: usize,
    },
    /// Sector size outside 512..=4096 or not a power of two.
    SectorSize(u32),
    /// A system call failed; `op` names the call.
    Io {
        op: &'static str,
        source: io::Error,
    },
}

impl BlockIOError {
    pub fn msg(&self) -> &'static str {
        match self {
            BlockIOError::Other(msg) => msg,
            BlockIOError::OutOfBounds => "Out of bounds",
            BlockIOError::Unsupported => "Unsupported operation",
            BlockIOError::ShortTransfer { .. } => "Truncated transfer",
            BlockIOError::SectorSize(_) => "Unsupported sector size",
            BlockIOError::Io { op, .. } => op,
        }
    }

    #[cold]
    pub fn io(op: &'static str, source: io::Error) -> Self {
        BlockIOError::Io { op, source }
    }

    /// Wraps `errno` from the last failed libc call.
    #[cold]
    pub fn last_os(op: &'static str) -> Self {
        BlockIOError::Io {
            op,
            source: io::Error::last_os_error(),
        }
    }
}

impl From<&'static str> for BlockIOError {
    #[inline]
    fn from(msg: &'static str) -> Self {
        BlockIOError::Other(msg)
    }
}

impl fmt::Display for BlockIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockIOError::ShortTransfer {
                offset,
                expected,
                done,
            } => write!(
                f,
                "{} at offset {offset:#x} ({done} of {expected} bytes)",
                self.msg()
            ),
            BlockIOError::SectorSize(size) => write!(f, "{}: {size}", self.msg()),
            BlockIOError::Io { op, source } => write!(f, "{op}: {source}"),
            _ => write!(f, "{}", self.msg()),
        }
    }
}

impl std::error::Error for BlockIOError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BlockIOError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
