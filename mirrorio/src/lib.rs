// SPDX-License-Identifier: MIT

// Core modules
pub mod blockmap;
pub mod errors;
#[macro_use]
mod macros;

// Backend modules
mod file;

#[cfg(any(test, feature = "mem"))]
mod mem;

#[cfg(target_os = "linux")]
pub mod linux;

// Prelude re-exports (central entrypoint)
pub mod prelude {
    pub use super::BlockIO;
    pub use super::BlockIOExt;
    pub use super::BlockIOStructExt;
    pub use super::blockmap::*;
    pub use super::errors::*;
    pub use super::file::FileBlockIO;

    #[cfg(any(test, feature = "mem"))]
    pub use super::mem::MemBlockIO;

    #[cfg(target_os = "linux")]
    pub use super::linux::{DeviceInfo, DeviceKind, FileBlockMapper, SharedMapping};
}

use errors::*;

/// Largest struct `read_struct` will stage on the stack.
pub const BLOCK_BUF_SIZE: usize = 4096;

/// Positional block IO.
///
/// Every call transfers the whole buffer or fails; implementations never
/// return a partial success.
pub trait BlockIO {
    /// Writes `data` at absolute byte `offset`.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult;

    /// Reads `buf.len()` bytes from absolute byte `offset`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult;

    /// Makes previous writes durable (may be a no-op).
    fn flush(&mut self) -> BlockIOResult;
}

/// Convenience helpers on top of `BlockIO`.
pub trait BlockIOExt: BlockIO {
    // read_u16_at / write_u32_at / ...
    blockio_impl_primitive_rw!(u16, u32, u64);
}

impl<T: BlockIO + ?Sized> BlockIOExt for T {}

/// Fixed-layout struct IO through zerocopy.
pub trait BlockIOStructExt: BlockIO {
    /// Reads a struct of type `T` from the given offset.
    fn read_struct<T: zerocopy::FromBytes + zerocopy::KnownLayout + zerocopy::Immutable>(
        &mut self,
        offset: u64,
    ) -> BlockIOResult<T> {
        let size = core::mem::size_of::<T>();
        if size > BLOCK_BUF_SIZE {
            return Err(BlockIOError::Other("read_struct: type too large"));
        }
        let mut buf = [0u8; BLOCK_BUF_SIZE];
        self.read_at(offset, &mut buf[..size])?;
        T::read_from_bytes(&buf[..size]).map_err(|_| BlockIOError::Other("read_struct failed"))
    }

    /// Writes a struct of type `T` at the given offset.
    fn write_struct<T: zerocopy::IntoBytes + zerocopy::KnownLayout + zerocopy::Immutable>(
        &mut self,
        offset: u64,
        val: &T,
    ) -> BlockIOResult {
        self.write_at(offset, val.as_bytes())
    }
}

impl<T: BlockIO + ?Sized> BlockIOStructExt for T {}
