// SPDX-License-Identifier: MIT

use crate::{BlockIO, BlockIOError, BlockIOResult};

/// In-memory implementation of `BlockIO`.
///
/// Stands in for a device in tests.
#[derive(Debug)]
pub struct MemBlockIO<'a> {
    buffer: &'a mut [u8],
}

impl<'a> MemBlockIO<'a> {
    #[inline]
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer }
    }

    #[inline]
    fn span(&self, offset: u64, len: usize) -> BlockIOResult<core::ops::Range<usize>> {
        let start = usize::try_from(offset).map_err(|_| BlockIOError::OutOfBounds)?;
        let end = start.checked_add(len).ok_or(BlockIOError::OutOfBounds)?;
        if end > self.buffer.len() {
            return Err(BlockIOError::OutOfBounds);
        }
        Ok(start..end)
    }
}

impl<'a> BlockIO for MemBlockIO<'a> {
    #[inline(always)]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult {
        let span = self.span(offset, data.len())?;
        self.buffer[span].copy_from_slice(data);
        Ok(())
    }

    #[inline(always)]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult {
        let span = self.span(offset, buf.len())?;
        buf.copy_from_slice(&self.buffer[span]);
        Ok(())
    }

    #[inline]
    fn flush(&mut self) -> BlockIOResult {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn test_rw() {
        let mut buf = [0u8; 256];
        let mut io = MemBlockIO::new(&mut buf);
        io.write_at(10, &[1, 2, 3, 4]).unwrap();

        let mut output = [0u8; 4];
        io.read_at(10, &mut output).unwrap();
        assert_eq!(output, [1, 2, 3, 4]);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut buf = [0u8; 16];
        let mut io = MemBlockIO::new(&mut buf);
        assert!(matches!(
            io.write_at(12, &[0u8; 8]),
            Err(BlockIOError::OutOfBounds)
        ));
        assert!(io.read_at(u64::MAX, &mut [0u8; 1]).is_err());
    }

    #[test]
    fn test_primitive_le() {
        let mut buf = [0u8; 16];
        let mut io = MemBlockIO::new(&mut buf);
        io.write_u32_at(4, 0x0FFF_FFF7).unwrap();
        io.write_u16_at(0, 0xAA55).unwrap();
        assert_eq!(io.read_u32_at(4).unwrap(), 0x0FFF_FFF7);
        assert_eq!(io.read_u16_at(0).unwrap(), 0xAA55);
        assert_eq!(&buf[..2], &[0x55, 0xAA]);
        assert_eq!(&buf[4..8], &[0xF7, 0xFF, 0xFF, 0x0F]);
    }
}
