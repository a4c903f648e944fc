// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::ErrorKind;
use std::os::unix::fs::FileExt;

use crate::{BlockIO, BlockIOError, BlockIOResult};

/// Positional `BlockIO` over an open file or block device.
///
/// Interrupted system calls are retried; a transfer that stops early is an
/// error. `flush` waits for the data to reach the device.
#[derive(Debug)]
pub struct FileBlockIO<'a> {
    file: &'a File,
}

impl<'a> FileBlockIO<'a> {
    #[inline]
    pub fn new(file: &'a File) -> Self {
        Self { file }
    }
}

impl<'a> BlockIO for FileBlockIO<'a> {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult {
        let mut done = 0;
        while done < data.len() {
            match self.file.write_at(&data[done..], offset + done as u64) {
                Ok(0) => {
                    return Err(BlockIOError::ShortTransfer {
                        offset,
                        expected: data.len(),
                        done,
                    });
                }
                Ok(n) => done += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(BlockIOError::io("write", e)),
            }
        }
        Ok(())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult {
        let expected = buf.len();
        let mut done = 0;
        while done < expected {
            match self.file.read_at(&mut buf[done..], offset + done as u64) {
                Ok(0) => {
                    return Err(BlockIOError::ShortTransfer {
                        offset,
                        expected,
                        done,
                    });
                }
                Ok(n) => done += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(BlockIOError::io("read", e)),
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> BlockIOResult {
        self.file
            .sync_data()
            .map_err(|e| BlockIOError::io("fdatasync", e))
    }
}
