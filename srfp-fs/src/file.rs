//! Read-only file handle.

use crate::bridge::RemoteFs;
use crate::error::Result;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// An open remote file with its own read cursor.
///
/// The size is captured when the file is opened and only used to resolve
/// [`SeekFrom::End`]; reads go to the device and stop wherever it reports
/// end of file.
pub struct RemoteFile<'a> {
    fs: &'a RemoteFs,
    path: PathBuf,
    size: u64,
    cursor: u64,
}

impl<'a> RemoteFile<'a> {
    pub(crate) fn new(fs: &'a RemoteFs, path: PathBuf, size: u64) -> Self {
        Self {
            fs,
            path,
            size,
            cursor: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size reported by the device at open time.
    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Read up to `size` bytes from the cursor and advance it by the number
    /// actually returned. Empty at end of file.
    pub fn read_bytes(&mut self, size: usize) -> Result<Vec<u8>> {
        let data = self.fs.read_range(&self.path, self.cursor, size)?;
        self.cursor += data.len() as u64;
        Ok(data)
    }
}

impl Read for RemoteFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        // One chunk per call keeps a slow link responsive to the caller.
        let want = buf.len().min(self.fs.config().max_chunk_size as usize);
        let data = self.read_bytes(want)?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }
}

impl Seek for RemoteFile<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(delta) => self.size.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.cursor.checked_add_signed(delta),
        };
        match target {
            Some(n) => {
                self.cursor = n;
                Ok(n)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}
