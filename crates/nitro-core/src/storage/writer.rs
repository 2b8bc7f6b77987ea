//! Concurrent offset writer for the destination file.

use std::fs::File;
use std::io;
use std::sync::Arc;
#[cfg(unix)]
use std::os::unix::fs::FileExt;
#[cfg(windows)]
use std::os::windows::fs::FileExt;

/// Shared handle to the destination file. Cheap to clone; each `write_at` is
/// independent (pwrite-style) and never moves a shared cursor.
#[derive(Clone)]
pub struct StorageWriter {
    file: Arc<File>,
}

impl StorageWriter {
    pub(crate) fn from_file(file: File) -> Self {
        Self {
            file: Arc::new(file),
        }
    }

    /// Write all of `data` at `offset`.
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.file.write_all_at(data, offset)
    }

    /// Write all of `data` at `offset`. `seek_write` moves the Windows file
    /// pointer but every call passes its own offset, so callers never rely on it.
    #[cfg(windows)]
    pub fn write_at(&self, offset: u64, mut data: &[u8]) -> io::Result<()> {
        let mut offset = offset;
        while !data.is_empty() {
            match self.file.seek_write(data, offset) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                Ok(n) => {
                    data = &data[n..];
                    offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Flush file data and metadata to disk.
    pub fn sync(&self) -> io::Result<()> {
        self.file.sync_all()
    }
}
