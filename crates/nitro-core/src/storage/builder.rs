//! Opening the destination file and reserving its final size.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use super::writer::StorageWriter;

/// Destination file that has been opened but not yet handed to segments.
pub struct StorageWriterBuilder {
    file: File,
}

impl StorageWriterBuilder {
    /// Open `path` for writing, discarding whatever it held before.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self { file })
    }

    /// Grow the file to `size` bytes so every segment offset is addressable.
    pub fn preallocate(&mut self, size: u64) -> io::Result<()> {
        if size == 0 || reserve_blocks(&self.file, size) {
            return Ok(());
        }
        self.file.set_len(size)
    }

    pub fn build(self) -> StorageWriter {
        StorageWriter::from_file(self.file)
    }
}

/// Ask the filesystem for real blocks. `false` leaves sizing to `set_len`.
#[cfg(target_os = "linux")]
fn reserve_blocks(file: &File, size: u64) -> bool {
    use std::os::unix::io::AsRawFd;

    let Ok(len) = libc::off_t::try_from(size) else {
        return false;
    };
    let rc = unsafe { libc::posix_fallocate(file.as_raw_fd(), 0, len) };
    if rc != 0 {
        tracing::debug!(errno = rc, size, "fallocate unavailable, sizing with set_len");
    }
    rc == 0
}

#[cfg(not(target_os = "linux"))]
fn reserve_blocks(_file: &File, _size: u64) -> bool {
    false
}
