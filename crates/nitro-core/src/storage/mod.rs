//! Output file lifecycle and concurrent offset writes.
//!
//! The destination is created (truncated if it exists), pre-sized when the
//! length is known (fallocate on Linux when available, else `set_len`), and
//! then shared by every segment through position-independent writes.

mod builder;
mod writer;

pub use builder::StorageWriterBuilder;
pub use writer::StorageWriter;

/// Offset-addressable write capability handed to segment writers.
///
/// Implementations must tolerate concurrent calls on disjoint ranges and must
/// never depend on a shared cursor.
pub trait OutputTarget: Send + Sync {
    fn write_at(&self, offset: u64, data: &[u8]) -> std::io::Result<()>;
}

impl OutputTarget for StorageWriter {
    fn write_at(&self, offset: u64, data: &[u8]) -> std::io::Result<()> {
        StorageWriter::write_at(self, offset, data)
    }
}
