//! Segment writer: moves one segment's stream into the output file.
//!
//! Push transports (curl write callbacks) hand data to `accept`; pull streams
//! (`std::io::Read`) go through `drain`. Either way every chunk lands at
//! `start + bytes_written` and is reported to the progress sink.

use std::io::{self, Read};

use crate::error::DownloadError;
use crate::progress::ProgressSink;
use crate::segmenter::SegmentPlan;
use crate::storage::OutputTarget;

/// Default read/write chunk size (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// How a segment stream is known to be finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The stream ends on its own (HTTP range bodies).
    EofDriven,
    /// The stream may run past the segment; stop at the expected length (FTP).
    LengthCapped,
}

/// Whether the writer wants more data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The length cap was reached; the caller must close the stream now.
    Full,
}

/// Writes one segment's bytes at their absolute offsets in the output file.
pub struct SegmentWriter<'a> {
    index: u8,
    start: u64,
    cap: Option<u64>,
    written: u64,
    discarded: u64,
    chunk_size: usize,
    target: &'a dyn OutputTarget,
    progress: &'a dyn ProgressSink,
}

impl<'a> SegmentWriter<'a> {
    /// Writer for `plan`. The cap is only enforced for `LengthCapped` streams
    /// over a bounded plan; unbounded plans always drain to end of stream.
    pub fn new(
        plan: &SegmentPlan,
        termination: Termination,
        target: &'a dyn OutputTarget,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        let cap = match termination {
            Termination::LengthCapped => plan.expected_len(),
            Termination::EofDriven => None,
        };
        Self {
            index: plan.index,
            start: plan.start,
            cap,
            written: 0,
            discarded: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            target,
            progress,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Bytes received past the cap and thrown away.
    pub fn bytes_discarded(&self) -> u64 {
        self.discarded
    }

    /// True once a capped segment has all of its bytes.
    pub fn is_full(&self) -> bool {
        matches!(self.cap, Some(cap) if self.written >= cap)
    }

    /// Write one chunk of stream data. Bytes past the cap are discarded.
    pub fn accept(&mut self, data: &[u8]) -> Result<Flow, DownloadError> {
        let mut data = data;
        if let Some(cap) = self.cap {
            let room = cap.saturating_sub(self.written);
            if data.len() as u64 > room {
                self.discarded += data.len() as u64 - room;
                data = &data[..room as usize];
            }
        }

        if !data.is_empty() {
            let offset = self.start + self.written;
            self.target
                .write_at(offset, data)
                .map_err(|source| DownloadError::Write { offset, source })?;
            self.written += data.len() as u64;
            self.progress.on_chunk(self.index, data.len() as u64);
        }

        if self.is_full() {
            Ok(Flow::Full)
        } else {
            Ok(Flow::Continue)
        }
    }

    /// Read `reader` in chunk-sized pieces until end of stream or the cap.
    /// The reader is dropped (closed) as soon as the cap is reached.
    pub fn drain<R: Read>(&mut self, mut reader: R) -> Result<u64, DownloadError> {
        if self.is_full() {
            return Ok(self.written);
        }
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DownloadError::Read(e)),
            };
            if self.accept(&buf[..n])? == Flow::Full {
                break;
            }
        }
        drop(reader);
        Ok(self.written)
    }
}
