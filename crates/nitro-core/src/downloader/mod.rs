//! Core segmented downloader engine.
//!
//! `Coordinator::run` validates the spec, creates and pre-sizes the output
//! file, plans the segments, runs one pipeline per segment on its own thread,
//! waits for every pipeline, and reduces their outcomes to one result.

mod run;
pub mod writer;

use std::path::Path;
use std::sync::Arc;

use crate::error::DownloadError;
use crate::probe::RemoteMetadata;
use crate::progress::{NoopProgress, ProgressSink};
use crate::segmenter::{plan_segments, SegmentPlan};
use crate::storage::{StorageWriter, StorageWriterBuilder};
use crate::transport::{self, CurlOptions, SegmentTransport};

pub use writer::{Flow, SegmentWriter, Termination, DEFAULT_CHUNK_SIZE};

/// What to download. Immutable once the download starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSpec {
    /// URL handed to the transport.
    pub source: String,
    /// Content length; `None` when the server did not say.
    pub total_size: Option<u64>,
    pub supports_ranged_access: bool,
    /// Requested segment count (must be > 0).
    pub segment_count: u8,
}

impl DownloadSpec {
    /// Segment count actually used. Sources without ranged access, or whose
    /// length is unknown or zero, get exactly one segment: parallel ranged
    /// requests against them would overlap in the output.
    pub fn effective_segment_count(&self) -> Result<u8, DownloadError> {
        if self.segment_count == 0 {
            return Err(DownloadError::InvalidArgument(
                "segment count must be greater than zero".into(),
            ));
        }
        match self.total_size {
            Some(n) if n > 0 && self.supports_ranged_access => Ok(self.segment_count),
            _ => Ok(1),
        }
    }

    /// The segment plans this spec will be downloaded with.
    pub fn plan(&self) -> Result<Vec<SegmentPlan>, DownloadError> {
        let count = self.effective_segment_count()?;
        plan_segments(self.total_size.unwrap_or(0), count)
    }
}

/// Result of one segment pipeline. Produced once, never mutated.
#[derive(Debug)]
pub struct SegmentOutcome {
    pub index: u8,
    pub bytes_written: u64,
    pub error: Option<DownloadError>,
}

impl SegmentOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate result, built only after every pipeline has settled.
#[derive(Debug)]
pub struct DownloadResult {
    /// Lowest-indexed failing segment; `None` on success or setup failure.
    pub failed_segment: Option<u8>,
    pub cause: Option<DownloadError>,
    /// Bytes written across all segments.
    pub bytes_written: u64,
}

impl DownloadResult {
    fn success(bytes_written: u64) -> Self {
        Self {
            failed_segment: None,
            cause: None,
            bytes_written,
        }
    }

    fn setup_failure(cause: DownloadError) -> Self {
        Self {
            failed_segment: None,
            cause: Some(cause),
            bytes_written: 0,
        }
    }

    /// Reduce per-segment outcomes: success iff none failed; otherwise the
    /// lowest index wins, whatever order the segments finished in.
    pub fn from_outcomes(outcomes: Vec<SegmentOutcome>) -> Self {
        let bytes_written = outcomes.iter().map(|o| o.bytes_written).sum();
        let first_failure = outcomes
            .into_iter()
            .filter(|o| o.error.is_some())
            .min_by_key(|o| o.index);
        match first_failure {
            None => Self::success(bytes_written),
            Some(o) => Self {
                failed_segment: Some(o.index),
                cause: o.error,
                bytes_written,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.cause.is_none()
    }

    /// Bytes written on success, or the representative failure.
    pub fn into_result(self) -> Result<u64, DownloadFailure> {
        match self.cause {
            None => Ok(self.bytes_written),
            Some(cause) => Err(DownloadFailure {
                segment: self.failed_segment,
                cause,
            }),
        }
    }
}

/// A failed download: which segment (if any) and why.
#[derive(Debug, thiserror::Error)]
#[error("{}{cause}", segment_prefix(.segment))]
pub struct DownloadFailure {
    pub segment: Option<u8>,
    #[source]
    pub cause: DownloadError,
}

fn segment_prefix(segment: &Option<u8>) -> String {
    segment.map(|s| format!("segment {}: ", s)).unwrap_or_default()
}

/// Runs segment pipelines for one download against a shared output file.
pub struct Coordinator {
    transport: Arc<dyn SegmentTransport>,
    progress: Arc<dyn ProgressSink>,
    chunk_size: usize,
}

impl Coordinator {
    pub fn new(transport: Arc<dyn SegmentTransport>, progress: Arc<dyn ProgressSink>) -> Self {
        Self {
            transport,
            progress,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Coordinator that reports progress nowhere.
    pub fn silent(transport: Arc<dyn SegmentTransport>) -> Self {
        Self::new(transport, Arc::new(NoopProgress))
    }

    /// Read size for pull-mode writers (`SegmentWriter::drain`). Curl-backed
    /// transports take theirs from `CurlOptions::buffer_size` instead.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Download `spec` into `destination`. Returns only after every segment
    /// pipeline has finished. A failed download leaves the partially written
    /// file in place.
    pub fn run(&self, spec: &DownloadSpec, destination: &Path) -> DownloadResult {
        let plans = match spec.plan() {
            Ok(p) => p,
            Err(e) => return DownloadResult::setup_failure(e),
        };

        let storage = match prepare_output(destination, spec.total_size) {
            Ok(s) => s,
            Err(e) => return DownloadResult::setup_failure(e),
        };

        if spec.total_size == Some(0) {
            tracing::info!(path = %destination.display(), "empty resource, nothing to fetch");
            return DownloadResult::success(0);
        }

        tracing::info!(
            source = %spec.source,
            size = ?spec.total_size,
            segments = plans.len(),
            requested = spec.segment_count,
            "starting download"
        );

        let outcomes = run::run_segments(
            self.transport.as_ref(),
            self.progress.as_ref(),
            &spec.source,
            &plans,
            &storage,
            self.chunk_size,
        );
        let result = DownloadResult::from_outcomes(outcomes);

        if !result.is_success() {
            tracing::warn!(
                segment = ?result.failed_segment,
                cause = %result.cause.as_ref().map(|c| c.to_string()).unwrap_or_default(),
                "download failed"
            );
            return result;
        }
        if let Err(e) = storage.sync() {
            return DownloadResult::setup_failure(DownloadError::Sync(e));
        }
        tracing::info!(bytes = result.bytes_written, path = %destination.display(), "download complete");
        result
    }
}

/// Create (truncate) the destination and size it when the length is known.
fn prepare_output(path: &Path, total_size: Option<u64>) -> Result<StorageWriter, DownloadError> {
    let create_err = |source| DownloadError::Create {
        path: path.display().to_string(),
        source,
    };
    let mut builder = StorageWriterBuilder::create(path).map_err(create_err)?;
    if let Some(size) = total_size {
        builder.preallocate(size).map_err(create_err)?;
    }
    Ok(builder.build())
}

/// Caller-side knobs for `download`.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub segment_count: u8,
    /// Largest chunk a segment writes at once. Overrides `curl.buffer_size`;
    /// libcurl raises values below 1 KiB to 1 KiB.
    pub chunk_size: usize,
    pub curl: CurlOptions,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            segment_count: 4,
            chunk_size: DEFAULT_CHUNK_SIZE,
            curl: CurlOptions::default(),
        }
    }
}

/// Download a probed resource: picks the transport for its protocol (HTTP
/// handle pool sized to the effective segment count) and runs a coordinator.
pub fn download(
    metadata: &RemoteMetadata,
    destination: &Path,
    options: &DownloadOptions,
    progress: Arc<dyn ProgressSink>,
) -> DownloadResult {
    let spec = metadata.to_spec(options.segment_count);
    let pool_size = spec.effective_segment_count().unwrap_or(1);
    let curl = CurlOptions {
        buffer_size: options.chunk_size.max(1),
        ..options.curl.clone()
    };
    let transport = transport::for_source(&metadata.source, pool_size, curl);
    Coordinator::new(transport, progress)
        .with_chunk_size(options.chunk_size)
        .run(&spec, destination)
}
