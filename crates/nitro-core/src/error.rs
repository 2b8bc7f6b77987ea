//! Error taxonomy for segment pipelines and the download as a whole.
//!
//! Every failure a pipeline can hit is a `DownloadError`; `kind()` folds the
//! variants into the four classes callers act on.

use thiserror::Error;

/// High-level class of a download failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller supplied an unusable value (e.g. zero segments).
    InvalidArgument,
    /// Connect, request, status, or mid-stream read failure.
    Transport,
    /// Local file create or write failure.
    Write,
    /// A segment exceeded its connect, low-speed, or overall deadline.
    Timeout,
}

/// Error produced by a segment pipeline or by download setup.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// libcurl reported a failure (connect, TLS, FTP command, timeout, ...).
    #[error("{0}")]
    Curl(#[from] curl::Error),

    /// Final HTTP response status was outside 200-299.
    #[error("HTTP {0}")]
    Http(u32),

    /// The stream ended before the segment's bytes were all received.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },

    /// Reading the segment stream failed before a clean end of stream.
    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),

    /// Writing to the output file failed.
    #[error("write failed at offset {offset}: {source}")]
    Write {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// Flushing the finished file to disk failed.
    #[error("sync failed: {0}")]
    Sync(#[source] std::io::Error),

    /// The segment pipeline panicked; its outcome is a failure like any other.
    #[error("segment worker panicked")]
    WorkerPanicked,

    /// Creating or pre-sizing the output file failed.
    #[error("cannot prepare {path}: {source}")]
    Create {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DownloadError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            DownloadError::Curl(e) => classify_curl_error(e),
            DownloadError::Http(_)
            | DownloadError::PartialTransfer { .. }
            | DownloadError::Read(_)
            | DownloadError::WorkerPanicked => ErrorKind::Transport,
            DownloadError::Write { .. } | DownloadError::Sync(_) | DownloadError::Create { .. } => {
                ErrorKind::Write
            }
        }
    }
}

/// Classify a curl error: timeouts are `Timeout`, everything else is `Transport`.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    ErrorKind::Transport
}
