pub mod config;
pub mod logging;

pub mod downloader;
pub mod error;
pub mod probe;
pub mod progress;
pub mod segmenter;
pub mod source;
pub mod storage;
pub mod transport;

pub use downloader::{
    download, Coordinator, DownloadFailure, DownloadOptions, DownloadResult, DownloadSpec,
    SegmentOutcome,
};
pub use error::{DownloadError, ErrorKind};
pub use probe::{probe, RemoteMetadata};
pub use progress::{ProgressSink, ProgressStats, SegmentProgress};
pub use segmenter::{plan_segments, SegmentPlan};
pub use source::{Credentials, Source};
