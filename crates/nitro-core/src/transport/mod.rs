//! Protocol transports that stream one segment's bytes into a `SegmentWriter`.
//!
//! Both variants drive libcurl through the `curl` crate: HTTP issues a ranged
//! GET, FTP issues `REST <offset>` + `RETR <path>`. Transport internals (TLS,
//! DNS, FTP login) stay inside libcurl.

mod ftp;
mod http;
mod pool;

pub use ftp::FtpTransport;
pub use http::HttpTransport;
pub(crate) use http::parse_status_line;
pub use pool::HandlePool;

use std::sync::Arc;
use std::time::Duration;

use crate::downloader::writer::{SegmentWriter, Termination, DEFAULT_CHUNK_SIZE};
use crate::error::DownloadError;
use crate::segmenter::SegmentPlan;
use crate::source::Source;

/// Opens a segment's stream and feeds it to `writer` until it ends or the
/// writer is full.
pub trait SegmentTransport: Send + Sync {
    /// How this protocol's streams terminate.
    fn termination(&self) -> Termination;

    /// Transfer `plan` from `locator` into `writer`. Must release every network
    /// resource it opened before returning, on success and on failure.
    fn fetch(
        &self,
        locator: &str,
        plan: &SegmentPlan,
        writer: &mut SegmentWriter<'_>,
    ) -> Result<(), DownloadError>;
}

/// libcurl knobs shared by every segment handle.
#[derive(Debug, Clone)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Abort when throughput stays below this many bytes/sec...
    pub low_speed_limit: u32,
    /// ...for this long.
    pub low_speed_time: Duration,
    /// Hard per-segment deadline; `None` (the default) leaves stalls to the
    /// low-speed abort.
    pub segment_timeout: Option<Duration>,
    /// Receive buffer size handed to libcurl (the write callback chunk size).
    pub buffer_size: usize,
    pub user_agent: Option<String>,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            segment_timeout: None,
            buffer_size: DEFAULT_CHUNK_SIZE,
            user_agent: Some(concat!("nitro/", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }
}

impl CurlOptions {
    /// Apply timeouts, buffer size and user agent to `easy`.
    pub(crate) fn apply(&self, easy: &mut curl::easy::Easy) -> Result<(), curl::Error> {
        easy.connect_timeout(self.connect_timeout)?;
        // Low-speed abort turns a stalled connection into CURLE_OPERATION_TIMEDOUT.
        easy.low_speed_limit(self.low_speed_limit)?;
        easy.low_speed_time(self.low_speed_time)?;
        if let Some(t) = self.segment_timeout {
            easy.timeout(t)?;
        }
        easy.buffer_size(self.buffer_size)?;
        if let Some(ref ua) = self.user_agent {
            easy.useragent(ua)?;
        }
        Ok(())
    }
}

/// Build the transport for `source`. HTTP handle pools are sized to
/// `segment_count` so every segment can hold a connection at once.
pub fn for_source(
    source: &Source,
    segment_count: u8,
    options: CurlOptions,
) -> Arc<dyn SegmentTransport> {
    match source {
        Source::Http { .. } => Arc::new(HttpTransport::new(segment_count, options)),
        Source::Ftp { credentials, .. } => {
            Arc::new(FtpTransport::new(credentials.clone(), options))
        }
    }
}

/// Outcome of a curl write callback: bytes to report back to libcurl.
/// Returning fewer than `data.len()` makes libcurl abort the transfer.
pub(crate) fn feed(
    writer: &mut SegmentWriter<'_>,
    failure: &mut Option<DownloadError>,
    data: &[u8],
) -> usize {
    use crate::downloader::writer::Flow;
    match writer.accept(data) {
        Ok(Flow::Continue) => data.len(),
        Ok(Flow::Full) => 0,
        Err(e) => {
            *failure = Some(e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_bound_a_stuck_segment() {
        let o = CurlOptions::default();
        assert!(o.segment_timeout.is_none(), "slow but steady segments must not expire");
        assert!(o.low_speed_limit > 0);
        assert!(o.low_speed_time > Duration::ZERO);
        assert_eq!(o.buffer_size, DEFAULT_CHUNK_SIZE);
        assert!(o.user_agent.as_deref().unwrap().starts_with("nitro/"));
    }

    #[test]
    fn transport_matches_protocol() {
        let http = Source::parse("https://example.com/a.iso").unwrap();
        assert_eq!(
            for_source(&http, 4, CurlOptions::default()).termination(),
            Termination::EofDriven
        );
        let ftp = Source::parse("ftp://example.com/pub/a.iso").unwrap();
        assert_eq!(
            for_source(&ftp, 4, CurlOptions::default()).termination(),
            Termination::LengthCapped
        );
    }
}
