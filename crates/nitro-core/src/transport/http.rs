//! HTTP(S) segment transport: ranged GET over pooled curl handles.

use std::cell::Cell;
use std::str;

use curl::easy::Easy;

use crate::downloader::writer::{SegmentWriter, Termination};
use crate::error::DownloadError;
use crate::segmenter::SegmentPlan;

use super::{feed, CurlOptions, HandlePool, SegmentTransport};

pub struct HttpTransport {
    pool: HandlePool,
    options: CurlOptions,
}

impl HttpTransport {
    /// Transport whose handle pool (and per-handle connection cache) scales
    /// with the number of segments of the download.
    pub fn new(segment_count: u8, options: CurlOptions) -> Self {
        Self {
            pool: HandlePool::with_capacity(usize::from(segment_count)),
            options,
        }
    }

    pub fn pool(&self) -> &HandlePool {
        &self.pool
    }

    fn perform(
        &self,
        easy: &mut Easy,
        url: &str,
        plan: &SegmentPlan,
        writer: &mut SegmentWriter<'_>,
    ) -> Result<(), DownloadError> {
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.max_connects(self.pool.capacity() as u32)?;
        self.options.apply(easy)?;
        if let Some(range) = plan.curl_range() {
            // curl wants "start-end" (inclusive), not "bytes=start-end".
            easy.range(&range)?;
        }

        let status: Cell<Option<u32>> = Cell::new(None);
        let mut failure: Option<DownloadError> = None;
        let performed = {
            let mut transfer = easy.transfer();
            transfer.header_function(|line| {
                if let Some(code) = parse_status_line(line) {
                    status.set(Some(code));
                }
                true
            })?;
            transfer.write_function(|data| {
                if let Some(code) = status.get().filter(|c| !(200..300).contains(c)) {
                    // Never write an error body into the output file.
                    failure = Some(DownloadError::Http(code));
                    return Ok(0);
                }
                if let Some(expected) = plan.expected_len() {
                    // A server that ignored the Range would spill into the next segment.
                    let received = writer.bytes_written() + data.len() as u64;
                    if received > expected {
                        failure = Some(DownloadError::PartialTransfer { expected, received });
                        return Ok(0);
                    }
                }
                Ok(feed(writer, &mut failure, data))
            })?;
            transfer.perform()
        };

        if let Err(e) = performed {
            if e.is_write_error() {
                if let Some(f) = failure {
                    return Err(f);
                }
            }
            return Err(e.into());
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(DownloadError::Http(code));
        }

        if let Some(expected) = plan.expected_len() {
            let received = writer.bytes_written();
            if received != expected {
                return Err(DownloadError::PartialTransfer { expected, received });
            }
        }
        Ok(())
    }
}

impl SegmentTransport for HttpTransport {
    fn termination(&self) -> Termination {
        Termination::EofDriven
    }

    fn fetch(
        &self,
        locator: &str,
        plan: &SegmentPlan,
        writer: &mut SegmentWriter<'_>,
    ) -> Result<(), DownloadError> {
        let mut easy = self.pool.checkout();
        let result = self.perform(&mut easy, locator, plan, writer);
        self.pool.checkin(easy);
        tracing::trace!(segment = plan.index, ok = result.is_ok(), "http segment transfer done");
        result
    }
}

/// Status code from an `HTTP/x[.y] NNN reason` line; `None` for other header lines.
pub(crate) fn parse_status_line(line: &[u8]) -> Option<u32> {
    let line = str::from_utf8(line).ok()?;
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}
