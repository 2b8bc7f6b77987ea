//! FTP segment transport: one control+data connection per segment.
//!
//! libcurl sends `REST <start>` before `RETR`, so the server streams from the
//! segment start to end of file. The writer caps the segment and the transfer
//! is aborted the moment the cap is hit; reading further would hand this
//! segment the next segment's bytes.

use curl::easy::Easy;

use crate::downloader::writer::{SegmentWriter, Termination};
use crate::error::DownloadError;
use crate::segmenter::SegmentPlan;
use crate::source::Credentials;

use super::{feed, CurlOptions, SegmentTransport};

pub struct FtpTransport {
    credentials: Credentials,
    options: CurlOptions,
}

impl FtpTransport {
    pub fn new(credentials: Credentials, options: CurlOptions) -> Self {
        Self {
            credentials,
            options,
        }
    }
}

impl SegmentTransport for FtpTransport {
    fn termination(&self) -> Termination {
        Termination::LengthCapped
    }

    fn fetch(
        &self,
        locator: &str,
        plan: &SegmentPlan,
        writer: &mut SegmentWriter<'_>,
    ) -> Result<(), DownloadError> {
        // Dedicated handle: dropping it logs off and closes both connections.
        let mut easy = Easy::new();
        easy.url(locator)?;
        self.options.apply(&mut easy)?;
        if !self.credentials.is_anonymous() {
            easy.username(&self.credentials.username)?;
            easy.password(&self.credentials.password)?;
        }
        if plan.start > 0 {
            easy.resume_from(plan.start)?;
        }
        tracing::trace!(segment = plan.index, offset = plan.start, "ftp REST/RETR");

        let mut failure: Option<DownloadError> = None;
        let performed = {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| Ok(feed(writer, &mut failure, data)))?;
            transfer.perform()
        };

        match performed {
            Ok(()) => {}
            // The writer refused more data because the segment is complete.
            Err(e) if e.is_write_error() && failure.is_none() && writer.is_full() => {
                tracing::trace!(segment = plan.index, "ftp stream closed at segment cap");
            }
            Err(e) => {
                if e.is_write_error() {
                    if let Some(f) = failure {
                        return Err(f);
                    }
                }
                return Err(e.into());
            }
        }

        if let Some(expected) = plan.expected_len() {
            let received = writer.bytes_written();
            if received < expected {
                return Err(DownloadError::PartialTransfer { expected, received });
            }
        }
        Ok(())
    }
}
