//! Remote metadata probing: size, range support and a local filename.
//!
//! HTTP(S) sources get a HEAD request (redirects followed); FTP sources get a
//! body-less curl transfer, which issues `SIZE` on the control connection.
//! Runs on the calling thread; call from `spawn_blocking` in async code.

mod filename;
mod headers;

pub use filename::{derive_filename, sanitize_filename, DEFAULT_FILENAME};
pub use headers::HeadHeaders;

use anyhow::{bail, Context, Result};
use curl::easy::Easy;

use crate::downloader::DownloadSpec;
use crate::source::{Credentials, Source};
use crate::transport::CurlOptions;

/// What the engine needs to know about a remote file before downloading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMetadata {
    pub source: Source,
    /// Suggested local filename (already sanitized).
    pub filename: String,
    /// `None` when the server did not report a length.
    pub total_size: Option<u64>,
    /// True when parallel ranged (HTTP) or offset (FTP `REST`) reads are possible.
    pub supports_ranges: bool,
}

impl RemoteMetadata {
    /// FTP login, if this is an FTP source.
    pub fn credentials(&self) -> Option<&Credentials> {
        match &self.source {
            Source::Ftp { credentials, .. } => Some(credentials),
            Source::Http { .. } => None,
        }
    }

    /// Download spec for this resource split `segment_count` ways.
    pub fn to_spec(&self, segment_count: u8) -> DownloadSpec {
        DownloadSpec {
            source: self.source.locator().to_string(),
            total_size: self.total_size,
            supports_ranged_access: self.supports_ranges,
            segment_count,
        }
    }
}

/// Probe `source` for its metadata.
pub fn probe(source: &Source, options: &CurlOptions) -> Result<RemoteMetadata> {
    let metadata = match source {
        Source::Http { url } => probe_http(source, url, options)?,
        Source::Ftp { url, credentials } => probe_ftp(source, url, credentials, options)?,
    };
    tracing::info!(
        url = %metadata.source.locator(),
        filename = %metadata.filename,
        size = ?metadata.total_size,
        ranges = metadata.supports_ranges,
        "probed remote file"
    );
    Ok(metadata)
}

fn probe_http(source: &Source, url: &str, options: &CurlOptions) -> Result<RemoteMetadata> {
    let mut head = HeadHeaders::default();

    let mut easy = Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.nobody(true)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    options.apply(&mut easy)?;
    {
        let mut transfer = easy.transfer();
        transfer.header_function(|line| {
            head.feed(line);
            true
        })?;
        transfer
            .perform()
            .with_context(|| format!("HEAD {} failed", url))?;
    }

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        bail!("HEAD {} returned HTTP {}", url, code);
    }

    // Name the file after where the redirects ended up.
    let effective = easy
        .effective_url()
        .ok()
        .flatten()
        .map(str::to_string)
        .unwrap_or_else(|| url.to_string());

    Ok(RemoteMetadata {
        source: source.clone(),
        filename: derive_filename(&effective, head.content_disposition.as_deref()),
        total_size: head.content_length,
        supports_ranges: head.accept_ranges,
    })
}

fn probe_ftp(
    source: &Source,
    url: &str,
    credentials: &Credentials,
    options: &CurlOptions,
) -> Result<RemoteMetadata> {
    let mut easy = Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.nobody(true)?;
    options.apply(&mut easy)?;
    if !credentials.is_anonymous() {
        easy.username(&credentials.username)?;
        easy.password(&credentials.password)?;
    }
    easy.perform()
        .with_context(|| format!("FTP SIZE {} failed", url))?;

    // libcurl reports -1 when the server did not answer SIZE.
    let size = easy.content_length_download().context("no content length")?;
    let total_size = (size >= 0.0).then_some(size as u64);

    Ok(RemoteMetadata {
        source: source.clone(),
        filename: derive_filename(url, None),
        total_size,
        supports_ranges: true,
    })
}
