//! Response header accumulation for HEAD probes.

use std::str;

use crate::transport::parse_status_line;

/// Headers of the final response of a (possibly redirected) HEAD request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadHeaders {
    pub status: Option<u32>,
    pub content_length: Option<u64>,
    /// Server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    pub content_disposition: Option<String>,
}

impl HeadHeaders {
    /// Feed one raw header line as delivered by libcurl. A status line starts
    /// a new response, so only the last hop of a redirect chain is kept.
    pub fn feed(&mut self, raw: &[u8]) {
        if let Some(code) = parse_status_line(raw) {
            *self = HeadHeaders {
                status: Some(code),
                ..Default::default()
            };
            return;
        }
        let Ok(line) = str::from_utf8(raw) else {
            return;
        };
        let Some((name, value)) = line.split_once(':') else {
            return;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            self.content_length = value.parse().ok();
        } else if name.eq_ignore_ascii_case("accept-ranges") {
            self.accept_ranges = value
                .split(',')
                .any(|unit| unit.trim().eq_ignore_ascii_case("bytes"));
        } else if name.eq_ignore_ascii_case("content-disposition") {
            self.content_disposition = Some(value.to_string());
        }
    }
}
