//! Minimal HTTP/1.1 server that supports HEAD and Range GET for integration tests.
//!
//! Serves a single static body at any path and records the `Range` header of
//! every GET it receives. One request per connection (`Connection: close`).

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct RangeServerOptions {
    /// If true, GET ignores Range and always returns 200 with the full body.
    pub ignore_ranges: bool,
    /// If true, HEAD omits `Content-Length` (length unknown to clients).
    pub hide_length: bool,
    /// Answer every request with this status and no body.
    pub fail_with: Option<u16>,
    /// `Content-Disposition` value sent on HEAD.
    pub disposition: Option<String>,
    /// Drop this many bytes from the end of every GET body (with a matching
    /// `Content-Length`), so responses are well formed but short.
    pub short_by: u64,
    /// Send GET headers, then hold the connection open without a body.
    pub stall: bool,
}

pub struct RangeServer {
    base: String,
    ranges: Arc<Mutex<Vec<Option<String>>>>,
}

impl RangeServer {
    /// URL of `path` on this server (e.g. `url("file.bin")`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Range headers of the GETs received so far, sorted (`None` = no Range).
    pub fn recorded_ranges(&self) -> Vec<Option<String>> {
        let mut r = self.ranges.lock().unwrap().clone();
        r.sort();
        r
    }
}

/// Starts a server in a background thread serving `body`. The server runs
/// until the process exits.
pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let ranges = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&ranges);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let recorder = Arc::clone(&recorder);
            let opts = opts.clone();
            thread::spawn(move || handle(stream, &body, &opts, &recorder));
        }
    });
    RangeServer {
        base: format!("http://127.0.0.1:{}/", port),
        ranges,
    }
}

fn handle(
    mut stream: TcpStream,
    body: &[u8],
    opts: &RangeServerOptions,
    recorder: &Mutex<Vec<Option<String>>>,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let (method, range_header) = parse_request(request);
    let total = body.len() as u64;

    if let Some(code) = opts.fail_with {
        let response = format!(
            "HTTP/1.1 {} Failure\r\nContent-Length: 9\r\nConnection: close\r\n\r\nerror-doc",
            code
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    let accept_ranges = if opts.ignore_ranges {
        ""
    } else {
        "Accept-Ranges: bytes\r\n"
    };

    if method.eq_ignore_ascii_case("HEAD") {
        let length = if opts.hide_length {
            String::new()
        } else {
            format!("Content-Length: {}\r\n", total)
        };
        let disposition = opts
            .disposition
            .as_ref()
            .map(|d| format!("Content-Disposition: {}\r\n", d))
            .unwrap_or_default();
        let response = format!(
            "HTTP/1.1 200 OK\r\n{}{}{}Connection: close\r\n\r\n",
            length, accept_ranges, disposition
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nConnection: close\r\n\r\n");
        return;
    }

    recorder.lock().unwrap().push(range_header.clone());
    let range = range_header.as_deref().and_then(parse_range);
    let (status, content_range, slice) = match range {
        Some((start, end_incl)) if !opts.ignore_ranges => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start > end_incl {
                ("416 Range Not Satisfiable", format!("bytes */{}", total), &body[0..0])
            } else {
                (
                    "206 Partial Content",
                    format!("bytes {}-{}/{}", start, end_incl, total),
                    &body[start as usize..=end_incl as usize],
                )
            }
        }
        _ => (
            "200 OK",
            format!("bytes 0-{}/{}", total.saturating_sub(1), total),
            body,
        ),
    };
    let slice = &slice[..slice.len().saturating_sub(opts.short_by as usize)];
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Range: {}\r\n{}Connection: close\r\n\r\n",
        status,
        slice.len(),
        content_range,
        accept_ranges
    );
    let _ = stream.write_all(response.as_bytes());
    if opts.stall {
        thread::sleep(Duration::from_secs(30));
        return;
    }
    let _ = stream.write_all(slice);
}

/// Returns (method, raw Range header value).
fn parse_request(request: &str) -> (&str, Option<String>) {
    let mut lines = request.lines();
    let method = lines
        .next()
        .and_then(|l| l.split_whitespace().next())
        .unwrap_or("");
    let range = lines
        .take_while(|l| !l.trim().is_empty())
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("range"))
        .map(|(_, v)| v.trim().to_string());
    (method, range)
}

/// `bytes=X-Y` to (X, Y inclusive); open-ended ranges run to the end.
fn parse_range(value: &str) -> Option<(u64, u64)> {
    let spec = value.strip_prefix("bytes=")?;
    let (a, b) = spec.split_once('-')?;
    let start = a.trim().parse().ok()?;
    let end = match b.trim() {
        "" => u64::MAX,
        e => e.parse().ok()?,
    };
    Some((start, end))
}
