//! Local filename derivation from `Content-Disposition` or the URL path.

use crate::source::percent_decode;

/// Used when neither the server nor the URL yields a usable name.
pub const DEFAULT_FILENAME: &str = "download.bin";

/// Longest filename most filesystems accept, in bytes.
const NAME_MAX: usize = 255;

/// Pick a safe local filename for `url`.
///
/// A `filename*=` or `filename=` parameter of `content_disposition` wins;
/// otherwise the last non-empty path segment of `url` is used (decoded).
/// Whatever is picked goes through `sanitize_filename`.
pub fn derive_filename(url: &str, content_disposition: Option<&str>) -> String {
    content_disposition
        .and_then(disposition_filename)
        .or_else(|| last_path_segment(url))
        .map(|name| sanitize_filename(&name))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

/// Make `name` safe to create in the current directory: separators and
/// control characters become `_`, runs of `_` collapse, leading and trailing
/// dots, spaces and underscores are dropped, and the result is cut to 255 bytes.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if matches!(c, '/' | '\\' | '\t') || c.is_control() {
            '_'
        } else {
            c
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    let mut trimmed = out.trim_matches(|c| matches!(c, ' ' | '.' | '_'));
    if trimmed.len() > NAME_MAX {
        let mut cut = NAME_MAX;
        while !trimmed.is_char_boundary(cut) {
            cut -= 1;
        }
        trimmed = &trimmed[..cut];
    }
    trimmed.to_string()
}

/// `filename*=UTF-8''...` (RFC 5987) if present, else `filename=`.
fn disposition_filename(header: &str) -> Option<String> {
    let mut plain = None;
    for param in header.split(';') {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        match key.as_str() {
            "filename*" => {
                let encoded = value
                    .split_once("''")
                    .filter(|(charset, _)| charset.eq_ignore_ascii_case("utf-8"))
                    .map(|(_, rest)| rest);
                if let Some(name) = encoded.map(percent_decode).filter(|n| !n.is_empty()) {
                    return Some(name);
                }
            }
            "filename" => {
                let name = unquote(value);
                if !name.is_empty() {
                    plain = Some(name);
                }
            }
            _ => {}
        }
    }
    plain
}

/// Strip surrounding quotes and backslash escapes from a quoted-string.
fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        if escaped || c != '\\' {
            out.push(c);
            escaped = false;
        } else {
            escaped = true;
        }
    }
    out
}

fn last_path_segment(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = percent_decode(segment);
    if decoded == "." || decoded == ".." {
        return None;
    }
    Some(decoded)
}
