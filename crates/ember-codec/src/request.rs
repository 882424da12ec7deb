use std::collections::HashMap;
use std::io::Read;

use crate::error::{CodecError, Result};

/// Incremental detector for the blank line that ends a request head.
///
/// Accepts `CRLFCRLF`, `LFLF` and any mix of the two (`CRLF LF`,
/// `LF CRLF`): a carriage return never counts toward a line's length, so a
/// line holding nothing but `\r` is blank.
#[derive(Debug, Default, Clone)]
pub struct HeadScanner {
    line_len: usize,
    lines: usize,
}

impl HeadScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next chunk of bytes. Returns the offset just past the
    /// terminating line feed if the head ends inside `chunk`.
    pub fn feed(&mut self, chunk: &[u8]) -> Option<usize> {
        for (i, &byte) in chunk.iter().enumerate() {
            match byte {
                b'\n' => {
                    if self.line_len == 0 && self.lines > 0 {
                        return Some(i + 1);
                    }
                    self.lines += 1;
                    self.line_len = 0;
                }
                b'\r' => {}
                _ => self.line_len += 1,
            }
        }
        None
    }
}

/// Reads from `reader` until the head terminator, returning the head bytes.
///
/// Anything after the terminator is discarded: only body-less GET exchanges
/// are served.
pub fn read_head<R: Read>(reader: &mut R, max_bytes: usize) -> Result<Vec<u8>> {
    let mut scanner = HeadScanner::new();
    let mut head = Vec::with_capacity(512);
    let mut buf = [0u8; 1024];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Err(CodecError::Truncated);
        }
        if let Some(end) = scanner.feed(&buf[..n]) {
            head.extend_from_slice(&buf[..end]);
            if head.len() > max_bytes {
                return Err(CodecError::HeadTooLarge(max_bytes));
            }
            return Ok(head);
        }
        head.extend_from_slice(&buf[..n]);
        if head.len() > max_bytes {
            return Err(CodecError::HeadTooLarge(max_bytes));
        }
    }
}

/// A parsed request line plus its header lines, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
    pub version: String,
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    /// First header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn path(&self) -> &str {
        split_target(&self.target).0
    }

    pub fn query(&self) -> Option<&str> {
        split_target(&self.target).1
    }

    /// The `Host` header without its port, lower-cased, or `default`.
    pub fn host(&self, default: &str) -> String {
        match self.header("Host").map(str::trim).filter(|h| !h.is_empty()) {
            Some(raw) => strip_port(raw).to_ascii_lowercase(),
            None => default.to_ascii_lowercase(),
        }
    }

    /// Value of the cookie `name` from the first `Cookie` header line.
    ///
    /// Only that first line is scanned and the first matching pair wins;
    /// surrounding double quotes are removed from the value.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let line = self.header("Cookie")?;
        line.split(';').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            if key.trim().eq_ignore_ascii_case(name) {
                Some(unquote(value.trim()).to_string())
            } else {
                None
            }
        })
    }
}

/// Parses the bytes returned by [`read_head`].
pub fn parse_head(bytes: &[u8]) -> Result<RequestHead> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| CodecError::Malformed("request head is not valid UTF-8".into()))?;
    let mut lines = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .skip_while(|line| line.is_empty());

    let request_line = lines
        .next()
        .ok_or_else(|| CodecError::Malformed("missing request line".into()))?;
    let parts: Vec<&str> = request_line.split(' ').collect();
    let (method, target, version) = match parts.as_slice() {
        [method, target, version] => (*method, *target, *version),
        _ => {
            return Err(CodecError::Malformed(format!("bad request line '{}'", request_line)));
        }
    };
    if method != "GET" {
        return Err(CodecError::Unsupported(format!("method {}", method)));
    }
    if version != "HTTP/1.0" && version != "HTTP/1.1" {
        return Err(CodecError::Unsupported(format!("version {}", version)));
    }
    if !target.starts_with('/') {
        return Err(CodecError::Malformed(format!("bad request target '{}'", target)));
    }

    let mut headers: Vec<(String, String)> = Vec::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            let Some((_, value)) = headers.last_mut() else {
                return Err(CodecError::Malformed("continuation before first header".into()));
            };
            value.push(' ');
            value.push_str(line.trim());
            continue;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| CodecError::Malformed(format!("bad header line '{}'", line)))?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    Ok(RequestHead {
        method: method.to_string(),
        target: target.to_string(),
        version: version.to_string(),
        headers,
    })
}

/// Splits a request target into route and optional query string.
pub fn split_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    }
}

/// Naive `key=value&...` parsing: no percent-decoding, later keys win,
/// a bare key maps to the empty string.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.insert(key.to_string(), value.to_string());
    }
    params
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal: keep the brackets, drop anything after them.
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
