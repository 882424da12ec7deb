use std::borrow::Cow;

use bytes::{BufMut, Bytes, BytesMut};

use crate::cookie::Cookie;

const BAD_REQUEST: &[u8] = b"HTTP/1.1 400 Bad request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

/// The terse reply sent for a head that cannot be served at all.
pub fn bad_request() -> &'static [u8] {
    BAD_REQUEST
}

/// Standard reason phrase for the status codes the server emits.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Mutable response metadata, rendered once into the header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub reason: Cow<'static, str>,
    pub mime_type: String,
    pub encoding: String,
    pub content_length: Option<u64>,
    pub cookies: Vec<Cookie>,
}

impl ResponseHead {
    pub fn new(mime_type: impl Into<String>, encoding: impl Into<String>) -> Self {
        Self {
            status: 200,
            reason: Cow::Borrowed(reason_phrase(200)),
            mime_type: mime_type.into(),
            encoding: encoding.into(),
            content_length: None,
            cookies: Vec::new(),
        }
    }

    /// `text/*` types carry the charset suffix.
    pub fn content_type(&self) -> String {
        if self.mime_type.starts_with("text/") {
            format!("{};charset={}", self.mime_type, self.encoding)
        } else {
            self.mime_type.clone()
        }
    }

    /// Renders the status line, entity headers, cookies and the blank line.
    pub fn render(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(128 + self.cookies.len() * 64);
        put_line(&mut buf, &format!("HTTP/1.1 {} {}", self.status, self.reason));
        put_line(&mut buf, &format!("Content-Type: {}", self.content_type()));
        if let Some(len) = self.content_length {
            put_line(&mut buf, &format!("Content-Length: {}", len));
        }
        for cookie in &self.cookies {
            put_line(&mut buf, &format!("Set-Cookie: {}", cookie));
        }
        buf.put_slice(b"\r\n");
        buf.freeze()
    }
}

fn put_line(buf: &mut BytesMut, line: &str) {
    buf.put_slice(line.as_bytes());
    buf.put_slice(b"\r\n");
}
