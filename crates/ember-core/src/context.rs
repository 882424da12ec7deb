use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use ember_codec::{reason_phrase, Cookie, ResponseHead};

use crate::error::{Result, ServerError};
use crate::session::SessionRecord;

/// Whether the header block has been written to the client yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderPhase {
    Pending,
    Sent,
}

/// The per-request response side of an exchange.
///
/// Header fields stay mutable until the first [`write`](Self::write); that
/// call renders and sends the header block, moving the context from
/// [`HeaderPhase::Pending`] to [`HeaderPhase::Sent`]. From then on every
/// header setter fails with [`ServerError::HeaderAlreadySent`].
///
/// Three parameter scopes are exposed: request parameters (read-only,
/// from the query string), temporary parameters (request-scoped scratch)
/// and persistent parameters (the session's attribute map).
pub struct ResponseContext<'a> {
    sink: &'a mut dyn Write,
    head: ResponseHead,
    phase: HeaderPhase,
    request: HashMap<String, String>,
    temporary: HashMap<String, String>,
    session: Arc<SessionRecord>,
    bytes_written: u64,
    include_depth: usize,
}

impl<'a> ResponseContext<'a> {
    pub fn new(
        sink: &'a mut dyn Write,
        head: ResponseHead,
        request: HashMap<String, String>,
        session: Arc<SessionRecord>,
    ) -> Self {
        Self {
            sink,
            head,
            phase: HeaderPhase::Pending,
            request,
            temporary: HashMap::new(),
            session,
            bytes_written: 0,
            include_depth: 0,
        }
    }

    pub fn phase(&self) -> HeaderPhase {
        self.phase
    }

    pub fn header_sent(&self) -> bool {
        self.phase == HeaderPhase::Sent
    }

    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    /// Body bytes written so far, excluding the header block.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Number of `include` calls currently running against this response.
    pub fn include_depth(&self) -> usize {
        self.include_depth
    }

    pub fn enter_include(&mut self) {
        self.include_depth += 1;
    }

    pub fn leave_include(&mut self) {
        self.include_depth = self.include_depth.saturating_sub(1);
    }

    fn head_mut(&mut self) -> Result<&mut ResponseHead> {
        match self.phase {
            HeaderPhase::Pending => Ok(&mut self.head),
            HeaderPhase::Sent => Err(ServerError::HeaderAlreadySent),
        }
    }

    pub fn set_status(&mut self, status: u16) -> Result<()> {
        let head = self.head_mut()?;
        head.status = status;
        head.reason = Cow::Borrowed(reason_phrase(status));
        Ok(())
    }

    pub fn set_status_with_reason(&mut self, status: u16, reason: impl Into<String>) -> Result<()> {
        let head = self.head_mut()?;
        head.status = status;
        head.reason = Cow::Owned(reason.into());
        Ok(())
    }

    pub fn set_mime_type(&mut self, mime_type: impl Into<String>) -> Result<()> {
        self.head_mut()?.mime_type = mime_type.into();
        Ok(())
    }

    pub fn set_encoding(&mut self, encoding: impl Into<String>) -> Result<()> {
        self.head_mut()?.encoding = encoding.into();
        Ok(())
    }

    pub fn set_content_length(&mut self, length: Option<u64>) -> Result<()> {
        self.head_mut()?.content_length = length;
        Ok(())
    }

    /// Replaces the whole outgoing cookie list.
    pub fn set_output_cookies(&mut self, cookies: Vec<Cookie>) -> Result<()> {
        self.head_mut()?.cookies = cookies;
        Ok(())
    }

    pub fn add_output_cookie(&mut self, cookie: Cookie) -> Result<()> {
        self.head_mut()?.cookies.push(cookie);
        Ok(())
    }

    /// Writes body bytes, sending the header block first if still pending.
    /// Every call flushes the transport.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.send_header()?;
        self.sink.write_all(bytes)?;
        self.sink.flush()?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    pub fn write_str(&mut self, text: &str) -> Result<()> {
        self.write(text.as_bytes())
    }

    /// Completes the exchange: emits the header for empty-body responses.
    pub fn finish(&mut self) -> Result<()> {
        self.send_header()?;
        self.sink.flush()?;
        Ok(())
    }

    fn send_header(&mut self) -> Result<()> {
        if self.phase == HeaderPhase::Sent {
            return Ok(());
        }
        let block = self.head.render();
        // Partial header bytes may already be out if this write fails.
        self.phase = HeaderPhase::Sent;
        self.sink.write_all(&block)?;
        Ok(())
    }

    pub fn session(&self) -> &Arc<SessionRecord> {
        &self.session
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.request.get(name).map(String::as_str)
    }

    pub fn parameters(&self) -> &HashMap<String, String> {
        &self.request
    }

    pub fn temporary_parameter(&self, name: &str) -> Option<&str> {
        self.temporary.get(name).map(String::as_str)
    }

    pub fn set_temporary_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.temporary.insert(name.into(), value.into());
    }

    pub fn remove_temporary_parameter(&mut self, name: &str) -> Option<String> {
        self.temporary.remove(name)
    }

    pub fn persistent_parameter(&self, name: &str) -> Option<String> {
        self.session.attribute(name)
    }

    pub fn set_persistent_parameter(&self, name: impl Into<String>, value: impl Into<String>) {
        self.session.set_attribute(name, value);
    }

    pub fn remove_persistent_parameter(&self, name: &str) -> Option<String> {
        self.session.remove_attribute(name)
    }
}
