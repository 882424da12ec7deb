use std::io::{Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;

use ember_codec::{bad_request, parse_head, parse_query, read_head, Cookie, ResponseHead};
use ember_core::{ResponseContext, Result, ServerConfig, ServerError, SessionRegistry, SESSION_COOKIE};

use crate::dispatcher::Dispatcher;

/// Serves exactly one request per connection.
pub struct ConnectionHandler {
    dispatcher: Arc<Dispatcher>,
    sessions: Arc<SessionRegistry>,
    config: Arc<ServerConfig>,
}

impl ConnectionHandler {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        sessions: Arc<SessionRegistry>,
        config: Arc<ServerConfig>,
    ) -> Self {
        Self {
            dispatcher,
            sessions,
            config,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Reads the request head from `stream`, resolves the session and
    /// dispatches the path as a direct call.
    ///
    /// Failures that happen before the header is sent are reported to the
    /// client with a matching status; later ones just truncate the body.
    /// The error is returned either way so the caller can log it.
    pub fn handle<S: Read + Write>(&self, stream: &mut S, peer: Option<SocketAddr>) -> Result<()> {
        let head = match read_head(stream, self.config.max_header_bytes).and_then(|b| parse_head(&b)) {
            Ok(head) => head,
            Err(ember_codec::CodecError::Io(e)) => return Err(e.into()),
            Err(e) => {
                // The client may already be gone; nothing more to report.
                let _ = stream.write_all(bad_request()).and_then(|_| stream.flush());
                return Err(e.into());
            }
        };

        let host = head.host(&self.config.default_domain);
        let presented = head.cookie(SESSION_COOKIE);
        let resolved = self.sessions.resolve(presented.as_deref(), &host);
        let params = head.query().map(parse_query).unwrap_or_default();
        let path = head.path();
        tracing::debug!(?peer, path, host = %host, new_session = resolved.created, "request");

        let mut ctx = ResponseContext::new(
            stream,
            ResponseHead::new("text/html", self.config.encoding.as_str()),
            params,
            Arc::clone(&resolved.record),
        );
        if resolved.created {
            let cookie = Cookie::new(SESSION_COOKIE, resolved.record.id())
                .with_domain(host.as_str())
                .with_path("/")
                .http_only();
            ctx.add_output_cookie(cookie)?;
        }

        match self.dispatcher.dispatch(path, true, &mut ctx) {
            Ok(()) => ctx.finish(),
            Err(e) => {
                if !ctx.header_sent() {
                    report(&mut ctx, &e);
                }
                Err(e)
            }
        }
    }
}

/// Replaces the pending response with a short plain-text error.
fn report(ctx: &mut ResponseContext<'_>, err: &ServerError) {
    let status = err.status_code();
    let sent = ctx
        .set_status(status)
        .and_then(|_| ctx.set_mime_type("text/plain"))
        .and_then(|_| ctx.set_content_length(None))
        .and_then(|_| {
            let reason = ctx.head().reason.to_string();
            ctx.write_str(&format!("{} {}\n", status, reason))
        });
    if let Err(e) = sent {
        tracing::debug!("could not report {} to client: {}", status, e);
    }
}
