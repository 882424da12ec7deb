//! # Connection Handler Tests
//!
//! Drives `ConnectionHandler::handle` over in-memory streams: session
//! cookie issuance and reuse, host binding, error reporting before the
//! header, and rejection of unservable request heads.

use ember_core::{HandlerRegistry, ServerConfig, ServerError, SessionRegistry};
use ember_transport::{ConnectionHandler, Dispatcher};
use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// A request on one side, everything the server wrote on the other.
struct MockStream {
    input: Cursor<Vec<u8>>,
    output: Vec<u8>,
}

impl MockStream {
    fn new(request: &str) -> Self {
        Self {
            input: Cursor::new(request.as_bytes().to_vec()),
            output: Vec::new(),
        }
    }

    fn response(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Fixture {
    _dir: TempDir,
    handler: ConnectionHandler,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "welcome").unwrap();
    fs::write(
        dir.path().join("count.tmpl"),
        "<%= \"n\" 0 session 1 + \"n\" swap session.set \"n\" 0 session %>",
    )
    .unwrap();
    fs::write(dir.path().join("late.tmpl"), "partial<%= 1 0 / %>").unwrap();

    let mut registry = HandlerRegistry::new();
    registry.route_fn("/fail", |_, _| Err(ServerError::Handler("boom".into())));

    let mut config = ServerConfig::default();
    config.document_root = dir.path().to_path_buf();
    config.max_header_bytes = 1024;
    let config = Arc::new(config);

    let dispatcher = Arc::new(Dispatcher::new(registry, Arc::clone(&config)));
    let sessions = Arc::new(SessionRegistry::new(Duration::from_secs(60)));
    Fixture {
        _dir: dir,
        handler: ConnectionHandler::new(dispatcher, sessions, config),
    }
}

fn exchange(handler: &ConnectionHandler, request: &str) -> (Result<(), ServerError>, String) {
    let mut stream = MockStream::new(request);
    let result = handler.handle(&mut stream, None);
    (result, stream.response())
}

fn set_cookie_value(response: &str) -> Option<String> {
    let line = response
        .lines()
        .find(|line| line.starts_with("Set-Cookie: sid="))?;
    let quoted = line.strip_prefix("Set-Cookie: sid=\"")?;
    quoted.split('"').next().map(str::to_string)
}

/// First request gets exactly one cookie; presenting it suppresses the
/// cookie and shares persistent parameters.
#[test]
fn test_session_cookie_lifecycle() {
    let t = Instant::now();

    let f = fixture();
    let (result, first) = exchange(
        &f.handler,
        "GET /count.tmpl HTTP/1.1\r\nHost: shop.example:8080\r\n\r\n",
    );
    result.unwrap();
    assert_eq!(first.matches("Set-Cookie:").count(), 1);
    assert!(first.contains("; Domain=shop.example; Path=/; HttpOnly\r\n"));
    assert!(first.ends_with("\r\n\r\n1"));
    let sid = set_cookie_value(&first).expect("session cookie");

    let (result, second) = exchange(
        &f.handler,
        &format!(
            "GET /count.tmpl HTTP/1.1\r\nHost: shop.example\r\nCookie: sid=\"{}\"\r\n\r\n",
            sid
        ),
    );
    result.unwrap();
    assert!(!second.contains("Set-Cookie"), "known session must not be re-issued");
    assert!(second.ends_with("\r\n\r\n2"));
    assert_eq!(f.handler.sessions().len(), 1);

    // Same cookie from another host starts over.
    let (result, third) = exchange(
        &f.handler,
        &format!(
            "GET /count.tmpl HTTP/1.1\r\nHost: other.example\r\nCookie: sid={}\r\n\r\n",
            sid
        ),
    );
    result.unwrap();
    assert_eq!(third.matches("Set-Cookie:").count(), 1);
    assert_ne!(set_cookie_value(&third).as_deref(), Some(sid.as_str()));
    assert!(third.ends_with("\r\n\r\n1"));

    let overhead = t.elapsed();
    println!("test_session_cookie_lifecycle: Testing Overhead = {:?}", overhead);
}

#[test]
fn test_missing_host_uses_default_domain() {
    let f = fixture();
    let (result, response) = exchange(&f.handler, "GET / HTTP/1.0\n\n");
    result.unwrap();
    assert!(response.contains("Domain=localhost"));
    assert!(response.ends_with("welcome"));
}

#[test]
fn test_unservable_heads_get_400() {
    let t = Instant::now();

    let f = fixture();
    for request in [
        "POST / HTTP/1.1\r\n\r\n",
        "GET / HTTP/3\r\n\r\n",
        "GARBAGE\r\n\r\n",
        "GET / HTTP/1.1\r\nBroken header\r\n\r\n",
    ] {
        let (result, response) = exchange(&f.handler, request);
        assert!(matches!(result, Err(ServerError::Protocol(_))), "{:?}", request);
        assert_eq!(
            response,
            "HTTP/1.1 400 Bad request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        );
    }

    let oversized = format!("GET / HTTP/1.1\r\nX-Pad: {}\r\n\r\n", "p".repeat(4096));
    let (result, response) = exchange(&f.handler, &oversized);
    assert!(matches!(result, Err(ServerError::Protocol(_))));
    assert!(response.starts_with("HTTP/1.1 400 "));

    assert_eq!(f.handler.sessions().len(), 0, "rejected heads never create sessions");

    let overhead = t.elapsed();
    println!("test_unservable_heads_get_400: Testing Overhead = {:?}", overhead);
}

/// Errors before the first byte become a status line; errors after it
/// only cut the body short.
#[test]
fn test_error_reporting() {
    let f = fixture();

    let (result, response) = exchange(&f.handler, "GET /nothing-here HTTP/1.1\r\n\r\n");
    assert!(matches!(result, Err(ServerError::NotFound(_))));
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\nContent-Type: text/plain;charset=UTF-8\r\n"));
    assert!(response.ends_with("\r\n\r\n404 Not Found\n"));

    let (result, response) = exchange(&f.handler, "GET /private/x HTTP/1.1\r\n\r\n");
    assert!(matches!(result, Err(ServerError::NotFound(_))));
    assert!(response.starts_with("HTTP/1.1 404 "));

    let (result, response) = exchange(&f.handler, "GET /fail HTTP/1.1\r\n\r\n");
    assert!(matches!(result, Err(ServerError::Handler(_))));
    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));

    let (result, response) = exchange(&f.handler, "GET /late.tmpl HTTP/1.1\r\n\r\n");
    assert!(matches!(result, Err(ServerError::Script(_))));
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with("\r\n\r\npartial"));
}

#[test]
fn test_client_gone_is_io_error() {
    let f = fixture();
    let (result, response) = exchange(&f.handler, "");
    assert!(matches!(result, Err(ServerError::Protocol(_))));
    assert!(response.starts_with("HTTP/1.1 400"));

    struct Failing;
    impl Read for Failing {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }
    impl Write for Failing {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
    let result = f.handler.handle(&mut Failing, None);
    assert!(matches!(result, Err(ServerError::Io(_))));
}
