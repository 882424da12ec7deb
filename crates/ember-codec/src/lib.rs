//! # ember-codec: HTTP/1.x wire format
//!
//! Request-head scanning and parsing, query/cookie extraction, and
//! response-head rendering. Everything here is pure byte and string work;
//! sockets live in `ember-transport`.

pub mod cookie;
pub mod error;
pub mod mime;
pub mod request;
pub mod response;

pub use cookie::Cookie;
pub use error::CodecError;
pub use request::{parse_head, parse_query, read_head, split_target, HeadScanner, RequestHead};
pub use response::{bad_request, reason_phrase, ResponseHead};
