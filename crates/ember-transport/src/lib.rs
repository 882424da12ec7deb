//! # ember-transport: sockets, workers and dispatch
//!
//! The accept loop runs on tokio; each accepted connection is handed to a
//! fixed pool of blocking worker threads which parse the head, resolve the
//! session and dispatch the path to a handler, a template or a file.

pub mod connection;
pub mod dispatcher;
pub mod pool;
pub mod server;

pub use connection::ConnectionHandler;
pub use dispatcher::{Dispatcher, Target, MAX_INCLUDE_DEPTH};
pub use pool::{Connection, WorkerPool};
pub use server::{BoundServer, EmberServer};
