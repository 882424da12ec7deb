use std::net::{Shutdown, SocketAddr, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use ember_core::{Result, ServerError};
use tokio::sync::mpsc;

use crate::connection::ConnectionHandler;

/// An accepted connection waiting for a worker.
pub struct Connection {
    pub stream: TcpStream,
    pub peer: SocketAddr,
}

/// A fixed set of worker threads fed from one unbounded queue.
///
/// When every worker is busy, accepted connections simply wait in the
/// queue. Each connection is served start to finish by a single worker.
pub struct WorkerPool {
    tx: mpsc::UnboundedSender<Connection>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(size: usize, handler: Arc<ConnectionHandler>) -> Result<Self> {
        if size == 0 {
            return Err(ServerError::Config("worker pool needs at least one thread".into()));
        }
        let (tx, rx) = mpsc::unbounded_channel::<Connection>();
        let rx = Arc::new(Mutex::new(rx));

        let mut workers = Vec::with_capacity(size);
        for worker_id in 0..size {
            let rx = Arc::clone(&rx);
            let handler = Arc::clone(&handler);
            let worker = std::thread::Builder::new()
                .name(format!("ember-worker-{}", worker_id))
                .spawn(move || loop {
                    let next = rx
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .blocking_recv();
                    let Some(connection) = next else {
                        tracing::debug!(worker_id, "queue closed, worker exiting");
                        break;
                    };
                    serve(&handler, connection);
                })?;
            workers.push(worker);
        }

        tracing::info!("worker pool started with {} threads", size);
        Ok(Self { tx, workers })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queues a connection for the next free worker.
    pub fn submit(&self, connection: Connection) -> Result<()> {
        self.tx
            .send(connection)
            .map_err(|_| ServerError::Handler("worker pool has shut down".into()))
    }

    /// Closes the queue and waits for in-flight connections to finish.
    pub fn shutdown(self) {
        drop(self.tx);
        for worker in self.workers {
            if worker.join().is_err() {
                tracing::error!("worker thread panicked during shutdown");
            }
        }
    }
}

fn serve(handler: &ConnectionHandler, connection: Connection) {
    let Connection { mut stream, peer } = connection;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&mut stream, Some(peer))));
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(ServerError::NotFound(path))) => tracing::debug!(%peer, "not found: {}", path),
        Ok(Err(e)) => tracing::warn!(%peer, "request aborted: {}", e),
        Err(_) => tracing::error!(%peer, "request handler panicked"),
    }
    // One request per connection.
    let _ = stream.shutdown(Shutdown::Write);
}
