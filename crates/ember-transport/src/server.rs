use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use ember_core::{HandlerRegistry, Result, ServerBuilder, ServerConfig, SessionRegistry};
use ember_script::DocumentParser;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;

use crate::connection::ConnectionHandler;
use crate::dispatcher::Dispatcher;
use crate::pool::{Connection, WorkerPool};

pub struct EmberServer {
    config: ServerConfig,
    registry: HandlerRegistry,
    parser: Option<Arc<dyn DocumentParser>>,
}

impl EmberServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            registry: HandlerRegistry::new(),
            parser: None,
        }
    }

    pub fn from_builder(builder: ServerBuilder) -> Self {
        Self::new(builder.config).with_registry(builder.registry)
    }

    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the default template parser.
    pub fn with_parser(mut self, parser: Arc<dyn DocumentParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Binds the listening socket and starts the worker pool.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn bind(self) -> Result<BoundServer> {
        self.config.validate()?;
        let addr = self.config.bind_addr()?;
        let config = Arc::new(self.config);

        let listener = bind_listener(addr)?;
        tracing::info!("ember listening on {}", listener.local_addr()?);

        let mut dispatcher = Dispatcher::new(self.registry, Arc::clone(&config));
        if let Some(parser) = self.parser {
            dispatcher = dispatcher.with_parser(parser);
        }
        let sessions = Arc::new(SessionRegistry::new(config.session_timeout()));
        let handler = Arc::new(ConnectionHandler::new(
            Arc::new(dispatcher),
            Arc::clone(&sessions),
            Arc::clone(&config),
        ));
        let pool = WorkerPool::spawn(config.threads, handler)?;

        Ok(BoundServer {
            listener,
            pool,
            sessions,
            config,
        })
    }

    /// Binds and serves until the listening socket fails.
    pub async fn start(self) -> Result<()> {
        self.bind().await?.run().await
    }
}

/// A server whose socket is bound but which is not yet accepting.
pub struct BoundServer {
    listener: TcpListener,
    pool: WorkerPool,
    sessions: Arc<SessionRegistry>,
    config: Arc<ServerConfig>,
}

impl BoundServer {
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn sessions(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.sessions)
    }

    /// Starts the session sweeper and runs the accept loop.
    pub async fn run(self) -> Result<()> {
        let sweeper = self.sessions.spawn_sweeper(self.config.sweep_interval());
        tracing::info!(
            "session sweeper running every {:?} (timeout {:?})",
            self.config.sweep_interval(),
            self.sessions.timeout()
        );

        let outcome = accept_loop(&self.listener, &self.pool).await;
        sweeper.abort();
        if let Err(e) = &outcome {
            tracing::error!("listener failed: {}", e);
        }
        outcome
    }
}

async fn accept_loop(listener: &TcpListener, pool: &WorkerPool) -> Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) if is_transient(&e) => {
                tracing::debug!("transient accept error: {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        // Workers use blocking I/O on their own threads.
        let stream = match stream.into_std().and_then(|s| s.set_nonblocking(false).map(|_| s)) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(%peer, "could not hand off connection: {}", e);
                continue;
            }
        };
        pool.submit(Connection { stream, peer })?;
    }
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

fn bind_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;
    TcpListener::from_std(std::net::TcpListener::from(socket))
}
