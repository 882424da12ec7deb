pub mod config;
pub mod context;
pub mod error;
pub mod registry;
pub mod session;

pub use config::ServerConfig;
pub use context::{HeaderPhase, ResponseContext};
pub use error::{Result, ScriptError, ServerError};
pub use registry::{HandlerRegistry, InternalDispatch, RequestHandler};
pub use session::{Resolved, SessionRecord, SessionRegistry, SESSION_COOKIE, SESSION_ID_LEN};

/// A unified builder for Ember servers.
///
/// Handlers are registered here before startup; the resulting tables are
/// shared read-only by every worker.
pub struct ServerBuilder {
    pub registry: HandlerRegistry,
    pub config: ServerConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            config: ServerConfig::default(),
        }
    }

    /// Registers a handler for an exact request path.
    pub fn route(mut self, path: &str, handler: impl RequestHandler + 'static) -> Self {
        self.registry.route(path, handler);
        self
    }

    /// Registers a handler reachable under the worker prefix by name.
    pub fn worker(mut self, name: &str, handler: impl RequestHandler + 'static) -> Self {
        self.registry.worker(name, handler);
        self
    }

    /// Overrides the default server configuration.
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_document_root(mut self, root: impl Into<std::path::PathBuf>) -> Self {
        self.config.document_root = root.into();
        self
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
