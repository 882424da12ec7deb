use std::collections::HashMap;
use std::sync::Arc;

use crate::context::ResponseContext;
use crate::error::Result;

/// Runs another path inside the current exchange, sharing its
/// [`ResponseContext`] (headers and queued cookies included).
pub trait InternalDispatch {
    fn include(&self, path: &str, ctx: &mut ResponseContext<'_>) -> Result<()>;
}

/// A pluggable request handler ("worker").
///
/// A returned error aborts the request; the connection handler logs it and
/// reports it to the client if the header is still pending.
pub trait RequestHandler: Send + Sync {
    fn process_request(
        &self,
        ctx: &mut ResponseContext<'_>,
        dispatch: &dyn InternalDispatch,
    ) -> Result<()>;
}

struct FnHandler<F>(F);

impl<F> RequestHandler for FnHandler<F>
where
    F: Fn(&mut ResponseContext<'_>, &dyn InternalDispatch) -> Result<()> + Send + Sync,
{
    fn process_request(
        &self,
        ctx: &mut ResponseContext<'_>,
        dispatch: &dyn InternalDispatch,
    ) -> Result<()> {
        (self.0)(ctx, dispatch)
    }
}

/// Startup-time handler tables: exact-path routes and named workers.
///
/// Populated before the server starts and read-only afterwards.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    routes: HashMap<String, Arc<dyn RequestHandler>>,
    workers: HashMap<String, Arc<dyn RequestHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to the exact request path `path`.
    pub fn route(&mut self, path: &str, handler: impl RequestHandler + 'static) {
        self.routes.insert(path.to_string(), Arc::new(handler));
    }

    pub fn route_fn<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&mut ResponseContext<'_>, &dyn InternalDispatch) -> Result<()> + Send + Sync + 'static,
    {
        self.route(path, FnHandler(handler));
    }

    /// Registers a worker reachable as `<worker_prefix><name>`.
    pub fn worker(&mut self, name: &str, handler: impl RequestHandler + 'static) {
        self.workers.insert(name.to_string(), Arc::new(handler));
    }

    pub fn worker_fn<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&mut ResponseContext<'_>, &dyn InternalDispatch) -> Result<()> + Send + Sync + 'static,
    {
        self.worker(name, FnHandler(handler));
    }

    pub fn route_for(&self, path: &str) -> Option<Arc<dyn RequestHandler>> {
        self.routes.get(path).cloned()
    }

    pub fn worker_for(&self, name: &str) -> Option<Arc<dyn RequestHandler>> {
        self.workers.get(name).cloned()
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}
