use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use ember_codec::mime;
use ember_core::{
    HandlerRegistry, InternalDispatch, RequestHandler, ResponseContext, Result, ScriptError,
    ServerConfig, ServerError,
};
use ember_script::{DocumentParser, ScriptEngine, TemplateParser};

/// Nested `include` calls allowed before the request is aborted.
pub const MAX_INCLUDE_DEPTH: usize = 16;

/// What a request path resolved to.
pub enum Target {
    /// A handler from the static route table or the named worker table.
    Handler(Arc<dyn RequestHandler>),
    /// A template under the document root.
    Script(PathBuf),
    /// Any other file under the document root, streamed verbatim.
    Static { path: PathBuf, mime: String },
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Handler(_) => f.write_str("Handler"),
            Target::Script(path) => f.debug_tuple("Script").field(path).finish(),
            Target::Static { path, mime } => f
                .debug_struct("Static")
                .field("path", path)
                .field("mime", mime)
                .finish(),
        }
    }
}

/// Maps request paths to handlers, scripts and files.
///
/// Resolution order: private-prefix guard (direct calls only), exact route,
/// named worker, then the document root.
pub struct Dispatcher {
    registry: HandlerRegistry,
    config: Arc<ServerConfig>,
    parser: Arc<dyn DocumentParser>,
}

impl Dispatcher {
    pub fn new(registry: HandlerRegistry, config: Arc<ServerConfig>) -> Self {
        Self {
            registry,
            config,
            parser: Arc::new(TemplateParser::new()),
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn DocumentParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// `direct` is true for paths that came straight from a client.
    pub fn resolve(&self, path: &str, direct: bool) -> Result<Target> {
        let path = normalize(path)?;
        let path = path.as_str();
        let private = &self.config.private_prefix;
        if direct && (path.starts_with(private.as_str()) || path == private.trim_end_matches('/')) {
            return Err(ServerError::NotFound(path.to_string()));
        }

        if let Some(handler) = self.registry.route_for(path) {
            return Ok(Target::Handler(handler));
        }

        if let Some(name) = path.strip_prefix(self.config.worker_prefix.as_str()) {
            return self
                .registry
                .worker_for(name)
                .map(Target::Handler)
                .ok_or_else(|| ServerError::NotFound(path.to_string()));
        }

        let file = self.locate(path)?;
        if mime::extension(&file).as_deref() == Some(self.config.script_extension.as_str()) {
            return Ok(Target::Script(file));
        }
        let mime = mime::mime_for(&self.config.mime_types, &file, &self.config.default_mime);
        Ok(Target::Static {
            mime: mime.to_string(),
            path: file,
        })
    }

    /// Resolves `path` and runs the target against `ctx`.
    pub fn dispatch(&self, path: &str, direct: bool, ctx: &mut ResponseContext<'_>) -> Result<()> {
        let target = self.resolve(path, direct)?;
        tracing::debug!(path, direct, ?target, "dispatching");

        match target {
            Target::Handler(handler) => handler.process_request(ctx, self),
            Target::Script(file) => self.run_script(&file, ctx),
            Target::Static { path: file, mime } => serve_static(&file, &mime, direct, ctx),
        }
    }

    fn run_script(&self, file: &Path, ctx: &mut ResponseContext<'_>) -> Result<()> {
        let source = std::fs::read_to_string(file)
            .map_err(|_| ServerError::NotFound(file.display().to_string()))?;
        let document = self.parser.parse(&source)?;
        ScriptEngine::with_dispatch(self).execute(&document, ctx)?;
        Ok(())
    }

    /// Maps a request path onto the document root. Paths that would leave
    /// the root, or that do not name a readable file, are `NotFound`.
    fn locate(&self, path: &str) -> Result<PathBuf> {
        let not_found = || ServerError::NotFound(path.to_string());
        let relative = Path::new(path.trim_start_matches('/'));
        if !relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
        {
            return Err(not_found());
        }

        let mut file = self.config.document_root.join(relative);
        if file.is_dir() {
            file.push(&self.config.index_file);
        }
        if !file.is_file() {
            return Err(not_found());
        }
        Ok(file)
    }
}

impl InternalDispatch for Dispatcher {
    fn include(&self, path: &str, ctx: &mut ResponseContext<'_>) -> Result<()> {
        if ctx.include_depth() >= MAX_INCLUDE_DEPTH {
            return Err(ScriptError::UnsupportedOperation(format!(
                "include depth exceeded at '{}'",
                path
            ))
            .into());
        }
        ctx.enter_include();
        let result = self.dispatch(path, false, ctx);
        ctx.leave_include();
        result
    }
}

/// Collapses empty and `.` segments so every lookup sees one spelling of a
/// path. A `..` segment is `NotFound`. A trailing slash is kept.
fn normalize(path: &str) -> Result<String> {
    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(ServerError::NotFound(path.to_string())),
            segment => {
                normalized.push('/');
                normalized.push_str(segment);
            }
        }
    }
    if normalized.is_empty() || path.ends_with('/') {
        normalized.push('/');
    }
    Ok(normalized)
}

fn serve_static(file: &Path, mime: &str, direct: bool, ctx: &mut ResponseContext<'_>) -> Result<()> {
    let bytes =
        std::fs::read(file).map_err(|_| ServerError::NotFound(file.display().to_string()))?;
    // An included file joins the including response and keeps its header.
    if direct && !ctx.header_sent() {
        ctx.set_mime_type(mime)?;
        ctx.set_content_length(Some(bytes.len() as u64))?;
    }
    ctx.write(&bytes)
}
