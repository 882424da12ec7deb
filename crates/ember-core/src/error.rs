use ember_codec::CodecError;
use ember_dsa::StackUnderflow;
use thiserror::Error;

/// Per-request and startup failures.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("response header already sent")]
    HeaderAlreadySent,

    #[error("script failed: {0}")]
    Script(#[from] ScriptError),

    #[error("handler failed: {0}")]
    Handler(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Status sent to the client when the header is still pending.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::Protocol(_) => 400,
            ServerError::NotFound(_) => 404,
            _ => 500,
        }
    }
}

impl From<CodecError> for ServerError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(e) => ServerError::Io(e),
            other => ServerError::Protocol(other.to_string()),
        }
    }
}

/// Failures raised while evaluating a document. All of them abort the
/// running script; bytes already flushed stay sent.
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("format error: {0}")]
    Format(String),

    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    #[error("empty stack: {0}")]
    EmptyStack(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Response(Box<ServerError>),
}

impl From<StackUnderflow> for ScriptError {
    fn from(err: StackUnderflow) -> Self {
        ScriptError::EmptyStack(err.name)
    }
}

impl From<ServerError> for ScriptError {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Script(inner) => inner,
            other => ScriptError::Response(Box::new(other)),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
