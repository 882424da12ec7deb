use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("unsupported request: {0}")]
    Unsupported(String),

    #[error("request head exceeds {0} bytes")]
    HeadTooLarge(usize),

    #[error("connection closed before the request head was complete")]
    Truncated,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;
