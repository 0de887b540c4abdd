//! Top-level error type for the server runtime.

/// Errors that can stop the server itself. Per-room and per-session
/// failures are handled locally and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid HOST: {0}")]
    Host(#[from] std::net::AddrParseError),
    #[error("invalid PORT: {0}")]
    Port(#[from] std::num::ParseIntError),
}

pub type Result<T> = std::result::Result<T, Error>;
