//! Error types for livemark operations.
//!
//! None of these escape the scheduler: each is caught where the failing
//! operation is attempted (one token render, one diagram render, one engine
//! load) and turned into a local fallback.

use thiserror::Error;

/// Errors that can occur while rendering, loading engines or copying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("engine failed to load: {0}")]
    LoadFailure(String),

    #[error("diagram source is invalid: {0}")]
    ParseFailure(String),

    #[error("render failed: {0}")]
    RenderFailure(String),

    #[error("content changed while node {node} was being processed")]
    StaleContentRace { node: u32 },

    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
