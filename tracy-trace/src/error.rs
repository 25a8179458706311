use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while opening or materializing a capture.
///
/// Decode failures happen on the loader thread, so the variants carry owned
/// message strings rather than the underlying error values.
#[derive(Debug, Clone, Error)]
pub enum TraceError {
    #[error("could not open {0}: {1}")]
    Open(PathBuf, String),

    #[error("could not write {0}: {1}")]
    Write(PathBuf, String),

    #[error("could not decode trace: {0}")]
    Decode(String),
}
