//! Error handling and custom error types
//!
//! Provides unified error handling across the uploader, the CDN client and
//! the folder orchestrator using thiserror.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to walk {}: {source}", .root.display())]
    Enumeration {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Cannot compute path of {} relative to {}", .path.display(), .root.display())]
    Path { path: PathBuf, root: PathBuf },

    #[error("Upload of {path} timed out after {timeout:?}")]
    Timeout { path: String, timeout: Duration },

    #[error("Operation canceled")]
    Canceled,

    #[error("Failed to upload {relative_path} after {attempts} attempts: {source}")]
    Upload {
        relative_path: String,
        attempts: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("CDN error: {0}")]
    Cdn(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl Error {
    /// Cancellation is never retried and never recorded as an upload failure.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
