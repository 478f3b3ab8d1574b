//! Error types for the leakscope core crate.
//!
//! Only the store boundaries (session log, score/profile files) surface
//! errors. Analysis itself degrades instead of failing: callers always
//! receive a result.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for leakscope store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from the persistence boundaries
#[derive(Error, Debug)]
pub enum Error {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Attach the offending path to an i/o error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
