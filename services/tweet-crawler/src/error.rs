//! Service-specific error types

use thiserror::Error;

/// Failures persisting run artifacts.
///
/// Crawl failures never show up here: the driver reports them as a stop
/// reason alongside the partial results, and those results are still written.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

impl Error {
    pub fn write(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Write {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;
