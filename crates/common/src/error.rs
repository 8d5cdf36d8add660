//! Configuration-time error types
//!
//! Everything in here is fatal at startup: the crawler refuses to issue a
//! single request until configuration and credentials are valid.

use thiserror::Error;

/// Startup error shared by the binary and the loader crates.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a validation failure with a formatted message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;
