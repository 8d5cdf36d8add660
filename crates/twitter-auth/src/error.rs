//! Error types for credential loading and request signing

/// Errors from credential and signing operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("request signing failed: {0}")]
    Signing(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
