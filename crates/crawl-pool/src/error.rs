//! Error types for pool operations

/// Errors from pool and driver setup. Request-level failures never surface
/// here; the driver folds them into `StopReason`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("credential pool is empty: no credentials configured")]
    EmptyPool,

    #[error("credential {0} is not in the pool")]
    UnknownCredential(usize),
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
