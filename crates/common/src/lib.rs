//! Shared types for the tweet crawler workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
