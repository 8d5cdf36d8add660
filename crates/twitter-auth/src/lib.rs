//! Twitter application credentials and OAuth 1.0a request signing
//!
//! Standalone library with no knowledge of the crawl loop:
//! 1. `credentials::load()` reads the ordered credential file (array of
//!    `[consumer_key, consumer_secret, access_token, access_token_secret]`)
//! 2. `oauth1::authorization_header()` signs each outgoing API request with
//!    HMAC-SHA1 using one of those credential sets

pub mod constants;
pub mod credentials;
pub mod error;
pub mod oauth1;

pub use constants::*;
pub use credentials::{AppCredentials, load, parse};
pub use error::{Error, Result};
pub use oauth1::{authorization_header, percent_encode};
