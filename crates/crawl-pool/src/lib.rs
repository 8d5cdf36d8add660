//! Credential rotation and rate-limit-aware pagination
//!
//! Drives a backward (newest to oldest) search crawl across several
//! credentials, each with its own rate-limit window.
//!
//! Run lifecycle:
//! 1. Caller builds a `CredentialPool` from the loaded credentials
//! 2. Driver probes `pool.current()` through the `RateLimitGate` without
//!    blocking; an exhausted credential is rotated to the back
//! 3. The selected credential is re-checked with blocking enabled, which
//!    sleeps until its window resets if it has just run dry
//! 4. One page is fetched; results are appended and `max_id` moves to the
//!    oldest id seen minus one
//! 5. Repeat until the target count is reached, a page comes back empty, or a
//!    fatal request error ends the run with the results collected so far

pub mod driver;
pub mod error;
pub mod gate;
pub mod pool;

pub use driver::{
    CrawlOptions, CrawlReport, Crawler, DEFAULT_MAX_CONSECUTIVE_RATE_LIMITS, StopReason,
};
pub use error::{Error, Result};
pub use gate::{Clock, DEFAULT_SAFETY_BUFFER, Decision, RateLimitGate, SystemClock, wait_duration};
pub use pool::{CredentialPool, Selected};
