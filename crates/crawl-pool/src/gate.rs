//! Rate-limit gate
//!
//! Answers "may this credential issue a search request now?" from a fresh
//! quota snapshot. Snapshots are never cached: the status endpoint is cheap
//! and does not count against the search quota.
//!
//! Reset times arrive as epoch seconds and are converted to UTC by the API
//! layer; the gate compares them against a UTC clock. Mixing time bases here
//! silently produces wrong sleep durations, so the wait computation is a
//! pure function with exact tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use search_api::{QuotaSnapshot, SearchApi};
use tracing::{debug, info};

/// Extra time added to every computed wait so the request lands after the
/// upstream has actually reset the window.
pub const DEFAULT_SAFETY_BUFFER: Duration = Duration::from_millis(100);

/// Outcome of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// A request may be issued now
    Proceed,
    /// Quota exhausted and the caller asked not to wait
    Blocked(QuotaSnapshot),
}

/// UTC time source. Injected so tests can pin "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Time to wait for a window resetting at `reset`: `(reset - now) + buffer`,
/// clamped at zero.
pub fn wait_duration(reset: DateTime<Utc>, now: DateTime<Utc>, buffer: Duration) -> Duration {
    if reset >= now {
        (reset - now).to_std().unwrap_or(Duration::ZERO) + buffer
    } else {
        let overdue = (now - reset).to_std().unwrap_or(Duration::MAX);
        buffer.saturating_sub(overdue)
    }
}

/// Quota gate shared by every credential in a run.
pub struct RateLimitGate {
    buffer: Duration,
    clock: Arc<dyn Clock>,
}

impl RateLimitGate {
    pub fn new(buffer: Duration) -> Self {
        Self::with_clock(buffer, Arc::new(SystemClock))
    }

    pub fn with_clock(buffer: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { buffer, clock }
    }

    pub fn buffer(&self) -> Duration {
        self.buffer
    }

    /// Check whether `credential` may issue a search request.
    ///
    /// - `remaining > 0` → `Proceed`
    /// - exhausted, `block_if_exhausted` → sleep until reset + buffer, then
    ///   `Proceed` without re-checking
    /// - exhausted, not blocking → `Blocked` immediately
    ///
    /// Errors from the status call are returned unchanged; the driver treats
    /// them as fatal.
    pub async fn check_quota<A: SearchApi + ?Sized>(
        &self,
        credential: &A,
        block_if_exhausted: bool,
    ) -> search_api::Result<Decision> {
        let snapshot = credential.rate_limit_status().await?;
        if !snapshot.is_exhausted() {
            debug!(
                credential = credential.id(),
                remaining = snapshot.remaining,
                limit = snapshot.limit,
                "quota available"
            );
            return Ok(Decision::Proceed);
        }

        info!(
            credential = credential.id(),
            limit = snapshot.limit,
            reset = %snapshot.reset,
            "0 of {} requests remaining",
            snapshot.limit
        );

        if !block_if_exhausted {
            return Ok(Decision::Blocked(snapshot));
        }

        let delay = wait_duration(snapshot.reset, self.clock.now(), self.buffer);
        info!(
            credential = credential.id(),
            delay_secs = delay.as_secs_f64(),
            "waiting for quota window to reset"
        );
        metrics::histogram!("crawler_quota_wait_seconds").record(delay.as_secs_f64());
        tokio::time::sleep(delay).await;
        Ok(Decision::Proceed)
    }
}

impl Default for RateLimitGate {
    fn default() -> Self {
        Self::new(DEFAULT_SAFETY_BUFFER)
    }
}
