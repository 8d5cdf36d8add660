//! Pagination driver
//!
//! Explicit state machine over a closed set of outcomes:
//!
//! ```text
//! SelectCredential --Proceed--> BlockingRecheck --> FetchPage
//!        ^   |                                       |  |  |
//!        |   +--Blocked: rotate, probe next          |  |  +--fatal--> Done
//!        |                                           |  +--empty----> Done
//!        +----------------rate limited---------------+  |
//!        +--below target-- UpdateCursor <----page-------+
//!                              +--target reached--> Done
//! ```
//!
//! One request is in flight at a time. Cancellation is checked before every
//! transition and raced against every request and quota wait.

use search_api::{ErrorClassification, Post, SearchApi, SearchQuery};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::gate::{Decision, RateLimitGate};
use crate::pool::CredentialPool;

/// Default cap on request-time rate-limit errors in a row before giving up.
pub const DEFAULT_MAX_CONSECUTIVE_RATE_LIMITS: u32 = 10;

/// Run parameters.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Minimum number of results to collect. The last page is always kept
    /// whole, so the final count may exceed this by up to one page.
    pub target: usize,
    /// Request-time rate-limit errors tolerated in a row (each one sends the
    /// driver back to credential selection) before the run is aborted.
    pub max_consecutive_rate_limits: u32,
}

impl CrawlOptions {
    pub fn new(target: usize) -> Self {
        Self {
            target,
            max_consecutive_rate_limits: DEFAULT_MAX_CONSECUTIVE_RATE_LIMITS,
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Collected at least `target` results
    TargetReached,
    /// Upstream returned an empty page (or ids ran out)
    Exhausted,
    /// A non-recoverable request failure; results so far are kept
    Aborted(String),
    /// The cancellation token fired
    Cancelled,
}

impl StopReason {
    pub fn label(&self) -> &'static str {
        match self {
            StopReason::TargetReached => "target_reached",
            StopReason::Exhausted => "exhausted",
            StopReason::Aborted(_) => "aborted",
            StopReason::Cancelled => "cancelled",
        }
    }
}

/// Result of a run: everything collected, in fetch order.
#[derive(Debug)]
pub struct CrawlReport {
    pub posts: Vec<Post>,
    /// Cursor for the next page that would have been requested
    pub max_id: Option<u64>,
    pub pages: usize,
    pub stop: StopReason,
}

#[derive(Debug)]
enum State {
    SelectCredential,
    BlockingRecheck,
    FetchPage,
    UpdateCursor { min_id: u64 },
    Done(StopReason),
}

/// Bookkeeping for one pass of non-blocking probes over the pool.
#[derive(Debug, Default)]
struct SelectionCycle {
    probed: usize,
    /// Exhausted credential with the earliest reset seen this cycle
    earliest: Option<(usize, chrono::DateTime<chrono::Utc>)>,
}

impl SelectionCycle {
    fn record_blocked(&mut self, index: usize, reset: chrono::DateTime<chrono::Utc>) {
        self.probed += 1;
        if self.earliest.is_none_or(|(_, best)| reset < best) {
            self.earliest = Some((index, reset));
        }
    }
}

/// Drives one crawl for one search term.
pub struct Crawler<'a, A> {
    pool: &'a mut CredentialPool<A>,
    gate: &'a RateLimitGate,
    query: SearchQuery,
    options: CrawlOptions,
    cancel: CancellationToken,
    posts: Vec<Post>,
    max_id: Option<u64>,
    pages: usize,
    consecutive_rate_limits: u32,
    cycle: SelectionCycle,
}

impl<'a, A: SearchApi> Crawler<'a, A> {
    /// `query` is the first-page query; any `max_id` it carries is replaced
    /// by the driver's cursor.
    pub fn new(
        pool: &'a mut CredentialPool<A>,
        gate: &'a RateLimitGate,
        query: SearchQuery,
        options: CrawlOptions,
    ) -> Self {
        Self {
            pool,
            gate,
            query,
            options,
            cancel: CancellationToken::new(),
            posts: Vec::new(),
            max_id: None,
            pages: 0,
            consecutive_rate_limits: 0,
            cycle: SelectionCycle::default(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run to completion.
    ///
    /// Only configuration problems (an empty pool) are returned as errors.
    /// Request failures end the run with `StopReason::Aborted` and whatever
    /// was collected before them.
    pub async fn run(mut self) -> Result<CrawlReport> {
        if self.pool.is_empty() {
            return Err(Error::EmptyPool);
        }

        info!(
            query = %self.query.term,
            target = self.options.target,
            credentials = self.pool.len(),
            "starting crawl"
        );

        let mut state = if self.options.target == 0 {
            State::Done(StopReason::TargetReached)
        } else {
            State::SelectCredential
        };

        let stop = loop {
            if self.cancel.is_cancelled() && !matches!(state, State::Done(_)) {
                break StopReason::Cancelled;
            }
            state = match state {
                State::SelectCredential => self.select_credential().await?,
                State::BlockingRecheck => self.blocking_recheck().await?,
                State::FetchPage => self.fetch_page().await?,
                State::UpdateCursor { min_id } => self.update_cursor(min_id),
                State::Done(reason) => break reason,
            };
        };

        match &stop {
            StopReason::Aborted(reason) => {
                warn!(
                    reason = %reason,
                    collected = self.posts.len(),
                    "crawl aborted, keeping partial results"
                );
            }
            other => info!(
                stop = other.label(),
                collected = self.posts.len(),
                pages = self.pages,
                "crawl finished"
            ),
        }

        Ok(CrawlReport {
            posts: self.posts,
            max_id: self.max_id,
            pages: self.pages,
            stop,
        })
    }

    /// Non-blocking probe of the current credential.
    ///
    /// Blocked credentials are rotated to the back. After a full pass with no
    /// credential available, rotate to the one whose window resets first and
    /// let the blocking re-check wait on it.
    async fn select_credential(&mut self) -> Result<State> {
        let selected = self.pool.current()?;
        let index = selected.index;
        let credential = selected.credential;

        let decision = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(State::Done(StopReason::Cancelled)),
            decision = self.gate.check_quota(credential, false) => decision,
        };

        match decision {
            Ok(Decision::Proceed) => {
                debug!(credential = credential.id(), "credential selected");
                self.cycle = SelectionCycle::default();
                Ok(State::BlockingRecheck)
            }
            Ok(Decision::Blocked(snapshot)) => {
                self.cycle.record_blocked(index, snapshot.reset);
                if self.cycle.probed < self.pool.len() {
                    self.pool.rotate();
                    metrics::counter!("crawler_rotations_total").increment(1);
                    if let Ok(next) = self.pool.current() {
                        info!(credential = next.credential.id(), "trying next credential");
                    }
                    return Ok(State::SelectCredential);
                }

                let (soonest, reset) = self.cycle.earliest.unwrap_or((index, snapshot.reset));
                warn!(
                    credentials = self.pool.len(),
                    soonest,
                    reset = %reset,
                    "all credentials exhausted, waiting on earliest reset"
                );
                self.pool.rotate_to(soonest)?;
                self.cycle = SelectionCycle::default();
                Ok(State::BlockingRecheck)
            }
            Err(e) => Ok(State::Done(StopReason::Aborted(format!(
                "quota status for {} failed: {e}",
                credential.id()
            )))),
        }
    }

    /// Blocking check immediately before spending the slot, closing the gap
    /// between the probe and the request.
    async fn blocking_recheck(&mut self) -> Result<State> {
        let credential = self.pool.current()?.credential;

        let decision = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(State::Done(StopReason::Cancelled)),
            decision = self.gate.check_quota(credential, true) => decision,
        };

        match decision {
            Ok(_) => Ok(State::FetchPage),
            Err(e) => Ok(State::Done(StopReason::Aborted(format!(
                "quota status for {} failed: {e}",
                credential.id()
            )))),
        }
    }

    async fn fetch_page(&mut self) -> Result<State> {
        let credential = self.pool.current()?.credential;
        self.query.max_id = self.max_id;

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(State::Done(StopReason::Cancelled)),
            result = credential.search(&self.query) => result,
        };

        match result {
            Ok(page) if page.is_empty() => {
                info!(credential = credential.id(), max_id = ?self.max_id, "empty page, no older results");
                Ok(State::Done(StopReason::Exhausted))
            }
            Ok(page) => {
                self.consecutive_rate_limits = 0;
                self.pages += 1;
                // Non-empty, so min() is Some
                let min_id = page.iter().map(|p| p.id).min().unwrap_or(0);
                let fetched = page.len();
                self.posts.extend(page);

                metrics::counter!("crawler_pages_total").increment(1);
                metrics::counter!("crawler_posts_total").increment(fetched as u64);
                info!(
                    credential = credential.id(),
                    page = self.pages,
                    fetched,
                    collected = self.posts.len(),
                    "page fetched"
                );
                Ok(State::UpdateCursor { min_id })
            }
            Err(e) => match e.classification() {
                ErrorClassification::RateLimited => {
                    self.consecutive_rate_limits += 1;
                    metrics::counter!("crawler_rate_limited_total").increment(1);
                    if self.consecutive_rate_limits > self.options.max_consecutive_rate_limits {
                        return Ok(State::Done(StopReason::Aborted(format!(
                            "rate limited {} times in a row: {e}",
                            self.consecutive_rate_limits
                        ))));
                    }
                    warn!(
                        credential = credential.id(),
                        attempt = self.consecutive_rate_limits,
                        error = %e,
                        "rate limited at request time, reselecting credential"
                    );
                    Ok(State::SelectCredential)
                }
                ErrorClassification::Fatal => {
                    warn!(credential = credential.id(), error = %e, "request failed");
                    Ok(State::Done(StopReason::Aborted(e.to_string())))
                }
            },
        }
    }

    fn update_cursor(&mut self, min_id: u64) -> State {
        let Some(next) = min_id.checked_sub(1) else {
            return State::Done(StopReason::Exhausted);
        };
        debug!(previous = ?self.max_id, max_id = next, "cursor updated");
        self.max_id = Some(next);

        if self.posts.len() >= self.options.target {
            State::Done(StopReason::TargetReached)
        } else {
            State::SelectCredential
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::Clock;
    use chrono::{DateTime, Utc};
    use search_api::{ApiError, QuotaSnapshot};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const NOW: i64 = 1_700_000_000;

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            at(0)
        }
    }

    /// `offset` seconds after the fixed test "now".
    fn at(offset: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(NOW + offset, 0).unwrap()
    }

    fn available(remaining: u32) -> QuotaSnapshot {
        QuotaSnapshot {
            remaining,
            limit: 180,
            reset: at(900),
        }
    }

    fn exhausted(reset_in_secs: i64) -> QuotaSnapshot {
        QuotaSnapshot {
            remaining: 0,
            limit: 180,
            reset: at(reset_in_secs),
        }
    }

    fn posts(ids: &[u64]) -> Vec<Post> {
        ids.iter()
            .map(|&id| Post {
                id,
                text: format!("post {id}"),
                created_at: at(-(id as i64)),
            })
            .collect()
    }

    /// Scripted credential. Quota snapshots are consumed in order and the
    /// last one repeats; pages are consumed in order and an exhausted script
    /// returns empty pages.
    struct ScriptedApi {
        id: String,
        quotas: Mutex<VecDeque<QuotaSnapshot>>,
        pages: Mutex<VecDeque<search_api::Result<Vec<Post>>>>,
        fail_status: bool,
        status_calls: AtomicUsize,
        searched_max_ids: Mutex<Vec<Option<u64>>>,
    }

    impl ScriptedApi {
        fn new(index: usize, quotas: Vec<QuotaSnapshot>) -> Self {
            Self {
                id: format!("credential-{index}"),
                quotas: Mutex::new(quotas.into()),
                pages: Mutex::new(VecDeque::new()),
                fail_status: false,
                status_calls: AtomicUsize::new(0),
                searched_max_ids: Mutex::new(Vec::new()),
            }
        }

        fn with_pages(self, pages: Vec<search_api::Result<Vec<Post>>>) -> Self {
            *self.pages.lock().unwrap() = pages.into();
            self
        }

        fn with_failing_status(mut self) -> Self {
            self.fail_status = true;
            self
        }

        fn searched(&self) -> Vec<Option<u64>> {
            self.searched_max_ids.lock().unwrap().clone()
        }
    }

    impl SearchApi for ScriptedApi {
        fn id(&self) -> &str {
            &self.id
        }

        fn rate_limit_status(
            &self,
        ) -> Pin<Box<dyn Future<Output = search_api::Result<QuotaSnapshot>> + Send + '_>> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            let result = if self.fail_status {
                Err(ApiError::Http("status endpoint down".into()))
            } else {
                let mut quotas = self.quotas.lock().unwrap();
                let snapshot = if quotas.len() > 1 {
                    quotas.pop_front()
                } else {
                    quotas.front().copied()
                };
                snapshot.ok_or_else(|| ApiError::Decode("no quota scripted".into()))
            };
            Box::pin(async move { result })
        }

        fn search<'a>(
            &'a self,
            query: &'a SearchQuery,
        ) -> Pin<Box<dyn Future<Output = search_api::Result<Vec<Post>>> + Send + 'a>> {
            self.searched_max_ids.lock().unwrap().push(query.max_id);
            let page = self.pages.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()));
            Box::pin(async move { page })
        }
    }

    fn gate() -> RateLimitGate {
        RateLimitGate::with_clock(Duration::from_millis(100), Arc::new(FixedClock))
    }

    fn query() -> SearchQuery {
        SearchQuery::new("#rust", true, 3)
    }

    fn ids(report: &CrawlReport) -> Vec<u64> {
        report.posts.iter().map(|p| p.id).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn single_credential_stops_after_target_page() {
        let api = ScriptedApi::new(0, vec![available(100)])
            .with_pages(vec![Ok(posts(&[100, 99, 98])), Ok(posts(&[97, 96, 95]))]);
        let mut pool = CredentialPool::new(vec![api]);
        let gate = gate();

        let report = Crawler::new(&mut pool, &gate, query(), CrawlOptions::new(5))
            .run()
            .await
            .unwrap();

        assert_eq!(report.stop, StopReason::TargetReached);
        assert_eq!(report.pages, 2);
        assert_eq!(ids(&report), vec![100, 99, 98, 97, 96, 95]);
        assert_eq!(report.max_id, Some(94));
        assert_eq!(pool.get(0).unwrap().searched(), vec![None, Some(97)]);
    }

    #[tokio::test(start_paused = true)]
    async fn probe_rotates_past_exhausted_credential_without_waiting() {
        let first = ScriptedApi::new(0, vec![exhausted(1)]);
        let second =
            ScriptedApi::new(1, vec![available(5)]).with_pages(vec![Ok(posts(&[10, 9]))]);
        let mut pool = CredentialPool::new(vec![first, second]);
        let gate = gate();
        let started = tokio::time::Instant::now();

        let report = Crawler::new(&mut pool, &gate, query(), CrawlOptions::new(2))
            .run()
            .await
            .unwrap();

        assert_eq!(started.elapsed(), Duration::ZERO, "must not wait");
        assert_eq!(report.stop, StopReason::TargetReached);
        assert_eq!(ids(&report), vec![10, 9]);
        assert_eq!(pool.current().unwrap().index, 1);
        assert!(pool.get(0).unwrap().searched().is_empty());
        assert_eq!(pool.get(0).unwrap().status_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn request_time_rate_limit_keeps_cursor() {
        let api = ScriptedApi::new(0, vec![available(100)]).with_pages(vec![
            Ok(posts(&[100, 99, 98])),
            Err(ApiError::RateLimited("429".into())),
            Ok(posts(&[97, 96])),
        ]);
        let mut pool = CredentialPool::new(vec![api]);
        let gate = gate();

        let report = Crawler::new(&mut pool, &gate, query(), CrawlOptions::new(5))
            .run()
            .await
            .unwrap();

        assert_eq!(report.stop, StopReason::TargetReached);
        assert_eq!(ids(&report), vec![100, 99, 98, 97, 96]);
        assert_eq!(
            pool.get(0).unwrap().searched(),
            vec![None, Some(97), Some(97)],
            "retry after rate limit must reuse the unchanged cursor"
        );
        assert_eq!(report.max_id, Some(95));
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_returns_partial_results() {
        let api = ScriptedApi::new(0, vec![available(100)]).with_pages(vec![
            Ok(posts(&[30, 20, 10])),
            Err(ApiError::Status {
                status: 401,
                body: "Invalid or expired token".into(),
            }),
        ]);
        let mut pool = CredentialPool::new(vec![api]);
        let gate = gate();

        let report = Crawler::new(&mut pool, &gate, query(), CrawlOptions::new(100))
            .run()
            .await
            .unwrap();

        assert!(matches!(report.stop, StopReason::Aborted(ref r) if r.contains("401")));
        assert_eq!(ids(&report), vec![30, 20, 10]);
        assert_eq!(report.max_id, Some(9));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_page_ends_run_as_exhausted() {
        let api = ScriptedApi::new(0, vec![available(100)])
            .with_pages(vec![Ok(posts(&[5, 4])), Ok(Vec::new())]);
        let mut pool = CredentialPool::new(vec![api]);
        let gate = gate();

        let report = Crawler::new(&mut pool, &gate, query(), CrawlOptions::new(100))
            .run()
            .await
            .unwrap();

        assert_eq!(report.stop, StopReason::Exhausted);
        assert_eq!(ids(&report), vec![5, 4]);
        assert_eq!(report.max_id, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn first_page_empty_returns_nothing() {
        let api = ScriptedApi::new(0, vec![available(100)]);
        let mut pool = CredentialPool::new(vec![api]);
        let gate = gate();

        let report = Crawler::new(&mut pool, &gate, query(), CrawlOptions::new(10))
            .run()
            .await
            .unwrap();

        assert_eq!(report.stop, StopReason::Exhausted);
        assert!(report.posts.is_empty());
        assert_eq!(report.max_id, None);
    }

    #[tokio::test(start_paused = true)]
    async fn cursor_strictly_decreases_and_pages_do_not_overlap() {
        let api = ScriptedApi::new(0, vec![available(100)]).with_pages(vec![
            Ok(posts(&[900, 850, 800])),
            Ok(posts(&[799, 700])),
            Ok(posts(&[650, 640, 600])),
        ]);
        let mut pool = CredentialPool::new(vec![api]);
        let gate = gate();

        let report = Crawler::new(&mut pool, &gate, query(), CrawlOptions::new(8))
            .run()
            .await
            .unwrap();

        let cursors = pool.get(0).unwrap().searched();
        assert_eq!(cursors, vec![None, Some(799), Some(699)]);
        let bounds: Vec<u64> = cursors.iter().flatten().copied().collect();
        assert!(bounds.windows(2).all(|w| w[1] < w[0]));
        assert!(report.max_id.unwrap() < *bounds.last().unwrap());
        assert_eq!(report.max_id, Some(599));
    }

    #[tokio::test(start_paused = true)]
    async fn all_exhausted_waits_on_earliest_reset() {
        let late = ScriptedApi::new(0, vec![exhausted(30)]);
        let soon = ScriptedApi::new(1, vec![exhausted(5)]).with_pages(vec![Ok(posts(&[42]))]);
        let mut pool = CredentialPool::new(vec![late, soon]);
        let gate = gate();
        let started = tokio::time::Instant::now();

        let report = Crawler::new(&mut pool, &gate, query(), CrawlOptions::new(1))
            .run()
            .await
            .unwrap();

        let waited = started.elapsed();
        assert!(
            waited >= Duration::from_millis(5_100) && waited < Duration::from_millis(5_200),
            "waited {waited:?}"
        );
        assert_eq!(ids(&report), vec![42]);
        assert!(pool.get(0).unwrap().searched().is_empty());
        assert_eq!(pool.current().unwrap().index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn blocking_recheck_waits_when_probe_race_is_lost() {
        // Probe sees quota, the re-check a moment later sees it exhausted
        let api = ScriptedApi::new(0, vec![available(1), exhausted(2), available(100)])
            .with_pages(vec![Ok(posts(&[7]))]);
        let mut pool = CredentialPool::new(vec![api]);
        let gate = gate();
        let started = tokio::time::Instant::now();

        let report = Crawler::new(&mut pool, &gate, query(), CrawlOptions::new(1))
            .run()
            .await
            .unwrap();

        let waited = started.elapsed();
        assert!(
            waited >= Duration::from_millis(2_100) && waited < Duration::from_millis(2_200),
            "waited {waited:?}"
        );
        assert_eq!(ids(&report), vec![7]);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_rate_limits_abort_after_cap() {
        let pages = (0..5)
            .map(|_| Err(ApiError::RateLimited("429".into())))
            .collect();
        let api = ScriptedApi::new(0, vec![available(100)]).with_pages(pages);
        let mut pool = CredentialPool::new(vec![api]);
        let gate = gate();
        let options = CrawlOptions {
            target: 10,
            max_consecutive_rate_limits: 3,
        };

        let report = Crawler::new(&mut pool, &gate, query(), options)
            .run()
            .await
            .unwrap();

        assert!(matches!(report.stop, StopReason::Aborted(ref r) if r.contains("4 times")));
        assert_eq!(pool.get(0).unwrap().searched().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn status_failure_aborts_with_collected_results() {
        let api = ScriptedApi::new(0, vec![available(100)]).with_failing_status();
        let mut pool = CredentialPool::new(vec![api]);
        let gate = gate();

        let report = Crawler::new(&mut pool, &gate, query(), CrawlOptions::new(10))
            .run()
            .await
            .unwrap();

        assert!(matches!(report.stop, StopReason::Aborted(ref r) if r.contains("credential-0")));
        assert!(report.posts.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_id_page_exhausts_cursor() {
        let api = ScriptedApi::new(0, vec![available(100)]).with_pages(vec![Ok(posts(&[1, 0]))]);
        let mut pool = CredentialPool::new(vec![api]);
        let gate = gate();

        let report = Crawler::new(&mut pool, &gate, query(), CrawlOptions::new(10))
            .run()
            .await
            .unwrap();

        assert_eq!(report.stop, StopReason::Exhausted);
        assert_eq!(report.posts.len(), 2);
    }

    #[tokio::test]
    async fn zero_target_makes_no_requests() {
        let api = ScriptedApi::new(0, vec![available(100)]);
        let mut pool = CredentialPool::new(vec![api]);
        let gate = gate();

        let report = Crawler::new(&mut pool, &gate, query(), CrawlOptions::new(0))
            .run()
            .await
            .unwrap();

        assert_eq!(report.stop, StopReason::TargetReached);
        assert_eq!(pool.get(0).unwrap().status_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_pool_is_configuration_error() {
        let mut pool: CredentialPool<ScriptedApi> = CredentialPool::new(Vec::new());
        let gate = gate();

        let err = Crawler::new(&mut pool, &gate, query(), CrawlOptions::new(10))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, Error::EmptyPool));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_before_start_returns_empty_report() {
        let api = ScriptedApi::new(0, vec![available(100)]).with_pages(vec![Ok(posts(&[3]))]);
        let mut pool = CredentialPool::new(vec![api]);
        let gate = gate();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = Crawler::new(&mut pool, &gate, query(), CrawlOptions::new(10))
            .with_cancellation(cancel)
            .run()
            .await
            .unwrap();

        assert_eq!(report.stop, StopReason::Cancelled);
        assert!(report.posts.is_empty());
        assert_eq!(pool.get(0).unwrap().status_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_quota_wait() {
        let api = ScriptedApi::new(0, vec![exhausted(3_600)]);
        let mut pool = CredentialPool::new(vec![api]);
        let gate = gate();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        let report = Crawler::new(&mut pool, &gate, query(), CrawlOptions::new(10))
            .with_cancellation(cancel)
            .run()
            .await
            .unwrap();

        assert_eq!(report.stop, StopReason::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn records_page_metrics() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _guard = metrics::set_default_local_recorder(&recorder);

        let first = ScriptedApi::new(0, vec![exhausted(1)]);
        let second =
            ScriptedApi::new(1, vec![available(5)]).with_pages(vec![Ok(posts(&[3, 2, 1]))]);
        let mut pool = CredentialPool::new(vec![first, second]);
        let gate = gate();

        Crawler::new(&mut pool, &gate, query(), CrawlOptions::new(3))
            .run()
            .await
            .unwrap();

        let output = handle.render();
        assert!(output.contains("crawler_pages_total 1"), "output: {output}");
        assert!(output.contains("crawler_posts_total 3"), "output: {output}");
        assert!(output.contains("crawler_rotations_total 1"), "output: {output}");
    }
}
