//! Prometheus metrics exposition
//!
//! The engine crates emit through the `metrics` facade:
//!
//! - `crawler_pages_total`, `crawler_posts_total` (counters)
//! - `crawler_rotations_total`, `crawler_rate_limited_total` (counters)
//! - `crawler_quota_wait_seconds` (histogram)
//!
//! The crawler is a batch job, so instead of serving `/metrics` it renders
//! the text exposition once at the end of a run for the node-exporter
//! textfile collector.

use std::path::Path;

use crawl_pool::StopReason;
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

use crate::output::write_atomic;

/// Quota waits run from the safety buffer up to a full 15-minute window.
const QUOTA_WAIT_BUCKETS: &[f64] = &[0.1, 1.0, 5.0, 15.0, 60.0, 300.0, 600.0, 900.0];

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full("crawler_quota_wait_seconds".to_string()),
        QUOTA_WAIT_BUCKETS,
    )
}

/// Install the Prometheus recorder globally and return a handle for rendering.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}

/// Record the outcome of a finished run.
pub fn record_run(stop: &StopReason, collected: usize) {
    metrics::counter!("crawler_runs_total", "stop" => stop.label()).increment(1);
    metrics::gauge!("crawler_last_run_posts").set(collected as f64);
}

/// Write the current exposition to `path`.
pub async fn write_textfile(handle: &PrometheusHandle, path: &Path) -> crate::error::Result<()> {
    write_atomic(path, handle.render().as_bytes()).await
}
