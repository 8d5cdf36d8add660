//! Tweet crawler
//!
//! Batch job that:
//! 1. Loads the credential list and builds one signed client per credential
//! 2. Crawls search results backwards from newest to oldest, rotating
//!    credentials as their rate-limit windows run dry
//! 3. Writes the collected posts to a JSON file (also on abort or SIGINT)
//! 4. Optionally writes a Prometheus textfile with run metrics

mod config;
mod error;
mod metrics;
mod output;

use anyhow::{Context, Result};
use crawl_pool::{CrawlReport, Crawler, CredentialPool, RateLimitGate, StopReason};
use search_api::TwitterClient;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, Overrides};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting tweet-crawler");

    let prometheus_handle =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    let args: Vec<String> = std::env::args().collect();
    let config_path = Config::resolve_path(config::flag_value(&args, "--config"));
    info!(path = %config_path.display(), "loading configuration");

    let mut config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    config
        .apply_overrides(Overrides::from_args(&args)?)
        .context("invalid command line override")?;

    info!(
        term = %config.search.term,
        target = config.search.target,
        base_url = %config.api.base_url,
        credentials = %config.paths.credentials.display(),
        output = %config.paths.output.display(),
        "configuration loaded"
    );

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    let run_id = uuid::Uuid::new_v4();
    let span = info_span!("crawl", run_id = %run_id.as_simple());
    let report = run(&config, cancel).instrument(span).await?;

    metrics::record_run(&report.stop, report.posts.len());
    if let Some(path) = &config.paths.metrics {
        if let Err(e) = metrics::write_textfile(&prometheus_handle, path).await {
            warn!(error = %e, "failed to write metrics textfile");
        }
    }

    match report.stop {
        StopReason::Aborted(reason) => {
            error!(
                reason = %reason,
                written = report.posts.len(),
                "crawl aborted, partial results written"
            );
            anyhow::bail!("crawl aborted: {reason}");
        }
        stop => {
            info!(
                stop = stop.label(),
                written = report.posts.len(),
                pages = report.pages,
                "done"
            );
            Ok(())
        }
    }
}

/// Load credentials, crawl, and persist whatever was collected.
async fn run(config: &Config, cancel: CancellationToken) -> Result<CrawlReport> {
    let credentials = twitter_auth::load(&config.paths.credentials)
        .await
        .context("failed to load credentials")?;

    let http = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;
    let clients: Vec<TwitterClient> = credentials
        .into_iter()
        .enumerate()
        .map(|(index, creds)| {
            TwitterClient::new(
                index,
                creds,
                &config.api.base_url,
                http.clone(),
                config.timeout(),
            )
        })
        .collect();

    let mut pool = CredentialPool::new(clients);
    let gate = RateLimitGate::new(config.buffer());

    let report = Crawler::new(
        &mut pool,
        &gate,
        config.search_query(),
        config.crawl_options(),
    )
    .with_cancellation(cancel)
    .run()
    .await
    .context("crawl could not start")?;

    output::write_posts(&config.paths.output, &report.posts)
        .await
        .with_context(|| {
            format!(
                "failed to write results to {}",
                config.paths.output.display()
            )
        })?;

    info!(
        path = %config.paths.output.display(),
        posts = report.posts.len(),
        "results written"
    );
    Ok(report)
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, stopping crawl"),
        _ = terminate => info!("received SIGTERM, stopping crawl"),
    }
}
