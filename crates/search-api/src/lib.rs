//! Search API abstraction for the crawler
//!
//! Defines the `SearchApi` trait that decouples the rotation/pagination
//! engine from the concrete upstream. Each implementation is one
//! authenticated identity with its own rate-limit window. `TwitterClient`
//! is the production implementation (Twitter v1.1 standard search).

pub mod classify;
pub mod twitter;

pub use classify::classify_status;
pub use twitter::TwitterClient;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

/// How the caller should react to a failed API call.
///
/// - RateLimited: the credential's window closed between check and request;
///   pick a credential again, keep the cursor
/// - Fatal: anything else; stop the run and keep what was collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClassification {
    RateLimited,
    Fatal,
}

/// Errors from search API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("authentication failed: {0}")]
    Auth(String),
}

impl ApiError {
    pub fn classification(&self) -> ErrorClassification {
        match self {
            ApiError::RateLimited(_) => ErrorClassification::RateLimited,
            ApiError::Status { status, body } => classify_status(*status, body),
            ApiError::Http(_) | ApiError::Decode(_) | ApiError::Auth(_) => {
                ErrorClassification::Fatal
            }
        }
    }
}

/// Result alias for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Point-in-time quota facts for the search endpoint of one credential.
///
/// `reset` is already converted from the API's epoch seconds into UTC, so it
/// can be compared directly against `Utc::now()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub remaining: u32,
    pub limit: u32,
    pub reset: DateTime<Utc>,
}

impl QuotaSnapshot {
    /// Build a snapshot from the raw status fields. Returns `None` when
    /// `reset_epoch_secs` is outside chrono's representable range.
    pub fn from_epoch(remaining: u32, limit: u32, reset_epoch_secs: i64) -> Option<Self> {
        let reset = DateTime::from_timestamp(reset_epoch_secs, 0)?;
        Some(Self {
            remaining,
            limit,
            reset,
        })
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Parameters for one page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Full query string, including any `-filter:retweets` modifier
    pub term: String,
    pub page_size: u32,
    pub language: Option<String>,
    pub include_entities: bool,
    /// Inclusive upper bound on result ids; `None` for the first page
    pub max_id: Option<u64>,
}

impl SearchQuery {
    /// Build the query for `term`, appending the retweet filter as a query
    /// modifier when requested.
    pub fn new(term: &str, filter_retweets: bool, page_size: u32) -> Self {
        let term = if filter_retweets {
            format!("{term} {}", twitter_auth::FILTER_RETWEETS)
        } else {
            term.to_string()
        };
        Self {
            term,
            page_size,
            language: None,
            include_entities: true,
            max_id: None,
        }
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    pub fn with_entities(mut self, include_entities: bool) -> Self {
        self.include_entities = include_entities;
        self
    }

    /// Query-string pairs in the order they are sent.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", self.term.clone()),
            ("count", self.page_size.to_string()),
            ("include_entities", self.include_entities.to_string()),
        ];
        if let Some(lang) = &self.language {
            params.push(("lang", lang.clone()));
        }
        if let Some(max_id) = self.max_id {
            params.push(("max_id", max_id.to_string()));
        }
        params
    }
}

/// A normalized search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: u64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// One authenticated identity against the remote search API.
///
/// Uses `Pin<Box<dyn Future>>` return types so implementations stay
/// dyn-compatible.
pub trait SearchApi: Send + Sync {
    /// Identifier for logging (e.g. "credential-0")
    fn id(&self) -> &str;

    /// Fetch a fresh quota snapshot for the search endpoint. Does not consume
    /// search quota.
    fn rate_limit_status(&self) -> Pin<Box<dyn Future<Output = Result<QuotaSnapshot>> + Send + '_>>;

    /// Fetch one page of results, in upstream order (newest first).
    fn search<'a>(
        &'a self,
        query: &'a SearchQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Post>>> + Send + 'a>>;
}
