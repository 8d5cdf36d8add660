//! Twitter v1.1 standard search client
//!
//! One `TwitterClient` per credential set. Every request is a signed GET;
//! the query string is built with the same RFC 3986 encoding the signature
//! uses so the upstream recomputes an identical base string.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};
use twitter_auth::{
    AppCredentials, RATE_LIMIT_STATUS_PATH, SEARCH_ENDPOINT_KEY, SEARCH_PATH, SEARCH_RESOURCE,
    percent_encode,
};

use crate::{
    ApiError, ErrorClassification, Post, QuotaSnapshot, Result, SearchApi, SearchQuery,
    classify_status,
};

/// `created_at` layout used by the v1.1 API, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
const TWITTER_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

#[derive(Deserialize)]
struct RateLimitStatusResponse {
    resources: HashMap<String, HashMap<String, EndpointLimit>>,
}

#[derive(Deserialize)]
struct EndpointLimit {
    limit: u32,
    remaining: u32,
    /// Epoch seconds
    reset: i64,
}

#[derive(Deserialize)]
struct SearchResponse {
    statuses: Vec<RawStatus>,
}

#[derive(Deserialize)]
struct RawStatus {
    id: u64,
    #[serde(alias = "full_text")]
    text: String,
    created_at: String,
}

impl RawStatus {
    fn normalize(self) -> Result<Post> {
        let created_at = parse_created_at(&self.created_at)?;
        Ok(Post {
            id: self.id,
            text: self.text,
            created_at,
        })
    }
}

/// Parse a v1.1 `created_at` value into UTC.
pub fn parse_created_at(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_str(value, TWITTER_DATE_FORMAT)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ApiError::Decode(format!("invalid created_at {value:?}: {e}")))
}

/// Search API client bound to a single credential set.
pub struct TwitterClient {
    id: String,
    credentials: AppCredentials,
    base_url: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl TwitterClient {
    /// `index` is the credential's position in the credential file and
    /// becomes its log identity.
    pub fn new(
        index: usize,
        credentials: AppCredentials,
        base_url: &str,
        http: reqwest::Client,
        timeout: Duration,
    ) -> Self {
        Self {
            id: format!("credential-{index}"),
            credentials,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            timeout,
        }
    }

    /// Issue a signed GET and return the body of a 2xx response.
    async fn signed_get(&self, path: &str, params: &[(&str, String)]) -> Result<String> {
        let url = format!("{}{path}", self.base_url);
        let pairs: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let authorization =
            twitter_auth::authorization_header("GET", &url, &pairs, &self.credentials)
                .map_err(|e| ApiError::Auth(e.to_string()))?;

        let query = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let full_url = if query.is_empty() {
            url
        } else {
            format!("{url}?{query}")
        };

        let response = self
            .http
            .get(&full_url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Http(format!("GET {path} failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Http(format!("reading {path} response: {e}")))?;

        if status.is_success() {
            return Ok(body);
        }

        match classify_status(status.as_u16(), &body) {
            ErrorClassification::RateLimited => {
                debug!(credential = %self.id, path, status = status.as_u16(), "request rate limited");
                Err(ApiError::RateLimited(format!("{path} returned {status}")))
            }
            ErrorClassification::Fatal => {
                warn!(credential = %self.id, path, status = status.as_u16(), "request failed");
                Err(ApiError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

impl SearchApi for TwitterClient {
    fn id(&self) -> &str {
        &self.id
    }

    fn rate_limit_status(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<QuotaSnapshot>> + Send + '_>> {
        Box::pin(async move {
            let body = self
                .signed_get(
                    RATE_LIMIT_STATUS_PATH,
                    &[("resources", SEARCH_RESOURCE.to_string())],
                )
                .await?;
            let parsed: RateLimitStatusResponse = serde_json::from_str(&body)
                .map_err(|e| ApiError::Decode(format!("rate limit status: {e}")))?;

            let endpoint = parsed
                .resources
                .get(SEARCH_RESOURCE)
                .and_then(|family| family.get(SEARCH_ENDPOINT_KEY))
                .ok_or_else(|| {
                    ApiError::Decode(format!(
                        "rate limit status has no resources.{SEARCH_RESOURCE}[{SEARCH_ENDPOINT_KEY}]"
                    ))
                })?;

            QuotaSnapshot::from_epoch(endpoint.remaining, endpoint.limit, endpoint.reset)
                .ok_or_else(|| ApiError::Decode(format!("reset out of range: {}", endpoint.reset)))
        })
    }

    fn search<'a>(
        &'a self,
        query: &'a SearchQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Post>>> + Send + 'a>> {
        Box::pin(async move {
            let body = self.signed_get(SEARCH_PATH, &query.params()).await?;
            let parsed: SearchResponse = serde_json::from_str(&body)
                .map_err(|e| ApiError::Decode(format!("search response: {e}")))?;
            parsed
                .statuses
                .into_iter()
                .map(RawStatus::normalize)
                .collect()
        })
    }
}
