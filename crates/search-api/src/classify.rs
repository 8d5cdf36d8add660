//! Rate-limit detection for Twitter API error responses
//!
//! Twitter signals an exhausted window with HTTP 429, and on some endpoints
//! with error code 88 ("Rate limit exceeded") in the JSON error body. Only
//! those two shapes are recoverable by picking another credential; every
//! other failure ends the run.

use crate::ErrorClassification;

/// Twitter error code for "Rate limit exceeded".
const RATE_LIMIT_ERROR_CODE: i64 = 88;

/// Whether a JSON error body carries Twitter error code 88.
fn has_rate_limit_code(body: &str) -> bool {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return false;
    };
    value
        .get("errors")
        .and_then(|errors| errors.as_array())
        .is_some_and(|errors| {
            errors
                .iter()
                .any(|e| e.get("code").and_then(|c| c.as_i64()) == Some(RATE_LIMIT_ERROR_CODE))
        })
}

/// Classify an upstream error by HTTP status and response body.
///
/// 429 is always a rate limit. Other statuses are rate limits only when the
/// body carries error code 88; everything else (401/403 bad credentials,
/// 5xx, malformed queries) is fatal.
pub fn classify_status(status: u16, body: &str) -> ErrorClassification {
    match status {
        429 => ErrorClassification::RateLimited,
        _ if has_rate_limit_code(body) => ErrorClassification::RateLimited,
        _ => ErrorClassification::Fatal,
    }
}
