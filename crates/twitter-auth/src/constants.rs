//! Twitter v1.1 API constants

/// Default REST API root. Overridable in config so tests can point at a mock.
pub const API_BASE_URL: &str = "https://api.twitter.com/1.1";

/// Standard search endpoint, relative to the API root
pub const SEARCH_PATH: &str = "/search/tweets.json";

/// Rate limit status endpoint, relative to the API root. Calls to it do not
/// count against the search quota.
pub const RATE_LIMIT_STATUS_PATH: &str = "/application/rate_limit_status.json";

/// `resources` family queried on the status endpoint
pub const SEARCH_RESOURCE: &str = "search";

/// Key of the search endpoint inside `resources.search`
pub const SEARCH_ENDPOINT_KEY: &str = "/search/tweets";

/// Query modifier that excludes retweets server-side
pub const FILTER_RETWEETS: &str = "-filter:retweets";

/// Largest page the standard search endpoint will return
pub const MAX_PAGE_SIZE: u32 = 100;

pub const OAUTH_SIGNATURE_METHOD: &str = "HMAC-SHA1";

pub const OAUTH_VERSION: &str = "1.0";
