//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Credentials are never part of the TOML; the file only points at the
//! credential list on disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crawl_pool::{CrawlOptions, DEFAULT_MAX_CONSECUTIVE_RATE_LIMITS};
use search_api::SearchQuery;
use serde::Deserialize;
use twitter_auth::{API_BASE_URL, MAX_PAGE_SIZE};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub search: SearchConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub api: ApiConfig,
    pub paths: PathsConfig,
}

/// What to search for and how much of it
#[derive(Debug, Deserialize)]
pub struct SearchConfig {
    pub term: String,
    #[serde(default = "default_target")]
    pub target: usize,
    #[serde(default = "default_true")]
    pub filter_retweets: bool,
    /// Empty string disables the language restriction
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_true")]
    pub include_entities: bool,
}

/// Quota handling
#[derive(Debug, Deserialize)]
pub struct RateLimitConfig {
    /// Seconds added to every computed quota wait
    #[serde(default = "default_buffer_secs")]
    pub buffer_secs: f64,
    #[serde(default = "default_max_consecutive_rate_limits")]
    pub max_consecutive_rate_limits: u32,
}

/// Upstream API settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Input and output locations
#[derive(Debug, Deserialize)]
pub struct PathsConfig {
    pub credentials: PathBuf,
    pub output: PathBuf,
    /// Prometheus textfile written at the end of a run
    #[serde(default)]
    pub metrics: Option<PathBuf>,
}

fn default_target() -> usize {
    4000
}

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "en".to_string()
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_buffer_secs() -> f64 {
    0.1
}

fn default_max_consecutive_rate_limits() -> u32 {
    DEFAULT_MAX_CONSECUTIVE_RATE_LIMITS
}

fn default_base_url() -> String {
    API_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            buffer_secs: default_buffer_secs(),
            max_consecutive_rate_limits: default_max_consecutive_rate_limits(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Values given on the command line, applied on top of the file.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Overrides {
    pub term: Option<String>,
    pub target: Option<usize>,
    pub credentials: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

impl Overrides {
    /// Parse `--term`, `--target`, `--credentials` and `--output`.
    pub fn from_args(args: &[String]) -> common::Result<Self> {
        let target = flag_value(args, "--target")
            .map(|raw| {
                raw.parse::<usize>().map_err(|e| {
                    common::Error::config(format!("--target must be a non-negative integer: {e}"))
                })
            })
            .transpose()?;

        Ok(Self {
            term: flag_value(args, "--term").map(str::to_string),
            target,
            credentials: flag_value(args, "--credentials").map(PathBuf::from),
            output: flag_value(args, "--output").map(PathBuf::from),
        })
    }
}

/// Value following `name` in `args`, if both are present.
pub fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> common::Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI overrides and re-validate.
    pub fn apply_overrides(&mut self, overrides: Overrides) -> common::Result<()> {
        if let Some(term) = overrides.term {
            self.search.term = term;
        }
        if let Some(target) = overrides.target {
            self.search.target = target;
        }
        if let Some(credentials) = overrides.credentials {
            self.paths.credentials = credentials;
        }
        if let Some(output) = overrides.output {
            self.paths.output = output;
        }
        self.validate()
    }

    fn validate(&self) -> common::Result<()> {
        if self.search.term.trim().is_empty() {
            return Err(common::Error::config("search.term must not be empty"));
        }

        if self.search.target == 0 {
            return Err(common::Error::config(
                "search.target must be greater than 0",
            ));
        }

        if self.search.page_size == 0 || self.search.page_size > MAX_PAGE_SIZE {
            return Err(common::Error::config(format!(
                "search.page_size must be between 1 and {MAX_PAGE_SIZE}, got: {}",
                self.search.page_size
            )));
        }

        if !self.rate_limit.buffer_secs.is_finite() || self.rate_limit.buffer_secs < 0.0 {
            return Err(common::Error::config(format!(
                "rate_limit.buffer_secs must be a non-negative number, got: {}",
                self.rate_limit.buffer_secs
            )));
        }

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(common::Error::config(format!(
                "api.base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(common::Error::config(
                "api.timeout_secs must be greater than 0",
            ));
        }

        Ok(())
    }

    /// First-page query for the configured term.
    pub fn search_query(&self) -> SearchQuery {
        let language = Some(self.search.language.trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string);
        SearchQuery::new(
            &self.search.term,
            self.search.filter_retweets,
            self.search.page_size,
        )
        .with_language(language)
        .with_entities(self.search.include_entities)
    }

    pub fn crawl_options(&self) -> CrawlOptions {
        CrawlOptions {
            target: self.search.target,
            max_consecutive_rate_limits: self.rate_limit.max_consecutive_rate_limits,
        }
    }

    pub fn buffer(&self) -> Duration {
        Duration::from_secs_f64(self.rate_limit.buffer_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("tweet-crawler.toml")
    }
}
