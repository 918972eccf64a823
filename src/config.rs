//! Client configuration
//!
//! Holds the upstream base URL, the provider credential and the knobs that
//! bound each request. Values come from the environment with builder-style
//! overrides for callers and tests.

use std::time::Duration;

use crate::client::RetryPolicy;
use crate::fetch::DEFAULT_TIMEOUT;

/// Default upstream API root
pub const DEFAULT_BASE_URL: &str = "https://api.opendota.com/api";

/// Default number of simultaneously in-flight fan-out operations
pub const DEFAULT_MAX_CONCURRENCY: usize = 6;

/// Environment variable holding the provider credential
pub const API_KEY_ENV: &str = "STATS_API_KEY";

/// Environment variable overriding the base URL
pub const BASE_URL_ENV: &str = "STATS_API_BASE_URL";

/// Environment variable overriding the per-attempt timeout in milliseconds
pub const TIMEOUT_ENV: &str = "STATS_API_TIMEOUT_MS";

/// Environment variable overriding the default fan-out width
pub const MAX_CONCURRENCY_ENV: &str = "STATS_API_MAX_CONCURRENCY";

/// Settings for [`crate::client::ApiClient`]
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// Root that relative paths are joined onto
    pub base_url: String,
    /// Provider credential, sent as the `api_key` query parameter
    pub api_key: Option<String>,
    /// Deadline for each individual HTTP attempt
    pub timeout: Duration,
    /// Default fan-out width for batch fetches
    pub max_concurrency: usize,
    /// Backoff schedule applied to 429 responses
    pub retry: RetryPolicy,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            retry: RetryPolicy::default(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from the process environment.
    ///
    /// A missing credential is not an error; requests then go out
    /// unauthenticated. Unparsable numeric values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(key) = lookup(API_KEY_ENV) {
            config = config.with_api_key(key);
        }

        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|s| !s.trim().is_empty()) {
            config.base_url = base_url.trim().to_string();
        }

        if let Some(ms) = lookup(TIMEOUT_ENV).and_then(|s| s.trim().parse::<u64>().ok()) {
            config.timeout = Duration::from_millis(ms);
        }

        if let Some(n) = lookup(MAX_CONCURRENCY_ENV)
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
        {
            config.max_concurrency = n;
        }

        config
    }

    /// Sets the credential; blank strings clear it.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = if api_key.trim().is_empty() {
            None
        } else {
            Some(api_key.trim().to_string())
        };
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the fan-out width; zero is raised to one.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
