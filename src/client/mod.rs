//! Retrying client for the upstream statistics API
//!
//! Builds authenticated request URLs, routes every attempt through the
//! timeout-bounded fetcher and transparently backs off when the upstream
//! answers 429. Only rate limiting is retried; every other failure is
//! terminal and returned to the caller.

mod error;
mod retry;

pub use error::{ApiError, ErrorKind};
pub use retry::RetryPolicy;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::cache::CacheStore;
use crate::config::ApiConfig;
use crate::fan_out::fan_out;
use crate::fetch::{fetch_with_timeout, FetchedResponse, RequestOptions};

/// Query parameter carrying the provider credential
pub const API_KEY_PARAM: &str = "api_key";

/// Client for the upstream statistics API
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    config: ApiConfig,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(ApiConfig::default())
    }
}

impl ApiClient {
    /// Create a client with the given configuration
    pub fn new(config: ApiConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Create a client from `STATS_API_*` environment variables
    pub fn from_env() -> Self {
        Self::new(ApiConfig::from_env())
    }

    /// Create a client with a custom HTTP client
    pub fn with_client(http: Client, config: ApiConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Turn a path or absolute URL into the URL that will be requested.
    ///
    /// Relative paths are joined onto the configured base URL. The credential
    /// is appended as `api_key` only when one is configured and the URL does
    /// not already carry one, so passing an already-built URL back in is a
    /// no-op.
    pub fn build_url(&self, path_or_url: &str) -> Result<Url, ApiError> {
        let raw = if is_absolute(path_or_url) {
            path_or_url.to_string()
        } else {
            format!(
                "{}/{}",
                self.config.base_url.trim_end_matches('/'),
                path_or_url.trim_start_matches('/')
            )
        };

        let mut url = Url::parse(&raw).map_err(|source| ApiError::InvalidUrl {
            input: path_or_url.to_string(),
            source,
        })?;

        if let Some(key) = self.config.api_key.as_deref() {
            if !url.query_pairs().any(|(name, _)| name == API_KEY_PARAM) {
                url.query_pairs_mut().append_pair(API_KEY_PARAM, key);
            }
        }

        Ok(url)
    }

    /// Fetch and decode one resource with a plain GET.
    ///
    /// # Arguments
    /// * `path_or_url` - Path relative to the base URL (e.g. `/matches/123`) or a full URL
    ///
    /// # Returns
    /// * `Ok(T)` - The decoded payload
    /// * `Err(ApiError)` - Timeout, exhausted rate-limit retries, non-2xx status,
    ///   transport failure or undecodable body
    pub async fn fetch_resource<T: DeserializeOwned>(&self, path_or_url: &str) -> Result<T, ApiError> {
        self.fetch_resource_with(path_or_url, &RequestOptions::default())
            .await
    }

    /// Fetch and decode one resource with explicit request options.
    pub async fn fetch_resource_with<T: DeserializeOwned>(
        &self,
        path_or_url: &str,
        options: &RequestOptions,
    ) -> Result<T, ApiError> {
        let url = self.build_url(path_or_url)?;
        let response = self.send_with_retry(&url, options).await?;
        Ok(response.json()?)
    }

    /// Serve `key` from `cache` if fresh, otherwise fetch `path_or_url` and
    /// store the raw payload for `ttl_seconds`.
    ///
    /// Failures are never cached.
    pub async fn fetch_resource_cached<T: DeserializeOwned>(
        &self,
        path_or_url: &str,
        cache: &CacheStore,
        key: &str,
        ttl_seconds: u64,
    ) -> Result<T, ApiError> {
        if let Some(hit) = cache.get_as::<T>(key) {
            return Ok(hit);
        }

        let value: Value = self.fetch_resource(path_or_url).await?;
        let data = serde_json::from_value(value.clone())?;
        cache.set(key, value, ttl_seconds);
        Ok(data)
    }

    /// Fetch many resources with at most `config.max_concurrency` in flight.
    ///
    /// Slot `i` holds the payload for `paths[i]`, or `None` if that fetch failed.
    pub async fn fetch_many(&self, paths: &[String]) -> Vec<Option<Value>> {
        fan_out(
            paths,
            |path, _| self.fetch_resource::<Value>(path),
            self.config.max_concurrency,
        )
        .await
    }

    /// Like [`ApiClient::fetch_many`], going through `cache` keyed by
    /// `"resource:<path>"`.
    pub async fn fetch_many_cached(
        &self,
        paths: &[String],
        cache: &CacheStore,
        ttl_seconds: u64,
    ) -> Vec<Option<Value>> {
        fan_out(
            paths,
            |path, _| async move {
                let key = resource_key(path);
                self.fetch_resource_cached::<Value>(path, cache, &key, ttl_seconds)
                    .await
            },
            self.config.max_concurrency,
        )
        .await
    }

    /// Issue attempts until one succeeds, one fails terminally, or the
    /// rate-limit budget runs out. Attempts are strictly sequential.
    async fn send_with_retry(
        &self,
        url: &Url,
        options: &RequestOptions,
    ) -> Result<FetchedResponse, ApiError> {
        let display_url = redact_credential(url);
        let policy = &self.config.retry;
        let mut retry: u32 = 0;

        loop {
            debug!(url = %display_url, attempt = retry + 1, "fetching resource");

            let response = fetch_with_timeout(&self.http, url.as_str(), options, self.config.timeout)
                .await
                .map_err(|e| match ApiError::from(e) {
                    ApiError::Timeout { timeout, .. } => ApiError::Timeout {
                        url: display_url.clone(),
                        timeout,
                    },
                    other => other,
                })?;

            if response.is_success() {
                return Ok(response);
            }

            if !response.is_rate_limited() {
                return Err(ApiError::Http {
                    url: display_url,
                    status: response.status.as_u16(),
                    status_text: response.status_text().to_string(),
                });
            }

            match policy.delay_for(retry) {
                Some(delay) => {
                    warn!(
                        url = %display_url,
                        attempt = retry + 1,
                        "rate limited, waiting {:?} before retrying",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                None => {
                    warn!(url = %display_url, attempts = retry + 1, "rate limit retries exhausted");
                    return Err(ApiError::RateLimited {
                        url: display_url,
                        attempts: retry + 1,
                    });
                }
            }
        }
    }
}

/// Cache key used by the batch helpers for a path
pub fn resource_key(path: &str) -> String {
    format!("resource:{}", path)
}

fn is_absolute(path_or_url: &str) -> bool {
    let lower = path_or_url.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Render a URL for logs and errors with the credential value masked.
fn redact_credential(url: &Url) -> String {
    if !url.query_pairs().any(|(name, _)| name == API_KEY_PARAM) {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(name, value)| {
            let value = if name == API_KEY_PARAM {
                "REDACTED".to_string()
            } else {
                value.into_owned()
            };
            (name.into_owned(), value)
        })
        .collect();

    let mut redacted = url.clone();
    redacted
        .query_pairs_mut()
        .clear()
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    redacted.to_string()
}
