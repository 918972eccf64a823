//! Timeout-bounded HTTP fetcher
//!
//! Issues exactly one outbound request and guarantees it terminates within a
//! caller-specified deadline. No retries and no caching happen here; those
//! belong to the layers built on top of this one.

mod response;

pub use response::FetchedResponse;

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use thiserror::Error;
use tracing::{debug, warn};

/// Default per-request deadline
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Errors produced by a single timeout-bounded request
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request did not complete before its deadline
    #[error("Request to {url} timed out after {}ms", .timeout.as_millis())]
    Timeout { url: String, timeout: Duration },

    /// Lower-level network failure (DNS, connection refused, reset)
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Method, headers and body for an outbound request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    /// Plain GET with no extra headers
    pub fn get() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    fn apply(&self, client: &Client, url: &str) -> RequestBuilder {
        let request = client
            .request(self.method.clone(), url)
            .headers(self.headers.clone());
        match &self.body {
            Some(body) => request.body(body.clone()),
            None => request,
        }
    }
}

/// Convert a signed millisecond count into a deadline.
///
/// Zero or negative values become `Duration::ZERO`, which the fetcher treats
/// as "fire immediately".
pub fn timeout_from_millis(ms: i64) -> Duration {
    Duration::from_millis(ms.max(0) as u64)
}

/// Perform one HTTP request that is guaranteed to finish within `timeout`.
///
/// The deadline covers both the response head and reading the body. If it
/// fires first, the in-flight request future is dropped, which aborts the
/// underlying connection, and `FetchError::Timeout` is returned. A zero
/// timeout fails without touching the network.
///
/// Non-2xx statuses are NOT errors at this layer; the response is returned
/// as-is for the caller to interpret.
pub async fn fetch_with_timeout(
    client: &Client,
    url: &str,
    options: &RequestOptions,
    timeout: Duration,
) -> Result<FetchedResponse, FetchError> {
    // Query strings may carry credentials; keep them out of the logs.
    let target = url.split('?').next().unwrap_or(url);

    if timeout.is_zero() {
        warn!(url = target, "zero timeout, failing request immediately");
        return Err(FetchError::Timeout {
            url: url.to_string(),
            timeout,
        });
    }

    debug!(url = target, method = %options.method, timeout_ms = timeout.as_millis() as u64, "sending request");

    match tokio::time::timeout(timeout, send_and_read(options.apply(client, url))).await {
        Ok(result) => result,
        Err(_) => {
            warn!(url = target, timeout_ms = timeout.as_millis() as u64, "request timed out");
            Err(FetchError::Timeout {
                url: url.to_string(),
                timeout,
            })
        }
    }
}

async fn send_and_read(request: RequestBuilder) -> Result<FetchedResponse, FetchError> {
    let response = request.send().await?;
    let url = response.url().to_string();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await?;

    Ok(FetchedResponse {
        url,
        status,
        headers,
        body,
    })
}
