//! Fully-read HTTP response returned by the fetcher

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// A response whose body has already been read off the wire.
///
/// The fetcher reads the body inside the request deadline, so by the time a
/// caller holds one of these no further I/O can block.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// Final URL the request was sent to
    pub url: String,
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body as text
    pub body: String,
}

impl FetchedResponse {
    /// Check if the response has a 2xx status.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Check if the upstream rejected the request for exceeding its rate limit.
    pub fn is_rate_limited(&self) -> bool {
        self.status == StatusCode::TOO_MANY_REQUESTS
    }

    /// Canonical reason phrase for the status, e.g. "Not Found".
    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    /// Get a header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Parse the body as JSON into the caller's type.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}
