//! Errors returned by the retrying API client

use std::time::Duration;

use thiserror::Error;

use crate::fetch::FetchError;

/// Terminal failures of a logical API call
#[derive(Debug, Error)]
pub enum ApiError {
    /// A single attempt did not complete within its deadline
    #[error("Request to {url} timed out after {}ms", .timeout.as_millis())]
    Timeout { url: String, timeout: Duration },

    /// The upstream answered 429 on every attempt in the retry budget
    #[error("Rate limited by upstream after {attempts} attempts: {url}")]
    RateLimited { url: String, attempts: u32 },

    /// The upstream answered with a non-2xx status other than 429
    #[error("HTTP {status} {status_text}: {url}")]
    Http {
        url: String,
        status: u16,
        status_text: String,
    },

    /// Network-level failure (DNS, connection refused, reset)
    #[error("HTTP request failed: {0}")]
    Transport(reqwest::Error),

    /// The payload was not valid JSON for the requested type
    #[error("Failed to parse JSON response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The path or URL could not be turned into a request URL
    #[error("Invalid URL '{input}': {source}")]
    InvalidUrl {
        input: String,
        source: url::ParseError,
    },
}

/// Structured tag for an [`ApiError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Timeout,
    RateLimited,
    Http,
    Transport,
    Decode,
    InvalidUrl,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Timeout { .. } => ErrorKind::Timeout,
            ApiError::RateLimited { .. } => ErrorKind::RateLimited,
            ApiError::Http { .. } => ErrorKind::Http,
            ApiError::Transport(_) => ErrorKind::Transport,
            ApiError::Decode(_) => ErrorKind::Decode,
            ApiError::InvalidUrl { .. } => ErrorKind::InvalidUrl,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Whether a user-initiated retry later might succeed.
    ///
    /// True for rate limiting and timeouts; other failures will repeat.
    pub fn is_retryable_by_caller(&self) -> bool {
        matches!(self.kind(), ErrorKind::RateLimited | ErrorKind::Timeout)
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout { url, timeout } => ApiError::Timeout { url, timeout },
            FetchError::Transport(e) => ApiError::Transport(e),
        }
    }
}
