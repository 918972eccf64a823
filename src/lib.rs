//! Resilient access layer for a rate-limited game statistics API
//!
//! Bundles a timeout-bounded fetcher, a time-boxed response cache, a client
//! that backs off on HTTP 429, and a bounded-concurrency fan-out for batch
//! lookups.

pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod fan_out;
pub mod fetch;

pub use cache::{cache_clear, cache_get, cache_set, CacheStore};
pub use client::{ApiClient, ApiError, ErrorKind, RetryPolicy};
pub use config::ApiConfig;
pub use fan_out::{fan_out, fan_out_settled, ItemFailure};
pub use fetch::{fetch_with_timeout, FetchError, FetchedResponse, RequestOptions};
