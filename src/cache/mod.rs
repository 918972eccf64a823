//! Ephemeral response cache
//!
//! This module provides a time-boxed key-value store used to short-circuit
//! repeated upstream lookups. Callers choose keys and TTLs; the cache enforces
//! no policy on what should be cached.

mod store;

pub use store::{CacheStore, CachedData};

use std::sync::OnceLock;

use serde_json::Value;

static GLOBAL_CACHE: OnceLock<CacheStore> = OnceLock::new();

/// The process-wide cache instance, created on first use.
pub fn global() -> &'static CacheStore {
    GLOBAL_CACHE.get_or_init(CacheStore::new)
}

/// Looks up `key` in the process-wide cache.
pub fn cache_get(key: &str) -> Option<Value> {
    global().get(key)
}

/// Stores `value` in the process-wide cache for `ttl_seconds`.
pub fn cache_set(key: impl Into<String>, value: Value, ttl_seconds: u64) {
    global().set(key, value, ttl_seconds);
}

/// Empties the process-wide cache.
pub fn cache_clear() {
    global().clear();
}
