//! In-memory key-value store with per-entry expiry
//!
//! Provides a `CacheStore` that holds upstream payloads for a bounded
//! freshness window. Expiry is checked lazily on access; there is no
//! background sweep.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// A stored value together with its freshness window
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    /// The cached payload
    value: V,
    /// Wall-clock time the entry was written, for inspection only
    cached_at: DateTime<Utc>,
    /// Monotonic expiry instant; `None` when the TTL overflowed the clock
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }
}

/// A live entry as seen by `CacheStore::peek`
#[derive(Debug, Clone, PartialEq)]
pub struct CachedData<V> {
    /// The cached payload
    pub data: V,
    /// When the payload was stored
    pub cached_at: DateTime<Utc>,
    /// Time left before the entry expires (`Duration::MAX` if it never does)
    pub expires_in: Duration,
}

/// Time-boxed key-value cache
///
/// Keys are caller-defined strings, typically `"<resource-type>:<resource-id>"`.
/// Writing a key replaces any prior entry atomically. Expired entries are
/// never returned and are removed by the first lookup that notices them.
///
/// Construct one per scope that needs isolation (tests, separate clients);
/// [`super::global`] exposes a shared process-wide instance.
#[derive(Debug)]
pub struct CacheStore<V = Value> {
    entries: DashMap<String, CacheEntry<V>>,
}

impl<V> Default for CacheStore<V> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<V: Clone> CacheStore<V> {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the value stored under `key` if it has not expired.
    ///
    /// An expired entry is removed and reported as absent.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();

        if let Some(entry) = self.entries.get(key) {
            if entry.is_fresh(now) {
                debug!(key, "cache hit");
                return Some(entry.value.clone());
            }
        }

        // Only drop the entry if it is still the expired one; a concurrent
        // `set` may already have replaced it.
        if self
            .entries
            .remove_if(key, |_, entry| !entry.is_fresh(now))
            .is_some()
        {
            debug!(key, "cache entry expired");
        } else {
            debug!(key, "cache miss");
        }
        None
    }

    /// Stores `value` under `key` for `ttl_seconds`, replacing any existing entry.
    ///
    /// A TTL of zero stores an entry that is already expired.
    pub fn set(&self, key: impl Into<String>, value: V, ttl_seconds: u64) {
        self.set_with_ttl(key, value, Duration::from_secs(ttl_seconds));
    }

    /// Same as [`CacheStore::set`] with a sub-second TTL.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            cached_at: Utc::now(),
            expires_at: Instant::now().checked_add(ttl),
        };
        self.entries.insert(key.into(), entry);
    }

    /// Returns the live entry for `key` with its metadata, without removing
    /// expired entries.
    pub fn peek(&self, key: &str) -> Option<CachedData<V>> {
        let now = Instant::now();
        let entry = self.entries.get(key)?;
        if !entry.is_fresh(now) {
            return None;
        }

        Some(CachedData {
            data: entry.value.clone(),
            cached_at: entry.cached_at,
            expires_in: entry
                .expires_at
                .map(|at| at.saturating_duration_since(now))
                .unwrap_or(Duration::MAX),
        })
    }

    /// Removes the entry for `key`, returning its value if it was still fresh.
    pub fn remove(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.entries
            .remove(key)
            .filter(|(_, entry)| entry.is_fresh(now))
            .map(|(_, entry)| entry.value)
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drops all entries that have expired, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of resident entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore<Value> {
    /// Reads a JSON entry back into a typed value.
    ///
    /// An entry that cannot be deserialized into `T` is treated as a miss.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(key, error = %e, "cached entry has unexpected shape, treating as miss");
                None
            }
        }
    }

    /// Serializes `data` to JSON and stores it.
    ///
    /// Values that fail to serialize are not stored; the cache never raises.
    pub fn set_as<T: Serialize>(&self, key: impl Into<String>, data: &T, ttl_seconds: u64) {
        let key = key.into();
        match serde_json::to_value(data) {
            Ok(value) => self.set(key, value, ttl_seconds),
            Err(e) => warn!(key = %key, error = %e, "failed to serialize value for cache"),
        }
    }
}
