//! Command-line interface parsing for herostats
//!
//! This module handles parsing of CLI arguments using clap and folds the
//! global flags over the environment-derived client configuration.

use clap::{Parser, Subcommand};
use thiserror::Error;
use url::Url;

use crate::config::ApiConfig;
use crate::fetch::timeout_from_millis;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// Fan-out width must leave room for at least one request
    #[error("Invalid concurrency: {0}. Concurrency must be at least 1")]
    InvalidConcurrency(usize),

    /// The base URL override is not an absolute URL
    #[error("Invalid base URL '{0}': {1}")]
    InvalidBaseUrl(String, url::ParseError),
}

/// herostats - Query the match/player/hero statistics API
#[derive(Parser, Debug)]
#[command(name = "herostats")]
#[command(about = "Rate-limit aware client for the game statistics API")]
#[command(version)]
pub struct Cli {
    /// Upstream API root (overrides STATS_API_BASE_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Per-attempt timeout in milliseconds; zero or negative fails immediately
    #[arg(long, global = true, value_name = "MS", allow_negative_numbers = true)]
    pub timeout_ms: Option<i64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Fetch a single resource and print it as JSON
    ///
    /// Examples:
    ///   herostats fetch /heroes
    ///   herostats fetch /matches/7412345678
    Fetch {
        /// Path relative to the API root, or a full URL
        path: String,
    },

    /// Fetch several resources concurrently and print a JSON array
    ///
    /// Failed lookups appear as null in their position.
    Batch {
        /// Paths relative to the API root, or full URLs
        #[arg(required = true)]
        paths: Vec<String>,

        /// Maximum simultaneous requests (defaults to STATS_API_MAX_CONCURRENCY or 6)
        #[arg(short, long, value_name = "N")]
        concurrency: Option<usize>,

        /// Cache responses for this many seconds so repeated paths hit the upstream once
        #[arg(long, value_name = "SECS")]
        cache_ttl: Option<u64>,
    },
}

impl Cli {
    /// Applies the command-line overrides on top of `base`.
    ///
    /// # Returns
    /// * `Ok(ApiConfig)` with overrides applied
    /// * `Err(CliError)` if a flag value is out of range
    pub fn apply_to(&self, base: ApiConfig) -> Result<ApiConfig, CliError> {
        let mut config = base;

        if let Some(base_url) = &self.base_url {
            Url::parse(base_url).map_err(|e| CliError::InvalidBaseUrl(base_url.clone(), e))?;
            config = config.with_base_url(base_url.clone());
        }

        if let Some(ms) = self.timeout_ms {
            config = config.with_timeout(timeout_from_millis(ms));
        }

        if let Command::Batch {
            concurrency: Some(n),
            ..
        } = &self.command
        {
            if *n == 0 {
                return Err(CliError::InvalidConcurrency(*n));
            }
            config = config.with_max_concurrency(*n);
        }

        Ok(config)
    }

    /// Default tracing filter for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "herostats=debug"
        } else {
            "herostats=info"
        }
    }
}
