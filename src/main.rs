//! herostats - query the game statistics API from the terminal
//!
//! Thin front end over the library: every request goes through the
//! timeout-bounded, rate-limit aware client, and batch lookups go through the
//! bounded fan-out.

use std::process;

use clap::Parser;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use herostats::cache::CacheStore;
use herostats::cli::{Cli, Command};
use herostats::{ApiClient, ApiConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout only ever carries JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match cli.apply_to(ApiConfig::from_env()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    if config.api_key.is_none() {
        tracing::info!("no API key configured, requests will be unauthenticated");
    }

    let client = ApiClient::new(config);

    match &cli.command {
        Command::Fetch { path } => match client.fetch_resource::<Value>(path).await {
            Ok(payload) => println!("{}", serde_json::to_string_pretty(&payload)?),
            Err(e) => {
                eprintln!("Error: {}", e);
                if e.is_retryable_by_caller() {
                    eprintln!("The API is busy or slow right now; try again in a moment.");
                }
                process::exit(1);
            }
        },
        Command::Batch {
            paths, cache_ttl, ..
        } => {
            let results = match cache_ttl {
                Some(ttl) => {
                    let cache = CacheStore::new();
                    client.fetch_many_cached(paths, &cache, *ttl).await
                }
                None => client.fetch_many(paths).await,
            };

            let failed = results.iter().filter(|r| r.is_none()).count();
            if failed > 0 {
                tracing::warn!("{} of {} lookups returned no data", failed, results.len());
            }

            let output: Vec<Value> = results
                .into_iter()
                .map(|r| r.unwrap_or(Value::Null))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
