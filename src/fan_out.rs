//! Bounded concurrency fan-out
//!
//! Runs an async operation over every item of a collection while keeping at
//! most `max_concurrency` operations in flight. A failing item never affects
//! its siblings; its slot is recorded as a failure and the batch carries on.
//! Results always come back in input order.

use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::future::join_all;
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Why a fan-out slot holds no result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemFailure {
    /// The per-item operation returned an error
    #[error("item {index} failed: {message}")]
    Failed { index: usize, message: String },

    /// The per-item operation panicked
    #[error("item {index} panicked")]
    Panicked { index: usize },
}

impl ItemFailure {
    /// Input position of the failed item
    pub fn index(&self) -> usize {
        match self {
            ItemFailure::Failed { index, .. } | ItemFailure::Panicked { index } => *index,
        }
    }
}

/// Applies `op` to every item with bounded concurrency, returning one
/// `Option` per input in input order; `None` marks a failed item.
///
/// See [`fan_out_settled`] for the admission rules.
pub async fn fan_out<I, T, E, F, Fut>(
    items: impl IntoIterator<Item = I>,
    op: F,
    max_concurrency: usize,
) -> Vec<Option<T>>
where
    F: Fn(I, usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    fan_out_settled(items, op, max_concurrency)
        .await
        .into_iter()
        .map(Result::ok)
        .collect()
}

/// Applies `op` to every item with bounded concurrency, keeping the failure
/// detail for each slot.
///
/// Each item must take a permit from a pool of `max_concurrency` before its
/// operation starts and gives it back when the operation finishes, so the
/// window never exceeds the limit and refills as soon as any item settles.
/// Permits are handed out first come first served, which admits items in
/// input order. A limit of zero is treated as one.
///
/// Everything runs on the calling task; nothing is spawned, so `op` and its
/// futures need not be `Send` or `'static`.
pub async fn fan_out_settled<I, T, E, F, Fut>(
    items: impl IntoIterator<Item = I>,
    op: F,
    max_concurrency: usize,
) -> Vec<Result<T, ItemFailure>>
where
    F: Fn(I, usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let permits = Semaphore::new(max_concurrency.max(1));
    let permits = &permits;
    let op = &op;

    let tasks = items.into_iter().enumerate().map(move |(index, item)| async move {
        // The semaphore is never closed, so acquire cannot fail.
        let _permit = permits.acquire().await.ok();
        debug!(index, "fan-out item started");

        let outcome = AssertUnwindSafe(async move { op(item, index).await })
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(index, error = %e, "fan-out item failed");
                Err(ItemFailure::Failed {
                    index,
                    message: e.to_string(),
                })
            }
            Err(_) => {
                warn!(index, "fan-out item panicked");
                Err(ItemFailure::Panicked { index })
            }
        }
    });

    join_all(tasks).await
}
