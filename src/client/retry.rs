//! Backoff schedule for rate-limited requests

use std::time::Duration;

/// Fixed per-retry delays applied after a 429 response.
///
/// Retry `n` (0-based) waits `schedule[n]`; once the schedule is exhausted
/// the call fails as rate limited. The default is 1s, 2s, 4s, i.e. three
/// retries and four attempts in total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    schedule: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            schedule: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ],
        }
    }
}

impl RetryPolicy {
    /// A policy with an explicit delay per retry
    pub fn with_schedule(schedule: Vec<Duration>) -> Self {
        Self { schedule }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            schedule: Vec::new(),
        }
    }

    /// Delay before retry number `retry` (0-based), or `None` once exhausted.
    pub fn delay_for(&self, retry: u32) -> Option<Duration> {
        self.schedule.get(retry as usize).copied()
    }

    pub fn max_retries(&self) -> u32 {
        self.schedule.len() as u32
    }

    /// Initial attempt plus every retry
    pub fn max_attempts(&self) -> u32 {
        self.max_retries() + 1
    }

    /// Sum of all backoff delays if every retry is used
    pub fn total_backoff(&self) -> Duration {
        self.schedule.iter().sum()
    }
}
