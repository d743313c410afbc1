//! Read retry policy: bounded retries with exponential backoff.
//!
//! Only for reads (`list`, snapshot `read`). Writes are never retried here, a
//! repeated transition could duplicate side effects.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::config::ReadRetryConfig;
use crate::domain::TrackerResult;

#[derive(Debug, Clone)]
pub struct ReadRetry {
    /// Total attempts including the first one.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier.
    pub multiplier: f64,

    /// Cap on any single delay.
    pub max_delay: Duration,
}

impl ReadRetry {
    pub fn from_config(config: &ReadRetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            multiplier: config.multiplier,
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    /// delay = min(base_delay * multiplier^(attempts - 1), max_delay)
    ///
    /// With base_delay=50ms, multiplier=2.0:
    /// - after attempt 1: 50ms
    /// - after attempt 2: 100ms
    /// - after attempt 3: 200ms
    ///
    /// A product that does not fit a `Duration` (overflow, NaN) is `max_delay`.
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = i32::try_from(attempts.saturating_sub(1)).unwrap_or(i32::MAX);
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(delay_secs)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Run `op`, retrying transient failures until `max_attempts` is used up.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> TrackerResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TrackerResult<T>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match op().await {
                Err(e) if e.is_transient() && attempts < self.max_attempts => {
                    let delay = self.next_delay(attempts);
                    debug!(attempts, ?delay, error = %e, "Retrying read");
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

impl Default for ReadRetry {
    fn default() -> Self {
        Self::from_config(&ReadRetryConfig::default())
    }
}
