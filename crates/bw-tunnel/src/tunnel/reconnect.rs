//! Exponential backoff for connection retries

use std::future::Future;
use std::time::Duration;

use bw_core::config::BackoffConfig;
use bw_core::TunnelError;

/// Exponential backoff with jitter between connection attempts
pub struct ExponentialBackoff {
    /// Delay before the first retry
    initial: Duration,
    /// Current delay
    current: Duration,
    /// Maximum delay
    max: Duration,
    /// Multiplier
    multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    jitter: f64,
}

impl ExponentialBackoff {
    /// Create a new backoff from configuration
    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(config.initial, config.max, config.multiplier, config.jitter)
    }

    /// Create a new backoff with custom parameters
    pub fn new(initial: Duration, max: Duration, multiplier: f64, jitter: f64) -> Self {
        Self {
            initial,
            current: initial,
            max,
            multiplier,
            jitter: if jitter.is_nan() { 0.0 } else { jitter.clamp(0.0, 1.0) },
        }
    }

    /// Get the next delay and advance the backoff
    ///
    /// A growth step that does not fit in a `Duration` saturates at the
    /// maximum delay.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;

        let next = Duration::try_from_secs_f64(self.current.as_secs_f64() * self.multiplier)
            .unwrap_or(self.max);
        self.current = std::cmp::min(next, self.max);

        let jitter_amount = delay.as_secs_f64() * self.jitter * rand::random::<f64>();
        delay.saturating_add(Duration::try_from_secs_f64(jitter_amount).unwrap_or_default())
    }

    /// Go back to the initial delay
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Run `attempt` until it succeeds, fails permanently, or the configured
/// number of attempts is used up
///
/// Only errors for which [`TunnelError::is_retryable`] holds are retried.
/// The last error is returned when attempts run out.
pub async fn retry<T, F, Fut>(config: &BackoffConfig, mut attempt: F) -> Result<T, TunnelError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TunnelError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut backoff = ExponentialBackoff::from_config(config);
    let mut tries = 0;

    loop {
        tries += 1;
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && tries < max_attempts => {
                let delay = backoff.next_delay();
                tracing::warn!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}",
                    tries,
                    max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
