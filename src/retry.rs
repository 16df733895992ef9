//! Bounded exponential backoff for provider calls.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// How often, and how patiently, a provider call is retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total tries, first one included. Must be at least 1.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    /// Cap applied to every individual wait
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Free-text translation: 3 tries, waits of 1s then 2s.
    pub fn translation() -> Self {
        Self::new(3, Duration::from_secs(1)).with_max_delay(Duration::from_secs(5))
    }

    /// Language detection only picks a default, so it gives up after one
    /// short wait.
    pub fn detection() -> Self {
        Self::new(2, Duration::from_millis(500)).with_max_delay(Duration::from_secs(1))
    }

    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Waits between consecutive tries, `max_attempts - 1` of them.
    pub fn backoff_schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_attempts.saturating_sub(1)).map(move |retry| {
            let millis =
                self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(retry as i32);
            Duration::from_millis(millis as u64).min(self.max_delay)
        })
    }

    /// Worst-case time spent sleeping before the last try.
    pub fn total_backoff(&self) -> Duration {
        self.backoff_schedule().sum()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::translation()
    }
}

/// Run `operation` until it succeeds or `config.max_attempts` is used up.
///
/// # Panics
/// Panics if `config.max_attempts` is 0
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, label: &str, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    with_retry_if(config, label, operation, |_| true).await
}

/// Like [`with_retry`], but an error rejected by `should_retry` ends the
/// loop at once (a 401 will not fix itself by waiting).
///
/// # Panics
/// Panics if `config.max_attempts` is 0
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    label: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    assert!(
        config.max_attempts >= 1,
        "RetryConfig.max_attempts must be >= 1, got {}",
        config.max_attempts
    );

    let mut waits = config.backoff_schedule();
    let mut attempt = 1;

    loop {
        let error = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{}: succeeded on try {}/{}", label, attempt, config.max_attempts);
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !should_retry(&error) {
            debug!("{}: giving up on non-retryable error: {}", label, error);
            return Err(error);
        }

        let Some(wait) = waits.next() else {
            warn!(
                "{}: all {} tries failed, last error: {}",
                label, config.max_attempts, error
            );
            return Err(error);
        };

        warn!(
            "{}: try {}/{} failed ({}), retrying in {:?}",
            label, attempt, config.max_attempts, error, wait
        );
        if !wait.is_zero() {
            sleep(wait).await;
        }
        attempt += 1;
    }
}
