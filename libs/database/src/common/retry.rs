use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff policy shared by connection bootstrap and store reads
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay in milliseconds
    pub max_delay_ms: u64,

    /// Growth factor applied to the delay after every failed attempt
    pub backoff_multiplier: f64,

    /// Randomise each delay to 50-100% of its nominal value
    pub use_jitter: bool,
}

impl RetryConfig {
    /// Defaults: 3 retries, 100ms initial delay, 5s cap, doubling, jitter on.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay_ms: u64) -> Self {
        self.initial_delay_ms = delay_ms;
        self
    }

    pub fn with_max_delay(mut self, delay_ms: u64) -> Self {
        self.max_delay_ms = delay_ms;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    /// Nominal delay (before jitter) preceding retry number `retry`, 1-based.
    fn nominal_delay_ms(&self, retry: u32) -> u64 {
        let growth = self.backoff_multiplier.powi(retry.saturating_sub(1) as i32);
        ((self.initial_delay_ms as f64 * growth) as u64).min(self.max_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

/// Retry an async operation with exponential backoff, but only while
/// `should_retry` classifies the error as worth another attempt.
///
/// Errors rejected by the predicate are returned immediately, so permanent
/// failures (validation, not-found, duplicate keys) never pay the backoff.
///
/// ```ignore
/// use database::common::{RetryConfig, retry_if};
/// use database::mongodb::is_transient;
///
/// let doc = retry_if(
///     || collection.find_one(filter.clone()),
///     RetryConfig::new().with_max_retries(2),
///     is_transient,
/// )
/// .await?;
/// ```
pub async fn retry_if<F, Fut, T, E, P>(
    mut operation: F,
    config: RetryConfig,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("Operation succeeded after {} retries", attempt);
                }
                return Ok(result);
            }
            Err(e) if !should_retry(&e) => return Err(e),
            Err(e) => {
                attempt += 1;

                if attempt > config.max_retries {
                    warn!(
                        "Operation failed after {} attempts: {}",
                        config.max_retries + 1,
                        e
                    );
                    return Err(e);
                }

                let nominal = config.nominal_delay_ms(attempt);
                let delay = if config.use_jitter {
                    apply_jitter(nominal)
                } else {
                    nominal
                };

                debug!(
                    "Operation failed (attempt {}/{}): {}. Retrying in {}ms...",
                    attempt, config.max_retries, e, delay
                );

                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
    }
}

/// Retry an async operation with exponential backoff on every error.
pub async fn retry_with_backoff<F, Fut, T, E>(operation: F, config: RetryConfig) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_if(operation, config, |_| true).await
}

/// [`retry_with_backoff`] with the default [`RetryConfig`].
pub async fn retry<F, Fut, T, E>(operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_with_backoff(operation, RetryConfig::default()).await
}

/// Scale a delay to a pseudo-random 50-100% of its value so that callers
/// failing together do not retry in lockstep.
fn apply_jitter(delay: u64) -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::BuildHasher;

    let random_factor =
        (RandomState::new().hash_one(std::time::SystemTime::now()) % 50) as f64 / 100.0 + 0.5;

    (delay as f64 * random_factor) as u64
}
