//! Retry with exponential backoff around an arbitrary async operation
//!
//! Attempt `n` (0-indexed) that fails is followed by a wait of
//! `backoff_factor * 2^n` seconds. By default every error kind is retried the
//! same way, including ones that cannot succeed on a second try.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::shared::errors::{AppError, AppResult};

/// Which failures are worth another attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryOn {
    /// Retry every failure uniformly
    #[default]
    AnyError,
    /// Give up immediately on failures `AppError::is_transient` rejects
    TransientOnly,
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = max_retries + 1
    pub max_retries: u32,
    /// Seconds multiplied by 2^attempt to get the wait before the next attempt
    pub backoff_factor: f64,
    /// Upper bound on a single wait
    pub max_delay: Option<Duration>,
    /// Add up to 10% random extra delay
    pub jitter: bool,
    pub retry_on: RetryOn,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: 1.0,
            max_delay: None,
            jitter: false,
            retry_on: RetryOn::AnyError,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_factor: f64) -> Self {
        Self {
            max_retries,
            backoff_factor,
            ..Self::default()
        }
    }

    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self::new(0, 0.0)
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    pub fn transient_only(mut self) -> Self {
        self.retry_on = RetryOn::TransientOnly;
        self
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait after failed attempt `attempt` (0-indexed)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let secs = self.backoff_factor * 2f64.powi(attempt.min(i32::MAX as u32) as i32);
        let mut delay = if secs.is_finite() && secs > 0.0 {
            Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };

        if let Some(max_delay) = self.max_delay {
            delay = delay.min(max_delay);
        }

        if self.jitter && !delay.is_zero() {
            let jitter_factor = 0.1 * rand::random::<f64>();
            delay = delay.saturating_add(delay.mul_f64(jitter_factor));
        }

        delay
    }

    pub fn should_retry(&self, error: &AppError) -> bool {
        match self.retry_on {
            RetryOn::AnyError => true,
            RetryOn::TransientOnly => error.is_transient(),
        }
    }
}

/// Runs an operation up to `max_retries + 1` times
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `operation` with retry logic and exponential backoff.
    ///
    /// Once every attempt is spent the most recent failure is returned inside
    /// `RetryExhausted`; earlier failures are dropped.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let max_retries = self.policy.max_retries;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        log::debug!(
                            "{} succeeded on attempt {} after {} retries",
                            operation_name,
                            attempt + 1,
                            attempt
                        );
                    }
                    return Ok(result);
                }
                Err(error) => {
                    if !self.policy.should_retry(&error) {
                        log::debug!(
                            "{} failed with non-retryable error: {}",
                            operation_name,
                            error
                        );
                        return Err(error);
                    }

                    // Don't wait after the last attempt
                    if attempt < max_retries {
                        let delay = self.policy.calculate_delay(attempt);
                        log::warn!(
                            "{} failed on attempt {}/{} ({}), retrying in {:?}",
                            operation_name,
                            attempt + 1,
                            self.policy.total_attempts(),
                            error,
                            delay
                        );
                        last_error = Some(error);
                        sleep(delay).await;
                    } else {
                        log::warn!(
                            "{} failed on final attempt {} ({}), giving up",
                            operation_name,
                            attempt + 1,
                            error
                        );
                        last_error = Some(error);
                    }
                }
            }
        }

        let last = last_error.unwrap_or_else(|| {
            AppError::InternalError(format!("{} ended without an attempt", operation_name))
        });
        Err(AppError::RetryExhausted {
            attempts: self.policy.total_attempts(),
            last: Box::new(last),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.total_attempts(), 4);
        assert_eq!(policy.retry_on, RetryOn::AnyError);
    }

    #[test]
    fn test_calculate_delay_exponential_backoff() {
        let policy = RetryPolicy::new(3, 1.0);
        assert_eq!(policy.calculate_delay(0), Duration::from_secs(1));
        assert_eq!(policy.calculate_delay(1), Duration::from_secs(2));
        assert_eq!(policy.calculate_delay(2), Duration::from_secs(4));

        let half = RetryPolicy::new(3, 0.5);
        assert_eq!(half.calculate_delay(2), Duration::from_secs(2));
    }

    #[test]
    fn test_calculate_delay_is_capped() {
        let policy = RetryPolicy::new(10, 1.0).with_max_delay(Duration::from_secs(5));
        assert_eq!(policy.calculate_delay(8), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        let policy = RetryPolicy::new(3, 1.0).with_jitter();
        for _ in 0..50 {
            let delay = policy.calculate_delay(1);
            assert!(delay >= Duration::from_secs(2));
            assert!(delay <= Duration::from_millis(2200));
        }
    }

    #[test]
    fn test_zero_factor_means_no_wait() {
        assert_eq!(RetryPolicy::none().calculate_delay(3), Duration::ZERO);
    }

    #[test]
    fn test_should_retry() {
        let not_found = AppError::NotFound("user 1".into());
        assert!(RetryPolicy::default().should_retry(&not_found));
        assert!(!RetryPolicy::default().transient_only().should_retry(&not_found));
    }

    #[tokio::test]
    async fn test_first_success_is_returned() {
        let executor = RetryExecutor::new(RetryPolicy::new(3, 0.0));
        let result = executor.execute("ok", || async { Ok::<_, AppError>(7) }).await;
        assert_eq!(result, Ok(7));
    }
}
