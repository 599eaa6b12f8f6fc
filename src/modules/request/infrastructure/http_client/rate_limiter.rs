//! Sliding-window admission control scoped to one logical operation
//!
//! The limiter never sleeps to smooth traffic. A call over budget is rejected
//! immediately with an estimate of when the window frees up, and it is up to
//! the retry layer or the caller to decide what to do with that.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::LogContext;

/// Length of the trailing window every limiter counts over
pub const WINDOW: Duration = Duration::from_secs(60);

/// Outcome of one admission check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    Admitted,
    Rejected { retry_after: Duration },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Per-operation call counter over the trailing 60 seconds
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    operation: String,
    calls_per_minute: u32,
    calls: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(operation: impl Into<String>, calls_per_minute: u32) -> Self {
        let calls_per_minute = calls_per_minute.max(1);
        Self {
            operation: operation.into(),
            calls_per_minute,
            calls: Mutex::new(VecDeque::with_capacity(calls_per_minute as usize)),
        }
    }

    /// Purge stale timestamps, then admit and record `now` or reject.
    ///
    /// The purge, the count and the append happen under one lock so two
    /// concurrent callers can never both take the last slot.
    pub async fn try_acquire(&self) -> Admission {
        let mut calls = self.calls.lock().await;
        let now = Instant::now();

        while let Some(&oldest) = calls.front() {
            if now.duration_since(oldest) >= WINDOW {
                calls.pop_front();
            } else {
                break;
            }
        }

        if calls.len() >= self.calls_per_minute as usize {
            let oldest = calls.front().copied().unwrap_or(now);
            let retry_after = WINDOW.saturating_sub(now.duration_since(oldest));
            return Admission::Rejected { retry_after };
        }

        calls.push_back(now);
        Admission::Admitted
    }

    /// Same as `try_acquire`, with rejection surfaced as `RateLimitExceeded`
    pub async fn acquire(&self) -> AppResult<()> {
        match self.try_acquire().await {
            Admission::Admitted => Ok(()),
            Admission::Rejected { retry_after } => {
                let retry_after_secs = retry_after.as_secs_f64();
                LogContext::rate_limited(&self.operation, retry_after_secs);
                Err(AppError::RateLimitExceeded {
                    operation: self.operation.clone(),
                    retry_after_secs,
                })
            }
        }
    }

    /// Calls currently counted against the budget
    pub async fn in_window(&self) -> usize {
        let calls = self.calls.lock().await;
        let now = Instant::now();
        calls
            .iter()
            .filter(|&&at| now.duration_since(at) < WINDOW)
            .count()
    }

    /// Check if a call would be admitted right now (for monitoring)
    pub async fn can_make_request_now(&self) -> bool {
        self.in_window().await < self.calls_per_minute as usize
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn calls_per_minute(&self) -> u32 {
        self.calls_per_minute
    }
}

/// Run `operation` only if `limiter` admits it
pub async fn rate_limited<F, Fut, T>(limiter: &SlidingWindowLimiter, operation: F) -> AppResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    limiter.acquire().await?;
    operation().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_limiter_creation() {
        let limiter = SlidingWindowLimiter::new("get_user", 120);
        assert_eq!(limiter.operation(), "get_user");
        assert_eq!(limiter.calls_per_minute(), 120);
        assert!(limiter.can_make_request_now().await);
    }

    #[tokio::test]
    async fn test_zero_budget_is_clamped() {
        let limiter = SlidingWindowLimiter::new("noop", 0);
        assert_eq!(limiter.calls_per_minute(), 1);
        assert!(limiter.try_acquire().await.is_admitted());
        assert!(!limiter.try_acquire().await.is_admitted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let limiter = SlidingWindowLimiter::new("get_user", 2);
        assert!(limiter.try_acquire().await.is_admitted());
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(limiter.try_acquire().await.is_admitted());

        match limiter.try_acquire().await {
            Admission::Rejected { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(30))
            }
            Admission::Admitted => panic!("third call within the window must be rejected"),
        }

        // First call ages out exactly at the 60s boundary
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(limiter.in_window().await, 1);
        assert!(limiter.try_acquire().await.is_admitted());
    }

    #[tokio::test]
    async fn test_rate_limited_wrapper_skips_rejected_work() {
        let limiter = SlidingWindowLimiter::new("post_batch", 1);
        let first = rate_limited(&limiter, || async { Ok::<_, AppError>(1) }).await;
        assert_eq!(first, Ok(1));

        let ran = std::sync::atomic::AtomicBool::new(false);
        let flag = &ran;
        let second = rate_limited(&limiter, || async move {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok::<_, AppError>(2)
        })
        .await;
        assert!(matches!(second, Err(AppError::RateLimitExceeded { .. })));
        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
    }
}
