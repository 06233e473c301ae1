// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Provider Rate Limiter
 * Sliding-window admission with retry/backoff for cloud management APIs
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use crate::errors::{ProviderError, ProviderResult};
use parking_lot::Mutex as SyncMutex;
use rand::Rng;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;
use tracing::{debug, warn};

const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry behavior for provider calls that fail transiently
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts per call, including the first
    pub max_retries: u32,

    /// First backoff step for transient errors
    pub base_delay: Duration,

    /// Backoff ceiling
    pub max_delay: Duration,

    /// Wait applied after a throttle response that carried no hint
    pub default_retry_after: Duration,

    /// Jitter to prevent synchronized retries across scanner tasks
    pub enable_jitter: bool,
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            default_retry_after: Duration::from_secs(1),
            enable_jitter: true,
            jitter_factor: 0.3,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_default_retry_after(mut self, retry_after: Duration) -> Self {
        self.default_retry_after = retry_after;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.enable_jitter = false;
        self
    }

    /// Backoff for a given attempt: `base_delay * 2^(attempt-1)`, capped
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_secs(0);
        }

        let base = self.base_delay.as_millis() as f64 * 2f64.powi((attempt - 1) as i32);
        let capped = base.min(self.max_delay.as_millis() as f64);

        let with_jitter = if self.enable_jitter {
            let mut rng = rand::rng();
            let jitter_range = capped * self.jitter_factor;
            let jitter = rng.random_range(-jitter_range..jitter_range);
            (capped + jitter).max(0.0)
        } else {
            capped
        };

        Duration::from_millis(with_jitter as u64)
    }
}

/// Counters exposed for post-scan diagnostics
#[derive(Debug, Clone)]
pub struct RateLimiterStats {
    pub total_requests: u64,
    pub throttle_events: u64,
    pub timeouts: u64,
    pub retries: u64,
}

/// Shared outbound gate for every provider call in one scan session.
///
/// Admission is a sliding one-second window: a request proceeds when fewer
/// than `requests_per_second` requests were admitted in the trailing second.
/// Callers queue FIFO on the window lock, and the lock is held across the
/// admission wait so ordering survives contention. A throttle response sets
/// a `retry_after` deadline that blocks all admissions until it passes;
/// the ceiling protects the whole account, not one scanner.
pub struct ProviderRateLimiter {
    requests_per_second: u32,
    request_timeout: Duration,
    policy: RetryPolicy,
    window: AsyncMutex<VecDeque<Instant>>,
    retry_after_until: SyncMutex<Option<Instant>>,
    total_requests: AtomicU64,
    throttle_events: AtomicU64,
    timeouts: AtomicU64,
    retries: AtomicU64,
}

impl ProviderRateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        Self::with_policy(requests_per_second, RetryPolicy::default())
    }

    pub fn with_policy(requests_per_second: u32, policy: RetryPolicy) -> Self {
        Self {
            requests_per_second: requests_per_second.max(1),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            policy,
            window: AsyncMutex::new(VecDeque::new()),
            retry_after_until: SyncMutex::new(None),
            total_requests: AtomicU64::new(0),
            throttle_events: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            retries: AtomicU64::new(0),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Block until a request slot is free under the per-second ceiling
    async fn acquire(&self) {
        let mut window = self.window.lock().await;

        // A prior throttle response may have set a global wait
        if let Some(deadline) = self.pending_retry_after() {
            let now = Instant::now();
            if deadline > now {
                debug!(
                    wait_ms = (deadline - now).as_millis() as u64,
                    "[RateLimiter] Honoring retry-after deadline"
                );
                tokio::time::sleep_until(deadline).await;
            }
            *self.retry_after_until.lock() = None;
        }

        loop {
            let now = Instant::now();
            while window
                .front()
                .is_some_and(|t| now.duration_since(*t) >= Duration::from_secs(1))
            {
                window.pop_front();
            }

            if (window.len() as u32) < self.requests_per_second {
                window.push_back(now);
                self.total_requests.fetch_add(1, Ordering::Relaxed);
                return;
            }

            // Wait for the oldest admission to age out of the window
            if let Some(oldest) = window.front().copied() {
                tokio::time::sleep_until(oldest + Duration::from_secs(1)).await;
            }
        }
    }

    fn pending_retry_after(&self) -> Option<Instant> {
        *self.retry_after_until.lock()
    }

    fn note_retry_after(&self, hint: Duration) {
        let deadline = Instant::now() + hint;
        let mut until = self.retry_after_until.lock();
        // Keep the later deadline if several calls were throttled at once
        if until.map_or(true, |existing| deadline > existing) {
            *until = Some(deadline);
        }
    }

    /// Run one provider call under the ceiling, the per-request timeout,
    /// and the retry policy.
    ///
    /// Throttle responses wait out the provider's hint (or the configured
    /// default) and retry; transient errors back off exponentially; a
    /// timeout is retried once and then surfaced as-is so callers can tell
    /// it apart from a hard failure. Non-retryable errors propagate
    /// immediately.
    pub async fn execute<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> ProviderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        let mut attempt = 0;
        let mut timeouts_seen = 0;
        let mut last_error: Option<ProviderError> = None;

        while attempt < self.policy.max_retries {
            attempt += 1;

            self.acquire().await;

            let outcome = tokio::time::timeout(self.request_timeout, operation()).await;
            let err = match outcome {
                Ok(Ok(value)) => {
                    if attempt > 1 {
                        debug!(
                            attempt = attempt,
                            operation = operation_name,
                            "[RateLimiter] Succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Ok(Err(e)) => e,
                Err(_) => {
                    self.timeouts.fetch_add(1, Ordering::Relaxed);
                    ProviderError::Timeout {
                        duration: self.request_timeout,
                    }
                }
            };

            warn!(
                attempt = attempt,
                max_retries = self.policy.max_retries,
                operation = operation_name,
                error = %err,
                "[RateLimiter] Provider call failed"
            );

            if err.is_throttle() {
                self.throttle_events.fetch_add(1, Ordering::Relaxed);
                let hint = err.retry_after().unwrap_or(self.policy.default_retry_after);
                self.note_retry_after(hint);
                last_error = Some(err);
                if attempt < self.policy.max_retries {
                    self.retries.fetch_add(1, Ordering::Relaxed);
                    // The recorded deadline is enforced at the next acquire
                    continue;
                }
            } else if matches!(err, ProviderError::Timeout { .. }) {
                timeouts_seen += 1;
                last_error = Some(err);
                if timeouts_seen > 1 {
                    break;
                }
                if attempt < self.policy.max_retries {
                    self.retries.fetch_add(1, Ordering::Relaxed);
                    tokio::time::sleep(self.policy.calculate_backoff(attempt)).await;
                    continue;
                }
            } else if err.is_retryable() {
                last_error = Some(err);
                if attempt < self.policy.max_retries {
                    self.retries.fetch_add(1, Ordering::Relaxed);
                    let backoff = self.policy.calculate_backoff(attempt);
                    debug!(
                        attempt = attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        operation = operation_name,
                        "[RateLimiter] Backing off before retry"
                    );
                    tokio::time::sleep(backoff).await;
                    continue;
                }
            } else {
                return Err(err);
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ProviderError::Other(format!(
                "Operation '{}' failed after {} attempts",
                operation_name, self.policy.max_retries
            ))
        }))
    }

    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            throttle_events: self.throttle_events.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}

impl Default for ProviderRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_SECOND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy::default().without_jitter();

        assert_eq!(policy.calculate_backoff(0), Duration::from_secs(0));
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(100));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(200));
        assert_eq!(policy.calculate_backoff(3), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_cap() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            default_retry_after: Duration::from_secs(1),
            enable_jitter: false,
            jitter_factor: 0.0,
        };

        assert_eq!(policy.calculate_backoff(3), Duration::from_secs(4));
        assert_eq!(policy.calculate_backoff(8), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_ceiling_enforced() {
        let limiter = ProviderRateLimiter::new(10);
        let started = std::time::Instant::now();

        for _ in 0..11 {
            let result: ProviderResult<()> = limiter.execute("noop", || async { Ok(()) }).await;
            result.unwrap();
        }

        // The 11th admission has to wait for the first to age out
        assert!(started.elapsed() >= Duration::from_millis(900));
    }

    #[tokio::test]
    async fn test_throttle_retried_until_success() {
        let policy = RetryPolicy::default()
            .with_max_retries(3)
            .with_default_retry_after(Duration::from_millis(10))
            .without_jitter();
        let limiter = ProviderRateLimiter::with_policy(100, policy);

        let calls = Arc::new(AtomicU32::new(0));
        let result = limiter
            .execute("list_buckets", || {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ProviderError::Throttled {
                            service: "s3".to_string(),
                            retry_after: None,
                        })
                    } else {
                        Ok("inventory")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "inventory");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(limiter.stats().throttle_events, 2);
    }

    #[tokio::test]
    async fn test_throttle_exhausts_retries() {
        let policy = RetryPolicy::default()
            .with_max_retries(3)
            .with_default_retry_after(Duration::from_millis(5))
            .without_jitter();
        let limiter = ProviderRateLimiter::with_policy(100, policy);

        let calls = Arc::new(AtomicU32::new(0));
        let result: ProviderResult<()> = limiter
            .execute("list_buckets", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::Throttled {
                        service: "s3".to_string(),
                        retry_after: None,
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(ProviderError::Throttled { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_after_hint_honored() {
        let policy = RetryPolicy::default()
            .with_max_retries(2)
            .without_jitter();
        let limiter = ProviderRateLimiter::with_policy(100, policy);

        let calls = Arc::new(AtomicU32::new(0));
        let started = std::time::Instant::now();
        let result = limiter
            .execute("describe", || {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(ProviderError::Throttled {
                            service: "ec2".to_string(),
                            retry_after: Some(Duration::from_millis(50)),
                        })
                    } else {
                        Ok(1)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 1);
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_non_retryable_propagates_immediately() {
        let limiter = ProviderRateLimiter::new(100);

        let calls = Arc::new(AtomicU32::new(0));
        let result: ProviderResult<()> = limiter
            .execute("list_users", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::AuthenticationFailed {
                        reason: "session expired".to_string(),
                    })
                }
            })
            .await;

        assert!(matches!(
            result,
            Err(ProviderError::AuthenticationFailed { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_retried_once_then_surfaced() {
        let policy = RetryPolicy::default()
            .with_max_retries(5)
            .with_base_delay(Duration::from_millis(1))
            .without_jitter();
        let limiter = ProviderRateLimiter::with_policy(100, policy)
            .with_request_timeout(Duration::from_millis(20));

        let calls = Arc::new(AtomicU32::new(0));
        let result: ProviderResult<()> = limiter
            .execute("slow_describe", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok(())
                }
            })
            .await;

        assert!(matches!(result, Err(ProviderError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
