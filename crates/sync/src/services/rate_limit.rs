//! Per-email sliding window limiter for historical backfills.
//!
//! Backfills are expensive (they page through the platform's order list), so
//! each email may trigger only a few within a window. Windows live in a
//! `moka` cache and expire once an email has been idle for a full window.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use moka::future::Cache;

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// The request was recorded; `remaining` more fit in the window.
    Allowed { remaining: u32 },
    /// The request was rejected and not recorded.
    Limited { retry_after: Duration },
}

/// Rate limit store for backfill requests.
pub trait BackfillRateLimiter: Send + Sync + 'static {
    /// Atomically check the window for `key` and record this request if allowed.
    fn check_and_record(&self, key: &str) -> impl Future<Output = RateDecision> + Send;
}

type Window = Arc<Mutex<VecDeque<Instant>>>;

/// In-process sliding window limiter.
#[derive(Clone)]
pub struct SlidingWindowLimiter {
    max_requests: u32,
    window: Duration,
    windows: Cache<String, Window>,
}

impl SlidingWindowLimiter {
    /// Allow `max_requests` per key within any `window`-long interval.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let windows = Cache::builder()
            .max_capacity(100_000)
            .time_to_idle(window)
            .build();

        Self {
            max_requests,
            window,
            windows,
        }
    }

    /// [`BackfillRateLimiter::check_and_record`] at an explicit instant.
    pub async fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let window = self
            .windows
            .get_with(key.to_owned(), async { Arc::new(Mutex::new(VecDeque::new())) })
            .await;

        let mut hits = window.lock().unwrap_or_else(PoisonError::into_inner);

        while let Some(&oldest) = hits.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                hits.pop_front();
            } else {
                break;
            }
        }

        let used = u32::try_from(hits.len()).unwrap_or(u32::MAX);
        if used >= self.max_requests {
            let retry_after = hits.front().map_or(self.window, |&oldest| {
                self.window
                    .saturating_sub(now.saturating_duration_since(oldest))
            });
            return RateDecision::Limited {
                retry_after: round_up_to_secs(retry_after),
            };
        }

        hits.push_back(now);
        RateDecision::Allowed {
            remaining: self.max_requests - used - 1,
        }
    }
}

impl BackfillRateLimiter for SlidingWindowLimiter {
    async fn check_and_record(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now()).await
    }
}

fn round_up_to_secs(duration: Duration) -> Duration {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    Duration::from_secs(secs.max(1))
}
