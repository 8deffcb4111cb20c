//! Sliding-window rate limiter for outbound messages.
//!
//! Bancho silences accounts that exceed their message quota, so the
//! client enforces the quota locally: a send that would exceed the
//! window suspends the calling task until the window resets. Only the
//! caller waits; the read loop is never involved.

use std::collections::VecDeque;

use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::config::RateLimit;

/// Tracks send timestamps inside the current window.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    limit: RateLimit,
    sent: VecDeque<Instant>,
}

impl SlidingWindowLimiter {
    /// Create a limiter for the given tier.
    pub fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            sent: VecDeque::new(),
        }
    }

    /// Reserve one send slot, suspending until the window allows it.
    pub async fn acquire(&mut self) {
        loop {
            let now = Instant::now();
            let window = self.limit.window();
            while let Some(front) = self.sent.front() {
                if now.duration_since(*front) >= window {
                    self.sent.pop_front();
                } else {
                    break;
                }
            }
            if (self.sent.len() as u32) < self.limit.threshold {
                self.sent.push_back(now);
                return;
            }
            // Full window: wait for the oldest send to fall out of it.
            let wake = *self.sent.front().unwrap_or(&now) + window;
            debug!(until = ?wake, "rate limit reached, suspending send");
            sleep_until(wake).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn limiter(threshold: u32) -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(RateLimit {
            threshold,
            window_secs: 60,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_under_threshold_never_waits() {
        let mut l = limiter(3);
        let start = Instant::now();
        for _ in 0..3 {
            l.acquire().await;
        }
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_exceeded_suspends_until_reset() {
        let mut l = limiter(2);
        let start = Instant::now();
        l.acquire().await;
        l.acquire().await;
        // Third send waits out the full window.
        l.acquire().await;
        assert_eq!(Instant::now() - start, Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let mut l = limiter(2);
        l.acquire().await;
        tokio::time::advance(Duration::from_secs(30)).await;
        l.acquire().await;

        let before = Instant::now();
        // Only the first send has to expire, 30s from now.
        l.acquire().await;
        assert_eq!(Instant::now() - before, Duration::from_secs(30));
    }
}
