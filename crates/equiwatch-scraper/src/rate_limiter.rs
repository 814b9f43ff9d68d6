//! Outbound request throttle: a minimum inter-request interval plus a
//! sliding one-minute request cap, shared across every call through the
//! scraper (spec §4.3).
//!
//! The teacher's own rate-limit code (`octofhir-auth`'s `RateLimitRule`)
//! models inbound request classification, not a blocking async gate, so
//! this is a fresh async `acquire()` primitive generalized from that
//! window-based shape.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    max_per_minute: usize,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    last_request: Option<Instant>,
    recent_requests: Vec<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration, max_per_minute: usize) -> Self {
        Self {
            min_interval,
            max_per_minute,
            state: Mutex::new(State::default()),
        }
    }

    /// Blocks the caller until a request may be made, then records it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let window_start = now - Duration::from_secs(60);
                state.recent_requests.retain(|t| *t > window_start);

                let min_interval_wait = state
                    .last_request
                    .map(|last| {
                        let elapsed = now.saturating_duration_since(last);
                        self.min_interval.saturating_sub(elapsed)
                    })
                    .unwrap_or_default();

                let window_wait = if state.recent_requests.len() >= self.max_per_minute {
                    state.recent_requests[0] + Duration::from_secs(60) - now
                } else {
                    Duration::ZERO
                };

                let wait = min_interval_wait.max(window_wait);
                if wait.is_zero() {
                    state.last_request = Some(now);
                    state.recent_requests.push(now);
                    return;
                }
                wait
            };
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    #[tokio::test(start_paused = true)]
    async fn enforces_minimum_interval() {
        let limiter = RateLimiter::new(StdDuration::from_millis(500), 1000);
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(Instant::now().saturating_duration_since(start) >= StdDuration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn enforces_sliding_window_cap() {
        let limiter = RateLimiter::new(StdDuration::from_millis(1), 2);
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(Instant::now().saturating_duration_since(start) >= StdDuration::from_secs(60));
    }
}
