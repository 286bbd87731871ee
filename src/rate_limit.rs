//! Rate Limiter (C2): per-provider request pacing and quota tracking, parsed
//! from response headers. Callers that find `can_make_request() == false`
//! must fall back to cache rather than wait (spec §5 back-pressure rule).

use std::sync::Mutex;
use std::time::{Duration, Instant};

use reqwest::header::HeaderMap;

#[derive(Debug, Clone, Copy)]
struct Quota {
    remaining: u32,
    reset_at: Instant,
}

struct State {
    last_call: Option<Instant>,
    quota: Option<Quota>,
}

/// One instance per provider adapter; never shared across providers.
pub struct RateLimiter {
    min_delay: Duration,
    state: Mutex<State>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            state: Mutex::new(State {
                last_call: None,
                quota: None,
            }),
        }
    }

    /// Waits until `now - last_call_time >= min_delay`. Suspension is via
    /// `tokio::time::sleep`, so it never blocks other tasks on the executor.
    pub async fn before_call(&self) {
        let wait = {
            let state = self.state.lock().unwrap();
            match state.last_call {
                Some(last) => self.min_delay.saturating_sub(last.elapsed()),
                None => Duration::ZERO,
            }
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        self.state.lock().unwrap().last_call = Some(Instant::now());
    }

    /// `false` if quota is known to be exhausted and the reset time has not
    /// yet passed.
    pub fn can_make_request(&self) -> bool {
        let state = self.state.lock().unwrap();
        match state.quota {
            Some(q) if q.remaining == 0 && Instant::now() < q.reset_at => false,
            _ => true,
        }
    }

    /// Refreshes quota state from `X-RateLimit-Remaining`/`X-RateLimit-Reset`
    /// (or provider-equivalent headers passed in already-normalized form).
    pub fn update_from_headers(&self, headers: &HeaderMap) {
        let remaining = headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u32>().ok());

        let reset_secs = headers
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        if let Some(remaining) = remaining {
            let reset_at = reset_secs
                .map(|secs| Instant::now() + Duration::from_secs(secs))
                .unwrap_or_else(|| Instant::now() + Duration::from_secs(60));
            self.state.lock().unwrap().quota = Some(Quota { remaining, reset_at });
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    #[tokio::test]
    async fn before_call_waits_the_minimum_delay() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        limiter.before_call().await;
        let start = Instant::now();
        limiter.before_call().await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn exhausted_quota_before_reset_blocks_requests() {
        let limiter = RateLimiter::new(Duration::from_millis(0));
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-ratelimit-remaining"),
            HeaderValue::from_static("0"),
        );
        headers.insert(
            HeaderName::from_static("x-ratelimit-reset"),
            HeaderValue::from_static("60"),
        );
        limiter.update_from_headers(&headers);
        assert!(!limiter.can_make_request());
    }

    #[test]
    fn no_quota_information_permits_requests() {
        let limiter = RateLimiter::new(Duration::from_millis(0));
        assert!(limiter.can_make_request());
    }
}
