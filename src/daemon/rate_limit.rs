//! Sliding-window relay rate limiter (§4.E, §8 invariant 5).
//!
//! Keyed by the relay requester's identity: the literal string `"local"`
//! for IPC callers, or the peer's remote address for federated relays —
//! all local clients therefore share one bucket (§9 design note d).

use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const WINDOW: Duration = Duration::from_secs(60);
pub const LIMIT: usize = 30;

#[derive(Debug, Default)]
pub struct RateLimiter {
    hits: HashMap<String, Vec<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one attempt for `key` at `now` and reports whether it is
    /// admitted under the 30-per-60s rolling window.
    pub fn check(&mut self, key: &str, now: Instant) -> bool {
        let entry = self.hits.entry(key.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) < WINDOW);
        if entry.len() >= LIMIT {
            return false;
        }
        entry.push(now);
        true
    }
}

#[cfg(test)]
#[path = "tests/rate_limit_tests.rs"]
mod rate_limit_tests;
