use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Per-username login brute force limiter: after `max_failures` failed
/// attempts inside `window`, further attempts are refused until the window
/// that started with the first failure has elapsed.
pub struct LoginRateLimiter {
    /// username -> (failed_count, window_start)
    entries: DashMap<String, (u32, Instant)>,
    max_failures: u32,
    window: Duration,
    /// Entry count at which `record_failure` sweeps expired windows first.
    capacity: usize,
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(15 * 60))
    }
}

impl LoginRateLimiter {
    pub fn new(max_failures: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_failures,
            window,
            capacity: 10_000,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries whose window has elapsed.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.entries
            .retain(|_, (_, start)| now.duration_since(*start) <= self.window);
    }

    /// Check if a login attempt is allowed. Returns the seconds left in the
    /// lockout otherwise. Does not count the attempt; call `record_failure()`
    /// on bad credentials.
    pub fn check(&self, username: &str) -> Result<(), u64> {
        let now = Instant::now();

        let Some(entry) = self.entries.get(&username.to_lowercase()) else {
            return Ok(());
        };
        let (count, start) = *entry.value();

        if now.duration_since(start) > self.window || count < self.max_failures {
            return Ok(());
        }

        let elapsed = now.duration_since(start).as_secs();
        Err(self.window.as_secs().saturating_sub(elapsed))
    }

    pub fn record_failure(&self, username: &str) {
        if self.entries.len() >= self.capacity {
            self.cleanup();
        }
        let now = Instant::now();

        let mut entry = self
            .entries
            .entry(username.to_lowercase())
            .or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) > self.window {
            *count = 1;
            *start = now;
        } else {
            *count += 1;
        }
    }

    /// Forget failures after a successful login.
    pub fn reset(&self, username: &str) {
        self.entries.remove(&username.to_lowercase());
    }
}
