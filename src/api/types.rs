//! Shared types for the HTTP layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::core_state::CoreState;

/// Searches allowed per client per minute.
const SEARCHES_PER_MINUTE: u32 = 30;
/// Searches allowed per client per hour.
const SEARCHES_PER_HOUR: u32 = 300;

const HOUR: Duration = Duration::from_secs(3600);
/// How often idle client windows are dropped.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self::with_rate_limiter(core, RateLimiter::new())
    }

    pub fn with_rate_limiter(core: Arc<CoreState>, limiter: RateLimiter) -> Self {
        Self {
            core,
            rate_limiter: Arc::new(Mutex::new(limiter)),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Rate limiter: sliding window per client key
// ═══════════════════════════════════════════════════════════

pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    per_minute: u32,
    per_hour: u32,
    last_sweep: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_limits(SEARCHES_PER_MINUTE, SEARCHES_PER_HOUR)
    }

    pub fn with_limits(per_minute: u32, per_hour: u32) -> Self {
        Self {
            windows: HashMap::new(),
            per_minute,
            per_hour,
            last_sweep: Instant::now(),
        }
    }

    /// Check if a client is within rate limits. Returns `Ok(())` or
    /// `Err(retry_after_secs)` if exceeded.
    pub fn check(&mut self, key: &str) -> Result<(), u64> {
        let now = Instant::now();
        if now.duration_since(self.last_sweep) >= SWEEP_INTERVAL {
            self.sweep(now);
        }
        let entries = self.windows.entry(key.to_string()).or_default();

        entries.retain(|ts| now.duration_since(*ts) < HOUR);

        let last_minute = entries
            .iter()
            .filter(|ts| now.duration_since(**ts) < Duration::from_secs(60))
            .count() as u32;
        if last_minute >= self.per_minute {
            return Err(60);
        }

        if entries.len() as u32 >= self.per_hour {
            return Err(3600);
        }

        entries.push(now);
        Ok(())
    }

    /// Drop request stamps older than an hour, and clients left with none.
    pub fn sweep(&mut self, now: Instant) {
        self.windows.retain(|_, entries| {
            entries.retain(|ts| now.saturating_duration_since(*ts) < HOUR);
            !entries.is_empty()
        });
        self.last_sweep = now;
    }

    /// Clients currently holding a window.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limiter_allows_up_to_per_minute() {
        let mut limiter = RateLimiter::new();
        for _ in 0..SEARCHES_PER_MINUTE {
            assert!(limiter.check("10.0.0.1").is_ok());
        }
        assert_eq!(limiter.check("10.0.0.1"), Err(60));
    }

    #[test]
    fn rate_limiter_keys_are_independent() {
        let mut limiter = RateLimiter::with_limits(1, 10);
        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("a").is_err());
        assert!(limiter.check("b").is_ok());
    }

    #[test]
    fn rate_limiter_enforces_hourly_cap() {
        let mut limiter = RateLimiter::with_limits(100, 3);
        for _ in 0..3 {
            assert!(limiter.check("c").is_ok());
        }
        assert_eq!(limiter.check("c"), Err(3600));
    }

    #[test]
    fn idle_clients_are_forgotten() {
        let mut limiter = RateLimiter::new();
        for i in 0..50 {
            limiter.check(&format!("ip:10.0.0.{i}")).unwrap();
        }
        assert_eq!(limiter.tracked_clients(), 50);

        limiter.sweep(Instant::now());
        assert_eq!(limiter.tracked_clients(), 50);

        limiter.sweep(Instant::now() + HOUR + Duration::from_secs(1));
        assert_eq!(limiter.tracked_clients(), 0);
        assert!(limiter.check("ip:10.0.0.1").is_ok());
    }
}
