//! Rate limiting middleware
//!
//! Sliding-window limit on pipeline invocations per Telegram user, with a
//! small burst allowance on top that refills once per window.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use crate::config::RateLimitSettings;
use crate::utils::errors::{TaskMindError, Result};

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    pub window_duration: Duration,
    /// Extra requests allowed in short bursts
    pub burst_allowance: u32,
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            max_requests: settings.max_requests,
            window_duration: Duration::from_secs(settings.window_seconds),
            burst_allowance: settings.burst_allowance,
        }
    }
}

#[derive(Debug, Clone)]
struct RateLimitEntry {
    requests: Vec<Instant>,
    burst_used: u32,
    last_reset: Instant,
}

impl RateLimitEntry {
    fn new(now: Instant) -> Self {
        Self {
            requests: Vec::new(),
            burst_used: 0,
            last_reset: now,
        }
    }

    /// Drop requests outside the window and refill the burst once a window has passed
    fn cleanup(&mut self, now: Instant, window_duration: Duration) {
        self.requests.retain(|&time| now.duration_since(time) < window_duration);

        if now.duration_since(self.last_reset) >= window_duration {
            self.burst_used = 0;
            self.last_reset = now;
        }
    }

    fn is_allowed(&mut self, now: Instant, config: &RateLimitConfig) -> bool {
        self.cleanup(now, config.window_duration);

        if (self.requests.len() as u32) < config.max_requests {
            return true;
        }

        if self.burst_used < config.burst_allowance {
            self.burst_used += 1;
            return true;
        }

        false
    }
}

/// Rate limiting middleware
#[derive(Clone)]
pub struct RateLimitMiddleware {
    config: RateLimitConfig,
    entries: Arc<Mutex<HashMap<u64, RateLimitEntry>>>,
}

impl RateLimitMiddleware {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<u64, RateLimitEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record a request for a user, failing with `RateLimitExceeded` when over the limit
    pub fn check_rate_limit(&self, user_id: u64) -> Result<()> {
        self.check_at(user_id, Instant::now())
    }

    fn check_at(&self, user_id: u64, now: Instant) -> Result<()> {
        let mut entries = self.entries();
        let entry = entries.entry(user_id).or_insert_with(|| RateLimitEntry::new(now));

        if entry.is_allowed(now, &self.config) {
            entry.requests.push(now);
            debug!(user_id = user_id, "Rate limit check passed");
            Ok(())
        } else {
            warn!(user_id = user_id, "Rate limit exceeded");
            Err(TaskMindError::RateLimitExceeded)
        }
    }

    /// Forget users with no requests in the last two windows
    pub fn cleanup_old_entries(&self) {
        let now = Instant::now();
        let keep_for = self.config.window_duration * 2;
        let mut entries = self.entries();

        entries.retain(|_, entry| entry.requests.iter().any(|&time| now.duration_since(time) < keep_for));

        debug!(remaining_entries = entries.len(), "Cleaned up old rate limit entries");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn middleware(max_requests: u32, burst_allowance: u32) -> RateLimitMiddleware {
        RateLimitMiddleware::new(RateLimitConfig {
            max_requests,
            window_duration: Duration::from_secs(60),
            burst_allowance,
        })
    }

    #[test]
    fn test_rate_limit_basic() {
        let limiter = middleware(3, 1);
        let now = Instant::now();

        assert!(limiter.check_at(123, now).is_ok());
        assert!(limiter.check_at(123, now).is_ok());
        assert!(limiter.check_at(123, now).is_ok());
        // burst
        assert!(limiter.check_at(123, now).is_ok());
        assert!(matches!(limiter.check_at(123, now), Err(TaskMindError::RateLimitExceeded)));

        // other users are independent
        assert!(limiter.check_at(456, now).is_ok());
    }

    #[test]
    fn test_window_slides() {
        let limiter = middleware(1, 0);
        let now = Instant::now();

        assert!(limiter.check_at(1, now).is_ok());
        assert!(limiter.check_at(1, now + Duration::from_secs(30)).is_err());
        assert!(limiter.check_at(1, now + Duration::from_secs(61)).is_ok());
    }

    #[test]
    fn test_cleanup_keeps_recent_entries() {
        let limiter = middleware(5, 0);
        limiter.check_rate_limit(7).unwrap();
        limiter.cleanup_old_entries();
        assert_eq!(limiter.entries().len(), 1);
    }
}
