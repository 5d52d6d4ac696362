//! Per-key rate limiting using a keyed token bucket

use governor::{DefaultKeyedRateLimiter, Quota};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;
use crate::key_resolver::RateLimitKey;

// Safe constants for fallback values
const DEFAULT_REQUESTS_PER_MINUTE: NonZeroU32 = nonzero!(100u32);

/// Rate limiter for the edge gateway
pub struct RateLimiter {
    /// Token buckets keyed by client
    limiter: DefaultKeyedRateLimiter<RateLimitKey>,
    /// Configuration
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a new rate limiter
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        let per_minute =
            NonZeroU32::new(config.requests_per_minute).unwrap_or(DEFAULT_REQUESTS_PER_MINUTE);
        let burst = NonZeroU32::new(config.burst_size).unwrap_or(per_minute);
        let quota = Quota::per_minute(per_minute).allow_burst(burst);

        Self {
            limiter: DefaultKeyedRateLimiter::keyed(quota),
            config,
        }
    }

    /// Check whether a request from `key` is within quota
    ///
    /// Requests without a key are never limited.
    pub fn check(&self, key: Option<&RateLimitKey>) -> bool {
        if !self.config.enabled {
            return true;
        }

        let Some(key) = key else {
            return true;
        };

        match self.limiter.check_key(key) {
            Ok(()) => {
                debug!("Rate limit check passed for key: {}", key);
                true
            }
            Err(not_until) => {
                warn!("Rate limit exceeded for key {}: {}", key, not_until);
                false
            }
        }
    }

    /// Get current rate limiting statistics
    #[must_use]
    pub fn get_stats(&self) -> RateLimitStats {
        RateLimitStats {
            tracked_keys: self.limiter.len(),
            limit_per_minute: self.config.requests_per_minute,
            burst_size: self.config.burst_size,
            enabled: self.config.enabled,
        }
    }

    /// Drop keys whose buckets have fully refilled
    pub fn cleanup_old_limiters(&self) {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        debug!(
            "Rate limiter cleanup: {} -> {} tracked keys",
            before,
            self.limiter.len()
        );
    }

    /// Cleanup interval from configuration
    #[must_use]
    pub fn cleanup_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.cleanup_interval_seconds.max(1))
    }
}

/// Rate limiting statistics
#[derive(Debug, serde::Serialize)]
pub struct RateLimitStats {
    pub tracked_keys: usize,
    pub limit_per_minute: u32,
    pub burst_size: u32,
    pub enabled: bool,
}
