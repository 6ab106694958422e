//! Shared-store rate limiting (Design Notes §9: counters live in Redis next
//! to the cache, not in per-process memory, so limits hold across workers).

use std::time::Duration;

use crate::cache::CacheLayer;
use crate::errors::AppError;

#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimit {
    pub fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    cache: CacheLayer,
}

impl RateLimiter {
    pub fn new(cache: CacheLayer) -> Self {
        Self { cache }
    }

    /// INCR the window counter for `scope_key`, EXPIRE on first increment.
    /// Returns `Err(AppError::RateLimited)` once `limit.max_requests` is
    /// exceeded within the window.
    pub async fn check(&self, scope_key: &str, limit: RateLimit) -> Result<(), AppError> {
        if !self.cache.enabled() {
            return Ok(());
        }
        let key = format!("mt:rl:{scope_key}");
        let count = self.cache.incr_with_expiry(&key, limit.window).await?;
        if count as u32 > limit.max_requests {
            return Err(AppError::RateLimited {
                retry_after_secs: limit.window.as_secs(),
            });
        }
        Ok(())
    }
}
