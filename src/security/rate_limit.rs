//! Rate limiting for the credential endpoints.
//!
//! Uses the `governor` crate's token bucket algorithm, one bucket per
//! client IP, shared between `/registrar` and `/login` so that password
//! guessing and account enumeration draw from the same budget.

use crate::config::SecurityConfig;
use dashmap::DashMap;
use governor::{Quota, RateLimiter as GovRateLimiter};
use std::net::IpAddr;
use std::num::NonZeroU32;
use tracing::debug;

/// Type alias for governor's direct rate limiter.
type DirectRateLimiter = governor::DefaultDirectRateLimiter;

/// Entries kept before the map is reset by [`AuthRateLimiter::cleanup`].
const MAX_ENTRIES: usize = 10_000;

/// Thread-safe per-IP limiter for authentication attempts.
#[derive(Debug)]
pub struct AuthRateLimiter {
    limiters: DashMap<IpAddr, DirectRateLimiter>,
    quota: Quota,
}

impl AuthRateLimiter {
    /// Create a new limiter with the given configuration.
    pub fn new(config: &SecurityConfig) -> Self {
        let per_minute = NonZeroU32::new(config.auth_attempts_per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.auth_burst).unwrap_or(NonZeroU32::MIN);
        Self {
            limiters: DashMap::new(),
            quota: Quota::per_minute(per_minute).allow_burst(burst),
        }
    }

    /// Check if an IP may attempt another registration or login.
    ///
    /// Returns `true` if allowed, `false` if rate limited.
    pub fn check(&self, ip: IpAddr) -> bool {
        let limiter = self
            .limiters
            .entry(ip)
            .or_insert_with(|| GovRateLimiter::direct(self.quota));

        let allowed = limiter.check().is_ok();
        if !allowed {
            debug!(ip = %ip, "auth rate limit exceeded");
        }
        allowed
    }

    /// Number of tracked client IPs.
    pub fn tracked(&self) -> usize {
        self.limiters.len()
    }

    /// Cleanup old entries to prevent memory growth.
    ///
    /// Called periodically from the maintenance task in `main`.
    pub fn cleanup(&self) {
        if self.limiters.len() > MAX_ENTRIES {
            self.limiters.clear();
            debug!("cleared auth rate limiters (exceeded {} entries)", MAX_ENTRIES);
        }
    }
}
