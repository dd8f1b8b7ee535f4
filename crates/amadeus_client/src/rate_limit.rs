//! Rate limiter for the Amadeus API.
//!
//! Test-tier limit: 10 transactions/sec per API key.

use governor::{Quota, RateLimiter as GovLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Single-bucket limiter shared by all outbound Amadeus calls.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limiter: Arc<
        GovLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
}

impl RateLimiter {
    /// Create with the Amadeus test-tier limit.
    pub fn new() -> Self {
        Self::with_limit(10)
    }

    /// Create with a custom per-second limit.
    pub fn with_limit(per_sec: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(per_sec).unwrap());
        Self {
            limiter: Arc::new(GovLimiter::direct(quota)),
        }
    }

    /// Wait until a slot is available.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to acquire a slot without waiting. Returns true if acquired.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
