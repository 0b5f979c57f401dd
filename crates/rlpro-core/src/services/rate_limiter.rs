//! Fixed-window rate limiter on top of a shared counter store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::ports::{CounterStore, RateLimitDecision, RateLimitError, RateLimiter};

/// Rate limiter configuration. One limit/window pair applies to every key.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum allowed attempts per window.
    pub max_requests: u32,
    /// Window duration, measured from the first attempt.
    pub window: Duration,
    /// Namespace prepended to every store key.
    pub key_prefix: String,
    /// Upper bound on a single store round trip.
    pub store_timeout: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(60),
            key_prefix: "ratelimit".to_string(),
            store_timeout: Duration::from_secs(2),
        }
    }
}

/// Fixed-window counter limiter.
///
/// Each check is exactly one `increment_and_expire` call on the store: the
/// counter is never read, compared and written back in separate steps, so
/// concurrent checks for one key are ordered by the store and at most
/// `max_requests` of them are allowed per window.
///
/// Attempts past the limit still bump the counter. The TTL is only set when
/// the counter is created, so this never stretches the window.
pub struct FixedWindowRateLimiter {
    store: Arc<dyn CounterStore>,
    config: RateLimitConfig,
}

impl FixedWindowRateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}:{}", self.config.key_prefix, key)
    }
}

#[async_trait]
impl RateLimiter for FixedWindowRateLimiter {
    async fn check_and_consume(&self, key: &str) -> Result<RateLimitDecision, RateLimitError> {
        if key.is_empty() {
            return Err(RateLimitError::InvalidKey);
        }

        let store_key = self.make_key(key);
        let state = tokio::time::timeout(
            self.config.store_timeout,
            self.store
                .increment_and_expire(&store_key, self.config.window),
        )
        .await
        .map_err(|_| {
            tracing::error!(timeout = ?self.config.store_timeout, "Counter store timed out");
            RateLimitError::Timeout(self.config.store_timeout)
        })?
        .map_err(|e| {
            tracing::error!(error = %e, "Counter store failed");
            RateLimitError::from(e)
        })?;

        let max_requests = u64::from(self.config.max_requests);
        if state.count <= max_requests {
            Ok(RateLimitDecision::Allowed {
                remaining: (max_requests - state.count) as u32,
                reset_after: state.ttl,
            })
        } else {
            tracing::debug!(
                count = state.count,
                limit = max_requests,
                retry_after_secs = state.ttl.as_secs(),
                "Rate limit window exhausted"
            );
            Ok(RateLimitDecision::Limited {
                retry_after: state.ttl,
            })
        }
    }
}
