//! Rate limiting port.

use async_trait::async_trait;
use std::time::Duration;

use super::CounterStoreError;

/// Rate limiter trait - abstraction over rate limiting strategies.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Record one attempt for `key` and decide whether it may proceed.
    ///
    /// Backend failures are errors, never a decision.
    async fn check_and_consume(&self, key: &str) -> Result<RateLimitDecision, RateLimitError>;
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed {
        /// Attempts still available in the current window.
        remaining: u32,
        /// Time until the window resets.
        reset_after: Duration,
    },
    Limited {
        /// Time until the window resets.
        retry_after: Duration,
    },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

/// Rate limit errors.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limit key must not be empty")]
    InvalidKey,

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Backend did not answer within {0:?}")]
    Timeout(Duration),
}

impl From<CounterStoreError> for RateLimitError {
    fn from(err: CounterStoreError) -> Self {
        RateLimitError::Backend(err.to_string())
    }
}
