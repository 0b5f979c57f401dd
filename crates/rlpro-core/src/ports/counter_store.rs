//! Counter store port - the shared backend behind the rate limiter.

use async_trait::async_trait;
use std::time::Duration;

/// State of a counter right after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterState {
    /// Count after the increment. `1` means this call opened the window.
    pub count: u64,
    /// Time left until the counter expires.
    pub ttl: Duration,
}

/// Counter store trait - abstraction over counter backends (Redis, in-memory).
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the counter for `key`.
    ///
    /// A missing (or expired) counter is created with count 1 and a TTL of
    /// `window`. An existing counter keeps its TTL. The whole operation is a
    /// single atomic step so concurrent callers never observe the same count.
    async fn increment_and_expire(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<CounterState, CounterStoreError>;
}

/// Counter store errors.
#[derive(Debug, thiserror::Error)]
pub enum CounterStoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}
