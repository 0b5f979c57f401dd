//! In-memory counter store - used when Redis is not configured.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use rlpro_core::ports::{Clock, CounterState, CounterStore, CounterStoreError};

use crate::clock::SystemClock;

/// Above this many counters, expired ones are swept before inserting a new key.
const SWEEP_THRESHOLD: usize = 10_000;

struct Counter {
    count: u64,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct Counters {
    entries: HashMap<String, Counter>,
    /// Earliest instant another threshold sweep may run.
    next_sweep: Option<DateTime<Utc>>,
}

/// In-memory counter store.
///
/// Every increment runs under one mutex, which makes `increment_and_expire`
/// atomic within the process. Past [`SWEEP_THRESHOLD`] counters, expired
/// ones are swept at most once per window.
/// Note: Counters are per-process, not shared across instances.
pub struct InMemoryCounterStore {
    counters: Mutex<Counters>,
    clock: Arc<dyn Clock>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            counters: Mutex::new(Counters::default()),
            clock,
        }
    }

    /// Drop expired counters. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut counters = self.counters.lock().await;
        let before = counters.entries.len();
        counters.entries.retain(|_, c| c.expires_at > now);
        before - counters.entries.len()
    }

    /// Number of counters currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.counters.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment_and_expire(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<CounterState, CounterStoreError> {
        let window = chrono::Duration::from_std(window)
            .map_err(|e| CounterStoreError::Operation(e.to_string()))?;

        let mut counters = self.counters.lock().await;
        let now = self.clock.now();

        let Counters {
            entries,
            next_sweep,
        } = &mut *counters;

        if entries.len() >= SWEEP_THRESHOLD
            && !entries.contains_key(key)
            && next_sweep.is_none_or(|at| now >= at)
        {
            entries.retain(|_, c| c.expires_at > now);
            *next_sweep = Some(now + window);
        }

        let counter = entries.entry(key.to_string()).or_insert(Counter {
            count: 0,
            expires_at: now + window,
        });
        if counter.expires_at <= now {
            counter.count = 0;
            counter.expires_at = now + window;
        }
        counter.count += 1;

        Ok(CounterState {
            count: counter.count,
            ttl: (counter.expires_at - now).to_std().unwrap_or(Duration::ZERO),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const WINDOW: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_first_increment_opens_window() {
        let store = InMemoryCounterStore::with_clock(Arc::new(ManualClock::default()));

        let state = store.increment_and_expire("k", WINDOW).await.unwrap();

        assert_eq!(state.count, 1);
        assert_eq!(state.ttl, WINDOW);
    }

    #[tokio::test]
    async fn test_increment_keeps_expiry() {
        let clock = ManualClock::default();
        let store = InMemoryCounterStore::with_clock(Arc::new(clock.clone()));

        store.increment_and_expire("k", WINDOW).await.unwrap();
        clock.advance(chrono::Duration::seconds(20));
        let state = store.increment_and_expire("k", WINDOW).await.unwrap();

        assert_eq!(state.count, 2);
        assert_eq!(state.ttl, Duration::from_secs(40));
    }

    #[tokio::test]
    async fn test_expired_counter_starts_fresh() {
        let clock = ManualClock::default();
        let store = InMemoryCounterStore::with_clock(Arc::new(clock.clone()));

        for _ in 0..7 {
            store.increment_and_expire("k", WINDOW).await.unwrap();
        }
        clock.advance(chrono::Duration::seconds(60));
        let state = store.increment_and_expire("k", WINDOW).await.unwrap();

        assert_eq!(state.count, 1);
        assert_eq!(state.ttl, WINDOW);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let clock = ManualClock::default();
        let store = InMemoryCounterStore::with_clock(Arc::new(clock.clone()));

        store.increment_and_expire("old", WINDOW).await.unwrap();
        clock.advance(chrono::Duration::seconds(30));
        store.increment_and_expire("new", WINDOW).await.unwrap();
        clock.advance(chrono::Duration::seconds(45));

        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 1);
    }

    async fn fill(store: &InMemoryCounterStore, prefix: &str, window: Duration) {
        for i in 0..SWEEP_THRESHOLD {
            store
                .increment_and_expire(&format!("{prefix}:{i}"), window)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_threshold_sweep_runs_once_per_window() {
        let clock = ManualClock::default();
        let store = InMemoryCounterStore::with_clock(Arc::new(clock.clone()));

        fill(&store, "a", WINDOW).await;
        clock.advance(chrono::Duration::seconds(61));
        store.increment_and_expire("trigger", WINDOW).await.unwrap();
        assert_eq!(store.len().await, 1);

        // Batch "b" expires within a second, but the last sweep is recent.
        fill(&store, "b", Duration::from_secs(1)).await;
        clock.advance(chrono::Duration::seconds(2));
        store.increment_and_expire("late", WINDOW).await.unwrap();
        assert_eq!(store.len().await, SWEEP_THRESHOLD + 2);

        clock.advance(chrono::Duration::seconds(60));
        store.increment_and_expire("next", WINDOW).await.unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_unique() {
        let store = Arc::new(InMemoryCounterStore::new());

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment_and_expire("k", WINDOW).await })
            })
            .collect();

        let mut counts: Vec<u64> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap().count)
            .collect();
        counts.sort_unstable();

        assert_eq!(counts, (1..=100).collect::<Vec<u64>>());
    }
}
