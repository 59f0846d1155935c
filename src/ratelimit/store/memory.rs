//! In-process window store backed by DashMap.

use super::{StoreError, WindowSnapshot, WindowStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Sweep idle keys every N recorded attempts to bound memory.
const SHRINK_INTERVAL: u64 = 1000;

#[derive(Debug, Default)]
struct WindowLog {
    /// Attempt timestamps in milliseconds, oldest first
    hits: VecDeque<i64>,
    window_ms: i64,
}

impl WindowLog {
    fn prune(&mut self, now_ms: i64) {
        let cutoff = now_ms.saturating_sub(self.window_ms);
        while self.hits.front().is_some_and(|&ts| ts <= cutoff) {
            self.hits.pop_front();
        }
    }
}

/// Window store that lives inside the process.
///
/// Counters are not shared between instances, so this backend only suits
/// development, tests, and single-instance deployments. The DashMap entry
/// guard serializes callers on the same key, which makes each `record`
/// atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWindowStore {
    windows: Arc<DashMap<String, WindowLog>>,
    record_count: Arc<AtomicU64>,
}

impl InMemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop keys whose whole log has left the window, like a store TTL.
    pub fn purge_expired(&self, now: DateTime<Utc>) {
        let now_ms = now.timestamp_millis();
        self.windows.retain(|_, log| {
            log.prune(now_ms);
            !log.hits.is_empty()
        });
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[async_trait]
impl WindowStore for InMemoryWindowStore {
    async fn record(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<WindowSnapshot, StoreError> {
        let count = self.record_count.fetch_add(1, Ordering::Relaxed);
        if count % SHRINK_INTERVAL == 0 && count > 0 {
            self.purge_expired(now);
        }

        let now_ms = now.timestamp_millis();
        let mut log = self.windows.entry(key.to_string()).or_default();
        log.window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        log.prune(now_ms);
        log.hits.push_back(now_ms);

        let oldest_ms = log.hits.front().copied().unwrap_or(now_ms);
        WindowSnapshot::from_script_reply(&[log.hits.len() as i64, oldest_ms])
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
