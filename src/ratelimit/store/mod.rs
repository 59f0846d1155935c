//! Sliding-window storage backends.
//!
//! Every backend keeps, per key, a log of attempt timestamps and performs
//! prune + record + count as one atomic step:
//! - [`InMemoryWindowStore`] for development and tests (single process)
//! - [`RedisWindowStore`] over a native Redis connection (`store-redis` feature)
//! - [`RestWindowStore`] over a Redis-compatible REST endpoint (`store-rest` feature)

mod memory;
#[cfg(feature = "store-redis")]
mod redis;
#[cfg(feature = "store-rest")]
mod rest;
#[cfg(test)]
pub(crate) mod script_double;

pub use memory::InMemoryWindowStore;
#[cfg(feature = "store-redis")]
pub use self::redis::RedisWindowStore;
#[cfg(feature = "store-rest")]
pub use rest::RestWindowStore;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::time::Duration;

/// Server-side sliding-window step.
///
/// KEYS[1] = counter key; ARGV = now (ms), window (ms), unique member.
/// Drops entries at or before `now - window`, records the attempt, refreshes
/// the key TTL and returns `{count, oldest_ms}`.
pub const SLIDING_WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
redis.call('ZREMRANGEBYSCORE', key, '-inf', now - window)
redis.call('ZADD', key, now, ARGV[3])
redis.call('PEXPIRE', key, window)
local count = redis.call('ZCARD', key)
local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
return {count, tonumber(oldest[2])}
"#;

/// State of one key's window right after recording an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    /// Attempts inside the trailing window, including the one just recorded
    pub count: u64,
    /// Timestamp of the oldest attempt still inside the window
    pub oldest: DateTime<Utc>,
}

impl WindowSnapshot {
    /// Build a snapshot from the `{count, oldest_ms}` pair the script returns.
    pub(crate) fn from_script_reply(reply: &[i64]) -> Result<Self, StoreError> {
        let [count, oldest_ms] = reply else {
            return Err(StoreError::Protocol(format!(
                "expected [count, oldest] reply, got {} values",
                reply.len()
            )));
        };

        let oldest = Utc
            .timestamp_millis_opt(*oldest_ms)
            .single()
            .ok_or_else(|| StoreError::Protocol(format!("invalid timestamp: {}", oldest_ms)))?;

        Ok(Self {
            count: (*count).max(0) as u64,
            oldest,
        })
    }
}

/// Errors raised by a window store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected store reply: {0}")]
    Protocol(String),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

/// Shared counter store with atomic sliding-window counting.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Record one attempt for `key` at `now` and return the window state.
    ///
    /// Implementations must make the prune, insert and count a single atomic
    /// operation so concurrent callers never both see a free slot.
    async fn record(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<WindowSnapshot, StoreError>;

    /// Backend name for logs and health output.
    fn name(&self) -> &'static str;
}

/// Unique sorted-set member for an attempt.
#[cfg(any(feature = "store-redis", feature = "store-rest"))]
pub(crate) fn attempt_member(now_ms: i64) -> String {
    format!("{}-{}", now_ms, uuid::Uuid::new_v4().simple())
}
