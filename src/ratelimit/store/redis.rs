//! Window store over a native Redis connection.

use super::{SLIDING_WINDOW_SCRIPT, StoreError, WindowSnapshot, WindowStore, attempt_member};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::IntoConnectionInfo;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

/// Redis-backed window store.
///
/// Each attempt is one `EVALSHA` of [`SLIDING_WINDOW_SCRIPT`], so the
/// prune/record/count step runs atomically on the server.
///
/// The connection is opened on first use. Until it succeeds every `record`
/// fails with [`StoreError::Unavailable`] and the next call tries again, so a
/// store that is down at startup is handled like any other store outage.
#[derive(Clone)]
pub struct RedisWindowStore {
    client: redis::Client,
    manager_config: ConnectionManagerConfig,
    connection: Arc<OnceCell<ConnectionManager>>,
    script: redis::Script,
}

impl RedisWindowStore {
    /// Prepare a store for `url` (`redis://` or `rediss://`), using `token`
    /// as the password when the URL does not carry one. Each connection
    /// attempt gives up after `connect_timeout`.
    ///
    /// Only the URL is checked here; no connection is made.
    pub fn new(
        url: &str,
        token: Option<&str>,
        connect_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let mut info = url
            .into_connection_info()
            .map_err(|e| StoreError::Unavailable(format!("invalid Redis URL: {}", e)))?;

        if info.redis.password.is_none() {
            info.redis.password = token.map(str::to_string);
        }

        let client = redis::Client::open(info)
            .map_err(|e| StoreError::Unavailable(format!("failed to create Redis client: {}", e)))?;

        let manager_config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(connect_timeout);

        Ok(Self {
            client,
            manager_config,
            connection: Arc::new(OnceCell::new()),
            script: redis::Script::new(SLIDING_WINDOW_SCRIPT),
        })
    }

    /// Shared connection, opened on first use. The manager reconnects by
    /// itself once established.
    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                let manager = ConnectionManager::new_with_config(self.client.clone(), self.manager_config.clone())
                    .await
                    .map_err(|e| StoreError::Unavailable(format!("failed to connect to Redis: {}", e)))?;
                debug!("Connected to Redis for rate limiting");
                Ok::<_, StoreError>(manager)
            })
            .await?;

        Ok(manager.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }
}

#[async_trait]
impl WindowStore for RedisWindowStore {
    async fn record(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<WindowSnapshot, StoreError> {
        let now_ms = now.timestamp_millis();
        let mut conn = self.connection().await?;

        let reply: Vec<i64> = self
            .script
            .key(key)
            .arg(now_ms)
            .arg(window.as_millis() as u64)
            .arg(attempt_member(now_ms))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Redis EVALSHA failed: {}", e)))?;

        WindowSnapshot::from_script_reply(&reply)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
