//! Window store over a Redis-compatible REST endpoint.
//!
//! Commands are POSTed to the base URL as a JSON array, authenticated with a
//! bearer token. Replies look like `{"result": ...}` or `{"error": "..."}`.

use super::{SLIDING_WINDOW_SCRIPT, StoreError, WindowSnapshot, WindowStore, attempt_member};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct RestReply {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// REST-backed window store.
#[derive(Debug, Clone)]
pub struct RestWindowStore {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl RestWindowStore {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    async fn command(&self, command: serde_json::Value) -> Result<serde_json::Value, StoreError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&command)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("REST request failed: {}", e)))?;

        let status = response.status();
        let reply: RestReply = response
            .json()
            .await
            .map_err(|e| StoreError::Protocol(format!("invalid REST reply ({}): {}", status, e)))?;

        if let Some(error) = reply.error {
            return Err(StoreError::Unavailable(format!("store returned error ({}): {}", status, error)));
        }

        reply
            .result
            .ok_or_else(|| StoreError::Protocol(format!("REST reply ({}) has no result", status)))
    }
}

#[async_trait]
impl WindowStore for RestWindowStore {
    async fn record(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<WindowSnapshot, StoreError> {
        let now_ms = now.timestamp_millis();
        let command = serde_json::json!([
            "EVAL",
            SLIDING_WINDOW_SCRIPT,
            "1",
            key,
            now_ms.to_string(),
            (window.as_millis() as u64).to_string(),
            attempt_member(now_ms),
        ]);

        let result = self.command(command).await?;
        let reply: Vec<i64> = serde_json::from_value(result)
            .map_err(|e| StoreError::Protocol(format!("unexpected EVAL result: {}", e)))?;

        WindowSnapshot::from_script_reply(&reply)
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}
