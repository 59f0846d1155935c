//! Rate limit policies and counter keys.

use super::client::ClientId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Named rate limit policy.
///
/// Each policy keeps its own counters; the limits live in
/// [`RateLimitConfig`](super::RateLimitConfig), not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    /// Booking form submissions
    FormSubmission,
    /// Every other `/api` request
    GeneralApi,
}

impl Policy {
    pub const ALL: [Policy; 2] = [Policy::FormSubmission, Policy::GeneralApi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::FormSubmission => "form-submission",
            Policy::GeneralApi => "general-api",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a policy name is not one of the configured policies.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rate limit policy: {0}")]
pub struct UnknownPolicy(pub String);

impl FromStr for Policy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "form-submission" => Ok(Policy::FormSubmission),
            "general-api" => Ok(Policy::GeneralApi),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

/// Limit and window for one policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyLimits {
    /// Maximum admitted requests per window
    pub max_requests: u32,
    /// Length of the trailing window in seconds
    pub window_seconds: u64,
}

/// Longest window a policy may use: one year.
pub const MAX_WINDOW_SECONDS: u64 = 365 * 24 * 60 * 60;

impl PolicyLimits {
    pub fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            max_requests,
            window_seconds,
        }
    }

    /// 3 submissions per hour.
    pub fn form_submission() -> Self {
        Self::new(3, 3600)
    }

    /// 10 requests per minute.
    pub fn general_api() -> Self {
        Self::new(10, 60)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

/// Counter key: one window state per (policy, client) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    pub policy: Policy,
    pub client: ClientId,
}

impl RateLimitKey {
    pub fn new(policy: Policy, client: ClientId) -> Self {
        Self { policy, client }
    }

    /// Store key, namespaced by policy so policies never share a counter.
    pub fn to_store_key(&self, prefix: &str) -> String {
        format!("{}:{}:{}", prefix, self.policy, self.client)
    }
}
