//! Per-request rate limit decisions and their response headers.

use super::policy::PolicyLimits;
use super::store::WindowSnapshot;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;

pub const HEADER_LIMIT: &str = "X-RateLimit-Limit";
pub const HEADER_REMAINING: &str = "X-RateLimit-Remaining";
pub const HEADER_RESET: &str = "X-RateLimit-Reset";

/// Outcome of a single `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub admitted: bool,
    /// Configured limit for the policy
    pub limit: u32,
    /// `max(0, limit - count)`
    pub remaining: u32,
    /// When the oldest counted request leaves the window
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Build a decision from the store's view of the window after recording
    /// the current attempt.
    pub fn from_snapshot(limits: &PolicyLimits, snapshot: &WindowSnapshot) -> Self {
        let limit = limits.max_requests;
        let remaining = u64::from(limit).saturating_sub(snapshot.count);

        // Windows past chrono's range saturate instead of overflowing
        let reset_at = i64::try_from(limits.window_seconds)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .and_then(|window| snapshot.oldest.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            admitted: snapshot.count <= u64::from(limit),
            limit,
            remaining: remaining as u32,
            reset_at,
        }
    }

    /// Whole seconds until `reset_at`, rounded up.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.reset_at - now).num_milliseconds();
        if millis <= 0 {
            return 0;
        }
        (millis as u64).div_ceil(1000)
    }
}

/// The three rate limit headers for a decision.
pub fn format_headers(decision: &RateLimitDecision) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        (HEADER_LIMIT, decision.limit.to_string()),
        (HEADER_REMAINING, decision.remaining.to_string()),
        (
            HEADER_RESET,
            decision.reset_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
    ])
}

/// Insert the rate limit headers into a response header map.
pub(crate) fn apply_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    for (name, value) in format_headers(decision) {
        // HeaderName::from_bytes normalizes to lowercase
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            headers.insert(name, value);
        }
    }
}
