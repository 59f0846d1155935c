//! Client identification for per-client counters.

use axum::http::HeaderMap;
use std::fmt;

/// Identifier shared by every client whose address cannot be determined.
pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// Non-empty client identifier, usually an IP address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

/// Returned when an empty identifier is used to build a [`ClientId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("client identifier must not be empty")]
pub struct EmptyClientId;

impl ClientId {
    pub fn new(id: impl Into<String>) -> Result<Self, EmptyClientId> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(EmptyClientId);
        }
        if trimmed.len() == id.len() {
            Ok(Self(id))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    pub fn anonymous() -> Self {
        Self(ANONYMOUS_CLIENT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the client identifier from proxy headers.
///
/// Precedence, first non-empty value wins:
/// 1. `x-real-ip`
/// 2. first entry of `x-forwarded-for`
/// 3. `cf-connecting-ip`
/// 4. `"anonymous"`
///
/// All clients that reach the fallback share one counter.
pub fn client_identifier(headers: &HeaderMap) -> ClientId {
    header_value(headers, "x-real-ip")
        .or_else(|| {
            // "client, proxy1, proxy2": the leftmost entry is the original client
            header_value(headers, "x-forwarded-for")
                .and_then(|s| s.split(',').next())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .or_else(|| header_value(headers, "cf-connecting-ip"))
        .map(|s| ClientId(s.to_string()))
        .unwrap_or_else(ClientId::anonymous)
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
