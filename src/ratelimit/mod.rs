//! Sliding-window rate limiting backed by a shared store.
//!
//! Two policies guard the API: `form-submission` for the booking form and
//! `general-api` for everything else under the API prefix. Counters live in
//! the store; when it is not configured the gate is off.

mod client;
mod clock;
mod config;
mod decision;
mod layer;
mod limiter;
mod policy;
pub mod store;

pub use client::{ANONYMOUS_CLIENT, ClientId, EmptyClientId, client_identifier};
pub use clock::{Clock, MockClock, SystemClock};
pub use config::{RateLimitConfig, RateLimitConfigBuilder, StoreFailureMode};
pub use decision::{HEADER_LIMIT, HEADER_REMAINING, HEADER_RESET, RateLimitDecision, format_headers};
pub use layer::{RateLimitLayer, RateLimitService, RouteClass, build_rate_limit_layer};
pub use limiter::{LimitOutcome, RateLimiter, SlidingWindowLimiter};
pub use policy::{MAX_WINDOW_SECONDS, Policy, PolicyLimits, RateLimitKey, UnknownPolicy};
pub use store::{InMemoryWindowStore, StoreError, WindowSnapshot, WindowStore};
