//! bookgate - appointment-booking API with a sliding-window rate-limit gate
//!
//! Requests under `/api` pass through a gate that counts them per client in
//! a shared store (Redis or a Redis-compatible REST endpoint):
//!
//! - `form-submission`: `POST /api/appointments`, 3 per hour
//! - `general-api`: every other `/api` request, 10 per minute
//!
//! Admitted responses carry `X-RateLimit-*` headers; rejected ones are 429
//! with `Retry-After`. Without store credentials, or outside production, the
//! gate is off and every request is admitted.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bookgate::{App, AppContext, ConfigBuilder, RateLimiter};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> bookgate::Result<()> {
//!     bookgate::init_tracing();
//!
//!     let config = ConfigBuilder::new().from_env().build()?;
//!     let limiter = RateLimiter::from_config(&config.rate_limit).await?;
//!     let context = AppContext::builder()
//!         .with_limiter(Arc::new(limiter))
//!         .with_booking(config.booking.clone())
//!         .build();
//!
//!     App::new(config, context).serve().await
//! }
//! ```

mod app;
pub mod booking;
mod config;
mod core;
mod error;
pub mod health;
pub mod http;
mod middleware;
pub mod ratelimit;
pub mod testing;
mod utils;
pub mod validation;

// Re-exports for public API
pub use app::{AppContext, AppContextBuilder};
pub use config::{Config, ConfigBuilder, LoggingConfig, ServerConfig};
pub use core::App;
pub use error::{AppError, ErrorResponse, Result};
pub use health::{ComponentHealth, HealthCheck, HealthChecker, HealthStatus};
pub use ratelimit::{
    ClientId, Policy, RateLimitConfig, RateLimitConfigBuilder, RateLimitDecision, RateLimiter,
    client_identifier, format_headers,
};
pub use validation::ValidatedJson;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "bookgate=debug")
/// - `BOOKGATE_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = utils::get_env_with_prefix("LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    install_subscriber(env_filter, json_logs);
}

/// Initialize tracing from configuration
///
/// `RUST_LOG` still wins over `config.logging.level` when set.
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    install_subscriber(env_filter, config.logging.json);
}

fn install_subscriber(env_filter: EnvFilter, json: bool) {
    // try_init: a subscriber may already be installed (tests, embedding apps)
    let result = if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
