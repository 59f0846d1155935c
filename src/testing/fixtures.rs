//! Fixtures for booking tests.

use crate::app::AppContext;
use crate::booking::{AppointmentRequest, BookingConfig, InMemoryAppointmentStore};
use crate::config::Config;
use crate::core::App;
use crate::ratelimit::{Clock, InMemoryWindowStore, MockClock, RateLimitConfig, RateLimiter, WindowStore};
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Helper functions for generating fake test data
pub mod fake {
    use super::*;

    /// Generate a unique email address
    pub fn email() -> String {
        format!("test-{}@example.com", Uuid::new_v4().simple())
    }

    /// Generate a name
    pub fn name() -> String {
        format!("Test Guest {}", &Uuid::new_v4().simple().to_string()[..8])
    }

    /// Generate a documentation-range IPv4 address (192.0.2.0/24)
    pub fn ip() -> String {
        format!("192.0.2.{}", Uuid::new_v4().as_bytes()[0])
    }
}

/// Builder for a valid booking form payload
#[derive(Debug, Clone)]
pub struct AppointmentRequestBuilder {
    request: AppointmentRequest,
}

impl AppointmentRequestBuilder {
    /// Valid request for `consultation`, dated `days_ahead` after `today`
    pub fn new(today: DateTime<Utc>) -> Self {
        Self {
            request: AppointmentRequest {
                name: fake::name(),
                email: fake::email(),
                phone: Some("+1 555 010 0000".to_string()),
                service: "consultation".to_string(),
                preferred_date: (today + Duration::days(7)).format("%Y-%m-%d").to_string(),
                message: None,
            },
        }
    }

    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.request.service = service.into();
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.request.email = email.into();
        self
    }

    pub fn preferred_date(mut self, date: impl Into<String>) -> Self {
        self.request.preferred_date = date.into();
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.request.message = Some(message.into());
        self
    }

    pub fn build(self) -> AppointmentRequest {
        self.request
    }
}

/// Fully wired app for tests: in-memory stores, a [`MockClock`] shared by
/// the limiter and the handlers, and the limiter enabled by default.
pub struct TestApp {
    pub clock: MockClock,
    pub appointments: Arc<InMemoryAppointmentStore>,
    pub limiter: Arc<RateLimiter>,
    config: Config,
}

impl TestApp {
    /// Limiter enabled with default policies over an in-memory store
    pub fn new() -> Self {
        Self::with_rate_limit(RateLimitConfig::default())
    }

    pub fn with_rate_limit(rate_limit: RateLimitConfig) -> Self {
        Self::with_store(Arc::new(InMemoryWindowStore::new()), rate_limit)
    }

    /// Limiter backed by a custom store
    pub fn with_store(store: Arc<dyn WindowStore>, rate_limit: RateLimitConfig) -> Self {
        let clock = MockClock::default();
        let limiter = Arc::new(RateLimiter::with_store_and_clock(
            store,
            rate_limit.clone(),
            Arc::new(clock.clone()),
        ));
        Self::assemble(clock, limiter, rate_limit)
    }

    /// Limiter disabled, as in development or without store credentials
    pub fn without_rate_limit() -> Self {
        let rate_limit = RateLimitConfig::default();
        let limiter = Arc::new(RateLimiter::disabled(rate_limit.clone()));
        Self::assemble(MockClock::default(), limiter, rate_limit)
    }

    fn assemble(clock: MockClock, limiter: Arc<RateLimiter>, rate_limit: RateLimitConfig) -> Self {
        let config = Config {
            rate_limit,
            ..Config::default()
        };
        Self {
            clock,
            appointments: Arc::new(InMemoryAppointmentStore::new()),
            limiter,
            config,
        }
    }

    pub fn with_booking(mut self, booking: BookingConfig) -> Self {
        self.config.booking = booking;
        self
    }

    /// A valid booking payload relative to the mock clock
    pub fn appointment(&self) -> AppointmentRequestBuilder {
        AppointmentRequestBuilder::new(self.clock.now())
    }

    /// Current mock time
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Number of appointments that reached the store
    pub async fn appointments_created(&self) -> usize {
        use crate::booking::AppointmentStore;
        self.appointments.list().await.map(|all| all.len()).unwrap_or(0)
    }

    /// Router with all middleware applied. Cheap to clone; clones share state.
    pub fn router(&self) -> Router {
        let context = AppContext::builder()
            .with_limiter(self.limiter.clone())
            .with_appointments(self.appointments.clone())
            .with_booking(self.config.booking.clone())
            .with_clock(Arc::new(self.clock.clone()))
            .build();

        App::new(self.config.clone(), context).into_router()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
