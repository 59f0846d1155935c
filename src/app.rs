use crate::booking::{AppointmentStore, BookingConfig, InMemoryAppointmentStore};
use crate::ratelimit::{Clock, RateLimitConfig, RateLimiter, SystemClock};
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppContext {
    pub limiter: Arc<RateLimiter>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub booking: Arc<BookingConfig>,
    pub clock: Arc<dyn Clock>,
}

impl AppContext {
    /// Context with a disabled limiter and in-memory appointments.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> AppContextBuilder {
        AppContextBuilder::new()
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for AppContext with fluent API
#[must_use = "builder does nothing until you call build()"]
pub struct AppContextBuilder {
    limiter: Option<Arc<RateLimiter>>,
    appointments: Option<Arc<dyn AppointmentStore>>,
    booking: BookingConfig,
    clock: Option<Arc<dyn Clock>>,
}

impl AppContextBuilder {
    pub fn new() -> Self {
        Self {
            limiter: None,
            appointments: None,
            booking: BookingConfig::default(),
            clock: None,
        }
    }

    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn with_appointments(mut self, store: Arc<dyn AppointmentStore>) -> Self {
        self.appointments = Some(store);
        self
    }

    pub fn with_booking(mut self, booking: BookingConfig) -> Self {
        self.booking = booking;
        self
    }

    /// Clock used by handlers, e.g. to reject dates in the past
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> AppContext {
        AppContext {
            limiter: self
                .limiter
                .unwrap_or_else(|| Arc::new(RateLimiter::disabled(RateLimitConfig::default()))),
            appointments: self
                .appointments
                .unwrap_or_else(|| Arc::new(InMemoryAppointmentStore::new())),
            booking: Arc::new(self.booking),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock::new())),
        }
    }
}

impl Default for AppContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
