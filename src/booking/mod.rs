//! Appointment booking endpoints.
//!
//! `POST /api/appointments` is the booking form and falls under the
//! `form-submission` rate limit; the read endpoints fall under `general-api`.

mod config;
mod routes;
mod store;
mod types;

pub use config::BookingConfig;
pub use routes::{BookingModule, ServicesResponse};
pub use store::{AppointmentStore, InMemoryAppointmentStore};
pub use types::{Appointment, AppointmentRequest, AppointmentStatus};
