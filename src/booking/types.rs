use crate::validation::{validate_booking_date, validate_phone};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Booking form payload.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    #[validate(
        length(min = 7, max = 20, message = "must be between 7 and 20 characters"),
        custom(function = "validate_phone")
    )]
    pub phone: Option<String>,

    #[validate(length(min = 1, message = "is required"))]
    pub service: String,

    /// `YYYY-MM-DD`
    #[validate(custom(function = "validate_booking_date"))]
    pub preferred_date: String,

    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub message: Option<String>,
}

/// Every request starts out pending until staff follow up outside this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
}

/// A submitted appointment request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub service: String,
    pub preferred_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// New pending appointment from a validated request.
    pub fn from_request(request: AppointmentRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            email: request.email.trim().to_lowercase(),
            phone: request.phone,
            service: request.service,
            preferred_date: request.preferred_date,
            message: request.message,
            status: AppointmentStatus::Pending,
            created_at,
        }
    }
}
