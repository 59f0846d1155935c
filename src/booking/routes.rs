use super::store::AppointmentStore;
use super::types::{Appointment, AppointmentRequest};
use crate::app::AppContext;
use crate::error::{AppError, Result};
use crate::http::{CreatedResponse, RouteModule};
use crate::validation::{BOOKING_DATE_FORMAT, ValidatedJson};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Booking funnel routes, mounted under `/api`.
pub struct BookingModule;

impl RouteModule for BookingModule {
    fn routes(&self) -> Router<AppContext> {
        Router::new()
            .route("/appointments", post(create_appointment))
            .route("/appointments/{id}", get(get_appointment))
            .route("/services", get(list_services))
    }

    fn prefix(&self) -> Option<&str> {
        Some("/api")
    }
}

#[derive(Debug, Serialize)]
pub struct ServicesResponse {
    pub services: Vec<String>,
}

async fn create_appointment(
    State(ctx): State<AppContext>,
    ValidatedJson(request): ValidatedJson<AppointmentRequest>,
) -> Result<CreatedResponse<Appointment>> {
    let mut field_errors: HashMap<String, Vec<String>> = HashMap::new();

    if !ctx.booking.offers(&request.service) {
        field_errors
            .entry("service".to_string())
            .or_default()
            .push(format!("must be one of: {}", ctx.booking.services.join(", ")));
    }

    let now = ctx.clock.now();
    // Format was checked by the validator
    if let Ok(date) = NaiveDate::parse_from_str(&request.preferred_date, BOOKING_DATE_FORMAT) {
        if date < now.date_naive() {
            field_errors
                .entry("preferredDate".to_string())
                .or_default()
                .push("must not be in the past".to_string());
        }
    }

    if !field_errors.is_empty() {
        return Err(AppError::Validation(field_errors));
    }

    let appointment = ctx
        .appointments
        .create(Appointment::from_request(request, now))
        .await?;

    tracing::info!(
        appointment_id = %appointment.id,
        service = %appointment.service,
        preferred_date = %appointment.preferred_date,
        "Appointment requested"
    );

    let location = format!("/api/appointments/{}", appointment.id);
    Ok(CreatedResponse::new(appointment, location))
}

async fn get_appointment(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>> {
    ctx.appointments
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("appointment {}", id)))
}

async fn list_services(State(ctx): State<AppContext>) -> Json<ServicesResponse> {
    Json(ServicesResponse {
        services: ctx.booking.services.clone(),
    })
}
