//! Request validation using the `validator` crate.
//!
//! ```rust,no_run
//! use bookgate::validation::ValidatedJson;
//! use validator::Validate;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, Validate)]
//! struct ContactRequest {
//!     #[validate(email)]
//!     email: String,
//! }
//!
//! async fn contact(
//!     ValidatedJson(req): ValidatedJson<ContactRequest>
//! ) -> bookgate::Result<axum::Json<serde_json::Value>> {
//!     Ok(axum::Json(serde_json::json!({"email": req.email})))
//! }
//! ```

mod extractor;
mod validators;

pub use extractor::{ValidatedJson, validate_json};
pub use validators::{BOOKING_DATE_FORMAT, validate_booking_date, validate_phone};
pub use validator;
