//! Custom validators for booking form fields.

use chrono::NaiveDate;
use std::borrow::Cow;
use validator::ValidationError;

/// Date format accepted for `preferredDate`
pub const BOOKING_DATE_FORMAT: &str = "%Y-%m-%d";

/// Validates a phone number: digits with optional leading `+` and common
/// separators (spaces, dashes, dots, parentheses).
///
/// ```rust,no_run
/// use bookgate::validation::validate_phone;
/// use validator::Validate;
///
/// #[derive(Validate)]
/// struct Request {
///     #[validate(custom(function = "validate_phone"))]
///     phone: String,
/// }
/// ```
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let body = phone.strip_prefix('+').unwrap_or(phone);
    let allowed = body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '.' | '(' | ')'));
    let digits = body.chars().filter(char::is_ascii_digit).count();

    if allowed && digits >= 7 {
        return Ok(());
    }

    let mut err = ValidationError::new("phone");
    err.message = Some(Cow::Borrowed("must be a valid phone number"));
    Err(err)
}

/// Validates a `YYYY-MM-DD` calendar date.
///
/// Whether the date is in the past depends on the current time and is
/// checked by the booking handler.
pub fn validate_booking_date(date: &str) -> Result<(), ValidationError> {
    NaiveDate::parse_from_str(date, BOOKING_DATE_FORMAT)
        .map(|_| ())
        .map_err(|_| {
            let mut err = ValidationError::new("date");
            err.message = Some(Cow::Borrowed("must be a date in YYYY-MM-DD format"));
            err
        })
}
