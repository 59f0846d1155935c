use crate::error::{AppError, Result};
use axum::{Json, extract::Request};
use serde::Deserialize;
use validator::Validate;

/// JSON body extractor that runs `validator` rules before the handler.
///
/// Malformed JSON is a 400 with the parser message; rule violations are a
/// 400 with per-field messages.
pub struct ValidatedJson<T>(pub T);

impl<T, S> axum::extract::FromRequest<S> for ValidatedJson<T>
where
    T: for<'de> Deserialize<'de> + Validate + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::bad_request(format!("Invalid JSON: {}", e.body_text())))?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

/// Validate an already-extracted `Json<T>`.
pub fn validate_json<T: Validate>(json: Json<T>) -> Result<ValidatedJson<T>> {
    json.0.validate()?;
    Ok(ValidatedJson(json.0))
}
