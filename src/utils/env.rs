use crate::error::{AppError, Result};
use std::str::FromStr;

/// Read an environment variable, preferring the `BOOKGATE_` prefixed form.
///
/// `get_env_with_prefix("PORT")` checks `BOOKGATE_PORT` first and falls back
/// to `PORT`, so platform-provided variables keep working.
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("BOOKGATE_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

/// Like [`get_env_with_prefix`], but treats blank values as unset.
pub fn get_non_empty_env(key: &str) -> Option<String> {
    get_env_with_prefix(key).filter(|value| !value.trim().is_empty())
}

/// Parse a non-blank variable, reporting malformed values as config errors.
pub fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>> {
    match get_non_empty_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AppError::config(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(None),
    }
}
