use crate::error::{AppError, Result};
use crate::utils::get_non_empty_env;
use serde::{Deserialize, Serialize};

/// Booking form settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BookingConfig {
    /// Services a visitor can book
    #[serde(default = "default_services")]
    pub services: Vec<String>,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            services: default_services(),
        }
    }
}

fn default_services() -> Vec<String> {
    ["consultation", "follow-up", "assessment"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl BookingConfig {
    /// Load from `BOOKING_SERVICES` (comma-separated).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(services) = get_non_empty_env("BOOKING_SERVICES") {
            let parsed: Vec<String> = services
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if !parsed.is_empty() {
                config.services = parsed;
            }
        }

        config
    }

    pub fn offers(&self, service: &str) -> bool {
        self.services.iter().any(|s| s == service)
    }

    pub fn validate(&self) -> Result<()> {
        if self.services.is_empty() {
            return Err(AppError::config("at least one bookable service is required"));
        }
        Ok(())
    }
}
