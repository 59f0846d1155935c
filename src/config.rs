use crate::booking::BookingConfig;
use crate::error::{AppError, Result};
use crate::ratelimit::RateLimitConfig;
use crate::utils::{get_env_with_prefix, parse_env};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main configuration for bookgate
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub booking: BookingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum request body size in bytes (default: 64KB)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json")]
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_size: default_max_body_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json() -> bool {
    false
}

fn default_max_body_size() -> usize {
    64 * 1024 // booking form payloads are small
}

impl ServerConfig {
    pub fn addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
    env_error: Option<AppError>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            env_error: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.config.server.max_body_size = max_body_size;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.config.rate_limit = rate_limit;
        self
    }

    pub fn with_booking(mut self, booking: BookingConfig) -> Self {
        self.config.booking = booking;
        self
    }

    /// Load configuration from environment variables with BOOKGATE_ prefix
    ///
    /// Malformed values are reported by [`build`](Self::build).
    pub fn from_env(mut self) -> Self {
        if let Some(host) = get_env_with_prefix("HOST") {
            self.config.server.host = host;
        }
        // BOOKGATE_PORT first, then PORT as set by most hosting platforms
        match parse_env("PORT") {
            Ok(Some(port)) => self.config.server.port = port,
            Ok(None) => {}
            Err(e) => self.record_env_error(e),
        }
        match parse_env("MAX_BODY_SIZE") {
            Ok(Some(size)) => self.config.server.max_body_size = size,
            Ok(None) => {}
            Err(e) => self.record_env_error(e),
        }
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        match parse_env("LOG_JSON") {
            Ok(Some(json)) => self.config.logging.json = json,
            Ok(None) => {}
            Err(e) => self.record_env_error(e),
        }

        match RateLimitConfig::from_env() {
            Ok(rate_limit) => self.config.rate_limit = rate_limit,
            Err(e) => self.record_env_error(e),
        }

        self.config.booking = BookingConfig::from_env();

        self
    }

    /// Keep the first malformed value; `build` reports it.
    fn record_env_error(&mut self, error: AppError) {
        if self.env_error.is_none() {
            self.env_error = Some(error);
        }
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns a configuration error for:
    /// - Unparseable environment values
    /// - Invalid server address (host:port)
    /// - Invalid log level
    /// - Invalid rate limit settings
    /// - An empty service list
    pub fn build(self) -> Result<Config> {
        if let Some(e) = self.env_error {
            return Err(e);
        }

        self.config.server.addr().map_err(|e| {
            AppError::config(format!(
                "Invalid server address {}:{} - {}",
                self.config.server.host, self.config.server.port, e
            ))
        })?;

        if self.config.server.port == 0 {
            return Err(AppError::config("Server port must be greater than 0"));
        }

        if self.config.server.max_body_size == 0 {
            return Err(AppError::config("Maximum body size must be greater than 0"));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging.level.to_lowercase().as_str()) {
            return Err(AppError::config(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        self.config.rate_limit.validate()?;
        self.config.booking.validate()?;

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_builds() {
        let config = ConfigBuilder::new().build().unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.logging.level, "info");
        assert!(!config.rate_limit.is_enabled());
    }

    #[test]
    fn test_invalid_log_level() {
        let result = ConfigBuilder::new().with_log_level("loud").build();
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_invalid_host() {
        let result = ConfigBuilder::new().with_host("not a host").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_rate_limit_settings_are_validated() {
        let rate_limit = RateLimitConfig::builder().general_api(10, 0).build();
        let result = ConfigBuilder::new().with_rate_limit(rate_limit).build();
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_empty_services_rejected() {
        let result = ConfigBuilder::new()
            .with_booking(BookingConfig { services: vec![] })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_serde_defaults() {
        let config: Config = serde_json::from_str(r#"{"server": {"port": 9000}}"#).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.rate_limit.form_submission.max_requests, 3);
        assert_eq!(config.rate_limit.general_api.window_seconds, 60);
    }
}
