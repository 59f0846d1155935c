use super::policy::{MAX_WINDOW_SECONDS, Policy, PolicyLimits};
use crate::error::{AppError, Result};
use crate::utils::{get_env_with_prefix, get_non_empty_env, parse_env};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// What the gate does when the store errors or times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreFailureMode {
    /// Admit the request and log a warning
    #[default]
    Open,
    /// Reject the request with 503
    Closed,
}

impl FromStr for StoreFailureMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(AppError::config(format!(
                "rate limit on_store_error must be 'open' or 'closed', got: {}",
                other
            ))),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Shared store endpoint: `https://...` for REST, `redis://...` for Redis
    #[serde(default)]
    pub store_url: Option<String>,

    /// Shared store credential
    #[serde(default)]
    pub store_token: Option<String>,

    /// Whether the process runs in production mode.
    ///
    /// The limiter only runs in production; elsewhere every request is
    /// admitted even when store credentials are present.
    #[serde(default)]
    pub production: bool,

    /// Limits for booking form submissions
    #[serde(default = "PolicyLimits::form_submission")]
    pub form_submission: PolicyLimits,

    /// Limits for all other API requests
    #[serde(default = "PolicyLimits::general_api")]
    pub general_api: PolicyLimits,

    /// Prefix for every counter key in the store
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Upper bound on a single store round trip, in milliseconds
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Behaviour when the store fails or times out
    #[serde(default)]
    pub on_store_error: StoreFailureMode,

    /// Path of the booking form endpoint (POST only)
    #[serde(default = "default_form_path")]
    pub form_path: String,

    /// Path prefix of the API surface
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            store_url: None,
            store_token: None,
            production: false,
            form_submission: PolicyLimits::form_submission(),
            general_api: PolicyLimits::general_api(),
            key_prefix: default_key_prefix(),
            store_timeout_ms: default_store_timeout_ms(),
            on_store_error: StoreFailureMode::default(),
            form_path: default_form_path(),
            api_prefix: default_api_prefix(),
        }
    }
}

impl RateLimitConfig {
    pub fn builder() -> RateLimitConfigBuilder {
        RateLimitConfigBuilder::new()
    }

    /// Limits configured for a policy.
    pub fn limits(&self, policy: Policy) -> PolicyLimits {
        match policy {
            Policy::FormSubmission => self.form_submission,
            Policy::GeneralApi => self.general_api,
        }
    }

    /// Both store URL and token are present and non-blank.
    pub fn has_store_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.store_url) && present(&self.store_token)
    }

    /// Whether the limiter should run at all.
    pub fn is_enabled(&self) -> bool {
        self.production && self.has_store_credentials()
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Load rate limit configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        config.store_url = get_non_empty_env("RATE_LIMIT_STORE_URL");
        config.store_token = get_non_empty_env("RATE_LIMIT_STORE_TOKEN");

        if let Some(env) = get_env_with_prefix("APP_ENV") {
            config.production = env.trim().eq_ignore_ascii_case("production");
        }

        if let Some(max) = parse_env("RATE_LIMIT_FORM_MAX_REQUESTS")? {
            config.form_submission.max_requests = max;
        }
        if let Some(window) = parse_env("RATE_LIMIT_FORM_WINDOW_SECONDS")? {
            config.form_submission.window_seconds = window;
        }
        if let Some(max) = parse_env("RATE_LIMIT_API_MAX_REQUESTS")? {
            config.general_api.max_requests = max;
        }
        if let Some(window) = parse_env("RATE_LIMIT_API_WINDOW_SECONDS")? {
            config.general_api.window_seconds = window;
        }

        if let Some(prefix) = get_non_empty_env("RATE_LIMIT_KEY_PREFIX") {
            config.key_prefix = prefix;
        }
        if let Some(timeout) = parse_env("RATE_LIMIT_STORE_TIMEOUT_MS")? {
            config.store_timeout_ms = timeout;
        }
        if let Some(mode) = get_non_empty_env("RATE_LIMIT_ON_STORE_ERROR") {
            config.on_store_error = mode.parse()?;
        }
        if let Some(path) = get_non_empty_env("RATE_LIMIT_FORM_PATH") {
            config.form_path = path;
        }
        if let Some(prefix) = get_non_empty_env("RATE_LIMIT_API_PREFIX") {
            config.api_prefix = prefix;
        }

        Ok(config)
    }

    /// Reject settings the limiter cannot run with.
    pub fn validate(&self) -> Result<()> {
        for policy in Policy::ALL {
            let limits = self.limits(policy);
            if limits.max_requests == 0 {
                return Err(AppError::config(format!(
                    "rate limit max_requests for {} must be greater than 0",
                    policy
                )));
            }
            if limits.window_seconds == 0 {
                return Err(AppError::config(format!(
                    "rate limit window_seconds for {} must be greater than 0",
                    policy
                )));
            }
            if limits.window_seconds > MAX_WINDOW_SECONDS {
                return Err(AppError::config(format!(
                    "rate limit window_seconds for {} must be at most {}, got {}",
                    policy, MAX_WINDOW_SECONDS, limits.window_seconds
                )));
            }
        }

        if self.store_timeout_ms == 0 {
            return Err(AppError::config("rate limit store_timeout_ms must be greater than 0"));
        }

        if self.key_prefix.trim().is_empty() {
            return Err(AppError::config("rate limit key_prefix must not be empty"));
        }

        if !self.api_prefix.starts_with('/') {
            return Err(AppError::config(format!(
                "rate limit api_prefix must start with '/', got: {}",
                self.api_prefix
            )));
        }

        let prefix = self.api_prefix.trim_end_matches('/');
        if !self.form_path.starts_with(&format!("{}/", prefix)) {
            return Err(AppError::config(format!(
                "rate limit form_path {} must live under api_prefix {}",
                self.form_path, self.api_prefix
            )));
        }

        Ok(())
    }
}

/// Builder for RateLimitConfig
#[must_use = "builder does nothing until you call build()"]
pub struct RateLimitConfigBuilder {
    config: RateLimitConfig,
}

impl RateLimitConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RateLimitConfig::default(),
        }
    }

    /// Store URL and token in one go.
    pub fn store(mut self, url: impl Into<String>, token: impl Into<String>) -> Self {
        self.config.store_url = Some(url.into());
        self.config.store_token = Some(token.into());
        self
    }

    pub fn production(mut self, production: bool) -> Self {
        self.config.production = production;
        self
    }

    pub fn form_submission(mut self, max_requests: u32, window_seconds: u64) -> Self {
        self.config.form_submission = PolicyLimits::new(max_requests, window_seconds);
        self
    }

    pub fn general_api(mut self, max_requests: u32, window_seconds: u64) -> Self {
        self.config.general_api = PolicyLimits::new(max_requests, window_seconds);
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    pub fn store_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.store_timeout_ms = timeout_ms;
        self
    }

    pub fn on_store_error(mut self, mode: StoreFailureMode) -> Self {
        self.config.on_store_error = mode;
        self
    }

    pub fn form_path(mut self, path: impl Into<String>) -> Self {
        self.config.form_path = path.into();
        self
    }

    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.api_prefix = prefix.into();
        self
    }

    pub fn build(self) -> RateLimitConfig {
        self.config
    }
}

impl Default for RateLimitConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_key_prefix() -> String {
    "ratelimit".to_string()
}

fn default_store_timeout_ms() -> u64 {
    500
}

fn default_form_path() -> String {
    "/api/appointments".to_string()
}

fn default_api_prefix() -> String {
    "/api".to_string()
}
