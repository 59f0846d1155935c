//! Sliding-window rate limiter.

use super::client::ClientId;
use super::clock::{Clock, SystemClock};
use super::config::{RateLimitConfig, StoreFailureMode};
use super::decision::RateLimitDecision;
use super::policy::{Policy, RateLimitKey};
use super::store::{StoreError, WindowStore};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Limiter bound to a live store.
///
/// Holds no counter state of its own: every check is one atomic round trip
/// to the store.
#[derive(Clone)]
pub struct SlidingWindowLimiter {
    store: Arc<dyn WindowStore>,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

impl SlidingWindowLimiter {
    pub fn new(store: Arc<dyn WindowStore>, config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    /// Record an attempt for `client` under `policy` and decide on it.
    ///
    /// Every call counts, admitted or not.
    pub async fn check(
        &self,
        policy: Policy,
        client: &ClientId,
    ) -> std::result::Result<RateLimitDecision, StoreError> {
        let limits = self.config.limits(policy);
        let key = RateLimitKey::new(policy, client.clone()).to_store_key(&self.config.key_prefix);
        let now = self.clock.now();

        let snapshot = self.store.record(&key, now, limits.window()).await?;
        let decision = RateLimitDecision::from_snapshot(&limits, &snapshot);

        debug!(
            policy = %policy,
            client = %client,
            count = snapshot.count,
            admitted = decision.admitted,
            remaining = decision.remaining,
            "Rate limit checked"
        );

        Ok(decision)
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }
}

/// Result of running a request through the limiter.
#[derive(Debug)]
pub enum LimitOutcome {
    /// Rate limiting is disabled; no decision was computed
    Bypassed,
    /// Within quota
    Admitted(RateLimitDecision),
    /// Over quota
    Rejected(RateLimitDecision),
    /// The store failed or timed out; handling follows `on_store_error`
    StoreFailed(StoreError),
}

/// Application-wide rate limiter.
///
/// Built once at startup and shared by reference. Without a store (missing
/// credentials or not in production) it admits everything and never touches
/// the network.
#[derive(Clone)]
pub struct RateLimiter {
    window: Option<SlidingWindowLimiter>,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Limiter that admits every request.
    pub fn disabled(config: RateLimitConfig) -> Self {
        Self {
            window: None,
            config,
            clock: Arc::new(SystemClock::new()),
        }
    }

    /// Limiter backed by `store`.
    pub fn with_store(store: Arc<dyn WindowStore>, config: RateLimitConfig) -> Self {
        Self::with_store_and_clock(store, config, Arc::new(SystemClock::new()))
    }

    pub fn with_store_and_clock(
        store: Arc<dyn WindowStore>,
        config: RateLimitConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            window: Some(SlidingWindowLimiter::new(store, config.clone(), clock.clone())),
            config,
            clock,
        }
    }

    /// Build the limiter from configuration.
    ///
    /// The store flavour follows the URL scheme: `redis://`/`rediss://` use a
    /// native connection, `http://`/`https://` use the REST protocol. No
    /// connection is made here: a store that is down at startup fails
    /// requests one by one under `on_store_error` and recovers on its own.
    /// A store URL that cannot be used at all disables the limiter in `open`
    /// mode and fails startup in `closed` mode.
    pub async fn from_config(config: &RateLimitConfig) -> Result<Self> {
        config.validate()?;

        if !config.is_enabled() {
            info!(
                production = config.production,
                has_credentials = config.has_store_credentials(),
                "Rate limiting disabled"
            );
            return Ok(Self::disabled(config.clone()));
        }

        match build_store(config) {
            Ok(store) => {
                info!(
                    store = store.name(),
                    form_limit = config.form_submission.max_requests,
                    form_window_seconds = config.form_submission.window_seconds,
                    api_limit = config.general_api.max_requests,
                    api_window_seconds = config.general_api.window_seconds,
                    "Rate limiting enabled"
                );
                Ok(Self::with_store(store, config.clone()))
            }
            Err(e) => match config.on_store_error {
                StoreFailureMode::Open => {
                    warn!(error = %e, "Rate limit store misconfigured, rate limiting disabled");
                    Ok(Self::disabled(config.clone()))
                }
                StoreFailureMode::Closed => Err(AppError::config(format!(
                    "rate limit store misconfigured: {}",
                    e
                ))),
            },
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.window.is_some()
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn store_name(&self) -> Option<&'static str> {
        self.window.as_ref().map(SlidingWindowLimiter::store_name)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run one request through the limiter.
    ///
    /// The store call is bounded by `store_timeout_ms`; a timeout counts as a
    /// store failure.
    pub async fn evaluate(&self, policy: Policy, client: &ClientId) -> LimitOutcome {
        let Some(window) = &self.window else {
            return LimitOutcome::Bypassed;
        };

        let timeout = self.config.store_timeout();
        match tokio::time::timeout(timeout, window.check(policy, client)).await {
            Ok(Ok(decision)) if decision.admitted => LimitOutcome::Admitted(decision),
            Ok(Ok(decision)) => LimitOutcome::Rejected(decision),
            Ok(Err(e)) => LimitOutcome::StoreFailed(e),
            Err(_) => LimitOutcome::StoreFailed(StoreError::Timeout(timeout)),
        }
    }
}

fn build_store(config: &RateLimitConfig) -> std::result::Result<Arc<dyn WindowStore>, StoreError> {
    let url = config.store_url.as_deref().unwrap_or_default().trim();
    let token = config.store_token.as_deref().unwrap_or_default().trim();

    if url.starts_with("redis://") || url.starts_with("rediss://") {
        #[cfg(feature = "store-redis")]
        {
            let store =
                super::store::RedisWindowStore::new(url, Some(token), config.store_timeout())?;
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "store-redis"))]
        {
            return Err(StoreError::Unavailable(
                "redis store requested but the store-redis feature is not enabled".to_string(),
            ));
        }
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        #[cfg(feature = "store-rest")]
        {
            let store = super::store::RestWindowStore::new(url, token)?;
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "store-rest"))]
        {
            return Err(StoreError::Unavailable(
                "REST store requested but the store-rest feature is not enabled".to_string(),
            ));
        }
    }

    Err(StoreError::Unavailable(format!(
        "unsupported rate limit store URL scheme: {}",
        url.split("://").next().unwrap_or(url)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::MockClock;
    use crate::ratelimit::store::{InMemoryWindowStore, WindowSnapshot};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::time::Duration;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn limiter(clock: &MockClock) -> RateLimiter {
        RateLimiter::with_store_and_clock(
            Arc::new(InMemoryWindowStore::new()),
            RateLimitConfig::default(),
            Arc::new(clock.clone()),
        )
    }

    fn client(ip: &str) -> ClientId {
        ClientId::new(ip).unwrap()
    }

    #[derive(Debug)]
    struct FailingStore;

    #[async_trait]
    impl WindowStore for FailingStore {
        async fn record(
            &self,
            _key: &str,
            _now: DateTime<Utc>,
            _window: Duration,
        ) -> std::result::Result<WindowSnapshot, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[derive(Debug)]
    struct SlowStore;

    #[async_trait]
    impl WindowStore for SlowStore {
        async fn record(
            &self,
            key: &str,
            now: DateTime<Utc>,
            window: Duration,
        ) -> std::result::Result<WindowSnapshot, StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            InMemoryWindowStore::new().record(key, now, window).await
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_form_policy_admits_up_to_limit() {
        let clock = MockClock::new(start());
        let limiter = limiter(&clock);
        let ip = client("1.2.3.4");

        for expected_remaining in [2, 1, 0] {
            match limiter.evaluate(Policy::FormSubmission, &ip).await {
                LimitOutcome::Admitted(decision) => {
                    assert_eq!(decision.limit, 3);
                    assert_eq!(decision.remaining, expected_remaining);
                }
                other => panic!("expected admission, got {:?}", other),
            }
        }

        match limiter.evaluate(Policy::FormSubmission, &ip).await {
            LimitOutcome::Rejected(decision) => {
                assert_eq!(decision.remaining, 0);
                assert_eq!(decision.reset_at, start() + chrono::Duration::hours(1));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_window_elapses_and_client_is_admitted_again() {
        let clock = MockClock::new(start());
        let limiter = limiter(&clock);
        let ip = client("1.2.3.4");

        for _ in 0..11 {
            limiter.evaluate(Policy::GeneralApi, &ip).await;
        }
        assert!(matches!(
            limiter.evaluate(Policy::GeneralApi, &ip).await,
            LimitOutcome::Rejected(_)
        ));

        clock.advance(Duration::from_secs(60));

        assert!(matches!(
            limiter.evaluate(Policy::GeneralApi, &ip).await,
            LimitOutcome::Admitted(_)
        ));
    }

    #[tokio::test]
    async fn test_policies_and_clients_have_separate_counters() {
        let clock = MockClock::new(start());
        let limiter = limiter(&clock);
        let ip = client("1.2.3.4");

        for _ in 0..3 {
            limiter.evaluate(Policy::FormSubmission, &ip).await;
        }
        assert!(matches!(
            limiter.evaluate(Policy::FormSubmission, &ip).await,
            LimitOutcome::Rejected(_)
        ));

        assert!(matches!(
            limiter.evaluate(Policy::GeneralApi, &ip).await,
            LimitOutcome::Admitted(_)
        ));
        assert!(matches!(
            limiter.evaluate(Policy::FormSubmission, &client("5.6.7.8")).await,
            LimitOutcome::Admitted(_)
        ));
    }

    #[tokio::test]
    async fn test_admissions_never_exceed_limit_under_concurrency() {
        let clock = MockClock::new(start());
        let limiter = limiter(&clock);

        let mut handles = Vec::new();
        for _ in 0..40 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter
                    .evaluate(Policy::GeneralApi, &ClientId::new("9.9.9.9").unwrap())
                    .await
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if let LimitOutcome::Admitted(_) = handle.await.unwrap() {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 10);
    }

    #[tokio::test]
    async fn test_unvalidated_huge_window_does_not_panic() {
        let clock = MockClock::new(start());
        let config = RateLimitConfig::builder()
            .general_api(10, 10_000_000_000_000)
            .build();
        let limiter = RateLimiter::with_store_and_clock(
            Arc::new(InMemoryWindowStore::new()),
            config,
            Arc::new(clock.clone()),
        );

        match limiter.evaluate(Policy::GeneralApi, &client("1.2.3.4")).await {
            LimitOutcome::Admitted(decision) => assert_eq!(decision.reset_at, DateTime::<Utc>::MAX_UTC),
            other => panic!("expected admission, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disabled_limiter_bypasses() {
        let limiter = RateLimiter::disabled(RateLimitConfig::default());

        assert!(!limiter.is_enabled());
        assert!(limiter.store_name().is_none());
        for _ in 0..100 {
            assert!(matches!(
                limiter.evaluate(Policy::FormSubmission, &client("1.2.3.4")).await,
                LimitOutcome::Bypassed
            ));
        }
    }

    #[tokio::test]
    async fn test_store_error_is_reported() {
        let limiter = RateLimiter::with_store(Arc::new(FailingStore), RateLimitConfig::default());

        assert!(matches!(
            limiter.evaluate(Policy::GeneralApi, &client("1.2.3.4")).await,
            LimitOutcome::StoreFailed(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_timeout_is_reported() {
        let config = RateLimitConfig::builder().store_timeout_ms(50).build();
        let limiter = RateLimiter::with_store(Arc::new(SlowStore), config);

        assert!(matches!(
            limiter.evaluate(Policy::GeneralApi, &client("1.2.3.4")).await,
            LimitOutcome::StoreFailed(StoreError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_from_config_without_credentials_is_disabled() {
        let config = RateLimitConfig::builder().production(true).build();
        let limiter = RateLimiter::from_config(&config).await.unwrap();
        assert!(!limiter.is_enabled());
    }

    #[tokio::test]
    async fn test_from_config_outside_production_is_disabled() {
        let config = RateLimitConfig::builder()
            .store("https://store.example.com", "token")
            .build();
        let limiter = RateLimiter::from_config(&config).await.unwrap();
        assert!(!limiter.is_enabled());
    }

    #[tokio::test]
    async fn test_from_config_rest_store() {
        let config = RateLimitConfig::builder()
            .store("https://store.example.com", "token")
            .production(true)
            .build();
        let limiter = RateLimiter::from_config(&config).await.unwrap();
        assert!(limiter.is_enabled());
        assert_eq!(limiter.store_name(), Some("rest"));
    }

    #[cfg(feature = "store-redis")]
    #[tokio::test]
    async fn test_from_config_redis_down_at_startup_fails_per_request() {
        for mode in [StoreFailureMode::Open, StoreFailureMode::Closed] {
            // Nothing listens on port 1
            let config = RateLimitConfig::builder()
                .store("redis://127.0.0.1:1/", "token")
                .production(true)
                .store_timeout_ms(200)
                .on_store_error(mode)
                .build();

            let limiter = RateLimiter::from_config(&config).await.unwrap();
            assert!(limiter.is_enabled());
            assert_eq!(limiter.store_name(), Some("redis"));

            for _ in 0..2 {
                assert!(matches!(
                    limiter.evaluate(Policy::GeneralApi, &client("1.2.3.4")).await,
                    LimitOutcome::StoreFailed(_)
                ));
            }
        }
    }

    #[tokio::test]
    async fn test_from_config_unknown_scheme() {
        let open = RateLimitConfig::builder()
            .store("memcached://store.example.com", "token")
            .production(true)
            .build();
        assert!(!RateLimiter::from_config(&open).await.unwrap().is_enabled());

        let closed = RateLimitConfig::builder()
            .store("memcached://store.example.com", "token")
            .production(true)
            .on_store_error(StoreFailureMode::Closed)
            .build();
        assert!(RateLimiter::from_config(&closed).await.is_err());
    }

    #[tokio::test]
    async fn test_from_config_rejects_invalid_limits() {
        let config = RateLimitConfig::builder().form_submission(0, 3600).build();
        assert!(RateLimiter::from_config(&config).await.is_err());
    }
}
