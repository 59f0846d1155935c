//! Rate limiting gate as a tower layer.
//!
//! Classifies each request into a policy by path and method, asks the
//! [`RateLimiter`] for a decision and either answers 429 or forwards to the
//! inner service, attaching the rate limit headers to whatever it returns.

use super::client::client_identifier;
use super::config::{RateLimitConfig, StoreFailureMode};
use super::decision::{RateLimitDecision, apply_headers};
use super::limiter::{LimitOutcome, RateLimiter};
use super::policy::Policy;
use crate::error::AppError;
use axum::{
    extract::Request,
    http::{HeaderValue, Method, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use std::{future::Future, pin::Pin, sync::Arc};
use tower::{Layer, Service};
use tracing::{info, warn};

/// Body of a 429 response.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitError {
    error: &'static str,
    message: String,
    retry_after: u64,
}

impl RateLimitError {
    fn into_response(self, decision: &RateLimitDecision) -> Response {
        let retry_after = self.retry_after;
        let mut response = (StatusCode::TOO_MANY_REQUESTS, axum::Json(self)).into_response();
        let headers = response.headers_mut();
        headers.insert(RETRY_AFTER, HeaderValue::from(retry_after));
        apply_headers(headers, decision);
        response
    }
}

/// Which policy, if any, applies to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Limited(Policy),
    Bypass,
}

impl RouteClass {
    /// `POST <form_path>` is a form submission, anything else under the API
    /// prefix is general API traffic, the rest is not gated.
    pub fn classify(config: &RateLimitConfig, method: &Method, path: &str) -> Self {
        if method == Method::POST && path == config.form_path {
            return Self::Limited(Policy::FormSubmission);
        }

        let prefix = config.api_prefix.trim_end_matches('/');
        let under_prefix = path == prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'));

        if under_prefix {
            Self::Limited(Policy::GeneralApi)
        } else {
            Self::Bypass
        }
    }
}

/// Tower layer for the rate limit gate
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter>,
}

impl RateLimitLayer {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

/// Tower service for the rate limit gate
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<RateLimiter>,
}

impl<S> Service<Request> for RateLimitService<S>
where
    S: Service<Request> + Clone + Send + Sync + 'static,
    S::Response: IntoResponse,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        // The clone that was driven to readiness handles this request
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let limiter = self.limiter.clone();

        Box::pin(async move {
            let config = limiter.config();
            let policy = match RouteClass::classify(config, req.method(), req.uri().path()) {
                RouteClass::Limited(policy) if limiter.is_enabled() => policy,
                _ => return Ok(inner.call(req).await?.into_response()),
            };

            let client = client_identifier(req.headers());

            match limiter.evaluate(policy, &client).await {
                LimitOutcome::Bypassed => Ok(inner.call(req).await?.into_response()),
                LimitOutcome::Admitted(decision) => {
                    let mut response = inner.call(req).await?.into_response();
                    apply_headers(response.headers_mut(), &decision);
                    Ok(response)
                }
                LimitOutcome::Rejected(decision) => {
                    let retry_after = decision.retry_after_secs(limiter.now()).max(1);

                    info!(
                        policy = %policy,
                        client = %client,
                        retry_after,
                        path = %req.uri().path(),
                        "Rate limit exceeded"
                    );

                    let body = RateLimitError {
                        error: "Too Many Requests",
                        message: format!(
                            "Too many requests. Please try again in {} seconds.",
                            retry_after
                        ),
                        retry_after,
                    };
                    Ok(body.into_response(&decision))
                }
                LimitOutcome::StoreFailed(e) => match config.on_store_error {
                    StoreFailureMode::Open => {
                        warn!(
                            policy = %policy,
                            client = %client,
                            error = %e,
                            "Rate limit store failed, admitting request"
                        );
                        Ok(inner.call(req).await?.into_response())
                    }
                    StoreFailureMode::Closed => {
                        warn!(
                            policy = %policy,
                            client = %client,
                            error = %e,
                            "Rate limit store failed, rejecting request"
                        );
                        Ok(AppError::service_unavailable(e.to_string()).into_response())
                    }
                },
            }
        })
    }
}

/// Build the rate limit layer.
///
/// Returns None if rate limiting is disabled, so the gate adds no work at all.
pub fn build_rate_limit_layer(limiter: &Arc<RateLimiter>) -> Option<RateLimitLayer> {
    if !limiter.is_enabled() {
        return None;
    }

    Some(RateLimitLayer::new(limiter.clone()))
}
