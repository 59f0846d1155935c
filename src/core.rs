use crate::{
    app::AppContext,
    booking::BookingModule,
    config::Config,
    error::{AppError, Result},
    health,
    http::RouteModule,
    middleware::MakeRequestUuid,
    ratelimit::build_rate_limit_layer,
};
use axum::{Router, extract::DefaultBodyLimit};
use std::time::Duration;
use tokio::signal;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// The bookgate HTTP application
pub struct App {
    router: Router<AppContext>,
    config: Config,
    context: AppContext,
}

impl App {
    /// App with the booking routes and health endpoint registered
    pub fn new(config: Config, context: AppContext) -> Self {
        Self {
            router: health::health_routes(),
            config,
            context,
        }
        .register_module(BookingModule)
    }

    /// Register a route module with the application
    pub fn register_module<M: RouteModule>(mut self, module: M) -> Self {
        let module_router = module.routes();
        if let Some(prefix) = module.prefix() {
            self.router = self.router.nest(prefix, module_router);
        } else {
            self.router = self.router.merge(module_router);
        }
        self
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Final router with middleware and state applied
    pub fn into_router(self) -> Router {
        let mut router = self.router;

        // Layers wrap outward: the last one added runs first.

        // Body size limit
        router = router.layer(DefaultBodyLimit::max(self.config.server.max_body_size));

        // Rate limiting, only when a store is configured
        if let Some(rate_limit_layer) = build_rate_limit_layer(&self.context.limiter) {
            router = router.layer(rate_limit_layer);
        }

        // Request ID
        router = router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        // HTTP tracing
        router = router.layer(TraceLayer::new_for_http());

        router.with_state(self.context)
    }

    /// Start the application server
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.server.addr().map_err(|e| {
            AppError::config(format!("Invalid server address in config: {}", e))
        })?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::internal(format!("failed to bind {}: {}", addr, e)))?;

        tracing::info!(
            rate_limiting = self.context.limiter.is_enabled(),
            "Server starting on http://{}",
            addr
        );
        tracing::info!("Health check available at http://{}/health", addr);

        axum::serve(listener, self.into_router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| AppError::internal(format!("server error: {}", e)))
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Give connections a grace period to close
    tokio::time::sleep(Duration::from_secs(1)).await;
    tracing::info!("Shutdown complete");
}
