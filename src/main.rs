use bookgate::{App, AppContext, ConfigBuilder, RateLimiter};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigBuilder::new().from_env().build()?;
    bookgate::init_tracing_with_config(&config);

    let limiter = RateLimiter::from_config(&config.rate_limit).await?;
    tracing::info!(
        rate_limiting = limiter.is_enabled(),
        store = limiter.store_name().unwrap_or("none"),
        services = ?config.booking.services,
        "bookgate configured"
    );

    let context = AppContext::builder()
        .with_limiter(Arc::new(limiter))
        .with_booking(config.booking.clone())
        .build();

    App::new(config, context).serve().await?;
    Ok(())
}
