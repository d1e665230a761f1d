use payment_router::server::PaymentRouterServer;
use payment_router::{Config, RouterError};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Payment Router starting...");

    // Load configuration
    let config = Config::from_env()?;
    config.validate().map_err(RouterError::Config)?;

    info!(
        "Configuration loaded - HTTP port: {}, redis: {}",
        config.server.port, config.redis.url
    );

    let server = PaymentRouterServer::new(config).await?;

    info!("Payment Router initialized successfully");

    server.start().await?;

    Ok(())
}
