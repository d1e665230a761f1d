use crate::config::Config;
use crate::error::Result;
use crate::gateway::{HttpProcessor, PaymentProcessor};
use crate::handlers::{configure_routes, AppState};
use crate::metrics::RouterMetrics;
use crate::recorder::SettlementRecorder;
use crate::worker::DispatchWorker;
use actix_web::{middleware::Logger, web, App, HttpServer};
use payment_queue::{QueueStore, RedisQueueStore};
use settlement_store::{Gateway, SettlementStore};
use std::sync::Arc;
use tracing::info;

pub struct PaymentRouterServer {
    config: Arc<Config>,
    queue: Arc<dyn QueueStore>,
}

impl PaymentRouterServer {
    /// Connect to the queue backend; an unreachable Redis aborts start-up
    pub async fn new(config: Config) -> Result<Self> {
        let queue = RedisQueueStore::connect(&config.redis.url).await?;
        queue.ping().await?;

        info!("Queue store connection established");

        Ok(Self {
            config: Arc::new(config),
            queue: Arc::new(queue),
        })
    }

    pub async fn start(self) -> Result<()> {
        let config = self.config.clone();

        let store = Arc::new(SettlementStore::new());
        let metrics = RouterMetrics::new()?;

        let timeout = config.processors.timeout();
        let primary: Arc<dyn PaymentProcessor> = Arc::new(HttpProcessor::new(
            Gateway::Primary,
            &config.processors.primary_url,
            timeout,
        )?);
        let secondary: Arc<dyn PaymentProcessor> = Arc::new(HttpProcessor::new(
            Gateway::Secondary,
            &config.processors.secondary_url,
            timeout,
        )?);

        info!(
            primary = %config.processors.primary_url,
            secondary = %config.processors.secondary_url,
            timeout_ms = config.processors.timeout_ms,
            "Processor gateways configured"
        );

        // Single writer for both lanes
        let worker = DispatchWorker::new(
            self.queue.clone(),
            primary,
            secondary,
            SettlementRecorder::new(store.clone()),
            metrics.clone(),
            config.dispatcher.clone(),
        );
        tokio::spawn(worker.run());

        let state = AppState {
            queue: self.queue.clone(),
            store,
            metrics,
        };

        info!(
            "Starting HTTP server on {}:{}",
            config.server.host, config.server.port
        );

        HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(state.clone()))
                .wrap(Logger::default())
                .configure(configure_routes)
        })
        .workers(config.server.workers)
        .bind((config.server.host.as_str(), config.server.port))?
        .run()
        .await?;

        Ok(())
    }
}
