use crate::error::{Result, RouterError};
use crate::metrics::RouterMetrics;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use payment_queue::{PaymentPayload, QueueList, QueueStore, QueuedPayment};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use settlement_store::{SettlementStore, TimeRange};
use std::sync::Arc;
use tracing::{debug, warn};

/// Shared handles for request handlers
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<dyn QueueStore>,
    pub store: Arc<SettlementStore>,
    pub metrics: RouterMetrics,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Health check endpoint
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    match state.queue.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "status": "healthy",
            "service": "payment-router",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => {
            warn!(error = %e, "Health check could not reach queue");
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "unhealthy",
                "service": "payment-router",
                "version": env!("CARGO_PKG_VERSION")
            }))
        }
    }
}

/// Accept a payment for asynchronous dispatch
pub async fn create_payment(
    state: web::Data<AppState>,
    request: web::Json<PaymentPayload>,
) -> Result<HttpResponse> {
    let mut payload = request.into_inner();

    if payload.correlation_id.trim().is_empty() {
        return Err(RouterError::Validation(
            "correlationId must not be empty".to_string(),
        ));
    }
    if payload.amount <= Decimal::ZERO {
        return Err(RouterError::Validation(
            "amount must be greater than 0".to_string(),
        ));
    }
    // Acceptance time is ours to stamp
    payload.extra.remove("requestedAt");

    let item = QueuedPayment::new(Utc::now(), payload).encode()?;
    state.queue.push(QueueList::Pending, &item).await?;

    debug!(item = %item, "Payment queued");
    Ok(HttpResponse::Accepted().finish())
}

/// Per-lane totals for a time window
pub async fn payments_summary(
    state: web::Data<AppState>,
    query: web::Query<SummaryQuery>,
) -> Result<HttpResponse> {
    let from = query.from.as_deref().filter(|v| !v.is_empty());
    let to = query.to.as_deref().filter(|v| !v.is_empty());

    let range = TimeRange::parse(from, to)?;
    let summary = state.store.summary(range).rounded();

    Ok(HttpResponse::Ok().json(summary))
}

/// Prometheus scrape endpoint
pub async fn metrics(state: web::Data<AppState>) -> Result<HttpResponse> {
    let body = state.metrics.encode()?;
    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(body))
}

/// Configure all routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| RouterError::Validation(err.to_string()).into());
    let query_config = web::QueryConfig::default()
        .error_handler(|err, _req| RouterError::Validation(err.to_string()).into());

    cfg.app_data(json_config)
        .app_data(query_config)
        .route("/health", web::get().to(health_check))
        .route("/metrics", web::get().to(metrics))
        .route("/payments", web::post().to(create_payment))
        .route("/payments-summary", web::get().to(payments_summary));
}
