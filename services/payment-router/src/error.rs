use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RouterError>;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Queue error: {0}")]
    Queue(#[from] payment_queue::Error),

    #[error("Invalid time range: {0}")]
    InvalidRange(#[from] settlement_store::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for RouterError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();

        HttpResponse::build(status_code).json(json!({
            "error": {
                "code": status_code.as_u16(),
                "message": self.to_string(),
                "type": self.error_type()
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            RouterError::Queue(_) => StatusCode::SERVICE_UNAVAILABLE,
            RouterError::InvalidRange(_) => StatusCode::BAD_REQUEST,
            RouterError::Validation(_) => StatusCode::BAD_REQUEST,
            RouterError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RouterError::HttpClient(_) => StatusCode::BAD_GATEWAY,
            RouterError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RouterError::Metrics(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RouterError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RouterError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl RouterError {
    fn error_type(&self) -> &str {
        match self {
            RouterError::Queue(_) => "queue_unavailable",
            RouterError::InvalidRange(_) => "invalid_range",
            RouterError::Validation(_) => "validation_error",
            RouterError::Serialization(_) => "serialization_error",
            RouterError::HttpClient(_) => "external_service_error",
            RouterError::Config(_) => "configuration_error",
            RouterError::Metrics(_) => "metrics_error",
            RouterError::Io(_) => "io_error",
            RouterError::Internal(_) => "internal_error",
        }
    }
}
