//! Error types for the payment queue

use thiserror::Error;

/// Queue store error
#[derive(Debug, Error)]
pub enum Error {
    /// Redis error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Malformed queue item. Never retried.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// No `@` between timestamp and payload
    #[error("missing '@' delimiter, expected requestedAt@json")]
    MissingDelimiter,

    /// Payload is not a valid payment JSON object
    #[error("invalid payment JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
