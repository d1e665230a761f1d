//! Queue item encoding
//!
//! Items travel as `"<requestedAt>@<json>"`, where `requestedAt` is RFC 3339
//! UTC with millisecond precision. The timestamp is split off at the first
//! `@` and injected back into the JSON body sent to a processor.

use crate::error::DecodeError;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Separator between timestamp and payload
pub const DELIMITER: char = '@';

const REQUESTED_AT_FIELD: &str = "requestedAt";

/// Payment body as submitted by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    /// Client-chosen opaque identifier
    pub correlation_id: String,

    /// Payment amount
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    /// Any further fields, passed through to processors untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PaymentPayload {
    /// Payload with no extra fields
    pub fn new(correlation_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            amount,
            extra: Map::new(),
        }
    }
}

/// A decoded queue item, shaped as the processor request body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedPayment {
    /// Acceptance time, exactly as stamped by ingestion
    pub requested_at: String,

    /// Payment fields
    #[serde(flatten)]
    pub payload: PaymentPayload,
}

impl QueuedPayment {
    /// Stamp a payload with its acceptance time
    pub fn new(requested_at: DateTime<Utc>, payload: PaymentPayload) -> Self {
        Self {
            requested_at: format_requested_at(requested_at),
            payload,
        }
    }

    /// Encode as `requestedAt@json`
    pub fn encode(&self) -> serde_json::Result<String> {
        let json = serde_json::to_string(&self.payload)?;
        Ok(format!("{}{}{}", self.requested_at, DELIMITER, json))
    }

    /// Decode a raw item, splitting on the first `@`
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        let (requested_at, json) = raw
            .split_once(DELIMITER)
            .ok_or(DecodeError::MissingDelimiter)?;

        let mut payload: PaymentPayload = serde_json::from_str(json)?;
        // The prefix is authoritative
        payload.extra.remove(REQUESTED_AT_FIELD);

        Ok(Self {
            requested_at: requested_at.to_string(),
            payload,
        })
    }
}

/// `2025-07-15T12:34:56.789Z`
pub fn format_requested_at(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
