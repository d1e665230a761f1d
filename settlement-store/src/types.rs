//! Core types for the settlement store
//!
//! Timestamps are microseconds since the Unix epoch. Amounts are exact
//! decimals; rounding to currency precision happens only when a summary is
//! reported.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Microseconds since the Unix epoch
pub type Timestamp = i64;

/// Zone-less timestamp layout accepted alongside RFC 3339
const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Downstream processor identity. Each gateway owns one settlement lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gateway {
    /// Preferred processor, tried first for every payment
    Primary,
    /// Fallback processor, only tried during retry sweeps
    Secondary,
}

impl Gateway {
    /// Both gateways, in routing order
    pub const ALL: [Gateway; 2] = [Gateway::Primary, Gateway::Secondary];

    /// Stable lowercase name (used for lane names, queue keys and metric labels)
    pub fn as_str(&self) -> &'static str {
        match self {
            Gateway::Primary => "primary",
            Gateway::Secondary => "secondary",
        }
    }
}

impl fmt::Display for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A gateway-confirmed payment. Immutable once appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    /// When the payment was requested (µs since epoch)
    pub timestamp: Timestamp,
    /// Settled amount
    pub amount: Decimal,
}

impl SettlementRecord {
    /// Create a record
    pub fn new(timestamp: Timestamp, amount: Decimal) -> Self {
        Self { timestamp, amount }
    }

    /// Create a record from an ISO-8601 `requestedAt` string
    pub fn from_requested_at(requested_at: &str, amount: Decimal) -> Result<Self> {
        Ok(Self::new(parse_timestamp(requested_at)?, amount))
    }
}

/// Inclusive query window. Missing bounds are resolved at query time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    /// Lower bound; defaults to 0
    pub from: Option<Timestamp>,
    /// Upper bound; defaults to the current time
    pub to: Option<Timestamp>,
}

impl TimeRange {
    /// Window with both bounds given
    pub fn between(from: Timestamp, to: Timestamp) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    /// Window with no bounds (everything up to now)
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Parse optional ISO-8601 bounds
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self> {
        Ok(Self {
            from: from.map(parse_timestamp).transpose()?,
            to: to.map(parse_timestamp).transpose()?,
        })
    }

    /// Concrete `(from, to)` bounds, filling defaults
    pub fn resolve(&self, now: Timestamp) -> (Timestamp, Timestamp) {
        (self.from.unwrap_or(0), self.to.unwrap_or(now))
    }
}

/// Count and total of one lane over a window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneSummary {
    /// Number of settled payments
    pub total_requests: u64,
    /// Sum of settled amounts
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

impl LaneSummary {
    /// Round the total to currency precision (2 dp, half away from zero)
    pub fn rounded(self) -> Self {
        Self {
            total_requests: self.total_requests,
            total_amount: self
                .total_amount
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        }
    }
}

/// Per-lane summary as reported to clients
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentsSummary {
    /// Primary lane
    pub primary: LaneSummary,
    /// Secondary lane
    pub secondary: LaneSummary,
}

impl PaymentsSummary {
    /// Round both lanes to currency precision
    pub fn rounded(self) -> Self {
        Self {
            primary: self.primary.rounded(),
            secondary: self.secondary.rounded(),
        }
    }
}

/// Parse an ISO-8601 timestamp into microseconds since epoch.
///
/// Accepts RFC 3339 (`2025-07-15T12:34:56.000Z`, any offset) and the
/// zone-less form (`2025-07-15T12:34:56`, fraction optional), read as UTC.
pub fn parse_timestamp(value: &str) -> Result<Timestamp> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp_micros());
    }

    NaiveDateTime::parse_from_str(value, NAIVE_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive).timestamp_micros())
        .map_err(|e| Error::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Current time in microseconds since epoch
pub fn now_micros() -> Timestamp {
    Utc::now().timestamp_micros()
}
