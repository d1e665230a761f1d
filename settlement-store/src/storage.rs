//! Lane storage
//!
//! # Lanes
//!
//! - `primary` - payments settled by the primary processor
//! - `secondary` - payments settled by the fallback processor
//!
//! Each lane is a `Vec<SettlementRecord>` behind its own `RwLock`: an append
//! holds the write lock, queries share the read lock, so a query never sees a
//! half-applied append. Lanes never block each other.
//!
//! Lanes are kept sorted by timestamp. Fresh settlements arrive in order and
//! are pushed to the tail in O(1). Retry sweeps settle older payments after
//! newer ones; those records are inserted at their sorted position.

use crate::types::{
    now_micros, Gateway, LaneSummary, PaymentsSummary, SettlementRecord, TimeRange, Timestamp,
};
use parking_lot::RwLock;
use rust_decimal::Decimal;

/// One append-only, time-ordered record sequence
#[derive(Debug, Default)]
struct Lane {
    records: RwLock<Vec<SettlementRecord>>,
}

impl Lane {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            records: RwLock::new(Vec::with_capacity(capacity)),
        }
    }

    /// Keep the lane sorted: tail push when in order, otherwise insert after
    /// every record with an equal or earlier timestamp
    fn append(&self, record: SettlementRecord) {
        let mut records = self.records.write();

        let late = records
            .last()
            .map_or(false, |last| record.timestamp < last.timestamp);

        if late {
            let at = records.partition_point(|r| r.timestamp <= record.timestamp);
            records.insert(at, record);
        } else {
            records.push(record);
        }
    }

    /// Sum `[first ts >= from, first ts > to)`
    fn query(&self, from: Timestamp, to: Timestamp) -> LaneSummary {
        let records = self.records.read();

        let low = records.partition_point(|r| r.timestamp < from);
        let high = records.partition_point(|r| r.timestamp <= to);

        if high <= low {
            return LaneSummary::default();
        }

        let matched = &records[low..high];
        LaneSummary {
            total_requests: matched.len() as u64,
            total_amount: matched.iter().map(|r| r.amount).sum::<Decimal>(),
        }
    }

    fn len(&self) -> usize {
        self.records.read().len()
    }
}

/// Settlement lanes for both gateways.
///
/// Construct once and share through an `Arc`.
#[derive(Debug, Default)]
pub struct SettlementStore {
    primary: Lane,
    secondary: Lane,
}

impl SettlementStore {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store with room for `capacity` records per lane
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            primary: Lane::with_capacity(capacity),
            secondary: Lane::with_capacity(capacity),
        }
    }

    fn lane(&self, gateway: Gateway) -> &Lane {
        match gateway {
            Gateway::Primary => &self.primary,
            Gateway::Secondary => &self.secondary,
        }
    }

    /// Append record to a lane, keeping it ordered by timestamp
    pub fn append(&self, gateway: Gateway, record: SettlementRecord) {
        self.lane(gateway).append(record);

        tracing::trace!(
            lane = %gateway,
            timestamp = record.timestamp,
            amount = %record.amount,
            "Settlement appended"
        );
    }

    /// Count and sum of one lane over a window.
    ///
    /// Missing `from` is 0, missing `to` is now. An inverted window is empty.
    pub fn query(&self, gateway: Gateway, range: TimeRange) -> LaneSummary {
        let (from, to) = range.resolve(now_micros());
        self.lane(gateway).query(from, to)
    }

    /// Both lanes over the same window, reported separately
    pub fn summary(&self, range: TimeRange) -> PaymentsSummary {
        let (from, to) = range.resolve(now_micros());

        PaymentsSummary {
            primary: self.primary.query(from, to),
            secondary: self.secondary.query(from, to),
        }
    }

    /// Number of records in a lane
    pub fn len(&self, gateway: Gateway) -> usize {
        self.lane(gateway).len()
    }

    /// True when both lanes are empty
    pub fn is_empty(&self) -> bool {
        Gateway::ALL.iter().all(|g| self.len(*g) == 0)
    }
}
