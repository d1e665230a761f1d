//! Settlement Store
//!
//! In-memory, append-only settlement lanes with range-sum queries.
//!
//! # Architecture
//!
//! - **Lanes**: one time-ordered record sequence per processor gateway
//! - **Ordered Lanes**: in-order appends go to the tail; late records (retry
//!   sweeps settle older payments after newer ones) are inserted in place
//! - **Binary Search**: range queries locate `[from, to]` in O(log n) and sum
//!   the k matches
//!
//! # Invariants
//!
//! - Append-only: records are never modified or removed
//! - Lanes are independent: a summary reports each lane on its own, never a
//!   merged total

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod error;
pub mod storage;
pub mod types;

// Re-exports
pub use error::{Error, Result};
pub use storage::SettlementStore;
pub use types::{Gateway, LaneSummary, PaymentsSummary, SettlementRecord, TimeRange};
