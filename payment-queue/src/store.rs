//! Queue store protocol

use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Queue key names
pub mod keys {
    /// Freshly accepted payments
    pub const PENDING: &str = "payments:pending";
    /// Payments whose first primary attempt failed
    pub const FAILED: &str = "payments:failed";
    /// Prefix of per-gateway cooldown flags
    pub const COOLDOWN: &str = "payments:cooldown";
}

/// Flag TTL constants (in seconds)
pub mod ttl {
    /// Sweep suppression after a primary failure
    pub const COOLDOWN: u64 = 10;
}

/// The two named lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueList {
    /// Items awaiting their first attempt
    Pending,
    /// Items awaiting a retry sweep
    Failed,
}

impl QueueList {
    /// Backend key
    pub fn key(&self) -> &'static str {
        match self {
            QueueList::Pending => keys::PENDING,
            QueueList::Failed => keys::FAILED,
        }
    }
}

/// Cooldown flag key for a gateway identity
pub fn cooldown_key(gateway: &str) -> String {
    format!("{}:{}", keys::COOLDOWN, gateway)
}

/// Durable FIFO lists plus expiring flags.
///
/// `pop_batch` must be atomic: two calls never return the same item.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Append item to the tail of a list
    async fn push(&self, list: QueueList, item: &str) -> Result<()>;

    /// Remove and return up to `max` items from the head of a list
    async fn pop_batch(&self, list: QueueList, max: usize) -> Result<Vec<String>>;

    /// Set (or refresh) a flag that disappears after `ttl`
    async fn set_flag(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Whether a flag is currently set
    async fn flag_exists(&self, key: &str) -> Result<bool>;

    /// Number of items in a list
    async fn len(&self, list: QueueList) -> Result<usize>;

    /// Connectivity check
    async fn ping(&self) -> Result<()>;
}
