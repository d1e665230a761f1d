//! Error types for the settlement store

use thiserror::Error;

/// Result type for settlement store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement store errors
#[derive(Error, Debug)]
pub enum Error {
    /// Timestamp string is not ISO-8601
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp {
        /// Offending input
        value: String,
        /// Parser message
        reason: String,
    },
}
