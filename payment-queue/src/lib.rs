//! Payment queue with Redis support
//!
//! Provides the durable hand-off between ingestion and dispatch:
//! - Two FIFO lists (`pending`, `failed`) with atomic batched pop
//! - TTL flags used as cooldown timers
//! - The `requestedAt@json` item encoding shared by producer and consumer
//! - An in-process backend with identical semantics for tests

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod error;
pub mod item;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use error::{DecodeError, Error, Result};
pub use item::{PaymentPayload, QueuedPayment};
pub use memory::InMemoryQueueStore;
pub use redis_store::RedisQueueStore;
pub use store::{cooldown_key, QueueList, QueueStore};
