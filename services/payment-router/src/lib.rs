//! Payment router service
//!
//! Accepts payments over HTTP, queues them in Redis and forwards them to a
//! primary processor, falling back to a secondary processor after a cooldown.
//! Confirmed payments are recorded per processor and reported as summaries.

pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod recorder;
pub mod server;
pub mod worker;

pub use config::Config;
pub use error::{Result, RouterError};
pub use gateway::{GatewayFailure, HttpProcessor, PaymentProcessor};
pub use worker::{DispatchWorker, SweepOutcome, TickReport};
