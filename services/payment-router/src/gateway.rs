// Processor gateways - HTTP clients for the primary and secondary processors

use crate::error::Result;
use async_trait::async_trait;
use payment_queue::QueuedPayment;
use reqwest::{Client, StatusCode};
use settlement_store::Gateway;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Why a processor did not accept a payment.
///
/// All variants are handled identically by dispatch; the split only feeds logs.
#[derive(Debug, Error)]
pub enum GatewayFailure {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("processor answered {0}")]
    Status(u16),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Which lane a success settles into
    fn gateway(&self) -> Gateway;

    /// Submit a payment; only HTTP 200 counts as accepted
    async fn process(&self, payment: &QueuedPayment) -> std::result::Result<(), GatewayFailure>;
}

pub struct HttpProcessor {
    gateway: Gateway,
    payments_url: String,
    client: Client,
}

impl HttpProcessor {
    pub fn new(gateway: Gateway, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(HttpProcessor {
            gateway,
            payments_url: format!("{}/payments", base_url.trim_end_matches('/')),
            client,
        })
    }
}

#[async_trait]
impl PaymentProcessor for HttpProcessor {
    fn gateway(&self) -> Gateway {
        self.gateway
    }

    async fn process(&self, payment: &QueuedPayment) -> std::result::Result<(), GatewayFailure> {
        let response = self
            .client
            .post(&self.payments_url)
            .json(payment)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayFailure::Timeout
                } else {
                    GatewayFailure::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(GatewayFailure::Status(status.as_u16()));
        }

        debug!(
            gateway = %self.gateway,
            correlation_id = %payment.payload.correlation_id,
            "Processor accepted payment"
        );

        Ok(())
    }
}
