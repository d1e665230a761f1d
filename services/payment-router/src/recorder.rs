use payment_queue::QueuedPayment;
use settlement_store::{Gateway, Result, SettlementRecord, SettlementStore};
use std::sync::Arc;

/// Writes accepted payments into the matching settlement lane.
///
/// Invoked once per gateway success. A failure here means the processor has
/// already taken the payment, so callers log it and move on; there is no undo.
#[derive(Debug, Clone)]
pub struct SettlementRecorder {
    store: Arc<SettlementStore>,
}

impl SettlementRecorder {
    pub fn new(store: Arc<SettlementStore>) -> Self {
        Self { store }
    }

    pub fn record(&self, gateway: Gateway, payment: &QueuedPayment) -> Result<()> {
        let record =
            SettlementRecord::from_requested_at(&payment.requested_at, payment.payload.amount)?;
        self.store.append(gateway, record);
        Ok(())
    }
}
