//! Prometheus metrics for the router
//!
//! # Metrics
//!
//! - `router_gateway_requests_total{gateway,outcome}` - Processor calls by result
//! - `router_settlements_total{gateway}` - Payments recorded per lane
//! - `router_sweeps_total{outcome}` - Retry sweep results
//! - `router_items_dropped_total{reason}` - Items abandoned by the worker

use crate::error::{Result, RouterError};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use settlement_store::Gateway;

/// Metrics collector, backed by a private registry
#[derive(Clone)]
pub struct RouterMetrics {
    registry: Registry,
    gateway_requests: IntCounterVec,
    settlements: IntCounterVec,
    sweeps: IntCounterVec,
    items_dropped: IntCounterVec,
}

impl RouterMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let gateway_requests = IntCounterVec::new(
            Opts::new(
                "router_gateway_requests_total",
                "Processor calls by gateway and outcome",
            ),
            &["gateway", "outcome"],
        )?;
        registry.register(Box::new(gateway_requests.clone()))?;

        let settlements = IntCounterVec::new(
            Opts::new("router_settlements_total", "Payments recorded per lane"),
            &["gateway"],
        )?;
        registry.register(Box::new(settlements.clone()))?;

        let sweeps = IntCounterVec::new(
            Opts::new("router_sweeps_total", "Retry sweep results"),
            &["outcome"],
        )?;
        registry.register(Box::new(sweeps.clone()))?;

        let items_dropped = IntCounterVec::new(
            Opts::new("router_items_dropped_total", "Items abandoned by the worker"),
            &["reason"],
        )?;
        registry.register(Box::new(items_dropped.clone()))?;

        Ok(Self {
            registry,
            gateway_requests,
            settlements,
            sweeps,
            items_dropped,
        })
    }

    pub fn record_gateway_call(&self, gateway: Gateway, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.gateway_requests
            .with_label_values(&[gateway.as_str(), outcome])
            .inc();
    }

    pub fn record_settlement(&self, gateway: Gateway) {
        self.settlements
            .with_label_values(&[gateway.as_str()])
            .inc();
    }

    pub fn record_sweep(&self, outcome: &str) {
        self.sweeps.with_label_values(&[outcome]).inc();
    }

    pub fn record_drop(&self, reason: &str) {
        self.items_dropped.with_label_values(&[reason]).inc();
    }

    /// Text exposition format
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| RouterError::Internal(e.to_string()))
    }

    #[cfg(test)]
    pub(crate) fn dropped(&self, reason: &str) -> u64 {
        self.items_dropped.with_label_values(&[reason]).get()
    }

    #[cfg(test)]
    pub(crate) fn gateway_calls(&self, gateway: Gateway, outcome: &str) -> u64 {
        self.gateway_requests
            .with_label_values(&[gateway.as_str(), outcome])
            .get()
    }
}

impl std::fmt::Debug for RouterMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterMetrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_independent_registries() {
        // Two instances must not collide the way global registration would
        let a = RouterMetrics::new().unwrap();
        let b = RouterMetrics::new().unwrap();

        a.record_drop("malformed");
        assert_eq!(a.dropped("malformed"), 1);
        assert_eq!(b.dropped("malformed"), 0);
    }

    #[test]
    fn test_encode_exposes_counters() {
        let metrics = RouterMetrics::new().unwrap();
        metrics.record_gateway_call(Gateway::Primary, true);
        metrics.record_gateway_call(Gateway::Secondary, false);
        metrics.record_settlement(Gateway::Primary);
        metrics.record_sweep("swept");

        let text = metrics.encode().unwrap();
        assert!(text.contains(
            r#"router_gateway_requests_total{gateway="primary",outcome="success"} 1"#
        ));
        assert!(text.contains(
            r#"router_gateway_requests_total{gateway="secondary",outcome="failure"} 1"#
        ));
        assert!(text.contains(r#"router_settlements_total{gateway="primary"} 1"#));
        assert!(text.contains(r#"router_sweeps_total{outcome="swept"} 1"#));
    }
}
