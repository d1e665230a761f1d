//! Dispatch worker
//!
//! A single sequential loop that drains the `pending` list into the primary
//! processor and, when there is nothing fresh to do, sweeps the `failed` list.
//!
//! ```text
//! pending ──pop──▶ primary ──ok──▶ primary lane
//!                     │
//!                   fail ──▶ failed list + cooldown flag
//!
//! (idle, flag expired)
//! failed ──pop──▶ primary ──ok──▶ primary lane
//!                     │
//!                   fail ──▶ re-arm cooldown ──▶ secondary ──ok──▶ secondary lane
//!                                                    │
//!                                                  fail ──▶ dropped
//! ```

use crate::config::DispatcherConfig;
use crate::gateway::PaymentProcessor;
use crate::metrics::RouterMetrics;
use crate::recorder::SettlementRecorder;
use payment_queue::{cooldown_key, QueueList, QueueStore, QueuedPayment};
use settlement_store::Gateway;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What one loop iteration did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub popped: usize,
    pub settled: usize,
    pub deferred: usize,
    pub dropped: usize,
    pub sweep: Option<SweepOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Primary cooldown flag still set; nothing touched
    CoolingDown,
    /// The queue store could not be read
    Unavailable,
    /// No failed items remained
    Drained,
    Swept {
        primary: usize,
        secondary: usize,
        dropped: usize,
    },
}

enum Disposition {
    Settled,
    Deferred,
    Dropped,
}

pub struct DispatchWorker {
    queue: Arc<dyn QueueStore>,
    primary: Arc<dyn PaymentProcessor>,
    secondary: Arc<dyn PaymentProcessor>,
    recorder: SettlementRecorder,
    metrics: RouterMetrics,
    config: DispatcherConfig,
    cooldown_key: String,
    has_failed_work: bool,
}

impl DispatchWorker {
    pub fn new(
        queue: Arc<dyn QueueStore>,
        primary: Arc<dyn PaymentProcessor>,
        secondary: Arc<dyn PaymentProcessor>,
        recorder: SettlementRecorder,
        metrics: RouterMetrics,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            queue,
            primary,
            secondary,
            recorder,
            metrics,
            config,
            cooldown_key: cooldown_key(Gateway::Primary.as_str()),
            has_failed_work: false,
        }
    }

    /// Run until the process exits
    pub async fn run(mut self) {
        tokio::time::sleep(self.config.startup_delay()).await;
        self.recover_backlog().await;

        info!(
            batch_size = self.config.batch_size,
            poll_interval_ms = self.config.poll_interval_ms,
            "Dispatch worker started"
        );

        loop {
            let report = self.tick().await;
            if report.popped > 0 {
                debug!(
                    popped = report.popped,
                    settled = report.settled,
                    deferred = report.deferred,
                    dropped = report.dropped,
                    "Dispatched batch"
                );
            }

            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    /// Pick up failed items left behind by a previous process
    pub async fn recover_backlog(&mut self) {
        match self.queue.len(QueueList::Failed).await {
            Ok(count) => {
                if count > 0 {
                    info!(count, "Found failed items from a previous run");
                }
                self.has_failed_work = count > 0;
            }
            Err(e) => {
                warn!(error = %e, "Could not inspect failed list; will sweep once");
                self.has_failed_work = true;
            }
        }
    }

    pub fn has_failed_work(&self) -> bool {
        self.has_failed_work
    }

    /// One loop iteration
    pub async fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        let batch = match self
            .queue
            .pop_batch(QueueList::Pending, self.config.batch_size)
            .await
        {
            Ok(batch) => batch,
            Err(e) => {
                error!(error = %e, "Failed to pop pending items");
                return report;
            }
        };

        report.popped = batch.len();
        for raw in &batch {
            match self.dispatch(raw).await {
                Disposition::Settled => report.settled += 1,
                Disposition::Deferred => report.deferred += 1,
                Disposition::Dropped => report.dropped += 1,
            }
        }

        if batch.is_empty() && self.has_failed_work {
            report.sweep = Some(self.sweep().await);
        }

        report
    }

    async fn dispatch(&mut self, raw: &str) -> Disposition {
        let Some(payment) = self.decode(raw) else {
            return Disposition::Dropped;
        };

        if self.attempt(self.primary.as_ref(), &payment).await {
            return Disposition::Settled;
        }

        if let Err(e) = self.queue.push(QueueList::Failed, raw).await {
            error!(
                correlation_id = %payment.payload.correlation_id,
                error = %e,
                "Could not park failed payment; item lost"
            );
            self.metrics.record_drop("requeue_failed");
        }

        self.arm_cooldown().await;
        self.has_failed_work = true;
        Disposition::Deferred
    }

    /// Retry the failed list: primary, then secondary once, then give up
    pub async fn sweep(&mut self) -> SweepOutcome {
        match self.queue.flag_exists(&self.cooldown_key).await {
            Ok(true) => {
                debug!("Primary cooling down, sweep skipped");
                self.metrics.record_sweep("cooling_down");
                return SweepOutcome::CoolingDown;
            }
            Ok(false) => {}
            Err(e) => {
                error!(error = %e, "Failed to read cooldown flag");
                self.metrics.record_sweep("unavailable");
                return SweepOutcome::Unavailable;
            }
        }

        let items = match self
            .queue
            .pop_batch(QueueList::Failed, self.config.batch_size)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                error!(error = %e, "Failed to pop failed items");
                self.metrics.record_sweep("unavailable");
                return SweepOutcome::Unavailable;
            }
        };

        if items.is_empty() {
            self.has_failed_work = false;
            self.metrics.record_sweep("drained");
            return SweepOutcome::Drained;
        }

        let (mut primary, mut secondary, mut dropped) = (0, 0, 0);

        for raw in &items {
            let Some(payment) = self.decode(raw) else {
                dropped += 1;
                continue;
            };

            if self.attempt(self.primary.as_ref(), &payment).await {
                primary += 1;
                continue;
            }

            self.arm_cooldown().await;

            if self.attempt(self.secondary.as_ref(), &payment).await {
                secondary += 1;
                continue;
            }

            error!(
                correlation_id = %payment.payload.correlation_id,
                requested_at = %payment.requested_at,
                amount = %payment.payload.amount,
                "Both processors rejected payment; dropping"
            );
            self.metrics.record_drop("double_failure");
            dropped += 1;
        }

        info!(
            swept = items.len(),
            primary, secondary, dropped, "Retry sweep finished"
        );
        self.metrics.record_sweep("swept");

        SweepOutcome::Swept {
            primary,
            secondary,
            dropped,
        }
    }

    fn decode(&self, raw: &str) -> Option<QueuedPayment> {
        match QueuedPayment::decode(raw) {
            Ok(payment) => Some(payment),
            Err(e) => {
                warn!(error = %e, item = %raw, "Dropping undecodable queue item");
                self.metrics.record_drop("malformed");
                None
            }
        }
    }

    /// Call a processor and settle on success
    async fn attempt(&self, processor: &dyn PaymentProcessor, payment: &QueuedPayment) -> bool {
        let gateway = processor.gateway();

        match processor.process(payment).await {
            Ok(()) => {
                self.metrics.record_gateway_call(gateway, true);
                self.settle(gateway, payment);
                true
            }
            Err(failure) => {
                self.metrics.record_gateway_call(gateway, false);
                warn!(
                    gateway = %gateway,
                    correlation_id = %payment.payload.correlation_id,
                    error = %failure,
                    "Processor call failed"
                );
                false
            }
        }
    }

    fn settle(&self, gateway: Gateway, payment: &QueuedPayment) {
        match self.recorder.record(gateway, payment) {
            Ok(()) => self.metrics.record_settlement(gateway),
            Err(e) => {
                error!(
                    gateway = %gateway,
                    correlation_id = %payment.payload.correlation_id,
                    error = %e,
                    "Processor accepted payment but it could not be recorded"
                );
                self.metrics.record_drop("unrecorded");
            }
        }
    }

    async fn arm_cooldown(&self) {
        if let Err(e) = self
            .queue
            .set_flag(&self.cooldown_key, self.config.cooldown())
            .await
        {
            error!(error = %e, "Failed to set primary cooldown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayFailure, MockPaymentProcessor};
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use payment_queue::{InMemoryQueueStore, PaymentPayload};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use settlement_store::{SettlementStore, TimeRange};
    use std::time::Duration;

    struct Harness {
        queue: InMemoryQueueStore,
        store: Arc<SettlementStore>,
        metrics: RouterMetrics,
        worker: DispatchWorker,
    }

    fn processor(gateway: Gateway) -> MockPaymentProcessor {
        let mut mock = MockPaymentProcessor::new();
        mock.expect_gateway().return_const(gateway);
        mock
    }

    fn harness(primary: MockPaymentProcessor, secondary: MockPaymentProcessor) -> Harness {
        let queue = InMemoryQueueStore::new();
        let store = Arc::new(SettlementStore::new());
        let metrics = RouterMetrics::new().unwrap();

        let worker = DispatchWorker::new(
            Arc::new(queue.clone()),
            Arc::new(primary),
            Arc::new(secondary),
            SettlementRecorder::new(store.clone()),
            metrics.clone(),
            DispatcherConfig::default(),
        );

        Harness {
            queue,
            store,
            metrics,
            worker,
        }
    }

    fn item(correlation_id: &str, amount: Decimal) -> String {
        item_at(Utc::now(), correlation_id, amount)
    }

    fn item_at(at: DateTime<Utc>, correlation_id: &str, amount: Decimal) -> String {
        QueuedPayment::new(at, PaymentPayload::new(correlation_id, amount))
            .encode()
            .unwrap()
    }

    fn lane_count(store: &SettlementStore, gateway: Gateway) -> u64 {
        store.query(gateway, TimeRange::unbounded()).total_requests
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_success_settles_once() {
        let mut primary = processor(Gateway::Primary);
        primary.expect_process().times(1).returning(|_| Ok(()));
        let mut secondary = processor(Gateway::Secondary);
        secondary.expect_process().never();

        let mut h = harness(primary, secondary);
        h.queue
            .push(QueueList::Pending, &item("p-1", dec!(19.90)))
            .await
            .unwrap();

        let report = h.worker.tick().await;
        assert_eq!(report.popped, 1);
        assert_eq!(report.settled, 1);
        assert!(report.sweep.is_none());

        let lane = h.store.query(Gateway::Primary, TimeRange::unbounded());
        assert_eq!(lane.total_requests, 1);
        assert_eq!(lane.total_amount, dec!(19.90));
        assert_eq!(lane_count(&h.store, Gateway::Secondary), 0);
        assert!(!h.worker.has_failed_work());
    }

    #[tokio::test(start_paused = true)]
    async fn test_undecodable_item_is_dropped() {
        let mut primary = processor(Gateway::Primary);
        primary.expect_process().never();
        let mut secondary = processor(Gateway::Secondary);
        secondary.expect_process().never();

        let mut h = harness(primary, secondary);
        h.queue
            .push(QueueList::Pending, "garbage-no-delimiter")
            .await
            .unwrap();
        h.queue
            .push(QueueList::Pending, "2025-07-15T12:00:00.000Z@{not json")
            .await
            .unwrap();

        let report = h.worker.tick().await;
        assert_eq!(report.dropped, 2);
        assert!(h.store.is_empty());
        assert!(h.queue.snapshot(QueueList::Failed).await.is_empty());
        assert_eq!(h.metrics.dropped("malformed"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_waits_for_cooldown_then_falls_back() {
        let mut primary = processor(Gateway::Primary);
        primary
            .expect_process()
            .times(2)
            .returning(|_| Err(GatewayFailure::Status(500)));
        let mut secondary = processor(Gateway::Secondary);
        secondary.expect_process().times(1).returning(|_| Ok(()));

        let mut h = harness(primary, secondary);
        let raw = item("f-1", dec!(42.00));
        h.queue.push(QueueList::Pending, &raw).await.unwrap();

        // First attempt fails: parked on the failed list
        let report = h.worker.tick().await;
        assert_eq!(report.deferred, 1);
        assert!(h.worker.has_failed_work());
        assert_eq!(h.queue.snapshot(QueueList::Failed).await, vec![raw.clone()]);

        // Idle tick inside the cooldown window touches nothing
        let report = h.worker.tick().await;
        assert_eq!(report.sweep, Some(SweepOutcome::CoolingDown));
        assert_eq!(h.queue.snapshot(QueueList::Failed).await, vec![raw]);

        tokio::time::advance(Duration::from_secs(11)).await;

        let report = h.worker.tick().await;
        assert_eq!(
            report.sweep,
            Some(SweepOutcome::Swept {
                primary: 0,
                secondary: 1,
                dropped: 0
            })
        );
        assert_eq!(lane_count(&h.store, Gateway::Primary), 0);
        assert_eq!(lane_count(&h.store, Gateway::Secondary), 1);
        assert!(h.queue.snapshot(QueueList::Failed).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_failure_drops_item() {
        let mut primary = processor(Gateway::Primary);
        primary
            .expect_process()
            .times(2)
            .returning(|_| Err(GatewayFailure::Timeout));
        let mut secondary = processor(Gateway::Secondary);
        secondary
            .expect_process()
            .times(1)
            .returning(|_| Err(GatewayFailure::Transport("connection refused".into())));

        let mut h = harness(primary, secondary);
        h.queue
            .push(QueueList::Pending, &item("d-1", dec!(5)))
            .await
            .unwrap();

        h.worker.tick().await;
        tokio::time::advance(Duration::from_secs(11)).await;

        let report = h.worker.tick().await;
        assert_eq!(
            report.sweep,
            Some(SweepOutcome::Swept {
                primary: 0,
                secondary: 0,
                dropped: 1
            })
        );
        assert!(h.store.is_empty());
        assert!(h.queue.snapshot(QueueList::Failed).await.is_empty());
        assert_eq!(h.metrics.dropped("double_failure"), 1);

        // The sweep's primary failure re-armed the cooldown
        let report = h.worker.tick().await;
        assert_eq!(report.sweep, Some(SweepOutcome::CoolingDown));

        tokio::time::advance(Duration::from_secs(11)).await;
        let report = h.worker.tick().await;
        assert_eq!(report.sweep, Some(SweepOutcome::Drained));
        assert!(!h.worker.has_failed_work());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_primary_recovery_settles_to_primary() {
        let mut calls = 0;
        let mut primary = processor(Gateway::Primary);
        primary.expect_process().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(GatewayFailure::Status(503))
            } else {
                Ok(())
            }
        });
        let mut secondary = processor(Gateway::Secondary);
        secondary.expect_process().never();

        let mut h = harness(primary, secondary);
        h.queue
            .push(QueueList::Pending, &item("r-1", dec!(1.50)))
            .await
            .unwrap();

        h.worker.tick().await;
        tokio::time::advance(Duration::from_secs(11)).await;
        h.worker.tick().await;

        assert_eq!(lane_count(&h.store, Gateway::Primary), 1);
        assert_eq!(lane_count(&h.store, Gateway::Secondary), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_swept_older_payment_keeps_lane_windows_exact() {
        let mut calls = 0;
        let mut primary = processor(Gateway::Primary);
        primary.expect_process().times(3).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(GatewayFailure::Status(500))
            } else {
                Ok(())
            }
        });
        let mut secondary = processor(Gateway::Secondary);
        secondary.expect_process().never();

        let mut h = harness(primary, secondary);
        let t0 = Utc.with_ymd_and_hms(2025, 7, 15, 12, 0, 0).unwrap();
        let t1 = t0 + ChronoDuration::seconds(1);
        h.queue
            .push(QueueList::Pending, &item_at(t0, "older", dec!(1)))
            .await
            .unwrap();
        h.queue
            .push(QueueList::Pending, &item_at(t1, "newer", dec!(2)))
            .await
            .unwrap();

        // Older fails and is parked, newer settles first
        let report = h.worker.tick().await;
        assert_eq!(report.deferred, 1);
        assert_eq!(report.settled, 1);

        tokio::time::advance(Duration::from_secs(11)).await;
        let report = h.worker.tick().await;
        assert_eq!(
            report.sweep,
            Some(SweepOutcome::Swept {
                primary: 1,
                secondary: 0,
                dropped: 0
            })
        );

        let t0_us = t0.timestamp_micros();
        let t1_us = t1.timestamp_micros();

        let only_older = h
            .store
            .query(Gateway::Primary, TimeRange::between(t0_us, t0_us));
        assert_eq!(only_older.total_requests, 1);
        assert_eq!(only_older.total_amount, dec!(1));

        let only_newer = h
            .store
            .query(Gateway::Primary, TimeRange::between(t1_us, t1_us));
        assert_eq!(only_newer.total_requests, 1);
        assert_eq!(only_newer.total_amount, dec!(2));

        let both = h
            .store
            .query(Gateway::Primary, TimeRange::between(t0_us, t1_us));
        assert_eq!(both.total_requests, 2);
        assert_eq!(both.total_amount, dec!(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_items_hit_primary_during_cooldown() {
        let mut calls = 0;
        let mut primary = processor(Gateway::Primary);
        primary.expect_process().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(GatewayFailure::Status(500))
            } else {
                Ok(())
            }
        });
        let mut secondary = processor(Gateway::Secondary);
        secondary.expect_process().never();

        let mut h = harness(primary, secondary);
        h.queue
            .push(QueueList::Pending, &item("a", dec!(1)))
            .await
            .unwrap();
        h.worker.tick().await;

        h.queue
            .push(QueueList::Pending, &item("b", dec!(2)))
            .await
            .unwrap();
        let report = h.worker.tick().await;
        assert_eq!(report.settled, 1);
        // A non-empty batch never triggers a sweep
        assert!(report.sweep.is_none());

        assert_eq!(lane_count(&h.store, Gateway::Primary), 1);
        assert_eq!(h.queue.snapshot(QueueList::Failed).await.len(), 1);
        assert_eq!(h.metrics.gateway_calls(Gateway::Primary, "failure"), 1);
        assert_eq!(h.metrics.gateway_calls(Gateway::Primary, "success"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recover_backlog_enables_sweep() {
        let mut primary = processor(Gateway::Primary);
        primary.expect_process().times(1).returning(|_| Ok(()));
        let mut secondary = processor(Gateway::Secondary);
        secondary.expect_process().never();

        let mut h = harness(primary, secondary);
        h.queue
            .push(QueueList::Failed, &item("left-over", dec!(3)))
            .await
            .unwrap();

        // Without recovery the worker does not know about the backlog
        assert!(h.worker.tick().await.sweep.is_none());

        h.worker.recover_backlog().await;
        assert!(h.worker.has_failed_work());

        let report = h.worker.tick().await;
        assert_eq!(
            report.sweep,
            Some(SweepOutcome::Swept {
                primary: 1,
                secondary: 0,
                dropped: 0
            })
        );
        assert_eq!(lane_count(&h.store, Gateway::Primary), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecordable_success_is_counted() {
        let mut primary = processor(Gateway::Primary);
        primary.expect_process().times(1).returning(|_| Ok(()));
        let mut secondary = processor(Gateway::Secondary);
        secondary.expect_process().never();

        let mut h = harness(primary, secondary);
        h.queue
            .push(
                QueueList::Pending,
                r#"not-a-time@{"correlationId":"x","amount":10}"#,
            )
            .await
            .unwrap();

        let report = h.worker.tick().await;
        assert_eq!(report.settled, 1);
        assert!(h.store.is_empty());
        assert_eq!(h.metrics.dropped("unrecorded"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_drains_pending() {
        let mut primary = processor(Gateway::Primary);
        primary.expect_process().returning(|_| Ok(()));
        let secondary = processor(Gateway::Secondary);

        let h = harness(primary, secondary);
        for i in 0..3 {
            h.queue
                .push(QueueList::Pending, &item(&format!("loop-{}", i), dec!(10)))
                .await
                .unwrap();
        }

        let handle = tokio::spawn(h.worker.run());
        tokio::time::sleep(Duration::from_millis(400)).await;
        handle.abort();

        let lane = h.store.query(Gateway::Primary, TimeRange::unbounded());
        assert_eq!(lane.total_requests, 3);
        assert_eq!(lane.total_amount, dec!(30));
    }
}
