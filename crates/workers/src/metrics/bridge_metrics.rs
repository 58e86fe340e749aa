use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Default)]
pub struct BridgeMetrics {
    metrics_received: AtomicU64,
    metrics_invalid: AtomicU64,
    alerts_fired: AtomicU64,
    alerts_persisted: AtomicU64,
    alerts_persist_failed: AtomicU64,
    external_alerts_forwarded: AtomicU64,
    external_alerts_invalid: AtomicU64,
    bus_errors: AtomicU64,
    ack_errors: AtomicU64,
    processing_latency_sum_us: AtomicU64,
    processing_latency_count: AtomicU64,
}

impl BridgeMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_metrics_received(&self) {
        self.metrics_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_metrics_invalid(&self) {
        self.metrics_invalid.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_alerts_fired(&self, count: u64) {
        self.alerts_fired.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_alerts_persisted(&self) {
        self.alerts_persisted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_alerts_persist_failed(&self) {
        self.alerts_persist_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_external_alerts_forwarded(&self) {
        self.external_alerts_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_external_alerts_invalid(&self) {
        self.external_alerts_invalid.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_bus_errors(&self) {
        self.bus_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ack_errors(&self) {
        self.ack_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processing_latency(&self, start: Instant) {
        let us = start.elapsed().as_micros() as u64;
        self.processing_latency_sum_us
            .fetch_add(us, Ordering::Relaxed);
        self.processing_latency_count
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn metrics_received_val(&self) -> u64 {
        self.metrics_received.load(Ordering::Relaxed)
    }

    pub fn metrics_invalid_val(&self) -> u64 {
        self.metrics_invalid.load(Ordering::Relaxed)
    }

    pub fn alerts_fired_val(&self) -> u64 {
        self.alerts_fired.load(Ordering::Relaxed)
    }

    pub fn alerts_persisted_val(&self) -> u64 {
        self.alerts_persisted.load(Ordering::Relaxed)
    }

    pub fn alerts_persist_failed_val(&self) -> u64 {
        self.alerts_persist_failed.load(Ordering::Relaxed)
    }

    pub fn external_alerts_forwarded_val(&self) -> u64 {
        self.external_alerts_forwarded.load(Ordering::Relaxed)
    }

    pub fn external_alerts_invalid_val(&self) -> u64 {
        self.external_alerts_invalid.load(Ordering::Relaxed)
    }

    pub fn bus_errors_val(&self) -> u64 {
        self.bus_errors.load(Ordering::Relaxed)
    }

    pub fn ack_errors_val(&self) -> u64 {
        self.ack_errors.load(Ordering::Relaxed)
    }

    pub fn processing_latency_vals(&self) -> (u64, u64) {
        (
            self.processing_latency_sum_us.load(Ordering::Relaxed),
            self.processing_latency_count.load(Ordering::Relaxed),
        )
    }
}
