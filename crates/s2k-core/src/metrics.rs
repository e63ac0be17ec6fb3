//! Ingestion pipeline counters.
//!
//! Plain atomics: delivery outcome callbacks arrive on arbitrary tasks in
//! arbitrary order, so every counter must be safe to bump concurrently.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the ingestion pipeline.
pub struct IngestionMetrics {
    /// Events received from the stream provider
    events_total: AtomicU64,

    /// Records handed to the producer send buffer
    publishes_total: AtomicU64,

    /// Deliveries acknowledged by the cluster
    deliveries_total: AtomicU64,

    /// Deliveries that failed after submission
    delivery_failures_total: AtomicU64,

    /// Records dropped before submission (serialization, enqueue)
    publish_errors_total: AtomicU64,
}

impl IngestionMetrics {
    /// Create zeroed metrics.
    pub fn new() -> Self {
        Self {
            events_total: AtomicU64::new(0),
            publishes_total: AtomicU64::new(0),
            deliveries_total: AtomicU64::new(0),
            delivery_failures_total: AtomicU64::new(0),
            publish_errors_total: AtomicU64::new(0),
        }
    }

    /// Record one received event.
    pub fn record_event(&self) {
        self.events_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one successful hand-off to the send buffer.
    pub fn record_publish(&self) {
        self.publishes_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one acknowledged delivery.
    pub fn record_delivery(&self) {
        self.deliveries_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one failed delivery.
    pub fn record_delivery_failure(&self) {
        self.delivery_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one record dropped before submission.
    pub fn record_publish_error(&self) {
        self.publish_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Total events received.
    pub fn events_total(&self) -> u64 {
        self.events_total.load(Ordering::Relaxed)
    }

    /// Total records submitted.
    pub fn publishes_total(&self) -> u64 {
        self.publishes_total.load(Ordering::Relaxed)
    }

    /// Total acknowledged deliveries.
    pub fn deliveries_total(&self) -> u64 {
        self.deliveries_total.load(Ordering::Relaxed)
    }

    /// Total failed deliveries.
    pub fn delivery_failures_total(&self) -> u64 {
        self.delivery_failures_total.load(Ordering::Relaxed)
    }

    /// Total records dropped before submission.
    pub fn publish_errors_total(&self) -> u64 {
        self.publish_errors_total.load(Ordering::Relaxed)
    }
}

impl Default for IngestionMetrics {
    fn default() -> Self {
        Self::new()
    }
}
