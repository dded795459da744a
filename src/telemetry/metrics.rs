//! Metric instrument factories.
//!
//! Instruments come from the `"coalesce-rs"` meter on the globally
//! registered `MeterProvider`; without one they are no-ops.

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("coalesce-rs")
}

/// Counter: submissions seen by the engine.
/// Labels: `result` ("accepted" | "rejected").
pub fn submissions() -> Counter<u64> {
    meter()
        .u64_counter("coalesce.submissions")
        .with_description("Number of submissions seen by the debounce engine")
        .build()
}

/// Counter: completed flush cycles.
/// Labels: `outcome` ("delivered" | "failed" | "cancelled").
pub fn flushes() -> Counter<u64> {
    meter()
        .u64_counter("coalesce.flushes")
        .with_description("Number of flush cycles by outcome")
        .build()
}

/// Counter: follow-up timers armed because items arrived mid-flush.
pub fn rearms() -> Counter<u64> {
    meter()
        .u64_counter("coalesce.rearms")
        .with_description("Timers re-armed after a flush found new items")
        .build()
}

/// Histogram: number of items coalesced into one delivery.
pub fn burst_items() -> Histogram<u64> {
    meter()
        .u64_histogram("coalesce.burst.items")
        .with_description("Items coalesced per flush")
        .build()
}

/// Histogram: consumer call duration in milliseconds.
pub fn delivery_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("coalesce.delivery.duration_ms")
        .with_description("Consumer delivery duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Instruments held by an engine so they are built once.
#[derive(Clone)]
pub struct EngineMetrics {
    submissions: Counter<u64>,
    flushes: Counter<u64>,
    rearms: Counter<u64>,
    burst_items: Histogram<u64>,
    delivery_duration_ms: Histogram<f64>,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            submissions: submissions(),
            flushes: flushes(),
            rearms: rearms(),
            burst_items: burst_items(),
            delivery_duration_ms: delivery_duration_ms(),
        }
    }

    pub fn record_submission(&self, accepted: bool) {
        let result = if accepted { "accepted" } else { "rejected" };
        self.submissions.add(1, &[KeyValue::new("result", result)]);
    }

    pub fn record_flush(&self, outcome: &'static str, items: usize) {
        self.flushes.add(1, &[KeyValue::new("outcome", outcome)]);
        self.burst_items.record(items as u64, &[]);
    }

    pub fn record_delivery_duration(&self, ms: f64) {
        self.delivery_duration_ms.record(ms, &[]);
    }

    pub fn record_rearm(&self) {
        self.rearms.add(1, &[]);
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
