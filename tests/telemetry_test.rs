//! Integration tests for telemetry initialization and span helpers.

use coalesce_rs::model::FlushId;
use coalesce_rs::telemetry::flush::{record_outcome, record_state_transition, start_flush_span};
use coalesce_rs::telemetry::metrics::EngineMetrics;
use coalesce_rs::telemetry::{TelemetryConfig, init_telemetry};

#[test]
fn telemetry_initializes_without_endpoint() {
    // A global subscriber can only be set once per process; a second
    // attempt returns Err instead of panicking.
    let config = TelemetryConfig {
        service_name: "coalesce-test".to_string(),
        ..TelemetryConfig::default()
    };
    if let Ok(guard) = init_telemetry(config) {
        assert!(!guard.is_exporting());
        guard.force_flush();
    }
}

#[test]
fn flush_span_records_transitions_and_outcome() {
    let span = start_flush_span("5511999@c.us-acme", FlushId::new(), 3);
    record_state_transition(&span, "idle", "flushing");
    record_outcome(&span, "delivered");
    record_state_transition(&span, "flushing", "idle");
}

#[test]
fn engine_metrics_work_without_a_meter_provider() {
    let metrics = EngineMetrics::new();
    metrics.record_submission(true);
    metrics.record_submission(false);
    metrics.record_flush("delivered", 2);
    metrics.record_delivery_duration(12.5);
    metrics.record_rearm();
}
