//! Smoke test for OTLP export of engine telemetry.
//!
//! Requires a local collector on :4317 forwarding metrics to Prometheus
//! on :9090. Run with:
//! ```sh
//! cargo test --test telemetry_smoke_test -- --ignored --nocapture
//! ```

use std::sync::Arc;
use std::time::Duration;

use coalesce_rs::config::EngineConfig;
use coalesce_rs::engine::{Consumer, Engine};
use coalesce_rs::telemetry::{TelemetryConfig, init_telemetry};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore]
async fn smoke_engine_metrics_reach_prometheus() {
    let guard = init_telemetry(TelemetryConfig {
        endpoint: Some("http://localhost:4317".to_string()),
        service_name: "coalesce-smoke-test".to_string(),
        ..TelemetryConfig::default()
    })
    .expect("failed to init telemetry");

    let engine = Engine::new(EngineConfig::new(Duration::from_millis(50))).unwrap();
    let consumer: Arc<dyn Consumer> =
        Arc::new(|_payload: String, _key: String| async { Ok::<(), anyhow::Error>(()) });

    for payload in ["one", "two", "three"] {
        engine.submit("smoke", payload, Arc::clone(&consumer));
    }
    engine.drain().await;

    guard.force_flush();
    // Give batch exporters and backends time to ingest.
    tokio::time::sleep(Duration::from_secs(8)).await;

    let resp = reqwest::Client::new()
        .get("http://localhost:9090/api/v1/query")
        .query(&[("query", "coalesce_flushes_total")])
        .send()
        .await
        .expect("failed to query Prometheus");
    assert!(
        resp.status().is_success(),
        "Prometheus query failed: {}",
        resp.status()
    );

    let body: serde_json::Value = resp.json().await.expect("bad Prometheus response");
    let results = body["data"]["result"].as_array();
    assert!(
        results.is_some_and(|r| !r.is_empty()),
        "expected coalesce_flushes_total series, got: {body}"
    );
}
