//! Long-lived process registry lifecycle.

use crate::prelude::*;
use serde_json::json;
use std::time::{Duration, Instant};

fn args(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn start_serves_until_stopped() {
    let h = harness();

    let started = h
        .dispatcher
        .dispatch(
            "system.start_process",
            &args(json!({
                "command": "echo Serving HTTP; sleep 60",
                "wait_for_ready": "Serving HTTP",
            })),
        )
        .await;
    assert!(started.success, "{:?}", started.error);

    let evidence = started.evidence.as_ref().unwrap();
    let process_id = evidence["process_id"].as_str().unwrap().to_string();
    assert!(evidence["uptime_ms"].as_u64().is_some());

    let monitored = h
        .dispatcher
        .dispatch(
            "system.monitor_process",
            &args(json!({ "process_id": process_id })),
        )
        .await;
    assert!(monitored.success);
    assert_eq!(monitored.evidence.as_ref().unwrap()["status"], "running");

    // Graceful stop lands within the 5s grace period.
    let before = Instant::now();
    let stopped = h
        .dispatcher
        .dispatch(
            "system.stop_process",
            &args(json!({ "process_id": process_id, "force": false })),
        )
        .await;
    assert!(stopped.success, "{:?}", stopped.error);
    assert!(before.elapsed() < Duration::from_secs(5));

    // The registry no longer lists the id.
    assert!(h.dispatcher.processes().list().is_empty());
    let gone = h
        .dispatcher
        .dispatch(
            "system.monitor_process",
            &args(json!({ "process_id": process_id })),
        )
        .await;
    assert!(!gone.success);
}
