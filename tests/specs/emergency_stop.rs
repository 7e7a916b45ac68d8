//! Emergency stop is prompt and total.

use crate::prelude::*;
use serde_json::json;
use std::time::{Duration, Instant};
use tether_core::test_support::shell_step;
use tether_core::{RunId, RunStatus};

#[tokio::test]
async fn stop_all_halts_runs_and_processes() {
    let h = harness();
    h.cloud.push_next_step(ready(0, shell_step("sleep 30")));
    h.cloud.push_next_step(ready(0, shell_step("sleep 30")));

    h.manager.start_run(RunId::new("A")).unwrap();
    h.manager.start_run(RunId::new("B")).unwrap();

    // A registered long-lived process that must be signalled too.
    let mut args = serde_json::Map::new();
    args.insert("command".into(), json!("sleep 60"));
    let started = h.dispatcher.dispatch("system.start_process", &args).await;
    assert!(started.success);

    tokio::time::sleep(Duration::from_millis(300)).await;

    let before = Instant::now();
    let stopped = h.manager.stop_all_runs();
    assert!(before.elapsed() < Duration::from_millis(100));
    assert_eq!(stopped, 2);

    let a = wait_for_terminal(&h, "A").await;
    let b = wait_for_terminal(&h, "B").await;
    assert_eq!(a.run.status, RunStatus::Stopped);
    assert_eq!(b.run.status, RunStatus::Stopped);

    // No new step fetches after the stop.
    let fetches = h.cloud.calls().len();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(h.cloud.calls().len(), fetches);

    // The registry drains as teardown completes.
    for _ in 0..100 {
        if h.dispatcher.processes().list().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(h.dispatcher.processes().list().is_empty());
}
