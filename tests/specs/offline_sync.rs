//! Offline reports queue durably and flush on reconnect.

use crate::prelude::*;
use tether_cloud::CloudCall;
use tether_core::test_support::write_step;
use tether_core::RunId;
use std::time::Duration;

#[tokio::test]
async fn offline_report_queues_and_flushes_on_reconnect() {
    let h = harness();
    h.cloud.push_next_step(ready(0, write_step("~/t.txt", "x")));
    h.cloud.push_next_step(complete("done"));

    // Network drops right after the step executes.
    h.cloud.set_reports_fail(true);
    h.manager.set_online(false);
    let _worker = h.manager.spawn_sync_worker();

    h.manager.start_run(RunId::new("R1")).unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    // The step ran, its report is queued, and step 1 was never fetched.
    assert!(h.home.join("t.txt").exists());
    assert_eq!(h.store.sync_backlog().unwrap(), 1);
    let result = h.store.get_step_result(&RunId::new("R1"), 0).unwrap().unwrap();
    assert!(result.synced_at_ms.is_none());
    let fetches = h
        .cloud
        .calls()
        .iter()
        .filter(|c| matches!(c, CloudCall::NextStep { .. }))
        .count();
    assert_eq!(fetches, 1);

    // Connectivity returns: the worker drains, then the executor
    // proceeds to completion.
    h.cloud.set_reports_fail(false);
    h.manager.set_online(true);

    let view = wait_for_terminal(&h, "R1").await;
    assert_eq!(view.run.status, tether_core::RunStatus::Complete);
    assert_eq!(h.store.sync_backlog().unwrap(), 0);
    let result = h.store.get_step_result(&RunId::new("R1"), 0).unwrap().unwrap();
    assert!(result.synced_at_ms.is_some());
}
