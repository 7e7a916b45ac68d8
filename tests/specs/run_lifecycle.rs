//! A single-step plan runs to completion with durable bookkeeping.

use crate::prelude::*;
use tether_core::test_support::{shell_step, write_step};
use tether_core::{RunId, RunStatus};

#[tokio::test]
async fn single_step_write_completes() {
    let h = harness();
    h.cloud
        .push_next_step(ready(0, write_step("~/t.txt", "hi")));
    h.cloud.push_next_step(complete("done"));

    h.manager.start_run(RunId::new("R1")).unwrap();
    let view = wait_for_terminal(&h, "R1").await;

    assert_eq!(view.run.status, RunStatus::Complete);
    assert_eq!(view.run.final_response.as_deref(), Some("done"));
    assert_eq!(view.run.current_step_index, 1);
    assert_eq!(std::fs::read_to_string(h.home.join("t.txt")).unwrap(), "hi");
}

#[tokio::test]
async fn multi_step_plan_threads_output_through_placeholders() {
    let h = harness();
    h.cloud.push_next_step(ready(0, shell_step("echo world")));
    h.cloud.push_next_step(ready(
        1,
        write_step("~/greeting.txt", "hello <NAME_PLACEHOLDER>"),
    ));
    h.cloud.push_next_step(complete("greeted"));

    h.manager.start_run(RunId::new("R2")).unwrap();
    let view = wait_for_terminal(&h, "R2").await;

    assert_eq!(view.run.status, RunStatus::Complete);
    assert_eq!(view.run.current_step_index, 2);
    assert_eq!(
        std::fs::read_to_string(h.home.join("greeting.txt")).unwrap(),
        "hello world"
    );
}

#[tokio::test]
async fn step_indexes_stay_contiguous_and_audited() {
    let h = harness();
    for i in 0..3 {
        h.cloud.push_next_step(ready(
            i,
            write_step(&format!("~/f{i}.txt"), &format!("{i}")),
        ));
    }
    h.cloud.push_next_step(complete("done"));

    h.manager.start_run(RunId::new("R3")).unwrap();
    wait_for_terminal(&h, "R3").await;

    // Steps 0..=2 are all persisted with results, in order.
    for i in 0..3 {
        let step = h.store.get_step(&RunId::new("R3"), i).unwrap().unwrap();
        assert_eq!(step.step_index, i);
        let result = h
            .store
            .get_step_result(&RunId::new("R3"), i)
            .unwrap()
            .unwrap();
        assert!(result.success);
        assert!(result.synced_at_ms.is_some());
    }
    assert!(h.store.get_step(&RunId::new("R3"), 3).unwrap().is_none());
}
