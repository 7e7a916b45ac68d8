// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::notify::FakeNotifyAdapter;
use std::path::PathBuf;
use std::time::Duration;
use tether_cloud::{FakeCloudClient, NextStepResponse, NextStepStatus};
use tether_core::test_support::{shell_step, write_step};
use tether_core::{FakeClock, StepDescriptor, StepStatus};
use tether_tools::{NoOpUserInput, Sandbox};

struct Harness {
    manager: Manager<FakeCloudClient, FakeClock>,
    store: Arc<StateStore>,
    cloud: Arc<FakeCloudClient>,
    notifier: FakeNotifyAdapter,
    home: PathBuf,
    _dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("home");
    std::fs::create_dir_all(&home).unwrap();

    let store = Arc::new(StateStore::open(&dir.path().join("state.db")).unwrap());
    let cloud = Arc::new(FakeCloudClient::new());
    let dispatcher = Arc::new(Dispatcher::new(
        Sandbox::with_home(&home),
        Arc::new(NoOpUserInput),
    ));
    let notifier = FakeNotifyAdapter::default();

    let config = EngineConfig {
        max_retries: 2,
        attempt_timeout: Duration::from_secs(10),
        poll_interval: Duration::from_millis(20),
        backoff_base: Duration::from_millis(10),
        sync_interval: Duration::from_millis(50),
    };

    let manager = Manager::new(
        Arc::clone(&store),
        Arc::clone(&cloud),
        dispatcher,
        FakeClock::new(),
        config,
        SystemContext::for_home(&home),
        Arc::new(notifier.clone()),
    );

    Harness {
        manager,
        store,
        cloud,
        notifier,
        home,
        _dir: dir,
    }
}

fn ready(index: i64, descriptor: StepDescriptor) -> NextStepResponse {
    let mut response = NextStepResponse::with_status(NextStepStatus::Ready);
    response.step_index = Some(index);
    response.step = Some(descriptor);
    response
}

fn complete(text: &str) -> NextStepResponse {
    let mut response = NextStepResponse::with_status(NextStepStatus::Complete);
    response.final_response = Some(text.to_string());
    response
}

async fn wait_for_terminal(h: &Harness, run: &str) -> RunStatusView {
    for _ in 0..200 {
        if let Some(view) = h.manager.get_run_status(&RunId::new(run)).unwrap() {
            if view.run.status.is_terminal() && !view.executing {
                return view;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("run {run} did not reach a terminal state");
}

#[tokio::test]
async fn start_run_drives_to_completion_and_notifies() {
    let h = harness();
    h.cloud.push_next_step(ready(0, write_step("~/t.txt", "hi")));
    h.cloud.push_next_step(complete("all done"));

    h.manager.start_run(RunId::new("R1")).unwrap();
    let view = wait_for_terminal(&h, "R1").await;

    assert_eq!(view.run.status, RunStatus::Complete);
    assert_eq!(view.run.final_response.as_deref(), Some("all done"));
    assert!(h.home.join("t.txt").exists());

    let calls = h.notifier.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].title.contains("complete"));
    assert_eq!(calls[0].message, "all done");
}

#[tokio::test]
async fn start_run_is_idempotent_while_executing() {
    let h = harness();
    h.cloud.push_next_step(ready(0, shell_step("sleep 5")));

    h.manager.start_run(RunId::new("R1")).unwrap();
    h.manager.start_run(RunId::new("R1")).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(h.manager.get_stats().unwrap().executing_runs, 1);
    h.manager.stop_all_runs();
    wait_for_terminal(&h, "R1").await;
}

#[tokio::test]
async fn stop_run_stops_one_run() {
    let h = harness();
    h.cloud.push_next_step(ready(0, shell_step("sleep 30")));

    h.manager.start_run(RunId::new("R1")).unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(h.manager.stop_run(&RunId::new("R1")));
    let view = wait_for_terminal(&h, "R1").await;
    assert_eq!(view.run.status, RunStatus::Stopped);

    // Unknown run: nothing to stop.
    assert!(!h.manager.stop_run(&RunId::new("ghost")));
}

#[tokio::test]
async fn stop_all_runs_returns_promptly() {
    let h = harness();
    h.cloud.push_next_step(ready(0, shell_step("sleep 30")));
    h.cloud.push_next_step(ready(0, shell_step("sleep 30")));

    h.manager.start_run(RunId::new("A")).unwrap();
    h.manager.start_run(RunId::new("B")).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = std::time::Instant::now();
    let stopped = h.manager.stop_all_runs();
    assert!(started.elapsed() < Duration::from_millis(100));
    assert_eq!(stopped, 2);

    let a = wait_for_terminal(&h, "A").await;
    let b = wait_for_terminal(&h, "B").await;
    assert_eq!(a.run.status, RunStatus::Stopped);
    assert_eq!(b.run.status, RunStatus::Stopped);

    // No further step fetches after the stop.
    let fetches = h.cloud.calls().len();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.cloud.calls().len(), fetches);
}

#[tokio::test]
async fn resume_demotes_orphaned_steps_and_restarts() {
    let h = harness();

    // Simulate a crash: run active, step left running.
    let run_id = RunId::new("R1");
    h.store.create_run(&run_id, 0, 1).unwrap();
    h.store
        .update_run(&run_id, &tether_core::RunPatch::status(RunStatus::Running), 1)
        .unwrap();
    let step = h
        .store
        .save_step(&run_id, 0, &write_step("~/resumed.txt", "back"), 1)
        .unwrap();
    h.store
        .update_step_status(step.step_id, StepStatus::Running, 1)
        .unwrap();

    h.cloud.push_next_step(complete("finished after resume"));

    let resumed = h.manager.resume_active_runs().unwrap();
    assert_eq!(resumed, 1);

    let view = wait_for_terminal(&h, "R1").await;
    assert_eq!(view.run.status, RunStatus::Complete);
    // The demoted step executed (not skipped, not stuck in running).
    assert!(h.home.join("resumed.txt").exists());
}

#[tokio::test]
async fn online_flag_propagates_to_subscribers() {
    let h = harness();
    let rx = h.manager.subscribe_online();

    assert!(h.manager.is_online());
    h.manager.set_online(false);
    assert!(!*rx.borrow());
    h.manager.set_online(true);
    assert!(*rx.borrow());
}

#[tokio::test]
async fn stats_merge_store_and_live_state() {
    let h = harness();
    h.cloud.push_next_step(ready(0, shell_step("sleep 5")));
    h.manager.start_run(RunId::new("R1")).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stats = h.manager.get_stats().unwrap();
    assert_eq!(stats.executing_runs, 1);
    assert!(stats.online);
    assert_eq!(stats.store.runs_by_status["running"], 1);

    h.manager.stop_all_runs();
    wait_for_terminal(&h, "R1").await;
}

#[tokio::test]
async fn get_run_status_reports_uptime_for_live_runs() {
    let h = harness();
    h.cloud.push_next_step(ready(0, shell_step("sleep 5")));
    h.manager.start_run(RunId::new("R1")).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let view = h.manager.get_run_status(&RunId::new("R1")).unwrap().unwrap();
    assert!(view.executing);
    assert!(view.uptime_ms.is_some());

    assert!(h.manager.get_run_status(&RunId::new("nope")).unwrap().is_none());

    h.manager.stop_all_runs();
    wait_for_terminal(&h, "R1").await;
}
