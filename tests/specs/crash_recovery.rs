//! A killed process resumes without re-executing completed steps.

use crate::prelude::*;
use tether_cloud::CloudCall;
use tether_core::test_support::write_step;
use tether_core::{RunId, RunPatch, RunStatus, StepResult, StepStatus};

/// Persist the state a crash would leave behind: step 0 executed and
/// reported, run still active, nothing known about step 1.
fn seed_crashed_run(h: &Harness, run: &str) {
    let run_id = RunId::new(run);
    h.store.create_run(&run_id, 0, 1_000).unwrap();
    h.store
        .update_run(&run_id, &RunPatch::status(RunStatus::Running), 1_000)
        .unwrap();

    let step = h
        .store
        .save_step(&run_id, 0, &write_step("~/step0.txt", "0"), 1_000)
        .unwrap();
    h.store
        .update_step_status(step.step_id, StepStatus::Running, 1_000)
        .unwrap();
    h.store
        .update_step_status(step.step_id, StepStatus::Done, 1_000)
        .unwrap();

    let result = StepResult {
        result_id: 0,
        step_id: step.step_id,
        run_id: run_id.clone(),
        step_index: 0,
        success: true,
        stdout: String::new(),
        stderr: String::new(),
        exit_code: Some(0),
        attempts: 1,
        execution_time_ms: 7,
        error: None,
        evidence: None,
        synced_at_ms: None,
    };
    let result_id = h.store.save_step_result(&result).unwrap();
    h.store.mark_result_synced(result_id, 1_001).unwrap();
    h.store
        .update_run(
            &run_id,
            &RunPatch {
                current_step_index: Some(1),
                ..RunPatch::default()
            },
            1_001,
        )
        .unwrap();
}

#[tokio::test]
async fn resume_continues_from_last_completed_step() {
    let dir = tempfile::tempdir().unwrap();
    {
        let h = harness_in(dir);
        seed_crashed_run(&h, "R1");

        // "Restart": reopen the same database with a fresh engine.
        let h = harness_in(h._dir);
        h.cloud
            .push_next_step(ready(1, write_step("~/step1.txt", "1")));
        h.cloud.push_next_step(complete("done"));

        assert_eq!(h.manager.resume_active_runs().unwrap(), 1);
        let view = wait_for_terminal(&h, "R1").await;
        assert_eq!(view.run.status, RunStatus::Complete);

        // Step 0 was not re-executed: the resumed engine's first fetch
        // already carried last_completed = 0, and no step-0 report went out.
        let calls = h.cloud.calls();
        assert!(matches!(
            calls[0],
            CloudCall::NextStep {
                last_completed: 0,
                ..
            }
        ));
        assert!(!calls
            .iter()
            .any(|c| matches!(c, CloudCall::ReportResult { step_index: 0, .. })));
        assert!(h.home.join("step1.txt").exists());
        assert!(!h.home.join("step0.txt").exists());
    }
}

#[tokio::test]
async fn steps_orphaned_in_running_are_demoted_on_startup() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness_in(dir);

    let run_id = RunId::new("R2");
    h.store.create_run(&run_id, 0, 1_000).unwrap();
    let step = h
        .store
        .save_step(&run_id, 0, &write_step("~/interrupted.txt", "x"), 1_000)
        .unwrap();
    h.store
        .update_step_status(step.step_id, StepStatus::Running, 1_000)
        .unwrap();

    // Restart over the same database.
    let h = harness_in(h._dir);
    h.cloud.push_next_step(complete("wrapped up"));
    h.manager.resume_active_runs().unwrap();

    let view = wait_for_terminal(&h, "R2").await;
    assert_eq!(view.run.status, RunStatus::Complete);
    // The orphaned step ran after demotion rather than wedging the run.
    assert!(h.home.join("interrupted.txt").exists());
}
