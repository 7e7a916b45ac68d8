//! Shared harness for the workspace specs.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tether_cloud::{FakeCloudClient, NextStepResponse, NextStepStatus};
use tether_core::{FakeClock, RunId, StepDescriptor, SystemContext};
use tether_engine::{EngineConfig, FakeNotifyAdapter, Manager, RunStatusView};
use tether_store::StateStore;
use tether_tools::{Dispatcher, NoOpUserInput, Sandbox};

pub struct Harness {
    pub manager: Manager<FakeCloudClient, FakeClock>,
    pub store: Arc<StateStore>,
    pub cloud: Arc<FakeCloudClient>,
    pub dispatcher: Arc<Dispatcher>,
    pub home: PathBuf,
    pub _dir: tempfile::TempDir,
}

pub fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    harness_in(dir)
}

/// Build a harness over an existing directory, so a "restarted" engine
/// can reopen the same database.
pub fn harness_in(dir: tempfile::TempDir) -> Harness {
    let home = dir.path().join("home");
    std::fs::create_dir_all(&home).unwrap();

    let store = Arc::new(StateStore::open(&dir.path().join("state.db")).unwrap());
    let cloud = Arc::new(FakeCloudClient::new());
    let dispatcher = Arc::new(Dispatcher::new(
        Sandbox::with_home(&home),
        Arc::new(NoOpUserInput),
    ));

    let manager = Manager::new(
        Arc::clone(&store),
        Arc::clone(&cloud),
        Arc::clone(&dispatcher),
        FakeClock::new(),
        EngineConfig {
            max_retries: 2,
            attempt_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(20),
            backoff_base: Duration::from_millis(10),
            sync_interval: Duration::from_millis(50),
        },
        SystemContext::for_home(&home),
        Arc::new(FakeNotifyAdapter::default()),
    );

    Harness {
        manager,
        store,
        cloud,
        dispatcher,
        home,
        _dir: dir,
    }
}

pub fn ready(index: i64, descriptor: StepDescriptor) -> NextStepResponse {
    let mut response = NextStepResponse::with_status(NextStepStatus::Ready);
    response.step_index = Some(index);
    response.step = Some(descriptor);
    response
}

pub fn complete(text: &str) -> NextStepResponse {
    let mut response = NextStepResponse::with_status(NextStepStatus::Complete);
    response.final_response = Some(text.to_string());
    response
}

pub async fn wait_for_terminal(harness: &Harness, run: &str) -> RunStatusView {
    for _ in 0..250 {
        if let Some(view) = harness
            .manager
            .get_run_status(&RunId::new(run))
            .unwrap()
        {
            if view.run.status.is_terminal() && !view.executing {
                return view;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("run {run} did not reach a terminal state");
}
