// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn config_paths_live_under_state_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("TETHER_STATE_DIR", dir.path());
    std::env::remove_var("TETHER_CLOUD_URL");
    std::env::remove_var("TETHER_CLOUD_TOKEN");

    let config = Config::load().unwrap();
    assert_eq!(config.state_dir, dir.path());
    assert_eq!(config.socket_path, dir.path().join("daemon.sock"));
    assert_eq!(config.db_path, dir.path().join("state.db"));
    assert_eq!(config.log_path, dir.path().join("daemon.log"));

    std::env::remove_var("TETHER_STATE_DIR");
}

#[test]
#[serial]
fn cloud_settings_come_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("TETHER_STATE_DIR", dir.path());
    std::env::remove_var("TETHER_CLOUD_URL");
    std::env::remove_var("TETHER_CLOUD_TOKEN");
    std::fs::write(
        dir.path().join("config.toml"),
        "[cloud]\nbase_url = \"https://cloud.example\"\ntoken = \"t0k\"\n",
    )
    .unwrap();

    let config = Config::load().unwrap();
    assert_eq!(config.cloud.base_url, "https://cloud.example");
    assert_eq!(config.cloud.token, "t0k");

    std::env::remove_var("TETHER_STATE_DIR");
}

#[test]
#[serial]
fn env_overrides_beat_config_file() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("TETHER_STATE_DIR", dir.path());
    std::fs::write(
        dir.path().join("config.toml"),
        "[cloud]\nbase_url = \"https://file.example\"\n",
    )
    .unwrap();
    std::env::set_var("TETHER_CLOUD_URL", "https://env.example");

    let config = Config::load().unwrap();
    assert_eq!(config.cloud.base_url, "https://env.example");

    std::env::remove_var("TETHER_CLOUD_URL");
    std::env::remove_var("TETHER_STATE_DIR");
}

#[test]
#[serial]
fn malformed_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("TETHER_STATE_DIR", dir.path());
    std::fs::write(dir.path().join("config.toml"), "cloud = \"not a table\"").unwrap();

    let err = Config::load().unwrap_err();
    assert!(matches!(err, LifecycleError::BadConfig { .. }));

    std::env::remove_var("TETHER_STATE_DIR");
}

#[tokio::test]
#[serial]
async fn second_startup_fails_on_lock() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("TETHER_STATE_DIR", dir.path());
    std::env::remove_var("TETHER_CLOUD_URL");
    std::env::remove_var("TETHER_CLOUD_TOKEN");

    let config = Config::load().unwrap();
    let first = startup(&config).await.unwrap();

    let err = startup(&config).await.unwrap_err();
    assert!(matches!(err, LifecycleError::LockFailed(_)));

    shutdown(&config, &first.manager).await;
    std::env::remove_var("TETHER_STATE_DIR");
}
