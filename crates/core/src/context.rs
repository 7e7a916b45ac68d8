// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host context sent with generate-args requests.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A snapshot of the host environment the cloud needs to generate
/// concrete tool arguments. Gathered once per engine start and cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemContext {
    pub os: String,
    pub user: String,
    pub home_dir: PathBuf,
    pub desktop_path: PathBuf,
    pub shell: String,
}

impl SystemContext {
    /// Gather the context from the running host.
    pub fn gather() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
        let desktop_path = dirs::desktop_dir().unwrap_or_else(|| home_dir.join("Desktop"));
        Self {
            os: std::env::consts::OS.to_string(),
            user: std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .unwrap_or_else(|_| "unknown".to_string()),
            home_dir,
            desktop_path,
            shell: std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string()),
        }
    }

    /// Fixed context for tests.
    #[cfg(any(test, feature = "test-support"))]
    pub fn for_home(home: impl Into<PathBuf>) -> Self {
        let home_dir = home.into();
        Self {
            os: "linux".to_string(),
            user: "tester".to_string(),
            desktop_path: home_dir.join("Desktop"),
            home_dir,
            shell: "/bin/sh".to_string(),
        }
    }
}
