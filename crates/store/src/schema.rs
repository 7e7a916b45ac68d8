// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema definition and versioned migrations.
//!
//! The current schema version lives in `PRAGMA user_version`; migrations
//! are an ordered list applied inside one transaction per version step.

use rusqlite::Connection;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

const V1: &str = r#"
CREATE TABLE IF NOT EXISTS runs (
    run_id                  TEXT PRIMARY KEY,
    status                  TEXT NOT NULL DEFAULT 'pending',
    current_step_index      INTEGER NOT NULL DEFAULT 0,
    total_steps             INTEGER NOT NULL DEFAULT 0,
    final_response          TEXT,
    current_status_summary  TEXT,
    initial_message         TEXT,
    created_at              INTEGER NOT NULL,
    completed_at            INTEGER
);
CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status);

CREATE TABLE IF NOT EXISTS steps (
    step_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id        TEXT NOT NULL REFERENCES runs(run_id) ON DELETE CASCADE,
    step_index    INTEGER NOT NULL,
    step_json     TEXT NOT NULL,
    status        TEXT NOT NULL DEFAULT 'pending',
    started_at    INTEGER,
    completed_at  INTEGER
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_steps_run_index ON steps(run_id, step_index);

CREATE TABLE IF NOT EXISTS step_results (
    result_id          INTEGER PRIMARY KEY AUTOINCREMENT,
    step_id            INTEGER NOT NULL UNIQUE REFERENCES steps(step_id) ON DELETE CASCADE,
    run_id             TEXT NOT NULL REFERENCES runs(run_id) ON DELETE CASCADE,
    step_index         INTEGER NOT NULL,
    success            INTEGER NOT NULL,
    stdout             TEXT NOT NULL DEFAULT '',
    stderr             TEXT NOT NULL DEFAULT '',
    exit_code          INTEGER,
    attempts           INTEGER NOT NULL DEFAULT 1,
    execution_time_ms  INTEGER NOT NULL DEFAULT 0,
    error_json         TEXT,
    evidence_json      TEXT,
    synced_at          INTEGER
);
CREATE INDEX IF NOT EXISTS idx_results_run_synced ON step_results(run_id, synced_at);

CREATE TABLE IF NOT EXISTS sync_queue (
    queue_id         INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id           TEXT NOT NULL,
    action           TEXT NOT NULL,
    payload          TEXT NOT NULL,
    priority         INTEGER NOT NULL DEFAULT 5,
    attempts         INTEGER NOT NULL DEFAULT 0,
    next_attempt_at  INTEGER NOT NULL DEFAULT 0,
    last_error       TEXT,
    completed        INTEGER NOT NULL DEFAULT 0,
    created_at       INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_sync_ready ON sync_queue(priority, next_attempt_at);
"#;

/// Apply any pending migrations to bring the database to [`SCHEMA_VERSION`].
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<()> {
    let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version >= SCHEMA_VERSION {
        return Ok(());
    }

    let mut current = version;
    while current < SCHEMA_VERSION {
        let tx = conn.transaction()?;
        match current {
            0 => tx.execute_batch(V1)?,
            _ => break,
        }
        current += 1;
        tx.pragma_update(None, "user_version", current)?;
        tx.commit()?;
        tracing::info!(version = current, "schema migrated");
    }

    Ok(())
}
