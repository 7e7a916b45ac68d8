// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The state store: runs, steps, results and the sync queue.

use crate::schema;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tether_core::{
    EngineError, Run, RunId, RunPatch, RunStatus, Step, StepDescriptor, StepResult, StepStatus,
    SyncAction, SyncItem,
};
use thiserror::Error;

/// Initial retry delay for failed sync items.
const SYNC_RETRY_BASE_MS: u64 = 10_000;

/// Cap on the sync retry delay.
const SYNC_RETRY_MAX_MS: u64 = 300_000;

/// Errors from store operations.
///
/// `Sqlite` and `Io` are transient from the caller's perspective; the
/// executor and sync worker retry them. The remaining variants are
/// contract violations by the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("run not found: {0}")]
    RunNotFound(String),
    #[error("step not found: {0}")]
    StepNotFound(i64),
    #[error("run {run_id} is {status}; terminal status cannot be downgraded")]
    TerminalDowngrade { run_id: String, status: RunStatus },
    #[error("step index {got} would leave a gap (next is {expected})")]
    StepIndexGap { expected: i64, got: i64 },
    #[error("invalid step transition {from} -> {to}")]
    InvalidTransition { from: StepStatus, to: StepStatus },
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Aggregate counters for the stats surface.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Stats {
    pub runs_by_status: HashMap<String, u64>,
    pub total_steps: u64,
    pub total_results: u64,
    pub pending_syncs: u64,
    pub avg_attempts: f64,
    pub db_size_bytes: u64,
}

/// Single source of truth for engine persistence.
///
/// All mutations run inside a transaction and are committed before the
/// method returns; concurrent callers are serialized by the connection
/// mutex. The database survives process kill at any point.
pub struct StateStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl StateStore {
    /// Open (or create) the database at `path` and migrate it.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(path)?;

        // WAL keeps readers unblocked during commits; NORMAL is durable
        // enough with WAL since the log is synced at checkpoint.
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        schema::migrate(&mut conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_owned(),
        })
    }

    // ── Runs ─────────────────────────────────────────────────────────────

    /// Insert a run in `pending`. Idempotent: a second call with the same
    /// id returns the existing row untouched.
    pub fn create_run(
        &self,
        run_id: &RunId,
        total_steps: i64,
        now_ms: u64,
    ) -> Result<Run, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        if let Some(existing) = query_run(&tx, run_id)? {
            tx.commit()?;
            return Ok(existing);
        }

        tx.execute(
            "INSERT INTO runs (run_id, status, total_steps, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                run_id.as_str(),
                RunStatus::Pending.to_string(),
                total_steps,
                now_ms as i64
            ],
        )?;

        let run = query_run(&tx, run_id)?
            .ok_or_else(|| StoreError::RunNotFound(run_id.to_string()))?;
        tx.commit()?;
        Ok(run)
    }

    /// Fetch a run by id.
    pub fn get_run(&self, run_id: &RunId) -> Result<Option<Run>, StoreError> {
        let conn = self.conn.lock();
        query_run(&conn, run_id)
    }

    /// Runs with status in {pending, running, paused}.
    pub fn list_active_runs(&self) -> Result<Vec<Run>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT run_id, status, current_step_index, total_steps, final_response,
                    current_status_summary, initial_message, created_at, completed_at
             FROM runs WHERE status IN ('pending', 'running', 'paused')
             ORDER BY created_at",
        )?;
        let rows = stmt.query_map([], row_to_run)?;
        let mut runs = Vec::new();
        for row in rows {
            runs.push(row??);
        }
        Ok(runs)
    }

    /// Apply a partial update to a run.
    ///
    /// Refuses to move a terminal run back to a non-terminal status.
    /// Sets `completed_at` the first time the run reaches a status that
    /// records completion.
    pub fn update_run(
        &self,
        run_id: &RunId,
        patch: &RunPatch,
        now_ms: u64,
    ) -> Result<Run, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let current = query_run(&tx, run_id)?
            .ok_or_else(|| StoreError::RunNotFound(run_id.to_string()))?;

        if let Some(next) = patch.status {
            if current.status.is_terminal() && !next.is_terminal() {
                return Err(StoreError::TerminalDowngrade {
                    run_id: run_id.to_string(),
                    status: current.status,
                });
            }
        }

        if let Some(status) = patch.status {
            tx.execute(
                "UPDATE runs SET status = ?2 WHERE run_id = ?1",
                params![run_id.as_str(), status.to_string()],
            )?;
            if status.records_completion() && current.completed_at_ms.is_none() {
                tx.execute(
                    "UPDATE runs SET completed_at = ?2 WHERE run_id = ?1 AND completed_at IS NULL",
                    params![run_id.as_str(), now_ms as i64],
                )?;
            }
        }
        if let Some(index) = patch.current_step_index {
            tx.execute(
                "UPDATE runs SET current_step_index = ?2 WHERE run_id = ?1",
                params![run_id.as_str(), index],
            )?;
        }
        if let Some(total) = patch.total_steps {
            tx.execute(
                "UPDATE runs SET total_steps = ?2 WHERE run_id = ?1",
                params![run_id.as_str(), total],
            )?;
        }
        if let Some(ref text) = patch.final_response {
            tx.execute(
                "UPDATE runs SET final_response = ?2 WHERE run_id = ?1",
                params![run_id.as_str(), text],
            )?;
        }
        if let Some(ref text) = patch.current_status_summary {
            tx.execute(
                "UPDATE runs SET current_status_summary = ?2 WHERE run_id = ?1",
                params![run_id.as_str(), text],
            )?;
        }
        if let Some(ref text) = patch.initial_message {
            tx.execute(
                "UPDATE runs SET initial_message = ?2 WHERE run_id = ?1",
                params![run_id.as_str(), text],
            )?;
        }

        let run = query_run(&tx, run_id)?
            .ok_or_else(|| StoreError::RunNotFound(run_id.to_string()))?;
        tx.commit()?;
        Ok(run)
    }

    // ── Steps ────────────────────────────────────────────────────────────

    /// Persist a step in `pending` at `step_index`.
    ///
    /// The index must be the run's next unused index; anything further
    /// ahead would leave a gap and is rejected. Saving an index that
    /// already exists returns the stored row (idempotent re-pull).
    pub fn save_step(
        &self,
        run_id: &RunId,
        step_index: i64,
        descriptor: &StepDescriptor,
        _now_ms: u64,
    ) -> Result<Step, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let next: i64 = tx.query_row(
            "SELECT COALESCE(MAX(step_index) + 1, 0) FROM steps WHERE run_id = ?1",
            params![run_id.as_str()],
            |row| row.get(0),
        )?;

        if step_index < next {
            let existing = query_step_by_index(&tx, run_id, step_index)?
                .ok_or(StoreError::StepIndexGap {
                    expected: next,
                    got: step_index,
                })?;
            tx.commit()?;
            return Ok(existing);
        }
        if step_index > next {
            return Err(StoreError::StepIndexGap {
                expected: next,
                got: step_index,
            });
        }

        tx.execute(
            "INSERT INTO steps (run_id, step_index, step_json, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                run_id.as_str(),
                step_index,
                serde_json::to_string(descriptor)?,
                StepStatus::Pending.to_string()
            ],
        )?;
        let step_id = tx.last_insert_rowid();

        let step = query_step(&tx, step_id)?.ok_or(StoreError::StepNotFound(step_id))?;
        tx.commit()?;
        Ok(step)
    }

    /// The lowest-indexed `pending` step of a run, if any.
    pub fn get_next_pending_step(&self, run_id: &RunId) -> Result<Option<Step>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT step_id, run_id, step_index, step_json, status, started_at, completed_at
             FROM steps WHERE run_id = ?1 AND status = 'pending'
             ORDER BY step_index LIMIT 1",
        )?;
        let step = stmt
            .query_row(params![run_id.as_str()], row_to_step)
            .optional()?;
        step.transpose()
    }

    /// Fetch a step by run and index.
    pub fn get_step(&self, run_id: &RunId, step_index: i64) -> Result<Option<Step>, StoreError> {
        let conn = self.conn.lock();
        query_step_by_index(&conn, run_id, step_index)
    }

    /// Replace a step's descriptor (after arg generation).
    pub fn update_step_descriptor(
        &self,
        step_id: i64,
        descriptor: &StepDescriptor,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE steps SET step_json = ?2 WHERE step_id = ?1",
            params![step_id, serde_json::to_string(descriptor)?],
        )?;
        if changed == 0 {
            return Err(StoreError::StepNotFound(step_id));
        }
        Ok(())
    }

    /// Move a step through its lifecycle, enforcing the allowed
    /// transitions. Stamps `started_at` / `completed_at` as a side effect.
    pub fn update_step_status(
        &self,
        step_id: i64,
        new_status: StepStatus,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let current = query_step(&tx, step_id)?.ok_or(StoreError::StepNotFound(step_id))?;
        if !current.status.can_transition(new_status) {
            return Err(StoreError::InvalidTransition {
                from: current.status,
                to: new_status,
            });
        }

        match new_status {
            StepStatus::Running => {
                tx.execute(
                    "UPDATE steps SET status = ?2, started_at = ?3 WHERE step_id = ?1",
                    params![step_id, new_status.to_string(), now_ms as i64],
                )?;
            }
            StepStatus::Done | StepStatus::Failed => {
                tx.execute(
                    "UPDATE steps SET status = ?2, completed_at = ?3 WHERE step_id = ?1",
                    params![step_id, new_status.to_string(), now_ms as i64],
                )?;
            }
            StepStatus::Pending => {
                // Startup demotion path: forget the stale start time.
                tx.execute(
                    "UPDATE steps SET status = ?2, started_at = NULL WHERE step_id = ?1",
                    params![step_id, new_status.to_string()],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Rearm a failed step with a cloud-regenerated descriptor.
    ///
    /// Adaptive recovery re-executes the same step index with fresh
    /// arguments; the step returns to `pending` and its timing resets.
    /// Only failed steps can be rearmed.
    pub fn reset_step_for_recovery(
        &self,
        step_id: i64,
        descriptor: &StepDescriptor,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let current = query_step(&tx, step_id)?.ok_or(StoreError::StepNotFound(step_id))?;
        if current.status != StepStatus::Failed {
            return Err(StoreError::InvalidTransition {
                from: current.status,
                to: StepStatus::Pending,
            });
        }

        tx.execute(
            "UPDATE steps
             SET step_json = ?2, status = 'pending', started_at = NULL, completed_at = NULL
             WHERE step_id = ?1",
            params![step_id, serde_json::to_string(descriptor)?],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Demote every `running` step back to `pending`.
    ///
    /// Called once at startup, before any executor loop exists: a step
    /// still marked running was orphaned by a crash.
    pub fn demote_running_steps(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE steps SET status = 'pending', started_at = NULL WHERE status = 'running'",
            [],
        )?;
        if changed > 0 {
            tracing::warn!(count = changed, "demoted orphaned running steps to pending");
        }
        Ok(changed as u64)
    }

    // ── Step results ─────────────────────────────────────────────────────

    /// Upsert the result for a step (latest attempt chain wins) and
    /// return its `result_id`. A replaced result starts unsynced again.
    pub fn save_step_result(&self, result: &StepResult) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO step_results
                 (step_id, run_id, step_index, success, stdout, stderr, exit_code,
                  attempts, execution_time_ms, error_json, evidence_json, synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, NULL)
             ON CONFLICT(step_id) DO UPDATE SET
                 success = excluded.success,
                 stdout = excluded.stdout,
                 stderr = excluded.stderr,
                 exit_code = excluded.exit_code,
                 attempts = excluded.attempts,
                 execution_time_ms = excluded.execution_time_ms,
                 error_json = excluded.error_json,
                 evidence_json = excluded.evidence_json,
                 synced_at = NULL",
            params![
                result.step_id,
                result.run_id.as_str(),
                result.step_index,
                result.success,
                result.stdout,
                result.stderr,
                result.exit_code,
                result.attempts,
                result.execution_time_ms as i64,
                result
                    .error
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                result
                    .evidence
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
            ],
        )?;

        let result_id = conn.query_row(
            "SELECT result_id FROM step_results WHERE step_id = ?1",
            params![result.step_id],
            |row| row.get(0),
        )?;
        Ok(result_id)
    }

    /// Fetch the result for a run's step, if one was recorded.
    pub fn get_step_result(
        &self,
        run_id: &RunId,
        step_index: i64,
    ) -> Result<Option<StepResult>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT result_id, step_id, run_id, step_index, success, stdout, stderr,
                    exit_code, attempts, execution_time_ms, error_json, evidence_json, synced_at
             FROM step_results WHERE run_id = ?1 AND step_index = ?2",
        )?;
        let result = stmt
            .query_row(params![run_id.as_str(), step_index], row_to_result)
            .optional()?;
        result.transpose()
    }

    /// Stdout of the most recent successful step before `step_index`
    /// that produced output. Feeds placeholder substitution.
    pub fn last_output_before(
        &self,
        run_id: &RunId,
        step_index: i64,
    ) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock();
        let out: Option<String> = conn
            .query_row(
                "SELECT stdout FROM step_results
                 WHERE run_id = ?1 AND step_index < ?2 AND success = 1 AND stdout != ''
                 ORDER BY step_index DESC LIMIT 1",
                params![run_id.as_str(), step_index],
                |row| row.get(0),
            )
            .optional()?;
        Ok(out)
    }

    /// One-line summaries of the run's completed steps, in order.
    /// Sent to the cloud as context for argument generation.
    pub fn completed_step_summaries(&self, run_id: &RunId) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT s.step_index, s.step_json, r.success
             FROM steps s JOIN step_results r ON r.step_id = s.step_id
             WHERE s.run_id = ?1 AND s.status IN ('done', 'failed')
             ORDER BY s.step_index",
        )?;
        let rows = stmt.query_map(params![run_id.as_str()], |row| {
            let index: i64 = row.get(0)?;
            let json: String = row.get(1)?;
            let success: bool = row.get(2)?;
            Ok((index, json, success))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (index, json, success) = row?;
            let descriptor: StepDescriptor = serde_json::from_str(&json)?;
            let label = descriptor
                .description
                .unwrap_or_else(|| descriptor.tool_name.clone());
            let outcome = if success { "ok" } else { "failed" };
            summaries.push(format!("step {index}: {label} ({outcome})"));
        }
        Ok(summaries)
    }

    /// Stamp `synced_at` on a result. Set-once: later calls are no-ops.
    pub fn mark_result_synced(&self, result_id: i64, now_ms: u64) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE step_results SET synced_at = ?2 WHERE result_id = ?1 AND synced_at IS NULL",
            params![result_id, now_ms as i64],
        )?;
        Ok(())
    }

    // ── Sync queue ───────────────────────────────────────────────────────

    /// Enqueue a deferred cloud call.
    pub fn queue_sync(
        &self,
        run_id: &RunId,
        action: SyncAction,
        payload: &serde_json::Value,
        priority: i64,
        now_ms: u64,
    ) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sync_queue (run_id, action, payload, priority, next_attempt_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                run_id.as_str(),
                action.to_string(),
                serde_json::to_string(payload)?,
                priority,
                now_ms as i64
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Up to `limit` ready items, highest priority first, ties broken by
    /// `next_attempt_at` then insertion order.
    pub fn get_pending_syncs(
        &self,
        limit: usize,
        now_ms: u64,
    ) -> Result<Vec<SyncItem>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT queue_id, run_id, action, payload, priority, attempts, next_attempt_at, last_error
             FROM sync_queue
             WHERE completed = 0 AND next_attempt_at <= ?1
             ORDER BY priority, next_attempt_at, queue_id
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![now_ms as i64, limit as i64], row_to_sync_item)?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row??);
        }
        Ok(items)
    }

    /// Mark a queue item terminal. Terminal items are never re-dispatched.
    pub fn mark_sync_completed(&self, queue_id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE sync_queue SET completed = 1 WHERE queue_id = ?1",
            params![queue_id],
        )?;
        Ok(())
    }

    /// Record a failed dispatch and reschedule with exponential delay
    /// (10s doubling per attempt, capped at 5 minutes).
    pub fn mark_sync_failed(
        &self,
        queue_id: i64,
        error: &str,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let attempts: u32 = tx.query_row(
            "SELECT attempts FROM sync_queue WHERE queue_id = ?1",
            params![queue_id],
            |row| row.get(0),
        )?;
        let delay = SYNC_RETRY_BASE_MS
            .saturating_mul(1u64 << attempts.min(10))
            .min(SYNC_RETRY_MAX_MS);

        tx.execute(
            "UPDATE sync_queue
             SET attempts = attempts + 1, next_attempt_at = ?2, last_error = ?3
             WHERE queue_id = ?1",
            params![queue_id, (now_ms + delay) as i64, error],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Count of unsent sync items.
    pub fn sync_backlog(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sync_queue WHERE completed = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ── Maintenance ──────────────────────────────────────────────────────

    /// Delete terminal runs whose `completed_at` is older than the
    /// cutoff, cascading their steps and results, plus completed sync
    /// items of the same age. Active runs are never touched.
    pub fn cleanup(&self, older_than_days: u32, now_ms: u64) -> Result<u64, StoreError> {
        let cutoff = now_ms.saturating_sub(older_than_days as u64 * 24 * 60 * 60 * 1000) as i64;

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let removed = tx.execute(
            "DELETE FROM runs
             WHERE status IN ('complete', 'failed', 'stopped', 'cancelled')
               AND completed_at IS NOT NULL AND completed_at < ?1",
            params![cutoff],
        )?;
        tx.execute(
            "DELETE FROM sync_queue WHERE completed = 1 AND created_at < ?1",
            params![cutoff],
        )?;

        tx.commit()?;
        tracing::info!(removed, older_than_days, "cleaned up terminal runs");
        Ok(removed as u64)
    }

    /// Aggregate counters for the stats surface.
    pub fn stats(&self) -> Result<Stats, StoreError> {
        let conn = self.conn.lock();

        let mut runs_by_status = HashMap::new();
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM runs GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (status, count) = row?;
            runs_by_status.insert(status, count as u64);
        }

        let total_steps: i64 = conn.query_row("SELECT COUNT(*) FROM steps", [], |r| r.get(0))?;
        let total_results: i64 =
            conn.query_row("SELECT COUNT(*) FROM step_results", [], |r| r.get(0))?;
        let pending_syncs: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sync_queue WHERE completed = 0",
            [],
            |r| r.get(0),
        )?;
        let avg_attempts: f64 = conn.query_row(
            "SELECT COALESCE(AVG(attempts), 0.0) FROM step_results",
            [],
            |r| r.get(0),
        )?;

        let db_size_bytes = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);

        Ok(Stats {
            runs_by_status,
            total_steps: total_steps as u64,
            total_results: total_results as u64,
            pending_syncs: pending_syncs as u64,
            avg_attempts,
            db_size_bytes,
        })
    }
}

// ── Row mapping ──────────────────────────────────────────────────────────

fn query_run(conn: &Connection, run_id: &RunId) -> Result<Option<Run>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT run_id, status, current_step_index, total_steps, final_response,
                current_status_summary, initial_message, created_at, completed_at
         FROM runs WHERE run_id = ?1",
    )?;
    let run = stmt
        .query_row(params![run_id.as_str()], row_to_run)
        .optional()?;
    run.transpose()
}

fn query_step(conn: &Connection, step_id: i64) -> Result<Option<Step>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT step_id, run_id, step_index, step_json, status, started_at, completed_at
         FROM steps WHERE step_id = ?1",
    )?;
    let step = stmt.query_row(params![step_id], row_to_step).optional()?;
    step.transpose()
}

fn query_step_by_index(
    conn: &Connection,
    run_id: &RunId,
    step_index: i64,
) -> Result<Option<Step>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT step_id, run_id, step_index, step_json, status, started_at, completed_at
         FROM steps WHERE run_id = ?1 AND step_index = ?2",
    )?;
    let step = stmt
        .query_row(params![run_id.as_str(), step_index], row_to_step)
        .optional()?;
    step.transpose()
}

type RowResult<T> = rusqlite::Result<Result<T, StoreError>>;

fn row_to_run(row: &Row<'_>) -> RowResult<Run> {
    let status_raw: String = row.get(1)?;
    let created_at: i64 = row.get(7)?;
    let completed_at: Option<i64> = row.get(8)?;

    Ok((|| {
        let status = RunStatus::parse(&status_raw)
            .ok_or_else(|| StoreError::Corrupt(format!("run status: {status_raw}")))?;
        Ok(Run {
            run_id: RunId::new(row.get::<_, String>(0)?),
            status,
            current_step_index: row.get(2)?,
            total_steps: row.get(3)?,
            final_response: row.get(4)?,
            current_status_summary: row.get(5)?,
            initial_message: row.get(6)?,
            created_at_ms: created_at as u64,
            completed_at_ms: completed_at.map(|v| v as u64),
        })
    })())
}

fn row_to_step(row: &Row<'_>) -> RowResult<Step> {
    let status_raw: String = row.get(4)?;
    let json: String = row.get(3)?;
    let started_at: Option<i64> = row.get(5)?;
    let completed_at: Option<i64> = row.get(6)?;

    Ok((|| {
        let status = StepStatus::parse(&status_raw)
            .ok_or_else(|| StoreError::Corrupt(format!("step status: {status_raw}")))?;
        Ok(Step {
            step_id: row.get(0)?,
            run_id: RunId::new(row.get::<_, String>(1)?),
            step_index: row.get(2)?,
            descriptor: serde_json::from_str(&json)?,
            status,
            started_at_ms: started_at.map(|v| v as u64),
            completed_at_ms: completed_at.map(|v| v as u64),
        })
    })())
}

fn row_to_result(row: &Row<'_>) -> RowResult<StepResult> {
    let error_json: Option<String> = row.get(10)?;
    let evidence_json: Option<String> = row.get(11)?;
    let execution_time_ms: i64 = row.get(9)?;
    let synced_at: Option<i64> = row.get(12)?;

    Ok((|| {
        let error: Option<EngineError> = error_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let evidence: Option<serde_json::Value> = evidence_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(StepResult {
            result_id: row.get(0)?,
            step_id: row.get(1)?,
            run_id: RunId::new(row.get::<_, String>(2)?),
            step_index: row.get(3)?,
            success: row.get(4)?,
            stdout: row.get(5)?,
            stderr: row.get(6)?,
            exit_code: row.get(7)?,
            attempts: row.get(8)?,
            execution_time_ms: execution_time_ms as u64,
            error,
            evidence,
            synced_at_ms: synced_at.map(|v| v as u64),
        })
    })())
}

fn row_to_sync_item(row: &Row<'_>) -> RowResult<SyncItem> {
    let action_raw: String = row.get(2)?;
    let payload_raw: String = row.get(3)?;
    let next_attempt_at: i64 = row.get(6)?;

    Ok((|| {
        let action = SyncAction::parse(&action_raw)
            .ok_or_else(|| StoreError::Corrupt(format!("sync action: {action_raw}")))?;
        Ok(SyncItem {
            queue_id: row.get(0)?,
            run_id: RunId::new(row.get::<_, String>(1)?),
            action,
            payload: serde_json::from_str(&payload_raw)?,
            priority: row.get(4)?,
            attempts: row.get(5)?,
            next_attempt_at_ms: next_attempt_at as u64,
            last_error: row.get(7)?,
        })
    })())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
