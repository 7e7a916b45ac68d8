// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text rendering of daemon responses.

use tether_core::format_elapsed_ms;
use tether_daemon::protocol::Response;

/// True when the response is an error envelope.
pub fn is_failure(response: &Response) -> bool {
    matches!(response, Response::Error { .. })
}

/// Print a response for humans.
pub fn render(response: &Response) {
    match response {
        Response::Ok { .. } => println!("ok"),
        Response::Pong { .. } => println!("pong"),
        Response::ShuttingDown { .. } => println!("daemon shutting down"),

        Response::RunStarted { run_id, .. } => println!("started {run_id}"),

        Response::RunStopped { stopped, .. } => {
            if *stopped {
                println!("stop signalled");
            } else {
                println!("run is not executing");
            }
        }

        Response::RunsStopped { stopped, .. } => println!("stopped {stopped} runs"),

        Response::RunStatus { status, .. } => match status {
            Some(view) => {
                let run = &view.run;
                println!("{}  {}", run.run_id, run.status);
                println!("  step: {}/{}", run.current_step_index, run.total_steps);
                if let Some(created) =
                    chrono::DateTime::from_timestamp_millis(run.created_at_ms as i64)
                {
                    println!("  created: {}", created.format("%Y-%m-%d %H:%M:%S UTC"));
                }
                if let Some(summary) = &run.current_status_summary {
                    println!("  last: {summary}");
                }
                if let Some(response) = &run.final_response {
                    println!("  final: {response}");
                }
                if let Some(uptime) = view.uptime_ms {
                    println!("  executing for {}", format_elapsed_ms(uptime));
                }
            }
            None => println!("unknown run"),
        },

        Response::ActiveRuns { runs, .. } => {
            if runs.is_empty() {
                println!("no active runs");
            } else {
                for run in runs {
                    println!(
                        "{}  {}  step {}/{}",
                        run.run_id, run.status, run.current_step_index, run.total_steps
                    );
                }
            }
        }

        Response::Stats { stats, .. } => {
            println!("online: {}", stats.online);
            println!("executing: {}", stats.executing_runs);
            let mut statuses: Vec<_> = stats.store.runs_by_status.iter().collect();
            statuses.sort();
            for (status, count) in statuses {
                println!("  {status}: {count}");
            }
            println!("steps: {}", stats.store.total_steps);
            println!("sync backlog: {}", stats.store.pending_syncs);
            println!("avg attempts: {:.2}", stats.store.avg_attempts);
            println!("db size: {} bytes", stats.store.db_size_bytes);
        }

        Response::OnlineSet { is_online, .. } => {
            println!("engine {}", if *is_online { "online" } else { "offline" });
        }

        Response::Cleaned { cleaned, .. } => println!("cleaned {cleaned} runs"),

        Response::PendingInputs { inputs, .. } => {
            if inputs.is_empty() {
                println!("no pending prompts");
            } else {
                for input in inputs {
                    println!("{}  {}", input.request_id, input.prompt);
                }
            }
        }

        Response::InputAnswered { delivered, .. } => {
            if *delivered {
                println!("answer delivered");
            } else {
                println!("prompt was gone (timed out or already answered)");
            }
        }

        Response::Error { message, .. } => eprintln!("error: {message}"),
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
