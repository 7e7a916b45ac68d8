// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `tether` - operator CLI for the Tether daemon.

mod client;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tether_daemon::protocol::Request;

#[derive(Parser)]
#[command(name = "tether", version, about = "Drive the Tether execution daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start (or resume) a run by id
    Start {
        /// Run id assigned by the cloud planner
        run_id: String,
    },
    /// Stop a single run
    Stop { run_id: String },
    /// Emergency stop: every run, every registered process
    StopAll,
    /// Show a run's status
    Status { run_id: String },
    /// List active runs
    List,
    /// Engine statistics
    Stats,
    /// Delete terminal runs older than N days
    Cleanup {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Force the engine online
    Online,
    /// Force the engine offline
    Offline,
    /// Prompts waiting for an answer
    Inputs,
    /// Answer a pending prompt
    Respond {
        request_id: String,
        response: String,
    },
    /// Check the daemon is alive
    Ping,
    /// Ask the daemon to shut down
    Shutdown,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let request = match cli.command {
        Command::Start { run_id } => Request::StartRun { run_id },
        Command::Stop { run_id } => Request::StopRun { run_id },
        Command::StopAll => Request::StopAll,
        Command::Status { run_id } => Request::GetStatus { run_id },
        Command::List => Request::ListActive,
        Command::Stats => Request::GetStats,
        Command::Cleanup { days } => Request::Cleanup {
            older_than_days: days,
        },
        Command::Online => Request::SetOnline { is_online: true },
        Command::Offline => Request::SetOnline { is_online: false },
        Command::Inputs => Request::PendingInputs,
        Command::Respond {
            request_id,
            response,
        } => Request::RespondInput {
            request_id,
            response,
        },
        Command::Ping => Request::Ping,
        Command::Shutdown => Request::Shutdown,
    };

    let response = client::send(request).await?;
    output::render(&response);

    if output::is_failure(&response) {
        std::process::exit(1);
    }
    Ok(())
}
