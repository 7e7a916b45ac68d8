// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket listener: one task per connection, request/response framing.

use crate::lifecycle::{DaemonManager, PendingInputs};
use crate::protocol::{
    self, ProtocolError, Request, Response, DEFAULT_TIMEOUT,
};
use std::sync::Arc;
use tether_core::{RequestId, RunId};
use tether_tools::ChannelUserInput;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Shared context for request handling.
pub struct ListenCtx {
    pub manager: Arc<DaemonManager>,
    pub user_input: ChannelUserInput,
    pub pending_inputs: PendingInputs,
    pub shutdown: Arc<Notify>,
}

/// Accept loop.
pub struct Listener {
    listener: UnixListener,
    ctx: Arc<ListenCtx>,
}

impl Listener {
    pub fn new(listener: UnixListener, ctx: Arc<ListenCtx>) -> Self {
        Self { listener, ctx }
    }

    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(handle_connection(stream, ctx));
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Serve one connection until it closes.
async fn handle_connection(mut stream: UnixStream, ctx: Arc<ListenCtx>) {
    loop {
        let request = match protocol::read_request(&mut stream, DEFAULT_TIMEOUT).await {
            Ok(request) => request,
            Err(ProtocolError::ConnectionClosed) | Err(ProtocolError::Timeout) => return,
            Err(e) => {
                debug!(error = %e, "bad request; closing connection");
                return;
            }
        };

        let response = handle_request(&ctx, request).await;

        if let Err(e) = protocol::write_response(&mut stream, &response, DEFAULT_TIMEOUT).await {
            debug!(error = %e, "response write failed");
            return;
        }
    }
}

/// Dispatch one request. Never lets an internal error escape as anything
/// but an error envelope.
pub async fn handle_request(ctx: &ListenCtx, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong { success: true },

        Request::Shutdown => {
            ctx.shutdown.notify_one();
            Response::ShuttingDown { success: true }
        }

        Request::StartRun { run_id } => match ctx.manager.start_run(RunId::new(&run_id)) {
            Ok(()) => Response::RunStarted {
                success: true,
                run_id,
            },
            Err(e) => Response::error(e.to_string()),
        },

        Request::StopRun { run_id } => {
            let stopped = ctx.manager.stop_run(&RunId::new(run_id));
            Response::RunStopped {
                success: true,
                stopped,
            }
        }

        Request::StopAll => {
            let stopped = ctx.manager.stop_all_runs();
            Response::RunsStopped {
                success: true,
                stopped,
            }
        }

        Request::GetStatus { run_id } => {
            match ctx.manager.get_run_status(&RunId::new(run_id)) {
                Ok(status) => Response::RunStatus {
                    success: true,
                    status: status.map(Box::new),
                },
                Err(e) => Response::error(e.to_string()),
            }
        }

        Request::ListActive => match ctx.manager.list_active_runs() {
            Ok(runs) => Response::ActiveRuns {
                success: true,
                runs,
            },
            Err(e) => Response::error(e.to_string()),
        },

        Request::GetStats => match ctx.manager.get_stats() {
            Ok(stats) => Response::Stats {
                success: true,
                stats: Box::new(stats),
            },
            Err(e) => Response::error(e.to_string()),
        },

        Request::SetOnline { is_online } => {
            ctx.manager.set_online(is_online);
            Response::OnlineSet {
                success: true,
                is_online,
            }
        }

        Request::Cleanup { older_than_days } => match ctx.manager.cleanup(older_than_days) {
            Ok(cleaned) => Response::Cleaned {
                success: true,
                cleaned,
            },
            Err(e) => Response::error(e.to_string()),
        },

        Request::PendingInputs => Response::PendingInputs {
            success: true,
            inputs: ctx.pending_inputs.lock().clone(),
        },

        Request::RespondInput {
            request_id,
            response,
        } => {
            let id = RequestId::new(&request_id);
            let delivered = ctx.user_input.respond(&id, response);
            ctx.pending_inputs
                .lock()
                .retain(|p| p.request_id != request_id);
            Response::InputAnswered {
                success: true,
                delivered,
            }
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
