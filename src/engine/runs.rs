use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::actions::run_actions::{self, RunForm};
use crate::api::RunsBackend;

use super::fetcher::RunFetcher;
use super::interface::{EngineHandle, Event, Request};
use super::poll::{PollingController, Ticket};

/// The runs engine: owns the backend, the poll timer and all in-flight
/// requests on a dedicated thread with its own Tokio runtime.
pub struct RunsEngine {
    backend: Arc<dyn RunsBackend>,
    poll_interval: Duration,
}

impl RunsEngine {
    pub fn new(backend: Arc<dyn RunsBackend>, poll_interval: Duration) -> Self {
        Self {
            backend,
            poll_interval,
        }
    }

    pub fn start(self) -> EngineHandle {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Request>();
        let handle = EngineHandle::new(tx);
        let _ = std::thread::Builder::new()
            .name("runs-engine".to_owned())
            .spawn(move || match tokio::runtime::Runtime::new() {
                Ok(rt) => rt.block_on(self.run_loop(rx)),
                Err(e) => tracing::error!("engine: tokio runtime init failed: {e}"),
            });
        handle
    }

    async fn run_loop(self, mut rx: UnboundedReceiver<Request>) {
        let fetcher = RunFetcher::new(Arc::clone(&self.backend));
        let mut poller = PollingController::new(self.poll_interval);

        loop {
            tokio::select! {
                biased;
                maybe_req = rx.recv() => {
                    match maybe_req {
                        None | Some(Request::Shutdown) => {
                            tracing::debug!("engine: shutting down");
                            break;
                        }
                        Some(req) => {
                            handle_request(req, &fetcher, &self.backend, &mut poller);
                        }
                    }
                }
                due = poller.next_due() => {
                    tracing::debug!("engine: poll tick stack={} seq={}", due.stack_id, due.ticket.seq);
                    spawn_fetch(&fetcher, due.stack_id, due.ticket, due.notify_tx);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Request dispatch
// ---------------------------------------------------------------------------

fn handle_request(
    req: Request,
    fetcher: &RunFetcher,
    backend: &Arc<dyn RunsBackend>,
    poller: &mut PollingController,
) {
    match req {
        Request::Watch {
            stack_id,
            cursor,
            notify_tx,
        } => {
            tracing::debug!("engine: watch stack {stack_id}");
            poller.watch(stack_id, cursor, notify_tx);
        }
        Request::Unwatch { stack_id, cursor } => {
            if !poller.unwatch(stack_id, &cursor) {
                tracing::debug!("engine: ignoring unwatch of stack {stack_id} from a replaced view");
            }
        }
        Request::FetchRuns {
            stack_id,
            ticket,
            reply_tx,
        } => {
            tracing::debug!("engine: fetch stack={stack_id} seq={}", ticket.seq);
            spawn_fetch(fetcher, stack_id, ticket, reply_tx);
        }
        Request::CreateRun {
            stack_id,
            form,
            reply_tx,
        } => {
            spawn_create(Arc::clone(backend), stack_id, form, reply_tx);
        }
        // Handled by the run loop.
        Request::Shutdown => {}
    }
}

/// Fetches run as independent tasks, so a slow response never delays the
/// next tick. Views order the results by sequence number.
fn spawn_fetch(fetcher: &RunFetcher, stack_id: u64, ticket: Ticket, reply_tx: Sender<Event>) {
    let fetcher = fetcher.clone();
    tokio::spawn(async move {
        let state = ticket.state;
        let event = match fetcher
            .fetch(stack_id, &state.filter, &state.pagination)
            .await
        {
            Ok(page) => Event::RunsFetched {
                stack_id,
                seq: ticket.seq,
                page,
            },
            Err(e) => Event::RunsFetchFailed {
                stack_id,
                seq: ticket.seq,
                message: e.user_message().map(str::to_owned),
            },
        };
        let _ = reply_tx.send(event);
    });
}

fn spawn_create(
    backend: Arc<dyn RunsBackend>,
    stack_id: u64,
    form: RunForm,
    reply_tx: Sender<Event>,
) {
    tokio::spawn(async move {
        let kind = form.operation();
        let event = match run_actions::submit(backend.as_ref(), stack_id, &form).await {
            Ok(kind) => {
                tracing::info!("engine: {kind} run created for stack {stack_id}");
                Event::RunCreated { stack_id, kind }
            }
            Err(e) => {
                tracing::debug!("engine: create {kind} for stack {stack_id} failed: {e}");
                Event::CreateFailed {
                    stack_id,
                    kind,
                    message: e.to_string(),
                }
            }
        };
        let _ = reply_tx.send(event);
    });
}
