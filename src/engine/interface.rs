use std::sync::mpsc::Sender;

use crate::actions::run_actions::RunForm;
use crate::api::RunsPage;
use crate::types::RunKind;

use super::poll::{PollCursor, Ticket};

/// Handle to the backend engine held by the view layer.
///
/// Cheaply cloneable. When the last handle is dropped the sender channel
/// closes, signalling the engine to shut down.
#[derive(Clone)]
pub struct EngineHandle {
    tx: tokio::sync::mpsc::UnboundedSender<Request>,
}

impl EngineHandle {
    pub(crate) fn new(tx: tokio::sync::mpsc::UnboundedSender<Request>) -> Self {
        Self { tx }
    }

    /// Send a request to the engine without blocking.
    pub fn send(&self, req: Request) {
        // Ignore errors: if the receiver is gone the engine has already shut down.
        let _ = self.tx.send(req);
    }
}

/// All operations the view layer can send to the engine.
pub enum Request {
    // -----------------------------------------------------------------------
    // Background polling (one subject at a time)
    // -----------------------------------------------------------------------
    Watch {
        stack_id: u64,
        cursor: PollCursor,
        notify_tx: Sender<Event>,
    },
    /// Only honoured when `cursor` is the one the current watch used.
    Unwatch {
        stack_id: u64,
        cursor: PollCursor,
    },

    // -----------------------------------------------------------------------
    // On-demand operations
    // -----------------------------------------------------------------------
    FetchRuns {
        stack_id: u64,
        ticket: Ticket,
        reply_tx: Sender<Event>,
    },
    CreateRun {
        stack_id: u64,
        form: RunForm,
        reply_tx: Sender<Event>,
    },

    // -----------------------------------------------------------------------
    // Control
    // -----------------------------------------------------------------------
    Shutdown,
}

/// All events the engine can push back to views.
#[derive(Debug)]
pub enum Event {
    RunsFetched {
        stack_id: u64,
        seq: u64,
        page: RunsPage,
    },
    /// `message` is set only for failures the operator should see.
    RunsFetchFailed {
        stack_id: u64,
        seq: u64,
        message: Option<String>,
    },
    RunCreated {
        stack_id: u64,
        kind: RunKind,
    },
    CreateFailed {
        stack_id: u64,
        kind: RunKind,
        message: String,
    },
}
