use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior};

use crate::types::{FilterState, Pagination};

use super::interface::Event;

/// Default delay between two background fetches.
pub const POLL_INTERVAL: Duration = Duration::from_secs(7);

// ---------------------------------------------------------------------------
// Poll cursor
// ---------------------------------------------------------------------------

/// Filter and pagination a fetch is issued with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorState {
    pub filter: FilterState,
    pub pagination: Pagination,
}

/// A sequence number paired with the cursor state it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub seq: u64,
    pub state: CursorState,
}

#[derive(Debug, Default)]
struct CursorInner {
    state: CursorState,
    last_seq: u64,
}

/// Shared, always-current view of what the list should be fetching.
///
/// Written by the view on every state-changing action and read by the poll
/// timer at tick time. State and sequence counter live under one lock so a
/// ticket can never pair a new sequence number with stale state.
#[derive(Debug, Clone, Default)]
pub struct PollCursor {
    inner: Arc<Mutex<CursorInner>>,
}

impl PollCursor {
    pub fn new(state: CursorState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CursorInner { state, last_seq: 0 })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CursorInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the state and issue a ticket for it in one step.
    pub fn publish(&self, state: CursorState) -> Ticket {
        let mut inner = self.lock();
        inner.state = state;
        inner.last_seq += 1;
        Ticket {
            seq: inner.last_seq,
            state,
        }
    }

    /// Issue a ticket for the current state.
    pub fn issue(&self) -> Ticket {
        let mut inner = self.lock();
        inner.last_seq += 1;
        Ticket {
            seq: inner.last_seq,
            state: inner.state,
        }
    }

    /// Replace the state without issuing a ticket.
    pub fn store(&self, state: CursorState) {
        self.lock().state = state;
    }

    pub fn snapshot(&self) -> CursorState {
        self.lock().state
    }

    /// Whether both handles point at the same cursor.
    pub fn same_as(&self, other: &PollCursor) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// ---------------------------------------------------------------------------
// Polling controller
// ---------------------------------------------------------------------------

struct Subscription {
    stack_id: u64,
    cursor: PollCursor,
    notify_tx: Sender<Event>,
    ticker: Interval,
}

/// A poll tick that is ready to be fetched.
pub struct DuePoll {
    pub stack_id: u64,
    pub ticket: Ticket,
    pub notify_tx: Sender<Event>,
}

/// Idle until a stack is watched, then ticks immediately and every
/// `interval` afterwards until the subject changes or is unwatched.
pub struct PollingController {
    interval: Duration,
    active: Option<Subscription>,
}

impl PollingController {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            active: None,
        }
    }

    /// Start polling `stack_id`, replacing any previous subscription.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn watch(&mut self, stack_id: u64, cursor: PollCursor, notify_tx: Sender<Event>) {
        if let Some(prev) = self.active.as_ref() {
            tracing::debug!("poll: stack {} replaced by {stack_id}", prev.stack_id);
        }
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.active = Some(Subscription {
            stack_id,
            cursor,
            notify_tx,
            ticker,
        });
    }

    /// Stop polling if `stack_id` is the current subject and `cursor` is the
    /// one it was watched with. A stale unwatch from a replaced view of the
    /// same stack leaves the live subscription alone.
    pub fn unwatch(&mut self, stack_id: u64, cursor: &PollCursor) -> bool {
        let current = self
            .active
            .as_ref()
            .is_some_and(|sub| sub.stack_id == stack_id && sub.cursor.same_as(cursor));
        if current {
            tracing::debug!("poll: stack {stack_id} unwatched");
            self.active = None;
            true
        } else {
            false
        }
    }

    pub fn subject(&self) -> Option<u64> {
        self.active.as_ref().map(|s| s.stack_id)
    }

    /// Wait for the next tick. Never resolves while idle.
    pub async fn next_due(&mut self) -> DuePoll {
        match self.active.as_mut() {
            Some(sub) => {
                sub.ticker.tick().await;
                DuePoll {
                    stack_id: sub.stack_id,
                    ticket: sub.cursor.issue(),
                    notify_tx: sub.notify_tx.clone(),
                }
            }
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RunStatus;

    #[test]
    fn tickets_are_monotonic_and_fresh() {
        let cursor = PollCursor::default();
        let a = cursor.issue();
        let state = CursorState {
            filter: FilterState {
                status: Some(RunStatus::Failed),
                ..FilterState::default()
            },
            pagination: Pagination::default(),
        };
        let b = cursor.publish(state);
        let c = cursor.issue();
        assert!(a.seq < b.seq && b.seq < c.seq);
        assert_eq!(c.state, state);
    }

    #[test]
    fn store_does_not_advance_sequence() {
        let cursor = PollCursor::default();
        let a = cursor.issue();
        cursor.store(CursorState::default());
        assert_eq!(cursor.issue().seq, a.seq + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_is_immediate_then_interval() {
        let (tx, _rx) = std::sync::mpsc::channel();
        let mut poller = PollingController::new(POLL_INTERVAL);
        poller.watch(42, PollCursor::default(), tx);

        let start = tokio::time::Instant::now();
        let first = poller.next_due().await;
        assert_eq!(first.stack_id, 42);
        assert_eq!(start.elapsed(), Duration::ZERO);

        let second = poller.next_due().await;
        assert_eq!(start.elapsed(), POLL_INTERVAL);
        assert!(second.ticket.seq > first.ticket.seq);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_reads_cursor_at_tick_time() {
        let (tx, _rx) = std::sync::mpsc::channel();
        let cursor = PollCursor::default();
        let mut poller = PollingController::new(POLL_INTERVAL);
        poller.watch(1, cursor.clone(), tx);
        let _ = poller.next_due().await;

        let mut state = CursorState::default();
        state.pagination.page = 4;
        cursor.publish(state);

        let due = poller.next_due().await;
        assert_eq!(due.ticket.state.pagination.page, 4);
    }

    #[tokio::test]
    async fn unwatch_only_matches_current_subject() {
        let (tx, _rx) = std::sync::mpsc::channel();
        let first = PollCursor::default();
        let second = PollCursor::default();
        let mut poller = PollingController::new(POLL_INTERVAL);
        poller.watch(1, first.clone(), tx.clone());
        poller.watch(2, second.clone(), tx);
        assert!(!poller.unwatch(1, &first));
        assert_eq!(poller.subject(), Some(2));
        assert!(poller.unwatch(2, &second));
        assert_eq!(poller.subject(), None);
    }

    #[tokio::test]
    async fn unwatch_from_replaced_view_of_same_stack_is_ignored() {
        let (tx, _rx) = std::sync::mpsc::channel();
        let old = PollCursor::default();
        let live = PollCursor::default();
        let mut poller = PollingController::new(POLL_INTERVAL);
        poller.watch(42, old.clone(), tx.clone());
        poller.watch(42, live.clone(), tx);

        assert!(!poller.unwatch(42, &old));
        assert_eq!(poller.subject(), Some(42));
        assert!(poller.unwatch(42, &live));
        assert_eq!(poller.subject(), None);
    }
}
