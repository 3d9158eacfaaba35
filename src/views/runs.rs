use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crate::actions::run_actions::RunForm;
use crate::engine::{CursorState, EngineHandle, Event, PollCursor, Request};
use crate::location::Location;
use crate::query::{self, ViewExtras};
use crate::types::{
    FilterKey, FilterState, Pagination, RunKind, RunRecord, RunStatus, TimeRange,
};

use super::detail::RunDetailViewer;

// ---------------------------------------------------------------------------
// Draft filter form
// ---------------------------------------------------------------------------

/// Filter values edited by the operator but not yet applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterForm {
    draft: FilterState,
}

impl FilterForm {
    pub fn new(initial: FilterState) -> Self {
        Self { draft: initial }
    }

    pub fn set_kind(&mut self, kind: Option<RunKind>) {
        self.draft.kind = kind;
    }

    pub fn set_status(&mut self, status: Option<RunStatus>) {
        self.draft.status = status;
    }

    pub fn set_time_range(&mut self, range: Option<TimeRange>) {
        self.draft.time_range = range;
    }

    pub fn clear(&mut self, key: FilterKey) {
        self.draft.clear(key);
    }

    pub fn reset(&mut self) {
        self.draft = FilterState::default();
    }

    pub fn values(&self) -> FilterState {
        self.draft
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A transient message for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Runs list view
// ---------------------------------------------------------------------------

/// Called once after a run is created successfully.
pub type CreateCallback = Box<dyn FnOnce() + Send>;

/// Mount-time settings that do not come from the location.
#[derive(Debug, Clone, Default)]
pub struct RunsViewOptions {
    pub panel_key: Option<String>,
    /// Used when the location carries no `projectName`.
    pub project_name: Option<String>,
}

/// The runs panel of one stack.
///
/// Owns the applied filter and pagination, projects them into the location,
/// publishes them to the poll cursor on every state-changing action and
/// applies engine responses in sequence order.
pub struct RunsListView<L: Location> {
    stack_id: u64,
    engine: EngineHandle,
    location: L,
    extras: ViewExtras,
    form: FilterForm,
    applied: FilterState,
    pagination: Pagination,
    runs: Vec<RunRecord>,
    cursor: PollCursor,
    /// Sequence number of the latest user-initiated fetch.
    barrier: u64,
    /// Sequence number of the response currently displayed.
    last_applied: u64,
    loading: bool,
    notification: Option<Notification>,
    create_open: bool,
    create_pending: bool,
    on_created: Option<CreateCallback>,
    detail: RunDetailViewer,
    events_tx: Sender<Event>,
    events_rx: Receiver<Event>,
}

impl<L: Location> RunsListView<L> {
    /// Decode the location once, publish the initial cursor and start
    /// polling `stack_id`.
    pub fn mount(stack_id: u64, engine: EngineHandle, location: L, options: RunsViewOptions) -> Self {
        let decoded = query::decode(location.query());
        let mut pagination = decoded.pagination;
        if decoded.extras.stack_id.is_some_and(|id| id != stack_id) {
            pagination.page = 1;
        }
        let extras = ViewExtras {
            project_name: decoded.extras.project_name.or(options.project_name),
            stack_id: Some(stack_id),
            panel_key: options.panel_key.or(decoded.extras.panel_key),
        };
        let cursor = PollCursor::new(CursorState {
            filter: decoded.filter,
            pagination,
        });
        let (events_tx, events_rx) = std::sync::mpsc::channel();

        let mut view = Self {
            stack_id,
            engine,
            location,
            extras,
            form: FilterForm::new(decoded.filter),
            applied: decoded.filter,
            pagination,
            runs: Vec::new(),
            cursor,
            barrier: 0,
            last_applied: 0,
            loading: true,
            notification: None,
            create_open: false,
            create_pending: false,
            on_created: None,
            detail: RunDetailViewer::default(),
            events_tx,
            events_rx,
        };
        view.sync_location();
        tracing::debug!("runs view: mounted stack {stack_id}");
        view.engine.send(Request::Watch {
            stack_id,
            cursor: view.cursor.clone(),
            notify_tx: view.events_tx.clone(),
        });
        view
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn stack_id(&self) -> u64 {
        self.stack_id
    }

    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    pub fn applied(&self) -> &FilterState {
        &self.applied
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn form(&self) -> &FilterForm {
        &self.form
    }

    /// Draft edits never touch the applied filter or the cursor.
    pub fn form_mut(&mut self) -> &mut FilterForm {
        &mut self.form
    }

    pub fn location(&self) -> &L {
        &self.location
    }

    /// Sequence number of the response on screen; 0 before the first one.
    pub fn applied_seq(&self) -> u64 {
        self.last_applied
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_create_open(&self) -> bool {
        self.create_open
    }

    pub fn is_create_pending(&self) -> bool {
        self.create_pending
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn take_notification(&mut self) -> Option<Notification> {
        self.notification.take()
    }

    /// Filter chips for the applied filter.
    pub fn active_filters(&self) -> Vec<(FilterKey, String)> {
        self.applied.active()
    }

    /// Whether a "clear all" affordance should be offered.
    pub fn has_active_filters(&self) -> bool {
        !self.applied.is_empty()
    }

    pub fn detail(&self) -> &RunDetailViewer {
        &self.detail
    }

    pub fn detail_mut(&mut self) -> &mut RunDetailViewer {
        &mut self.detail
    }

    // -----------------------------------------------------------------------
    // Filter and paging actions
    // -----------------------------------------------------------------------

    /// Apply the draft filter and go back to the first page.
    pub fn search(&mut self) {
        self.applied = self.form.values();
        self.pagination = self.pagination.first_page();
        self.issue_fetch("search");
    }

    /// Clear draft and applied filters and go back to the first page.
    pub fn reset(&mut self) {
        self.form.reset();
        self.applied = FilterState::default();
        self.pagination = self.pagination.first_page();
        self.issue_fetch("reset");
    }

    /// Clear one draft field, then search with what remains.
    pub fn clear_one(&mut self, key: FilterKey) {
        self.form.clear(key);
        self.search();
    }

    pub fn change_page(&mut self, page: u32) {
        if page == 0 {
            return;
        }
        self.pagination.page = page;
        self.issue_fetch("page");
    }

    /// A new page size always starts from the first page.
    pub fn change_page_size(&mut self, page_size: u32) {
        if page_size == 0 {
            return;
        }
        self.pagination = Pagination {
            page: 1,
            page_size,
            ..self.pagination
        };
        self.issue_fetch("page size");
    }

    /// Re-fetch the current applied filter and page.
    pub fn refresh(&mut self) {
        self.issue_fetch("refresh");
    }

    fn issue_fetch(&mut self, reason: &str) {
        let ticket = self.cursor.publish(CursorState {
            filter: self.applied,
            pagination: self.pagination,
        });
        self.barrier = ticket.seq;
        self.loading = true;
        tracing::debug!(
            "runs view: {reason} -> seq={} page={} size={}",
            ticket.seq,
            self.pagination.page,
            self.pagination.page_size
        );
        self.engine.send(Request::FetchRuns {
            stack_id: self.stack_id,
            ticket,
            reply_tx: self.events_tx.clone(),
        });
        self.sync_location();
    }

    /// Write the current view state to the location.
    fn sync_location(&mut self) {
        let encoded = query::encode(&self.applied, &self.pagination, &self.extras);
        if encoded != self.location.query() {
            self.location.replace_query(encoded);
        }
    }

    // -----------------------------------------------------------------------
    // Run creation
    // -----------------------------------------------------------------------

    pub fn open_create_form(&mut self) {
        self.create_open = true;
    }

    pub fn close_create_form(&mut self) {
        self.create_open = false;
    }

    /// Launch a run. `on_success` runs once the server accepts it.
    ///
    /// Ignored while an earlier create is still waiting for its reply, so
    /// each reply settles the callback of the submit that caused it.
    pub fn submit(&mut self, form: RunForm, on_success: Option<CreateCallback>) -> bool {
        if self.create_pending {
            tracing::debug!("runs view: submit ignored, a create is in flight");
            return false;
        }
        tracing::debug!("runs view: submit {}", form.operation());
        self.create_pending = true;
        self.on_created = on_success;
        self.engine.send(Request::CreateRun {
            stack_id: self.stack_id,
            form,
            reply_tx: self.events_tx.clone(),
        });
        true
    }

    // -----------------------------------------------------------------------
    // Detail
    // -----------------------------------------------------------------------

    /// Open a run of the current page in the detail viewer.
    pub fn open_detail(&mut self, run_id: u64) -> bool {
        match self.runs.iter().find(|r| r.id == run_id) {
            Some(run) => {
                self.detail.open(run.clone());
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Engine events
    // -----------------------------------------------------------------------

    /// Handle every event already delivered. Returns how many there were.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Block up to `timeout` for one event, then drain the rest.
    pub fn wait(&mut self, timeout: Duration) -> usize {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => {
                self.handle_event(event);
                1 + self.pump()
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => 0,
        }
    }

    fn accepts(&self, seq: u64) -> bool {
        seq >= self.barrier && seq > self.last_applied
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::RunsFetched {
                stack_id,
                seq,
                page,
            } => {
                if stack_id != self.stack_id {
                    return;
                }
                if !self.accepts(seq) {
                    tracing::debug!(
                        "runs view: dropping stale page seq={seq} (barrier={}, shown={})",
                        self.barrier,
                        self.last_applied
                    );
                    return;
                }
                self.last_applied = seq;
                self.loading = false;
                self.pagination = page.pagination();
                self.runs = page.items;
                self.cursor.store(CursorState {
                    filter: self.applied,
                    pagination: self.pagination,
                });
                self.sync_location();
            }
            Event::RunsFetchFailed {
                stack_id,
                seq,
                message,
            } => {
                if stack_id != self.stack_id || !self.accepts(seq) {
                    return;
                }
                self.loading = false;
                // The last good page stays on screen.
                if let Some(message) = message {
                    self.notification = Some(Notification::error(message));
                }
            }
            Event::RunCreated { stack_id, kind } => {
                if stack_id != self.stack_id {
                    return;
                }
                tracing::debug!("runs view: {kind} run created");
                self.create_pending = false;
                self.create_open = false;
                self.notification = Some(Notification::success("Create Successful"));
                if let Some(callback) = self.on_created.take() {
                    callback();
                }
                self.refresh();
            }
            Event::CreateFailed {
                stack_id, message, ..
            } => {
                if stack_id != self.stack_id {
                    return;
                }
                self.create_pending = false;
                self.on_created = None;
                self.notification = Some(Notification::error(message));
            }
        }
    }
}

impl<L: Location> Drop for RunsListView<L> {
    fn drop(&mut self) {
        self.engine.send(Request::Unwatch {
            stack_id: self.stack_id,
            cursor: self.cursor.clone(),
        });
    }
}
