use std::sync::Arc;
use std::sync::mpsc::{Receiver, channel};
use std::time::{Duration, Instant};

use stack_runs::actions::run_actions::RunForm;
use stack_runs::api::RunsBackend;
use stack_runs::engine::{
    CursorState, EngineHandle, Event, PollCursor, Request, RunsEngine, StubBackend,
};
use stack_runs::location::{Location, MemoryLocation};
use stack_runs::types::{FilterState, Pagination, RunKind, RunRecord, RunStatus};
use stack_runs::views::runs::{RunsListView, RunsViewOptions};

const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

fn load_fixture_runs() -> Vec<RunRecord> {
    let json = include_str!("fixtures/runs.json");
    serde_json::from_str(json).expect("valid runs.json fixture")
}

fn start(stub: &Arc<StubBackend>, interval: Duration) -> EngineHandle {
    RunsEngine::new(Arc::clone(stub) as Arc<dyn RunsBackend>, interval).start()
}

fn next_event(rx: &Receiver<Event>) -> Event {
    rx.recv_timeout(REPLY_TIMEOUT)
        .expect("engine should reply within 2 seconds")
}

fn failed_page_of_one() -> CursorState {
    CursorState {
        filter: FilterState {
            status: Some(RunStatus::Failed),
            ..FilterState::default()
        },
        pagination: Pagination {
            page: 1,
            page_size: 1,
            total: 0,
        },
    }
}

#[test]
fn fixture_decodes_unknown_kind_as_none() {
    let runs = load_fixture_runs();
    assert_eq!(runs.len(), 5);
    assert_eq!(runs[4].kind, None);
    assert_eq!(runs[4].status, Some(RunStatus::Pending));
}

#[test]
fn watch_fetches_immediately_with_cursor_state() {
    let stub = Arc::new(StubBackend::new(load_fixture_runs()));
    let handle = start(&stub, Duration::from_secs(60));
    let (tx, rx) = channel();

    handle.send(Request::Watch {
        stack_id: 42,
        cursor: PollCursor::new(failed_page_of_one()),
        notify_tx: tx,
    });

    match next_event(&rx) {
        Event::RunsFetched {
            stack_id,
            seq,
            page,
        } => {
            assert_eq!(stack_id, 42);
            assert_eq!(seq, 1);
            assert_eq!(page.total, 2);
            assert_eq!(page.items.len(), 1);
            assert_eq!(page.items[0].id, 102);
        }
        other => panic!("expected RunsFetched, got {other:?}"),
    }

    let calls = stub.list_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].stack_id, 42);
    assert_eq!(calls[0].status.as_deref(), Some("Failed"));
    assert_eq!((calls[0].page, calls[0].page_size), (1, 1));
}

#[test]
fn poll_ticks_read_the_latest_cursor() {
    let stub = Arc::new(StubBackend::new(load_fixture_runs()));
    let handle = start(&stub, Duration::from_millis(50));
    let (tx, rx) = channel();
    let cursor = PollCursor::new(failed_page_of_one());

    handle.send(Request::Watch {
        stack_id: 42,
        cursor: cursor.clone(),
        notify_tx: tx,
    });
    let _ = next_event(&rx);

    let mut next = failed_page_of_one();
    next.pagination.page = 2;
    cursor.store(next);

    let deadline = Instant::now() + REPLY_TIMEOUT;
    loop {
        assert!(Instant::now() < deadline, "no tick used the new cursor");
        if let Event::RunsFetched { page, .. } = next_event(&rx)
            && page.page == 2
        {
            assert_eq!(page.items[0].id, 104);
            break;
        }
    }
    let last = stub.list_calls().pop().expect("at least one call");
    assert_eq!(last.page, 2);
}

#[test]
fn unwatch_stops_polling() {
    let stub = Arc::new(StubBackend::new(load_fixture_runs()));
    let handle = start(&stub, Duration::from_millis(50));
    let (tx, rx) = channel();
    let cursor = PollCursor::default();

    handle.send(Request::Watch {
        stack_id: 42,
        cursor: cursor.clone(),
        notify_tx: tx,
    });
    let _ = next_event(&rx);

    // Unwatching another stack, or the same stack with a foreign cursor,
    // is a no-op.
    handle.send(Request::Unwatch {
        stack_id: 7,
        cursor: cursor.clone(),
    });
    handle.send(Request::Unwatch {
        stack_id: 42,
        cursor: PollCursor::default(),
    });
    let _ = next_event(&rx);

    handle.send(Request::Unwatch {
        stack_id: 42,
        cursor,
    });
    assert_polling_stopped(&stub, &rx);
}

fn assert_polling_stopped(stub: &StubBackend, rx: &Receiver<Event>) {
    std::thread::sleep(Duration::from_millis(150));
    while rx.try_recv().is_ok() {}

    let before = stub.list_calls().len();
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(stub.list_calls().len(), before);
    assert!(rx.try_recv().is_err());
}

fn list_calls_after(stub: &StubBackend, pause: Duration) -> (usize, usize) {
    let before = stub.list_calls().len();
    std::thread::sleep(pause);
    (before, stub.list_calls().len())
}

#[test]
fn remounting_the_same_stack_keeps_polling() {
    let stub = Arc::new(StubBackend::new(load_fixture_runs()));
    let handle = start(&stub, Duration::from_millis(50));

    let mut view = RunsListView::mount(
        42,
        handle.clone(),
        MemoryLocation::new("/runs", ""),
        RunsViewOptions::default(),
    );
    let deadline = Instant::now() + REPLY_TIMEOUT;
    while view.applied_seq() == 0 {
        assert!(Instant::now() < deadline, "no page applied");
        view.wait(Duration::from_millis(50));
    }

    // The replacement mounts before the old view is dropped.
    view = RunsListView::mount(
        42,
        handle.clone(),
        MemoryLocation::new("/runs", "status=Failed"),
        RunsViewOptions::default(),
    );
    std::thread::sleep(Duration::from_millis(150));
    let (before, after) = list_calls_after(&stub, Duration::from_millis(400));
    assert!(after > before, "live view stopped polling: before={before} after={after}");
    assert_eq!(
        stub.list_calls().last().and_then(|q| q.status.clone()).as_deref(),
        Some("Failed")
    );

    drop(view);
    std::thread::sleep(Duration::from_millis(150));
    let (before, after) = list_calls_after(&stub, Duration::from_millis(300));
    assert_eq!(before, after);
}

#[test]
fn create_dispatches_to_the_selected_operation() {
    let stub = Arc::new(StubBackend::default());
    let handle = start(&stub, Duration::from_secs(60));
    let (tx, rx) = channel();

    handle.send(Request::CreateRun {
        stack_id: 42,
        form: RunForm::new(Some(RunKind::Apply), Some("dev".to_owned())),
        reply_tx: tx,
    });

    match next_event(&rx) {
        Event::RunCreated { stack_id, kind } => {
            assert_eq!(stack_id, 42);
            assert_eq!(kind, RunKind::Apply);
        }
        other => panic!("expected RunCreated, got {other:?}"),
    }
    let calls = stub.create_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, RunKind::Apply);
    assert_eq!(
        calls[0].query,
        vec![("workspace", "dev".to_owned()), ("noCache", "true".to_owned())]
    );
}

#[test]
fn rejected_create_reports_server_message() {
    let stub = Arc::new(StubBackend::default().rejecting_creates("stack is locked"));
    let handle = start(&stub, Duration::from_secs(60));
    let (tx, rx) = channel();

    handle.send(Request::CreateRun {
        stack_id: 42,
        form: RunForm::new(None, None),
        reply_tx: tx,
    });

    match next_event(&rx) {
        Event::CreateFailed { kind, message, .. } => {
            assert_eq!(kind, RunKind::Preview);
            assert_eq!(message, "stack is locked");
        }
        other => panic!("expected CreateFailed, got {other:?}"),
    }
}

#[test]
fn rejected_list_carries_message_and_polling_continues() {
    let stub = Arc::new(StubBackend::default().rejecting_lists("database unavailable"));
    let handle = start(&stub, Duration::from_millis(50));
    let (tx, rx) = channel();

    handle.send(Request::Watch {
        stack_id: 42,
        cursor: PollCursor::default(),
        notify_tx: tx,
    });

    for expected_seq in 1..=2 {
        match next_event(&rx) {
            Event::RunsFetchFailed { seq, message, .. } => {
                assert_eq!(seq, expected_seq);
                assert_eq!(message.as_deref(), Some("database unavailable"));
            }
            other => panic!("expected RunsFetchFailed, got {other:?}"),
        }
    }
}

#[test]
fn view_applies_first_page_and_syncs_location() {
    let stub = Arc::new(StubBackend::new(load_fixture_runs()));
    let handle = start(&stub, Duration::from_secs(60));
    let mut view = RunsListView::mount(
        42,
        handle,
        MemoryLocation::new("/runs", "type=Preview"),
        RunsViewOptions::default(),
    );

    let deadline = Instant::now() + REPLY_TIMEOUT;
    while view.applied_seq() == 0 {
        assert!(Instant::now() < deadline, "no page applied");
        view.wait(Duration::from_millis(50));
    }

    assert_eq!(view.runs().len(), 1);
    assert_eq!(view.runs()[0].id, 102);
    assert_eq!(
        view.location().query(),
        "type=Preview&stackId=42&page=1&pageSize=10&total=1"
    );

    assert!(view.open_detail(102));
    let resources: Vec<&str> = view.detail().resources().into_iter().map(|(k, _)| k).collect();
    assert_eq!(resources, vec!["vpc", "subnet"]);
}

#[test]
fn view_create_round_trip_refetches() {
    let stub = Arc::new(StubBackend::new(load_fixture_runs()));
    let handle = start(&stub, Duration::from_secs(60));
    let mut view = RunsListView::mount(
        42,
        handle,
        MemoryLocation::new("/runs", ""),
        RunsViewOptions::default(),
    );

    view.open_create_form();
    view.submit(RunForm::new(Some(RunKind::Destroy), None), None);

    let deadline = Instant::now() + REPLY_TIMEOUT;
    while view.is_create_pending() {
        assert!(Instant::now() < deadline, "create never completed");
        view.wait(Duration::from_millis(50));
    }
    assert!(!view.is_create_open());
    assert_eq!(
        view.notification().map(|n| n.message.as_str()),
        Some("Create Successful")
    );

    // Initial tick plus the refetch after creation.
    let deadline = Instant::now() + REPLY_TIMEOUT;
    while stub.list_calls().len() < 2 {
        assert!(Instant::now() < deadline, "no refetch after create");
        view.wait(Duration::from_millis(50));
    }
    assert_eq!(stub.create_calls()[0].kind, RunKind::Destroy);
}
