// engine module: background fetching and polling of runs

mod fetcher;
mod interface;
mod poll;
mod runs;
pub mod stub;

pub use fetcher::RunFetcher;
pub use interface::{EngineHandle, Event, Request};
pub use poll::{CursorState, DuePoll, POLL_INTERVAL, PollCursor, PollingController, Ticket};
pub use runs::RunsEngine;
pub use stub::StubBackend;
