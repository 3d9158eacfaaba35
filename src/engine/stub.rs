use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::api::{ApiError, CreateRunCall, ListRunsQuery, RunsBackend, RunsPage};
use crate::types::RunRecord;

/// A stub backend that serves pre-loaded fixture runs without any network
/// calls, filtering and paginating them in memory.
///
/// Every request is recorded so tests can assert on what the engine sent.
#[derive(Default)]
pub struct StubBackend {
    pub runs: Vec<RunRecord>,
    /// When set, list calls are rejected with this message.
    pub list_rejection: Option<String>,
    /// When set, create calls are rejected with this message.
    pub create_rejection: Option<String>,
    list_calls: Mutex<Vec<ListRunsQuery>>,
    create_calls: Mutex<Vec<CreateRunCall>>,
}

impl StubBackend {
    pub fn new(runs: Vec<RunRecord>) -> Self {
        Self {
            runs,
            ..Self::default()
        }
    }

    pub fn rejecting_creates(mut self, message: impl Into<String>) -> Self {
        self.create_rejection = Some(message.into());
        self
    }

    pub fn rejecting_lists(mut self, message: impl Into<String>) -> Self {
        self.list_rejection = Some(message.into());
        self
    }

    /// List requests received so far, oldest first.
    pub fn list_calls(&self) -> Vec<ListRunsQuery> {
        self.list_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Create requests received so far, oldest first.
    pub fn create_calls(&self) -> Vec<CreateRunCall> {
        self.create_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn matches(run: &RunRecord, query: &ListRunsQuery) -> bool {
        if query.kind.is_some() && run.kind != query.kind {
            return false;
        }
        if let Some(ref status) = query.status
            && run.status.map(|s| s.as_str()) != Some(status.as_str())
        {
            return false;
        }
        true
    }
}

#[async_trait]
impl RunsBackend for StubBackend {
    async fn list_runs(&self, query: &ListRunsQuery) -> Result<RunsPage, ApiError> {
        self.list_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.clone());

        if let Some(ref message) = self.list_rejection {
            return Err(ApiError::Rejected {
                message: message.clone(),
            });
        }

        let matching: Vec<&RunRecord> = self
            .runs
            .iter()
            .filter(|r| Self::matches(r, query))
            .collect();
        let size = query.page_size.max(1) as usize;
        let skip = (query.page.max(1) as usize - 1) * size;
        Ok(RunsPage {
            items: matching.iter().skip(skip).take(size).map(|r| (*r).clone()).collect(),
            page: query.page.max(1),
            page_size: query.page_size.max(1),
            total: matching.len() as u64,
        })
    }

    async fn create_run(&self, call: &CreateRunCall) -> Result<(), ApiError> {
        self.create_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call.clone());

        match self.create_rejection {
            Some(ref message) => Err(ApiError::Rejected {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}
