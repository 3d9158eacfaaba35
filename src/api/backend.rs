use async_trait::async_trait;

use super::error::ApiError;
use super::types::{CreateRunCall, ListRunsQuery, RunsPage};

/// The two backend operations the runs panel consumes.
///
/// Implemented by [`super::HttpBackend`] and by the fixture
/// [`crate::engine::StubBackend`].
#[async_trait]
pub trait RunsBackend: Send + Sync + 'static {
    /// List one page of runs.
    async fn list_runs(&self, query: &ListRunsQuery) -> Result<RunsPage, ApiError>;

    /// Launch a run. `Ok` means the server accepted it.
    async fn create_run(&self, call: &CreateRunCall) -> Result<(), ApiError>;
}
