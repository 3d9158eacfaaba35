use std::sync::Arc;

use crate::api::{ApiError, ListRunsQuery, RunsBackend, RunsPage};
use crate::types::{FilterState, Pagination};

/// Issues list requests and logs every failure at this boundary.
#[derive(Clone)]
pub struct RunFetcher {
    backend: Arc<dyn RunsBackend>,
}

impl RunFetcher {
    pub fn new(backend: Arc<dyn RunsBackend>) -> Self {
        Self { backend }
    }

    pub async fn fetch(
        &self,
        stack_id: u64,
        filter: &FilterState,
        pagination: &Pagination,
    ) -> Result<RunsPage, ApiError> {
        let query = ListRunsQuery::new(stack_id, filter, pagination);
        match self.backend.list_runs(&query).await {
            Ok(page) => {
                tracing::debug!(
                    "fetcher: stack {stack_id} page {}/{} count={} total={}",
                    page.page,
                    page.page_size,
                    page.items.len(),
                    page.total
                );
                Ok(page)
            }
            Err(e) => {
                if e.user_message().is_some() {
                    tracing::debug!("fetcher: stack {stack_id} rejected: {e}");
                } else {
                    tracing::warn!("fetcher: stack {stack_id} failed: {e:#}");
                }
                Err(e)
            }
        }
    }
}
