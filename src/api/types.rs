use serde::{Deserialize, Serialize};

use crate::types::{FilterState, Pagination, RunKind, RunRecord};

use super::error::ApiError;

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// `{success, data?, message?}` wrapper used by every endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Turn a `success=false` envelope into [`ApiError::Rejected`].
    pub fn check(self) -> Result<Option<T>, ApiError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(ApiError::Rejected {
                message: self
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "request failed".to_owned()),
            })
        }
    }
}

/// `data` of a successful list response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunPageData {
    #[serde(default)]
    pub runs: Vec<RunRecord>,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total: u64,
}

// ---------------------------------------------------------------------------
// List request / normalized page
// ---------------------------------------------------------------------------

/// Query parameters of the list operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListRunsQuery {
    #[serde(rename = "stackID")]
    pub stack_id: u64,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<RunKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "startTime", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(rename = "endTime", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub page: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
}

impl ListRunsQuery {
    /// Build the request for `filter` and `pagination`. The time range is sent
    /// as two UTC bounds, or not at all.
    pub fn new(stack_id: u64, filter: &FilterState, pagination: &Pagination) -> Self {
        let (start_time, end_time) = match filter.time_range {
            Some(range) => {
                let (start, end) = range.wire_bounds();
                (Some(start), Some(end))
            }
            None => (None, None),
        };
        Self {
            stack_id,
            kind: filter.kind,
            status: filter.status.map(|s| s.as_str().to_owned()),
            start_time,
            end_time,
            page: pagination.page.max(1),
            page_size: if pagination.page_size == 0 {
                crate::types::DEFAULT_PAGE_SIZE
            } else {
                pagination.page_size
            },
        }
    }
}

/// One page of runs with the pagination the server reported for it.
#[derive(Debug, Clone, PartialEq)]
pub struct RunsPage {
    pub items: Vec<RunRecord>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

impl RunsPage {
    /// Normalize wire data against the request that produced it.
    pub fn from_wire(data: RunPageData, requested: &ListRunsQuery) -> Self {
        Self {
            items: data.runs,
            page: data.current_page.max(1),
            page_size: if data.page_size == 0 {
                requested.page_size
            } else {
                data.page_size
            },
            total: data.total,
        }
    }

    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            page_size: self.page_size,
            total: self.total,
        }
    }
}

// ---------------------------------------------------------------------------
// Create request
// ---------------------------------------------------------------------------

/// A fully resolved create call: which operation, body and query.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRunCall {
    pub stack_id: u64,
    pub kind: RunKind,
    pub body: serde_json::Map<String, serde_json::Value>,
    pub query: Vec<(&'static str, String)>,
}
