//! View-state query string codec.
//!
//! Maps the applied filter, pagination and a few view extras to and from the
//! `?key=value` string kept in the location, so a view can be bookmarked and
//! shared. Decoding never fails: anything unparsable falls back to its
//! default.

use url::form_urlencoded;

use crate::types::{FilterState, Pagination, TimeRange};

/// Location state that is not part of the run filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewExtras {
    pub project_name: Option<String>,
    pub stack_id: Option<u64>,
    pub panel_key: Option<String>,
}

/// Everything recoverable from a location query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewQuery {
    pub filter: FilterState,
    pub pagination: Pagination,
    pub extras: ViewExtras,
}

/// Serialize view state. Empty or absent values are omitted.
pub fn encode(filter: &FilterState, pagination: &Pagination, extras: &ViewExtras) -> String {
    let mut out = form_urlencoded::Serializer::new(String::new());
    let mut put = |key: &str, value: &str| {
        if !value.is_empty() {
            out.append_pair(key, value);
        }
    };

    put("projectName", extras.project_name.as_deref().unwrap_or(""));
    if let Some(kind) = filter.kind {
        put("type", kind.as_str());
    }
    if let Some(status) = filter.status {
        put("status", status.as_str());
    }
    if let Some(range) = filter.time_range {
        let (start, end) = range.wire_bounds();
        put("startTime", &start);
        put("endTime", &end);
    }
    if let Some(stack_id) = extras.stack_id {
        put("stackId", &stack_id.to_string());
    }
    put("page", &pagination.page.to_string());
    put("pageSize", &pagination.page_size.to_string());
    put("total", &pagination.total.to_string());
    put("panelKey", extras.panel_key.as_deref().unwrap_or(""));

    out.finish()
}

/// Parse view state. Missing keys take their defaults, unknown keys are
/// ignored and malformed values degrade to the default.
pub fn decode(query: &str) -> ViewQuery {
    let query = query.trim().trim_start_matches('?');
    let mut view = ViewQuery::default();
    let mut start_time = None;
    let mut end_time = None;

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            "projectName" => view.extras.project_name = Some(value.to_owned()),
            "panelKey" => view.extras.panel_key = Some(value.to_owned()),
            "stackId" => view.extras.stack_id = value.parse().ok(),
            "type" => view.filter.kind = value.parse().ok(),
            "status" => view.filter.status = value.parse().ok(),
            "startTime" => start_time = Some(value.to_owned()),
            "endTime" => end_time = Some(value.to_owned()),
            "page" => {
                if let Some(page) = value.parse::<u32>().ok().filter(|p| *p >= 1) {
                    view.pagination.page = page;
                }
            }
            "pageSize" => {
                if let Some(size) = value.parse::<u32>().ok().filter(|s| *s > 0) {
                    view.pagination.page_size = size;
                }
            }
            "total" => {
                if let Ok(total) = value.parse::<u64>() {
                    view.pagination.total = total;
                }
            }
            other => tracing::trace!("query: ignoring unknown key {other:?}"),
        }
    }

    if let (Some(start), Some(end)) = (start_time, end_time) {
        view.filter.time_range = TimeRange::parse_wire(&start, &end);
    }

    view
}
