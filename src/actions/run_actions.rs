use indexmap::IndexMap;
use serde_json::Value;

use crate::api::{ApiError, CreateRunCall, RunsBackend};
use crate::types::RunKind;

// ---------------------------------------------------------------------------
// Creation form values
// ---------------------------------------------------------------------------

/// Values of the "new run" form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunForm {
    /// Requested operation; `None` launches a preview.
    pub kind: Option<RunKind>,
    pub workspace: Option<String>,
    /// Any other form fields, passed through to the request body.
    pub fields: IndexMap<String, Value>,
}

impl RunForm {
    pub fn new(kind: Option<RunKind>, workspace: Option<String>) -> Self {
        Self {
            kind,
            workspace,
            fields: IndexMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// The operation this form dispatches to.
    pub fn operation(&self) -> RunKind {
        self.kind.unwrap_or(RunKind::Preview)
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Path segment of the async create endpoint for each operation.
pub fn route_segment(kind: RunKind) -> &'static str {
    match kind {
        RunKind::Apply => "apply",
        RunKind::Generate => "generate",
        RunKind::Destroy => "destroy",
        RunKind::Preview => "preview",
    }
}

/// Resolve the create call for `form` against `stack_id`.
///
/// The body holds every form field plus `type`, `stackID` and `workspace`;
/// the query always disables the server cache and previews ask for JSON
/// output.
pub fn build_call(stack_id: u64, form: &RunForm) -> CreateRunCall {
    let kind = form.operation();

    let mut body: serde_json::Map<String, Value> = form
        .fields
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    body.insert("type".to_owned(), Value::from(kind.as_str()));
    body.insert("stackID".to_owned(), Value::from(stack_id));
    if let Some(ref workspace) = form.workspace {
        body.insert("workspace".to_owned(), Value::from(workspace.as_str()));
    }

    let mut query = Vec::new();
    if let Some(ref workspace) = form.workspace {
        query.push(("workspace", workspace.clone()));
    }
    match kind {
        RunKind::Preview => {
            query.push(("output", "json".to_owned()));
            query.push(("noCache", "true".to_owned()));
        }
        RunKind::Apply | RunKind::Generate | RunKind::Destroy => {
            query.push(("noCache", "true".to_owned()));
        }
    }

    CreateRunCall {
        stack_id,
        kind,
        body,
        query,
    }
}

/// Launch the run described by `form`.
pub async fn submit(
    backend: &dyn RunsBackend,
    stack_id: u64,
    form: &RunForm,
) -> Result<RunKind, ApiError> {
    let call = build_call(stack_id, form);
    backend.create_run(&call).await?;
    Ok(call.kind)
}
