use crate::ansi::{self, StyledLine};
use crate::types::{ChangeAction, ChangeSet, ChangeStep, RunKind, RunRecord};

/// How a run is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailMode {
    /// Generate / Apply / Destroy: raw result and log.
    Summary,
    /// Previews (and unknown kinds): per-resource diff and log.
    Changes,
}

impl DetailMode {
    pub fn for_kind(kind: Option<RunKind>) -> Self {
        match kind {
            Some(RunKind::Generate | RunKind::Apply | RunKind::Destroy) => Self::Summary,
            Some(RunKind::Preview) | None => Self::Changes,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DetailTab {
    #[default]
    ExecResult,
    ExecLogs,
}

/// Detail state of the currently opened run.
///
/// The result JSON and the log markup are derived once per run id and
/// reused until another run is opened or the run's result or log changes.
/// Closing the viewer keeps them.
#[derive(Debug, Default)]
pub struct RunDetailViewer {
    /// Last opened run; the derived data below belongs to it.
    record: Option<RunRecord>,
    open: bool,
    changes: ChangeSet,
    log: Vec<StyledLine>,
    selected: Option<String>,
    tab: DetailTab,
}

impl RunDetailViewer {
    pub fn open(&mut self, record: RunRecord) {
        let unchanged = self.record.as_ref().is_some_and(|prev| {
            prev.id == record.id && prev.result == record.result && prev.logs == record.logs
        });
        if !unchanged {
            self.changes = parse_changes(&record);
            self.log = ansi::to_styled_lines(record.logs.as_deref().unwrap_or_default());
            self.selected = self.changes.step_keys.first().cloned();
        }
        self.tab = DetailTab::ExecResult;
        self.record = Some(record);
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn record(&self) -> Option<&RunRecord> {
        self.record.as_ref().filter(|_| self.open)
    }

    pub fn mode(&self) -> Option<DetailMode> {
        self.record().map(|r| DetailMode::for_kind(r.kind))
    }

    pub fn tab(&self) -> DetailTab {
        self.tab
    }

    pub fn select_tab(&mut self, tab: DetailTab) {
        self.tab = tab;
    }

    /// Step keys with their change action, in result order.
    pub fn resources(&self) -> Vec<(&str, Option<ChangeAction>)> {
        self.changes
            .step_keys
            .iter()
            .map(|k| (k.as_str(), self.changes.step(k).map(|s| s.action)))
            .collect()
    }

    /// Select a resource; unknown keys are ignored.
    pub fn select_resource(&mut self, key: &str) -> bool {
        if self.changes.step_keys.iter().any(|k| k == key) {
            self.selected = Some(key.to_owned());
            true
        } else {
            false
        }
    }

    pub fn selected_resource(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_step(&self) -> Option<&ChangeStep> {
        self.selected.as_deref().and_then(|k| self.changes.step(k))
    }

    /// Pretty-printed `(from, to)` of the selected step; empty when absent.
    pub fn diff_sides(&self) -> (String, String) {
        let pretty = |v: Option<&serde_json::Value>| {
            v.and_then(|v| serde_json::to_string_pretty(v).ok())
                .unwrap_or_default()
        };
        match self.selected_step() {
            Some(step) => (pretty(step.from.as_ref()), pretty(step.to.as_ref())),
            None => (String::new(), String::new()),
        }
    }

    pub fn log_lines(&self) -> &[StyledLine] {
        &self.log
    }

    /// The raw result, pretty-printed when it is JSON.
    pub fn result_text(&self) -> String {
        let Some(raw) = self.record().and_then(|r| r.result.as_deref()) else {
            return String::new();
        };
        serde_json::from_str::<serde_json::Value>(raw)
            .ok()
            .and_then(|v| serde_json::to_string_pretty(&v).ok())
            .unwrap_or_else(|| raw.to_owned())
    }
}

fn parse_changes(record: &RunRecord) -> ChangeSet {
    let Some(raw) = record.result.as_deref().filter(|r| !r.trim().is_empty()) else {
        return ChangeSet::default();
    };
    match ChangeSet::parse(raw) {
        Ok(set) => set,
        Err(e) => {
            tracing::debug!("detail: run {} result is not a change set: {e}", record.id);
            ChangeSet::default()
        }
    }
}
