use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Classification of a single resource change in a preview result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
    UnChanged,
    #[serde(other)]
    Undefined,
}

/// Severity used to badge a change in the resource selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeBadge {
    Error,
    Neutral,
    Warning,
}

impl ChangeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::UnChanged => "UnChanged",
            Self::Undefined => "Undefined",
        }
    }

    pub fn badge(self) -> ChangeBadge {
        match self {
            Self::Undefined => ChangeBadge::Error,
            Self::UnChanged => ChangeBadge::Neutral,
            Self::Create | Self::Update | Self::Delete => ChangeBadge::Warning,
        }
    }
}

/// One resource's computed diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeStep {
    pub action: ChangeAction,
    #[serde(default)]
    pub from: Option<serde_json::Value>,
    #[serde(default)]
    pub to: Option<serde_json::Value>,
}

/// The structured `result` of a preview run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    /// Resource step ids in display order.
    #[serde(default)]
    pub step_keys: Vec<String>,
    #[serde(default)]
    pub change_steps: HashMap<String, ChangeStep>,
}

impl ChangeSet {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn step(&self, key: &str) -> Option<&ChangeStep> {
        self.change_steps.get(key)
    }
}
