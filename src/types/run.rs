use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Run enums
// ---------------------------------------------------------------------------

/// The operation a run executes against its stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunKind {
    Apply,
    Generate,
    Destroy,
    Preview,
}

impl RunKind {
    pub const ALL: [RunKind; 4] = [
        RunKind::Apply,
        RunKind::Generate,
        RunKind::Destroy,
        RunKind::Preview,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Apply => "Apply",
            Self::Generate => "Generate",
            Self::Destroy => "Destroy",
            Self::Preview => "Preview",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub const ALL: [RunStatus; 4] = [
        RunStatus::Pending,
        RunStatus::Running,
        RunStatus::Succeeded,
        RunStatus::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
        }
    }

    /// Whether the run has reached a final state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Error returned when a run label is not one of the known variants.
#[derive(Debug, thiserror::Error)]
#[error("unknown run {what} {value:?}")]
pub struct UnknownLabel {
    what: &'static str,
    value: String,
}

impl FromStr for RunKind {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownLabel {
                what: "type",
                value: s.to_owned(),
            })
    }
}

impl FromStr for RunStatus {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownLabel {
                what: "status",
                value: s.to_owned(),
            })
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Lenient label deserialization
// ---------------------------------------------------------------------------

/// Deserialize an optional label, mapping unknown or missing values to `None`
/// so a single odd record does not fail the whole page.
pub(crate) mod lenient {
    use std::str::FromStr;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr,
    {
        let s: Option<String> = Option::deserialize(deserializer)?;
        Ok(s.and_then(|s| s.parse().ok()))
    }
}

// ---------------------------------------------------------------------------
// RunRecord domain type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: u64,
    #[serde(rename = "type", default, deserialize_with = "lenient::deserialize")]
    pub kind: Option<RunKind>,
    #[serde(default, deserialize_with = "lenient::deserialize")]
    pub status: Option<RunStatus>,
    #[serde(default)]
    pub creation_timestamp: Option<DateTime<Utc>>,
    /// JSON-encoded run result; parsed only when the run is opened.
    #[serde(default)]
    pub result: Option<String>,
    /// Raw execution log, may contain ANSI escapes.
    #[serde(default)]
    pub logs: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!("destroy".parse::<RunKind>().unwrap(), RunKind::Destroy);
        assert_eq!(" Failed ".parse::<RunStatus>().unwrap(), RunStatus::Failed);
        assert!("Rollback".parse::<RunKind>().is_err());
    }

    #[test]
    fn record_with_unknown_labels_still_decodes() {
        let json = r#"{
            "id": 7,
            "type": "Rollback",
            "status": "Cancelled",
            "creationTimestamp": "2024-01-01T08:00:00+08:00",
            "result": null
        }"#;
        let run: RunRecord = serde_json::from_str(json).unwrap();
        assert_eq!(run.id, 7);
        assert_eq!(run.kind, None);
        assert_eq!(run.status, None);
        assert_eq!(
            run.creation_timestamp.unwrap().to_rfc3339(),
            "2024-01-01T00:00:00+00:00"
        );
        assert!(run.logs.is_none());
    }

    #[test]
    fn record_decodes_known_labels() {
        let json = r#"{"id": 1, "type": "Preview", "status": "Running", "logs": "ok"}"#;
        let run: RunRecord = serde_json::from_str(json).unwrap();
        assert_eq!(run.kind, Some(RunKind::Preview));
        assert_eq!(run.status, Some(RunStatus::Running));
        assert_eq!(run.logs.as_deref(), Some("ok"));
    }
}
