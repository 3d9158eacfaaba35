use std::time::Duration;

use serde::Deserialize;

use crate::types::DEFAULT_PAGE_SIZE;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub defaults: Defaults,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Root of the console API, without the `/api/v1` suffix.
    pub base_url: String,
    /// Bearer token; `$STACK_RUNS_TOKEN` is used when unset.
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:80".to_owned(),
            token: None,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub page_size: u32,
    pub poll_interval_secs: u64,
    pub project_name: Option<String>,
    pub workspace: Option<String>,
    pub date_format: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            poll_interval_secs: 7,
            project_name: None,
            workspace: None,
            date_format: "relative".to_owned(),
        }
    }
}

impl Defaults {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
