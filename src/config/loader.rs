use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::types::AppConfig;

/// Discover and load the app config.
///
/// Priority:
/// 1. `--config` flag (explicit path)
/// 2. `$STACK_RUNS_CONFIG` environment variable
/// 3. `$XDG_CONFIG_HOME/stack-runs/config.toml`
/// 4. `~/.config/stack-runs/config.toml`
///
/// When nothing is found the built-in defaults are used.
pub fn load_config(explicit_path: Option<&Path>) -> Result<AppConfig> {
    // If an explicit path was given, just load that.
    if let Some(path) = explicit_path {
        return read_config(path);
    }

    match find_global_config() {
        Some(path) => read_config(&path),
        None => {
            tracing::debug!("config: no file found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

fn read_config(path: &Path) -> Result<AppConfig> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("parsing TOML from {}", path.display()))?;
    tracing::debug!("config: loaded {}", path.display());
    Ok(config)
}

fn find_global_config() -> Option<PathBuf> {
    // $STACK_RUNS_CONFIG
    if let Ok(path) = std::env::var("STACK_RUNS_CONFIG") {
        let p = PathBuf::from(&path);
        if p.is_file() {
            return Some(p);
        }
    }

    // $XDG_CONFIG_HOME/stack-runs/config.toml
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        let p = PathBuf::from(xdg).join("stack-runs/config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    // ~/.config/stack-runs/config.toml
    if let Some(home) = dirs_fallback() {
        let p = home.join(".config/stack-runs/config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    None
}

fn dirs_fallback() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
