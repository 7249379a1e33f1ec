//! Retention settings.
//!
//! Loaded from `~/.tether/config.json` (or the file named by `TETHER_CONFIG`).
//! A missing file yields the defaults; unknown keys are ignored.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Session persistence and retention policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionSettings {
    /// Persist sessions at all
    pub enabled: bool,
    /// Keep at most this many sessions across all branches (0 = unlimited)
    pub max_sessions: usize,
    /// Drop sessions not updated for this many days (0 = never)
    pub max_age_days: u32,
    /// Default row count for list views
    pub list_limit: usize,
    /// Save after every turn
    pub auto_save: bool,
    /// Seconds between periodic saves when `auto_save` is on
    pub save_interval: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_sessions: 100,
            max_age_days: 30,
            list_limit: 20,
            auto_save: true,
            save_interval: 30,
        }
    }
}

impl SessionSettings {
    /// Age limit in force, 0 when disabled.
    #[must_use]
    pub fn effective_max_age_days(&self) -> u32 {
        if self.enabled { self.max_age_days } else { 0 }
    }

    /// Count limit in force, 0 when disabled.
    #[must_use]
    pub fn effective_max_sessions(&self) -> usize {
        if self.enabled { self.max_sessions } else { 0 }
    }
}

/// Prompt/command history retention policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistorySettings {
    pub enabled: bool,
    /// Entries kept per branch and stream (0 = unlimited)
    pub max_entries: usize,
    /// Drop entries older than this many days (0 = never)
    pub max_age_days: u32,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
            max_age_days: 90,
        }
    }
}

impl HistorySettings {
    #[must_use]
    pub fn effective_max_entries(&self) -> usize {
        if self.enabled { self.max_entries } else { 0 }
    }

    #[must_use]
    pub fn effective_max_age_days(&self) -> u32 {
        if self.enabled { self.max_age_days } else { 0 }
    }
}

/// The full settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sessions: SessionSettings,
    pub history: HistorySettings,
}

impl Settings {
    /// Parse settings from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the text is not valid settings JSON.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
    }
}

/// Get the config file path.
fn config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("TETHER_CONFIG") {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    super::global_tether_dir()
        .map(|dir| dir.join("config.json"))
        .ok_or(Error::Config("Could not determine home directory".into()))
}

/// Load settings, falling back to defaults when no file exists.
///
/// # Errors
///
/// Returns `Error::Config` if the file exists but cannot be read or parsed.
pub fn load_settings() -> Result<Settings> {
    let path = config_path()?;

    if !path.exists() {
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(&path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {e}", path.display()))
    })?;

    Settings::from_json(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::from_json(r#"{"sessions": {"maxSessions": 5}}"#).unwrap();
        assert_eq!(settings.sessions.max_sessions, 5);
        assert_eq!(settings.sessions.max_age_days, 30);
        assert_eq!(settings.history, HistorySettings::default());
    }

    #[test]
    fn test_disabled_policy_has_no_limits() {
        let settings = Settings::from_json(
            r#"{"sessions": {"enabled": false}, "history": {"enabled": false, "maxEntries": 3}}"#,
        )
        .unwrap();
        assert_eq!(settings.sessions.effective_max_sessions(), 0);
        assert_eq!(settings.sessions.effective_max_age_days(), 0);
        assert_eq!(settings.history.effective_max_entries(), 0);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        assert!(matches!(
            Settings::from_json("{sessions"),
            Err(Error::Config(_))
        ));
    }
}
