//! Configuration management.
//!
//! This module provides functions for resolving the database path, loading
//! retention settings, and detecting the current repository scope.
//!
//! # Layout
//!
//! - **Database**: `~/.tether/data/tether.db` (or `~/.tether/test/tether.db` in test mode)
//! - **Settings**: `~/.tether/config.json`

mod settings;

pub use settings::{load_settings, HistorySettings, SessionSettings, Settings};

use crate::model::Scope;
use std::path::{Path, PathBuf};

/// Get the global Tether directory (`~/.tether/`).
#[must_use]
pub fn global_tether_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".tether"))
}

/// Check if test mode is enabled.
///
/// Test mode is enabled by setting `TETHER_TEST_DB=1` (or any non-empty value).
/// This redirects all database operations to an isolated test database.
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("TETHER_TEST_DB")
        .map(|v| !v.is_empty() && v != "0" && v.to_lowercase() != "false")
        .unwrap_or(false)
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided (`--db` flag or `TETHER_DB`), use it directly
/// 2. `TETHER_TEST_DB` environment variable → `~/.tether/test/tether.db`
/// 3. Global location: `~/.tether/data/tether.db`
///
/// # Returns
///
/// Returns the path to the database file, or `None` if no home directory is known.
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    let subdir = if is_test_mode() { "test" } else { "data" };
    global_tether_dir().map(|dir| dir.join(subdir).join("tether.db"))
}

/// Get the current git branch name.
///
/// Returns `None` if not in a git repository or if git command fails.
#[must_use]
pub fn current_git_branch() -> Option<String> {
    git_output(&["rev-parse", "--abbrev-ref", "HEAD"])
}

/// URL of the `origin` remote.
#[must_use]
pub fn git_remote_url() -> Option<String> {
    git_output(&["remote", "get-url", "origin"])
}

fn git_output(args: &[&str]) -> Option<String> {
    std::process::Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Explicit scope components, typically from CLI flags.
///
/// Any component left `None` is filled in by [`detect_scope`].
#[derive(Debug, Clone, Default)]
pub struct ScopeOverrides {
    pub host: Option<String>,
    pub org: Option<String>,
    pub project: Option<String>,
    pub branch: Option<String>,
}

/// Detect the scope of the current working directory.
///
/// Uses the `origin` remote and current branch. Without a usable remote the
/// scope falls back to `local/<user>/<directory name>`; without a branch
/// (detached HEAD, no repository) it falls back to `main`.
#[must_use]
pub fn detect_scope(overrides: &ScopeOverrides) -> Scope {
    let branch = overrides
        .branch
        .clone()
        .or_else(|| current_git_branch().filter(|b| b != "HEAD"))
        .unwrap_or_else(|| "main".to_string());

    let detected = git_remote_url()
        .and_then(|url| Scope::parse_remote(&url, &branch))
        .unwrap_or_else(|| local_scope(&branch));

    Scope {
        host: overrides.host.clone().unwrap_or(detected.host),
        org: overrides.org.clone().unwrap_or(detected.org),
        project: overrides.project.clone().unwrap_or(detected.project),
        branch,
    }
}

fn local_scope(branch: &str) -> Scope {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let project = std::env::current_dir()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| "workspace".to_string());
    Scope::new("local", user, project, branch)
}
